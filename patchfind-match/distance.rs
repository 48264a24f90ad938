/// Plain summed squared difference
#[inline]
pub fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Summed squared difference that gives up once it passes `bound`.
///
/// Accumulates four components at a time. A result `<= bound` is exact; a
/// result `> bound` only means the true distance exceeds `bound` too.
/// Both slices must share a length divisible by four.
#[inline]
pub fn squared_distance_bounded(a: &[f32], b: &[f32], bound: f32) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut total = 0f32;
    for (ca, cb) in a.chunks_exact(4).zip(b.chunks_exact(4)) {
        let t0 = ca[0] - cb[0];
        let t1 = ca[1] - cb[1];
        let t2 = ca[2] - cb[2];
        let t3 = ca[3] - cb[3];
        total += t0 * t0 + t1 * t1 + t2 * t2 + t3 * t3;
        if total > bound {
            break;
        }
    }
    total
}

/// Running two best candidates, nearest first
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest2 {
    slots: [(usize, f32); 2],
    filled: usize,
}

impl Default for Nearest2 {
    fn default() -> Self {
        Self {
            slots: [(usize::MAX, f32::INFINITY); 2],
            filled: 0,
        }
    }
}

impl Nearest2 {
    /// Distance a candidate must beat to enter the set
    #[inline]
    pub fn worst(&self) -> f32 {
        self.slots[1].1
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.filled == 2
    }

    #[inline]
    pub fn offer(&mut self, index: usize, dist: f32) {
        if dist < self.slots[0].1 {
            self.slots[1] = self.slots[0];
            self.slots[0] = (index, dist);
        } else if dist < self.slots[1].1 {
            self.slots[1] = (index, dist);
        } else {
            return;
        }
        self.filled = (self.filled + 1).min(2);
    }

    /// `(nearest, second)` once two candidates were seen
    pub fn pair(&self) -> Option<((usize, f32), (usize, f32))> {
        self.is_full().then_some((self.slots[0], self.slots[1]))
    }
}
