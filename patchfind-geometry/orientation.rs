use patchfind_core::CornerSet;

/// How patch coordinates must be read when the target is rotated by 180 degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatchReflection {
    /// Walk the patch list from the far end along the top edge
    pub reverse_along_edge: bool,
    /// Measure relative height from the opposite edge
    pub invert_height: bool,
}

impl PatchReflection {
    pub fn upside_down() -> Self {
        Self {
            reverse_along_edge: true,
            invert_height: true,
        }
    }

    pub fn is_identity(&self) -> bool {
        !self.reverse_along_edge && !self.invert_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation {
    pub corners: CornerSet,
    pub upside_down: bool,
    pub reflection: PatchReflection,
}

/// Relabel corners so corner 0 is left of corner 1.
///
/// A target whose corner 0 lies right of corner 1 is upside down; corners
/// 0/2 and 1/3 swap places and both reflections are set.
pub fn normalize(corners: CornerSet) -> Orientation {
    let upside_down = corners[0].x > corners[1].x;
    if !upside_down {
        return Orientation {
            corners,
            upside_down,
            reflection: PatchReflection::default(),
        };
    }
    let [c0, c1, c2, c3] = corners;
    Orientation {
        corners: [c2, c3, c0, c1],
        upside_down,
        reflection: PatchReflection::upside_down(),
    }
}
