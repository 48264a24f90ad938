use log::debug;
use nalgebra::{DMatrix, Matrix3, Point2, Vector3};
use patchfind_core::{CornerSet, PixelPoint, RansacConfig};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;

use crate::error::{GeometryError, GeometryResult};

/// Minimal sample size of a planar homography
pub const MIN_CORRESPONDENCES: usize = 4;

/// Projective map `x' ~ H x` from the target frame to the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    m: Matrix3<f64>,
}

impl Homography {
    pub fn from_matrix(m: Matrix3<f64>) -> Self {
        Self { m }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.m
    }

    /// Map a point; `None` when it lands on the line at infinity
    pub fn apply(&self, p: &Point2<f64>) -> Option<Point2<f64>> {
        let v = self.m * Vector3::new(p.x, p.y, 1.0);
        if v.z.abs() <= f64::EPSILON {
            return None;
        }
        Some(Point2::new(v.x / v.z, v.y / v.z))
    }

    pub fn reprojection_error(&self, src: &Point2<f64>, dst: &Point2<f64>) -> f64 {
        match self.apply(src) {
            Some(p) => (p - dst).norm(),
            None => f64::INFINITY,
        }
    }

    /// Normalised DLT over at least four pairs.
    ///
    /// Both point sets are shifted to zero mean and scaled to an average
    /// distance of sqrt(2) before solving `A h = 0` by SVD.
    pub fn dlt(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Self> {
        let n = src.len();
        if n < MIN_CORRESPONDENCES || dst.len() != n {
            return None;
        }
        let (src_n, t_src) = normalize(src)?;
        let (dst_n, t_dst) = normalize(dst)?;

        let mut a = DMatrix::<f64>::zeros(2 * n, 9);
        for (i, (p, q)) in src_n.iter().zip(&dst_n).enumerate() {
            let (x, y, u, v) = (p.x, p.y, q.x, q.y);
            let r0 = 2 * i;
            let r1 = r0 + 1;
            a[(r0, 0)] = -x;
            a[(r0, 1)] = -y;
            a[(r0, 2)] = -1.0;
            a[(r0, 6)] = u * x;
            a[(r0, 7)] = u * y;
            a[(r0, 8)] = u;
            a[(r1, 3)] = -x;
            a[(r1, 4)] = -y;
            a[(r1, 5)] = -1.0;
            a[(r1, 6)] = v * x;
            a[(r1, 7)] = v * y;
            a[(r1, 8)] = v;
        }

        // a minimal sample gives 8 rows; pad so the SVD exposes the null space
        if a.nrows() < a.ncols() {
            let mut padded = DMatrix::<f64>::zeros(9, 9);
            padded.view_mut((0, 0), (a.nrows(), 9)).copy_from(&a);
            a = padded;
        }

        let svd = a.svd(false, true);
        let v_t = svd.v_t?;
        let (min_idx, _) = svd
            .singular_values
            .iter()
            .enumerate()
            .min_by(|x, y| x.1.total_cmp(y.1))?;
        let h = v_t.row(min_idx);

        let m = Matrix3::from_fn(|r, c| h[3 * r + c]);
        let mut m = t_dst.try_inverse()? * m * t_src;
        let scale = m[(2, 2)];
        if scale.abs() > f64::EPSILON {
            m /= scale;
        }
        if !m.iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(Self { m })
    }

    /// Scene positions of the target frame corners `(0,0) (w,0) (w,h) (0,h)`,
    /// rounded to the nearest pixel.
    pub fn locate_corners(&self, width: u32, height: u32) -> GeometryResult<CornerSet> {
        let (w, h) = (width as f64, height as f64);
        let frame = [
            Point2::new(0.0, 0.0),
            Point2::new(w, 0.0),
            Point2::new(w, h),
            Point2::new(0.0, h),
        ];
        let mut corners = [PixelPoint::default(); 4];
        for (slot, p) in corners.iter_mut().zip(&frame) {
            let q = self.apply(p).ok_or(GeometryError::DegenerateHomography)?;
            *slot = PixelPoint::new(q.x.round() as i32, q.y.round() as i32);
        }
        Ok(corners)
    }
}

fn normalize(points: &[Point2<f64>]) -> Option<(Vec<Point2<f64>>, Matrix3<f64>)> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist <= f64::EPSILON {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let out = points
        .iter()
        .map(|p| Point2::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();
    Some((out, t))
}

/// Consensus homography with the indices of its inliers
#[derive(Debug, Clone)]
pub struct RansacFit {
    pub homography: Homography,
    pub inliers: Vec<usize>,
    pub iterations: usize,
}

/// Robust fit over minimal samples; the best consensus is re-fitted on all its inliers
pub fn estimate(src: &[Point2<f64>], dst: &[Point2<f64>], cfg: &RansacConfig) -> GeometryResult<RansacFit> {
    validate(cfg)?;
    let n = src.len().min(dst.len());
    if n < MIN_CORRESPONDENCES {
        return Err(GeometryError::TooFewCorrespondences { found: n });
    }

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut best: Option<(Homography, Vec<usize>)> = None;
    let mut budget = cfg.max_iters;
    let mut iterations = 0;
    let mut ms = [Point2::origin(); MIN_CORRESPONDENCES];
    let mut md = [Point2::origin(); MIN_CORRESPONDENCES];

    while iterations < budget {
        iterations += 1;
        let idx = sample(&mut rng, n, MIN_CORRESPONDENCES);
        for (k, i) in idx.iter().enumerate() {
            ms[k] = src[i];
            md[k] = dst[i];
        }
        if is_degenerate(&ms, &md) {
            continue;
        }
        let Some(model) = Homography::dlt(&ms, &md) else {
            continue;
        };

        let inliers = collect_inliers(&model, src, dst, cfg.reprojection_threshold);
        let improves = match &best {
            Some((_, b)) => inliers.len() > b.len(),
            None => true,
        };
        if improves {
            budget = budget.min(adaptive_iterations(inliers.len(), n, cfg.confidence, cfg.max_iters));
            best = Some((model, inliers));
        }
    }

    let (model, inliers) = best.ok_or(GeometryError::NoConsensus { best_inliers: 0 })?;
    if inliers.len() < MIN_CORRESPONDENCES {
        return Err(GeometryError::NoConsensus {
            best_inliers: inliers.len(),
        });
    }

    let (s_in, d_in): (Vec<_>, Vec<_>) = inliers.iter().map(|&i| (src[i], dst[i])).unzip();
    let (homography, inliers) = match Homography::dlt(&s_in, &d_in) {
        Some(refined) => {
            let again = collect_inliers(&refined, src, dst, cfg.reprojection_threshold);
            if again.len() >= inliers.len() {
                (refined, again)
            } else {
                (model, inliers)
            }
        }
        None => (model, inliers),
    };

    debug!(
        "RANSAC: {} of {} correspondences agree after {} iterations",
        inliers.len(),
        n,
        iterations
    );

    Ok(RansacFit {
        homography,
        inliers,
        iterations,
    })
}

fn validate(cfg: &RansacConfig) -> GeometryResult<()> {
    if !(cfg.reprojection_threshold.is_finite() && cfg.reprojection_threshold > 0.0) {
        return Err(GeometryError::InvalidRansacParams(format!(
            "reprojection threshold {} must be > 0",
            cfg.reprojection_threshold
        )));
    }
    if !(cfg.confidence > 0.0 && cfg.confidence < 1.0) {
        return Err(GeometryError::InvalidRansacParams(format!(
            "confidence {} must be in (0, 1)",
            cfg.confidence
        )));
    }
    if cfg.max_iters == 0 {
        return Err(GeometryError::InvalidRansacParams("max_iters must be >= 1".into()));
    }
    Ok(())
}

fn collect_inliers(h: &Homography, src: &[Point2<f64>], dst: &[Point2<f64>], threshold: f64) -> Vec<usize> {
    src.iter()
        .zip(dst)
        .enumerate()
        .filter(|(_, (s, d))| h.reprojection_error(s, d) <= threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Iterations needed to draw one all-inlier sample with probability `confidence`
fn adaptive_iterations(inliers: usize, total: usize, confidence: f64, max_iters: usize) -> usize {
    let w = inliers as f64 / total as f64;
    let p_good = w.powi(MIN_CORRESPONDENCES as i32);
    if p_good <= f64::EPSILON {
        return max_iters;
    }
    if p_good >= 1.0 {
        return 0;
    }
    let needed = (1.0 - confidence).ln() / (1.0 - p_good).ln();
    if needed.is_finite() {
        (needed.ceil() as usize).min(max_iters)
    } else {
        max_iters
    }
}

/// Collinear triples or a flipped triangle orientation between the two
/// sides cannot come from a proper planar view.
fn is_degenerate(src: &[Point2<f64>; 4], dst: &[Point2<f64>; 4]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    let area = |p: &[Point2<f64>; 4], [a, b, c]: [usize; 3]| {
        (p[b].x - p[a].x) * (p[c].y - p[a].y) - (p[b].y - p[a].y) * (p[c].x - p[a].x)
    };
    TRIPLES.iter().any(|&t| {
        let (a_src, a_dst) = (area(src, t), area(dst, t));
        a_src.abs() < 1e-9 || a_dst.abs() < 1e-9 || a_src.signum() != a_dst.signum()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> Homography {
        Homography::from_matrix(Matrix3::new(
            0.9, -0.2, 40.0, //
            0.15, 1.1, 25.0, //
            0.0004, -0.0002, 1.0,
        ))
    }

    fn grid(n: usize) -> Vec<Point2<f64>> {
        (0..n)
            .map(|i| Point2::new((i % 10) as f64 * 20.0 + 3.0 * (i / 10) as f64, (i / 10) as f64 * 17.0))
            .collect()
    }

    #[test]
    fn four_exact_points_reproject_corners() {
        let h = known();
        let src = vec![
            Point2::new(0.0, 0.0),
            Point2::new(200.0, 0.0),
            Point2::new(200.0, 120.0),
            Point2::new(0.0, 120.0),
        ];
        let dst: Vec<_> = src.iter().map(|p| h.apply(p).unwrap()).collect();
        let fit = estimate(&src, &dst, &RansacConfig::default()).unwrap();
        assert_eq!(fit.inliers.len(), 4);
        for (s, d) in src.iter().zip(&dst) {
            assert!(fit.homography.reprojection_error(s, d) < 1.0);
        }
        let corners = fit.homography.locate_corners(200, 120).unwrap();
        for (c, d) in corners.iter().zip(&dst) {
            assert!((c.x as f64 - d.x).abs() <= 1.0 && (c.y as f64 - d.y).abs() <= 1.0);
        }
    }

    #[test]
    fn outliers_are_rejected() {
        let h = known();
        let src = grid(60);
        let mut dst: Vec<_> = src.iter().map(|p| h.apply(p).unwrap()).collect();
        // every fourth pair points somewhere unrelated
        for (k, d) in dst.iter_mut().enumerate().filter(|(k, _)| k % 4 == 0) {
            *d = Point2::new(500.0 - 7.0 * k as f64, 13.0 * k as f64);
        }
        let fit = estimate(&src, &dst, &RansacConfig::default()).unwrap();
        assert_eq!(fit.inliers.len(), 45);
        assert!(fit.inliers.iter().all(|i| i % 4 != 0));
        let p = fit.homography.apply(&Point2::new(77.0, 33.0)).unwrap();
        let q = h.apply(&Point2::new(77.0, 33.0)).unwrap();
        assert!((p - q).norm() < 1e-3);
    }

    #[test]
    fn too_few_pairs() {
        let p = vec![Point2::new(0.0, 0.0); 3];
        assert_eq!(
            estimate(&p, &p, &RansacConfig::default()).unwrap_err(),
            GeometryError::TooFewCorrespondences { found: 3 }
        );
    }

    #[test]
    fn collinear_points_find_no_consensus() {
        let src: Vec<_> = (0..10).map(|i| Point2::new(i as f64, 2.0 * i as f64)).collect();
        let err = estimate(&src, &src, &RansacConfig::default()).unwrap_err();
        assert!(matches!(err, GeometryError::NoConsensus { .. }));
    }

    #[test]
    fn identity_corners() {
        let h = Homography::from_matrix(Matrix3::identity());
        let c = h.locate_corners(10, 10).unwrap();
        assert_eq!(
            c,
            [
                PixelPoint::new(0, 0),
                PixelPoint::new(10, 0),
                PixelPoint::new(10, 10),
                PixelPoint::new(0, 10)
            ]
        );
    }

    #[test]
    fn adaptive_budget_shrinks_with_inlier_ratio() {
        assert_eq!(adaptive_iterations(0, 100, 0.995, 2000), 2000);
        assert_eq!(adaptive_iterations(100, 100, 0.995, 2000), 0);
        let half = adaptive_iterations(50, 100, 0.995, 2000);
        // log(0.005) / log(1 - 1/16)
        assert_eq!(half, 83);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let cfg = RansacConfig {
            confidence: 1.0,
            ..RansacConfig::default()
        };
        let p = grid(8);
        assert!(matches!(estimate(&p, &p, &cfg), Err(GeometryError::InvalidRansacParams(_))));
    }
}
