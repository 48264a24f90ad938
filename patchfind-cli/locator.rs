use image::GrayImage;
use nalgebra::Point2;
use patchfind_core::{CornerSet, Keypoint, PixelPoint};
use patchfind_geometry::{estimate, normalize, project_patches};
use patchfind_match::DescriptorMatcher;
use patchfind_surf::{reduce_pair, SurfDetector};

use crate::config::LocatorConfig;
use crate::description::TargetDescription;
use crate::error::LocateResult;

/// Where the chart sits in the scene
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Oriented corners in the reduced scene
    pub reduced_corners: CornerSet,
    /// Oriented corners at full scene resolution
    pub corners: CornerSet,
    pub upside_down: bool,
    pub scale: i32,
    pub reductions: u32,
    /// Full-resolution centre of every patch, in description order
    pub patch_centres: Vec<PixelPoint>,
    pub correspondences: usize,
    pub inliers: usize,
}

/// Runs detection, matching and geometry for one target/scene pair
#[derive(Debug, Clone)]
pub struct TargetLocator {
    config: LocatorConfig,
    detector: SurfDetector,
    matcher: DescriptorMatcher,
}

fn point(kp: &Keypoint) -> Point2<f64> {
    Point2::new(kp.x as f64, kp.y as f64)
}

impl TargetLocator {
    pub fn new(config: LocatorConfig) -> LocateResult<Self> {
        config.validate()?;
        let detector = SurfDetector::new(config.surf.clone())?;
        let matcher = DescriptorMatcher::new(config.matching.clone())?;
        Ok(Self {
            config,
            detector,
            matcher,
        })
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Locate `target` inside `scene` and project the described patches.
    ///
    /// Both images are consumed; they are reduced together until they fit
    /// the pyramid threshold and all outputs are mapped back by the scale
    /// factor.
    pub fn locate(&self, target: GrayImage, scene: GrayImage, description: &TargetDescription) -> LocateResult<Location> {
        let aspect = description.aspect()?;

        let reduced = reduce_pair(target, scene, self.config.pyramid_threshold)?;
        let scale = reduced.scale_factor() as i32;
        log::info!(
            "Reduced {} times to target {}x{}, scene {}x{} (scale {})",
            reduced.reductions,
            reduced.target.width(),
            reduced.target.height(),
            reduced.scene.width(),
            reduced.scene.height(),
            scale
        );

        let (target_kps, target_desc) = self.detector.detect_and_compute(&reduced.target)?;
        let (scene_kps, scene_desc) = self.detector.detect_and_compute(&reduced.scene)?;
        log::debug!("Target descriptors: {}", target_desc.len());
        log::debug!("Scene descriptors: {}", scene_desc.len());

        let pairs = self.matcher.match_descriptors(&target_desc, &scene_desc)?;
        log::info!("{} correspondences", pairs.len());

        let (src, dst): (Vec<_>, Vec<_>) = pairs
            .iter()
            .map(|c| (point(&target_kps[c.target]), point(&scene_kps[c.scene])))
            .unzip();
        let fit = estimate(&src, &dst, &self.config.ransac)?;
        log::debug!(
            "Homography from {} inliers after {} iterations",
            fit.inliers.len(),
            fit.iterations
        );

        let raw = fit
            .homography
            .locate_corners(reduced.target.width(), reduced.target.height())?;
        let oriented = normalize(raw);
        if oriented.upside_down {
            log::info!("Target is upside down");
        }

        let patch_centres = project_patches(
            &oriented.corners,
            aspect,
            &description.patches,
            oriented.reflection,
            scale,
        )?;

        Ok(Location {
            reduced_corners: oriented.corners,
            corners: oriented.corners.map(|c| c.scaled(scale)),
            upside_down: oriented.upside_down,
            scale,
            reductions: reduced.reductions,
            patch_centres,
            correspondences: pairs.len(),
            inliers: fit.inliers.len(),
        })
    }
}
