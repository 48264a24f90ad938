//! Locate a printed patch chart in a photograph and report every patch centre.
//!
//! The library side is [`TargetLocator`], which works on decoded images.
//! [`run`] adds the file handling used by the `patchfind` binary.

pub mod annotate;
pub mod builder;
pub mod config;
pub mod description;
pub mod document;
pub mod error;
pub mod locator;
pub mod logging;
pub mod report;
pub mod sampling;

use std::path::{Path, PathBuf};

use image::DynamicImage;

pub use builder::LocatorBuilder;
pub use config::LocatorConfig;
pub use description::TargetDescription;
pub use document::Document;
pub use error::{LocateError, LocateResult};
pub use locator::{Location, TargetLocator};
pub use report::{write_result, Measurements};
pub use sampling::PatchColor;

pub use patchfind_core::{self, CornerSet, MatchStrategy, PixelPoint};

/// The six files one run reads and writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub target_image: PathBuf,
    pub scene_image: PathBuf,
    pub target_data: PathBuf,
    pub output_template: PathBuf,
    pub output_data: PathBuf,
    pub annotated_image: PathBuf,
}

impl Default for RunPaths {
    fn default() -> Self {
        Self {
            target_image: "target.png".into(),
            scene_image: "scene.png".into(),
            target_data: "targetData.json".into(),
            output_template: "imageDataTemplate.json".into(),
            output_data: "imageData.json".into(),
            annotated_image: "annotated.png".into(),
        }
    }
}

impl RunPaths {
    /// Take all six paths from `args` (program name first), or fall back to
    /// the defaults for any other argument count.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        match args {
            [_, target, scene, data, template, output, annotated] => Self {
                target_image: target.as_ref().into(),
                scene_image: scene.as_ref().into(),
                target_data: data.as_ref().into(),
                output_template: template.as_ref().into(),
                output_data: output.as_ref().into(),
                annotated_image: annotated.as_ref().into(),
            },
            _ => Self::default(),
        }
    }
}

pub fn open_image(path: &Path) -> LocateResult<DynamicImage> {
    image::open(path).map_err(|e| LocateError::ImageLoadFailure {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Locate the chart and write the result document and the annotated image.
///
/// Nothing is written unless the whole geometry pipeline succeeded. Failing
/// to save the annotated image is only logged.
pub fn run(paths: &RunPaths, config: LocatorConfig) -> LocateResult<Location> {
    let locator = TargetLocator::new(config)?;
    log::info!("{}", locator.config().summary());

    let target = open_image(&paths.target_image)?.to_luma8();
    let scene = open_image(&paths.scene_image)?;
    let scene_gray = scene.to_luma8();
    let scene_rgb = scene.to_rgb8();
    drop(scene);

    let description = TargetDescription::load(&paths.target_data)?;
    let template = Document::load(&paths.output_template)?;

    let location = locator.locate(target, scene_gray, &description)?;
    log::info!(
        "Found target with {} of {} correspondences as inliers",
        location.inliers,
        location.correspondences
    );

    let length = sampling::target_length(&location.corners);
    let extra = Measurements {
        colors: match locator.config().color_sample_radius {
            Some(r) => sampling::sample_patches(&scene_rgb, &location.patch_centres, r),
            None => Vec::new(),
        },
        target_length: Some(length),
        resolution: description
            .size_in_cm
            .and_then(|(width_cm, _)| sampling::resolution(length, width_cm)),
    };

    write_result(&template, &location, &extra).save(&paths.output_data)?;
    log::info!("Wrote {}", paths.output_data.display());

    // the result is already on disk; a missing picture does not fail the run
    if let Err(e) = annotate::save_annotated(
        scene_rgb,
        &location.corners,
        &location.patch_centres,
        locator.config().annotation_reductions,
        &paths.annotated_image,
    ) {
        log::warn!("{}", e);
    }
    Ok(location)
}
