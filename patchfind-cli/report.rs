//! Fills an output template with the located geometry.

use crate::document::Document;
use crate::locator::Location;
use crate::sampling::PatchColor;

pub const PATCHES: &str = "imageData.patchData.patch";
pub const GENERAL: &str = "imageData.generalData";

/// Optional measurements taken on the colour scene after locating
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurements {
    /// One entry per patch; `None` where the stencil left the image
    pub colors: Vec<Option<PatchColor>>,
    pub target_length: Option<f64>,
    pub resolution: Option<f64>,
}

/// Copy of `template` with centres, patch count, orientation flag and
/// full-resolution corners written in. Fields already in the template are
/// kept unless overwritten.
pub fn write_result(template: &Document, location: &Location, extra: &Measurements) -> Document {
    if template.count(PATCHES) == 0 && !location.patch_centres.is_empty() {
        log::warn!("Output template has no patch slots; creating {}", location.patch_centres.len());
    }

    let mut doc = template.clone();
    for (i, c) in location.patch_centres.iter().enumerate() {
        doc.set(&format!("{}[{}].center.X", PATCHES, i), c.x);
        doc.set(&format!("{}[{}].center.Y", PATCHES, i), c.y);
    }
    doc.set(&format!("{}.numberOfPatches", GENERAL), location.patch_centres.len());
    doc.set(&format!("{}.targetUpsideDown", GENERAL), u8::from(location.upside_down));
    for (k, c) in location.corners.iter().enumerate() {
        doc.set(&format!("{}.positionOfTarget.corner[{}].X", GENERAL, k), c.x);
        doc.set(&format!("{}.positionOfTarget.corner[{}].Y", GENERAL, k), c.y);
    }

    for (i, color) in extra.colors.iter().enumerate() {
        let Some(color) = color else { continue };
        let base = format!("{}[{}]", PATCHES, i);
        for (name, v) in ["R", "G", "B"].iter().zip(color.rgb) {
            doc.set(&format!("{}.colorValues.RGB.{}", base, name), v);
        }
        doc.set(&format!("{}.stdDev", base), color.std_dev);
    }
    if let Some(len) = extra.target_length {
        doc.set(&format!("{}.targetLength", GENERAL), len);
    }
    if let Some(res) = extra.resolution {
        doc.set(&format!("{}.resolution", GENERAL), res);
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchfind_core::PixelPoint;
    use serde_json::json;

    fn location() -> Location {
        let p = PixelPoint::new;
        let corners = [p(10, 20), p(110, 20), p(110, 80), p(10, 80)];
        Location {
            reduced_corners: corners,
            corners: corners.map(|c| c.scaled(2)),
            upside_down: true,
            scale: 2,
            reductions: 1,
            patch_centres: vec![p(40, 60), p(180, 100)],
            correspondences: 30,
            inliers: 25,
        }
    }

    #[test]
    fn geometry_is_written_and_template_kept() {
        let template = Document::from_value(json!({
            "imageData": {
                "camera": "X100",
                "patchData": {"patch": [{"name": "A1"}, {"name": "A2"}]}
            }
        }));
        let doc = write_result(&template, &location(), &Measurements::default());
        assert_eq!(doc.get("imageData.camera"), Some(&json!("X100")));
        assert_eq!(doc.get("imageData.patchData.patch[1].name"), Some(&json!("A2")));
        assert_eq!(doc.number("imageData.patchData.patch[1].center.X"), Some(180.0));
        assert_eq!(doc.number("imageData.generalData.numberOfPatches"), Some(2.0));
        assert_eq!(doc.number("imageData.generalData.targetUpsideDown"), Some(1.0));
        assert_eq!(
            doc.number("imageData.generalData.positionOfTarget.corner[2].Y"),
            Some(160.0)
        );
        assert!(doc.get("imageData.patchData.patch[0].stdDev").is_none());
        assert!(doc.get("imageData.generalData.resolution").is_none());
    }

    #[test]
    fn empty_template_is_extended() {
        let doc = write_result(&Document::new(), &location(), &Measurements::default());
        assert_eq!(doc.count(PATCHES), 2);
        assert_eq!(doc.count("imageData.generalData.positionOfTarget.corner"), 4);
    }

    #[test]
    fn measurements_are_written_where_available() {
        let extra = Measurements {
            colors: vec![
                None,
                Some(PatchColor {
                    rgb: [10.5, 20.0, 30.25],
                    std_dev: 1.5,
                }),
            ],
            target_length: Some(200.0),
            resolution: Some(300.12),
        };
        let doc = write_result(&Document::new(), &location(), &extra);
        assert!(doc.get("imageData.patchData.patch[0].colorValues").is_none());
        assert_eq!(doc.number("imageData.patchData.patch[1].colorValues.RGB.B"), Some(30.25));
        assert_eq!(doc.number("imageData.patchData.patch[1].stdDev"), Some(1.5));
        assert_eq!(doc.number("imageData.generalData.targetLength"), Some(200.0));
        assert_eq!(doc.number("imageData.generalData.resolution"), Some(300.12));
    }
}
