use std::path::Path;

use patchfind_geometry::{RelativeCenter, TargetAspect};

use crate::document::Document;
use crate::error::{LocateError, LocateResult};

pub const NUMBER_OF_PATCHES: &str = "targetData.generalData.numberOfPatches";
pub const SIZE_IN_PIXELS: &str = "targetData.generalData.size.sizeInPixels";
pub const SIZE_IN_CM: &str = "targetData.generalData.size.sizeInCm";
pub const PATCHES: &str = "targetData.patches.patch";

/// Printed chart layout: physical proportions and relative patch centres
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDescription {
    pub x_size: u32,
    pub y_size: u32,
    /// Physical width and height in centimetres, when known
    pub size_in_cm: Option<(f64, f64)>,
    pub patches: Vec<RelativeCenter>,
}

fn malformed(msg: String) -> LocateError {
    LocateError::MalformedTargetDescription(msg)
}

fn required(doc: &Document, path: &str) -> LocateResult<f64> {
    match doc.get(path) {
        None => Err(malformed(format!("missing {}", path))),
        Some(v) => doc
            .number(path)
            .filter(|n| n.is_finite())
            .ok_or_else(|| malformed(format!("{} is not a number: {}", path, v))),
    }
}

/// Integer size field, truncated toward zero and required to be positive
fn positive_size(doc: &Document, path: &str) -> LocateResult<u32> {
    let value = required(doc, path)?.trunc();
    if value < 1.0 || value > u32::MAX as f64 {
        return Err(malformed(format!("{} must be a positive size, got {}", path, value)));
    }
    Ok(value as u32)
}

fn unit_interval(doc: &Document, path: &str) -> LocateResult<f64> {
    let value = required(doc, path)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(malformed(format!("{} = {} lies outside [0, 1]", path, value)));
    }
    Ok(value)
}

impl TargetDescription {
    pub fn load<P: AsRef<Path>>(path: P) -> LocateResult<Self> {
        Self::from_document(&Document::load(path)?)
    }

    pub fn from_document(doc: &Document) -> LocateResult<Self> {
        let declared = required(doc, NUMBER_OF_PATCHES)?;
        if declared < 0.0 || declared.fract() != 0.0 {
            return Err(malformed(format!(
                "{} must be a whole number, got {}",
                NUMBER_OF_PATCHES, declared
            )));
        }
        let declared = declared as usize;
        let listed = doc.count(PATCHES);
        if listed != declared {
            return Err(malformed(format!(
                "{} declares {} patches but {} are listed",
                NUMBER_OF_PATCHES, declared, listed
            )));
        }

        let x_size = positive_size(doc, &format!("{}.X", SIZE_IN_PIXELS))?;
        let y_size = positive_size(doc, &format!("{}.Y", SIZE_IN_PIXELS))?;

        let cm_x = doc.number(&format!("{}.X", SIZE_IN_CM));
        let cm_y = doc.number(&format!("{}.Y", SIZE_IN_CM));
        let size_in_cm = match (cm_x, cm_y) {
            (Some(x), Some(y)) if x > 0.0 && y > 0.0 => Some((x, y)),
            _ => None,
        };

        let patches = (0..declared)
            .map(|i| {
                let x = unit_interval(doc, &format!("{}[{}].relativeCenter.X", PATCHES, i))?;
                let y = unit_interval(doc, &format!("{}[{}].relativeCenter.Y", PATCHES, i))?;
                Ok(RelativeCenter::new(x, y))
            })
            .collect::<LocateResult<Vec<_>>>()?;

        log::debug!(
            "Target description: {} patches, {}x{} px{}",
            patches.len(),
            x_size,
            y_size,
            if size_in_cm.is_some() { ", physical size known" } else { "" }
        );

        Ok(Self {
            x_size,
            y_size,
            size_in_cm,
            patches,
        })
    }

    pub fn aspect(&self) -> LocateResult<TargetAspect> {
        Ok(TargetAspect::new(self.x_size as f64, self.y_size as f64)?)
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}
