use std::path::Path;

use patchfind_core::{default_threads, MatchConfig, RansacConfig, SurfConfig};
use patchfind_surf::DEFAULT_PYRAMID_THRESHOLD;
use serde::{Deserialize, Serialize};

use crate::builder::LocatorBuilder;
use crate::error::{LocateError, LocateResult};

/// Number of pyramid steps applied to the annotated scene before saving
pub const DEFAULT_ANNOTATION_REDUCTIONS: u32 = 3;

/// Complete locator configuration with all stage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Longest side above which target and scene are halved together
    pub pyramid_threshold: u32,
    pub annotation_reductions: u32,
    /// Half side of the colour sampling stencil; `None` disables sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_sample_radius: Option<u32>,
    pub n_threads: usize,
    pub surf: SurfConfig,
    pub matching: MatchConfig,
    pub ransac: RansacConfig,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            pyramid_threshold: DEFAULT_PYRAMID_THRESHOLD,
            annotation_reductions: DEFAULT_ANNOTATION_REDUCTIONS,
            color_sample_radius: None,
            n_threads: default_threads(),
            surf: SurfConfig::default(),
            matching: MatchConfig::default(),
            ransac: RansacConfig::default(),
        }
    }
}

impl LocatorConfig {
    /// Convert to LocatorBuilder for further customization
    pub fn to_builder(self) -> LocatorBuilder {
        LocatorBuilder::from_config(self)
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "LocatorConfig: hessian={}, octaves={}x{}, extended={}, ratio={}, strategy={:?}, ransac={}px, pyramid={}, threads={}",
            self.surf.hessian_threshold,
            self.surf.n_octaves,
            self.surf.n_octave_layers,
            self.surf.extended,
            self.matching.ratio,
            self.matching.strategy,
            self.ransac.reprojection_threshold,
            self.pyramid_threshold,
            self.n_threads
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> LocateResult<()> {
        let fail = |msg: String| Err(LocateError::Config(msg));
        if !self.surf.hessian_threshold.is_finite() || self.surf.hessian_threshold < 0.0 {
            return fail(format!("hessian_threshold {} must be >= 0", self.surf.hessian_threshold));
        }
        if self.surf.n_octaves == 0 || self.surf.n_octave_layers == 0 {
            return fail("n_octaves and n_octave_layers must be >= 1".into());
        }
        if !(self.matching.ratio > 0.0 && self.matching.ratio <= 1.0) {
            return fail(format!("ratio {} must be in (0, 1]", self.matching.ratio));
        }
        if self.matching.trees == 0 || self.matching.checks == 0 {
            return fail("trees and checks must be >= 1".into());
        }
        if !(self.ransac.reprojection_threshold.is_finite() && self.ransac.reprojection_threshold > 0.0) {
            return fail(format!(
                "reprojection_threshold {} must be > 0",
                self.ransac.reprojection_threshold
            ));
        }
        if !(self.ransac.confidence > 0.0 && self.ransac.confidence < 1.0) {
            return fail(format!("confidence {} must be in (0, 1)", self.ransac.confidence));
        }
        if self.ransac.max_iters == 0 {
            return fail("max_iters must be >= 1".into());
        }
        if self.pyramid_threshold == 0 {
            return fail("pyramid_threshold must be >= 1".into());
        }
        if self.n_threads == 0 {
            return fail("n_threads must be >= 1".into());
        }
        Ok(())
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> LocateResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| LocateError::Config(e.to_string()))
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> LocateResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| LocateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> LocateResult<String> {
        toml::to_string_pretty(self).map_err(|e| LocateError::Config(e.to_string()))
    }

    /// Deserialize from TOML string
    pub fn from_toml(toml_str: &str) -> LocateResult<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| LocateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json` or `.toml` file
    pub fn load<P: AsRef<Path>>(path: P) -> LocateResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LocateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if is_toml(path) {
            Self::from_toml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Save as TOML when the extension says so, JSON otherwise
    pub fn save<P: AsRef<Path>>(&self, path: P) -> LocateResult<()> {
        let path = path.as_ref();
        let text = if is_toml(path) { self.to_toml()? } else { self.to_json()? };
        std::fs::write(path, text).map_err(|source| LocateError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchfind_core::MatchStrategy;

    #[test]
    fn defaults_validate() {
        let cfg = LocatorConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.pyramid_threshold, 10_000);
        assert_eq!(cfg.annotation_reductions, 3);
        assert!(cfg.color_sample_radius.is_none());
    }

    #[test]
    fn json_round_trip() {
        let mut cfg = LocatorConfig::default();
        cfg.matching.strategy = MatchStrategy::BruteForce;
        cfg.color_sample_radius = Some(4);
        let back = LocatorConfig::from_json(&cfg.to_json().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn toml_round_trip() {
        let mut cfg = LocatorConfig::default();
        cfg.surf.extended = false;
        cfg.ransac.seed = 17;
        let text = cfg.to_toml().unwrap();
        assert!(text.contains("[surf]"));
        assert_eq!(LocatorConfig::from_toml(&text).unwrap(), cfg);
    }

    #[test]
    fn partial_files_fill_defaults() {
        let cfg = LocatorConfig::from_toml("pyramid_threshold = 4000\n[matching]\nratio = 0.7\n").unwrap();
        assert_eq!(cfg.pyramid_threshold, 4000);
        assert_eq!(cfg.matching.ratio, 0.7);
        assert_eq!(cfg.matching.trees, 4);
        assert_eq!(cfg.surf, SurfConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            LocatorConfig::from_json(r#"{"pyramid_threshold": 0}"#),
            Err(LocateError::Config(_))
        ));
        assert!(matches!(
            LocatorConfig::from_json(r#"{"matching": {"ratio": 1.5}}"#),
            Err(LocateError::Config(_))
        ));
        assert!(matches!(
            LocatorConfig::from_toml("[ransac]\nconfidence = 1.0\n"),
            Err(LocateError::Config(_))
        ));
    }

    #[test]
    fn save_and_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = LocatorConfig {
            n_threads: 2,
            ..LocatorConfig::default()
        };
        for name in ["locator.json", "locator.toml"] {
            let path = dir.path().join(name);
            cfg.save(&path).unwrap();
            assert_eq!(LocatorConfig::load(&path).unwrap(), cfg);
        }
    }
}
