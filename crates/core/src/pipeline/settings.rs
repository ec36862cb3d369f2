//! Named pipeline knobs, loaded from JSON and validated up front.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compositing::infrastructure::falloff_mask::DEFAULT_CORE_FRACTION;
use crate::detection::domain::face_selection::FaceSelection;
use crate::detection::infrastructure::scrfd_detector::{DEFAULT_CONFIDENCE, DEFAULT_NMS_IOU};
use crate::stylizing::infrastructure::cartoon_stylizer::CartoonParams;

use super::target_region::TargetRegionPolicy;

/// Smallest target side (pixels) a template must offer.
pub const DEFAULT_MIN_TARGET_SIZE: u32 = 32;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    pub confidence: f32,
    pub nms_iou: f64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            nms_iou: DEFAULT_NMS_IOU,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeSettings {
    pub target_region: TargetRegionPolicy,
    /// Resolved targets narrower or shorter than this are rejected.
    pub min_target_size: u32,
    /// Share of the mask ellipse held at full opacity.
    pub mask_core_fraction: f64,
}

impl Default for CompositeSettings {
    fn default() -> Self {
        Self {
            target_region: TargetRegionPolicy::default(),
            min_target_size: DEFAULT_MIN_TARGET_SIZE,
            mask_core_fraction: DEFAULT_CORE_FRACTION,
        }
    }
}

/// Every configurable knob of a personalization run. Missing fields take
/// their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub detection: DetectionSettings,
    pub face_selection: FaceSelection,
    pub stylizer: CartoonParams,
    pub composite: CompositeSettings,
}

impl PipelineSettings {
    /// Parse and validate a JSON settings file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: PipelineSettings =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Settings from the platform config directory if present, else defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        match default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.detection;
        check("detection.confidence", d.confidence > 0.0 && d.confidence <= 1.0, || {
            format!("{} is not in (0, 1]", d.confidence)
        })?;
        check("detection.nms_iou", d.nms_iou > 0.0 && d.nms_iou <= 1.0, || {
            format!("{} is not in (0, 1]", d.nms_iou)
        })?;

        let s = &self.stylizer;
        check("stylizer.padding", s.padding.is_finite() && s.padding >= 0.0, || {
            format!("{} must be a non-negative number", s.padding)
        })?;
        check("stylizer.edge_low", s.edge_low >= 0.0, || {
            format!("{} must be non-negative", s.edge_low)
        })?;
        check("stylizer.edge_high", s.edge_high >= s.edge_low, || {
            format!("{} is below edge_low ({})", s.edge_high, s.edge_low)
        })?;
        check("stylizer.smoothing_color_sigma", s.smoothing_color_sigma > 0.0, || {
            format!("{} must be positive", s.smoothing_color_sigma)
        })?;
        check("stylizer.smoothing_space_sigma", s.smoothing_space_sigma > 0.0, || {
            format!("{} must be positive", s.smoothing_space_sigma)
        })?;
        check("stylizer.clusters", s.clusters >= 1, || "must be at least 1".into())?;
        check("stylizer.max_iterations", s.max_iterations >= 1, || {
            "must be at least 1".into()
        })?;
        check("stylizer.epsilon", s.epsilon >= 0.0, || {
            format!("{} must be non-negative", s.epsilon)
        })?;
        check(
            "stylizer.line_darkening",
            (0.0..=1.0).contains(&s.line_darkening),
            || format!("{} is not in [0, 1]", s.line_darkening),
        )?;

        let c = &self.composite;
        match c.target_region {
            TargetRegionPolicy::Centered {
                width_fraction,
                height_fraction,
            } => {
                let in_range = |f: f64| f > 0.0 && f <= 1.0;
                check(
                    "composite.target_region",
                    in_range(width_fraction) && in_range(height_fraction),
                    || format!("fractions {width_fraction}x{height_fraction} must be in (0, 1]"),
                )?;
            }
            TargetRegionPolicy::Fixed(region) => {
                check("composite.target_region", !region.is_degenerate(), || {
                    format!("fixed region {region:?} has no area")
                })?;
                check(
                    "composite.target_region",
                    region.x >= 0 && region.y >= 0 && region.edges_in_range(),
                    || format!("fixed region {region:?} must start at x, y >= 0 and fit in i32"),
                )?;
            }
        }
        check("composite.min_target_size", c.min_target_size >= 1, || {
            "must be at least 1".into()
        })?;
        check(
            "composite.mask_core_fraction",
            (0.0..1.0).contains(&c.mask_core_fraction),
            || format!("{} is not in [0, 1)", c.mask_core_fraction),
        )?;
        Ok(())
    }
}

/// `<config dir>/Toonface/settings.json`, if the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("Toonface").join(SETTINGS_FILE))
}

fn check(
    field: &'static str,
    ok: bool,
    reason: impl FnOnce() -> String,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: reason(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::region::Region;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_json(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(PipelineSettings::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let file = write_json(r#"{"stylizer": {"clusters": 6}}"#);
        let settings = PipelineSettings::load(file.path()).unwrap();
        assert_eq!(settings.stylizer.clusters, 6);
        assert_eq!(settings.stylizer.edge_low, 50.0);
        assert_eq!(settings.composite, CompositeSettings::default());
    }

    #[test]
    fn test_fixed_target_from_file() {
        let file = write_json(
            r#"{"composite": {"target_region": {"kind": "fixed", "x": 5, "y": 6, "width": 70, "height": 80}}}"#,
        );
        let settings = PipelineSettings::load(file.path()).unwrap();
        assert_eq!(
            settings.composite.target_region,
            TargetRegionPolicy::Fixed(Region::new(5, 6, 70, 80))
        );
    }

    #[test]
    fn test_invalid_value_names_field() {
        let file = write_json(r#"{"stylizer": {"edge_low": 200, "edge_high": 100}}"#);
        match PipelineSettings::load(file.path()) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "stylizer.edge_high"),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json() {
        let file = write_json("{ not json");
        assert!(matches!(
            PipelineSettings::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            PipelineSettings::load(&dir.path().join("absent.json")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_zero_clusters_rejected() {
        let mut settings = PipelineSettings::default();
        settings.stylizer.clusters = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { field: "stylizer.clusters", .. })
        ));
    }

    #[rstest]
    #[case::negative_origin(Region::new(-10, 0, 100, 100))]
    #[case::right_edge_overflows(Region::new(2_000_000_000, 0, 500_000_000, 10))]
    #[case::bottom_edge_overflows(Region::new(0, 5, 10, i32::MAX))]
    fn test_unrepresentable_fixed_region_rejected(#[case] region: Region) {
        let mut settings = PipelineSettings::default();
        settings.composite.target_region = TargetRegionPolicy::Fixed(region);
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { field: "composite.target_region", .. })
        ));
    }

    #[test]
    fn test_degenerate_fixed_region_rejected() {
        let mut settings = PipelineSettings::default();
        settings.composite.target_region = TargetRegionPolicy::Fixed(Region::new(0, 0, 0, 10));
        assert!(settings.validate().is_err());
    }
}
