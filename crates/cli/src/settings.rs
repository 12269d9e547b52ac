use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use facetrail_core::recognition::infrastructure::onnx_face_locator::DEFAULT_CONFIDENCE;
use facetrail_core::recognition::infrastructure::onnx_face_matcher::DEFAULT_MATCH_THRESHOLD;
use facetrail_core::video::infrastructure::ffmpeg_writer::MAX_CRF;

/// Matcher and encoder tuning that doesn't belong on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub detection_confidence: f64,
    pub match_threshold: f64,
    /// Scan threads; 1 runs batches sequentially.
    pub workers: usize,
    /// CRF for re-encoded clips (0 = best, 51 = worst, unset = 18).
    pub quality: Option<u32>,
    /// Directory holding bundled ONNX models.
    pub models_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            detection_confidence: DEFAULT_CONFIDENCE,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            workers: 1,
            quality: None,
            models_dir: None,
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Facetrail").join("settings.json"))
    }

    /// Loads an explicit settings file, or the default one when `path` is
    /// `None`. A missing default file yields defaults; an explicit file must
    /// exist and parse.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        match path {
            Some(path) => Self::read(path),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::read(&path),
                None => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self, String> {
        let json = fs::read_to_string(path)
            .map_err(|e| format!("Cannot read settings file {}: {e}", path.display()))?;
        let settings: Self = serde_json::from_str(&json)
            .map_err(|e| format!("Invalid settings file {}: {e}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return Err(format!(
                "Detection confidence must be between 0.0 and 1.0, got {}",
                self.detection_confidence
            ));
        }
        if !(-1.0..=1.0).contains(&self.match_threshold) {
            return Err(format!(
                "Match threshold must be between -1.0 and 1.0, got {}",
                self.match_threshold
            ));
        }
        if self.workers == 0 {
            return Err("Workers must be at least 1".into());
        }
        if let Some(q) = self.quality {
            if q > MAX_CRF {
                return Err(format!("Quality must be between 0 and {MAX_CRF}, got {q}"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("settings.json");
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, r#"{ "workers": 4, "quality": 23 }"#);

        let settings = Settings::load(Some(&path)).unwrap();

        assert_eq!(settings.workers, 4);
        assert_eq!(settings.quality, Some(23));
        assert_eq!(settings.match_threshold, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(settings.models_dir, None);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = Settings::load(Some(&dir.path().join("absent.json")));
        assert!(result.unwrap_err().contains("Cannot read settings file"));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "{ workers: ");
        assert!(Settings::load(Some(&path))
            .unwrap_err()
            .contains("Invalid settings file"));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, r#"{ "quality": 60 }"#);
        assert!(Settings::load(Some(&path)).is_err());

        let path = write(&dir, r#"{ "workers": 0 }"#);
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }
}
