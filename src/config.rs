use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Options for a save operation.
///
/// Built up front and passed to the pipeline entry point; nothing mutates it
/// during a save.
///
/// ```rust
/// use geostamp::config::SaveOptions;
///
/// let options = SaveOptions {
///     jpeg_quality: 90,
///     ..SaveOptions::default()
/// };
/// assert_eq!(options.jpeg_quality, 90);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveOptions {
    /// JPEG encode quality for the final stream, 1–100.
    pub jpeg_quality: u8,
    /// Staging directory for the temporary file handed to the library.
    /// Defaults to the system temp directory.
    pub temp_dir: Option<PathBuf>,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: 100,
            temp_dir: None,
        }
    }
}

impl SaveOptions {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("geostamp.json"))
    }

    /// Load options from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let options: SaveOptions =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(options)
    }

    /// Save options to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_use_maximum_quality() {
        let options = SaveOptions::default();
        assert_eq!(options.jpeg_quality, 100);
        assert!(options.temp_dir.is_none());
    }

    #[test]
    fn json_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geostamp.json");

        let options = SaveOptions {
            jpeg_quality: 85,
            temp_dir: Some(PathBuf::from("/tmp/staging")),
        };
        options.save(Some(&path)).unwrap();

        let loaded = SaveOptions::load(Some(&path)).unwrap();
        assert_eq!(loaded.jpeg_quality, 85);
        assert_eq!(loaded.temp_dir, Some(PathBuf::from("/tmp/staging")));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = SaveOptions::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(loaded.jpeg_quality, 100);
    }
}
