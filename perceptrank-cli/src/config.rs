/// Config file loading and creation for the perceptrank CLI.
///
/// Config lives at ~/.config/perceptrank/config.toml.
/// All fields are optional. CLI args override config values.
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Place Pulse style perceptual axes, judged in this order.
pub const DEFAULT_DIMENSIONS: &[&str] = &["beautiful", "boring", "depressing", "lively", "safety", "wealthy"];

#[derive(Deserialize, Default, Debug)]
pub struct PerceptrankConfig {
    pub image_dir: Option<String>,
    pub data_dir: Option<String>,
    pub dimensions: Option<Vec<String>>,
    pub min_coverage: Option<u32>,
    pub weighting: Option<String>,
    pub pairs_file: Option<String>,
    pub subject: Option<String>,
    pub seed: Option<u64>,
}

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# perceptrank configuration
# All values here can be overridden by CLI flags.

# Folder holding the images to compare (png, jpg, jpeg, webp)
# image_dir = \"image\"

# Folder where results and comparison counts are written
# data_dir = \".\"

# Perceptual dimensions, judged in this order
# dimensions = [\"beautiful\", \"boring\", \"depressing\", \"lively\", \"safety\", \"wealthy\"]

# Judgments every image needs on a dimension before moving on. 0 = no limit.
# min_coverage = 5

# Sampling weight: \"inverse-frequency\" (1 / (1 + count)) or \"remaining-quota\"
# weighting = \"inverse-frequency\"

# Optional fixed pair schedule (CSV with header, columns Left_Image,Right_Image).
# When set, pairs are shown in file order instead of being sampled.
# pairs_file = \"comparison_pairs.csv\"

# Identifier written next to every judgment
# subject = \"participant-01\"

# RNG seed for reproducible pair sampling
# seed = 42
";

/// Returns the default config path: ~/.config/perceptrank/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("perceptrank").join("config.toml"))
}

/// Load config from a file path. Returns default (all None) if file doesn't exist.
pub fn load_config(path: &Path) -> Result<PerceptrankConfig> {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PerceptrankConfig::default()),
        Err(e) => Err(e).with_context(|| format!("Failed to read config at {}", path.display())),
    }
}

/// Create the default config file. Errors if it already exists.
pub fn create_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write config to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("nope.toml")).unwrap();
        assert!(cfg.image_dir.is_none());
        assert!(cfg.dimensions.is_none());
    }

    #[test]
    fn test_parses_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "image_dir = \"img\"\ndimensions = [\"safety\", \"lively\"]\nmin_coverage = 4\nseed = 3\n",
        )
        .unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.image_dir.as_deref(), Some("img"));
        assert_eq!(cfg.dimensions.unwrap(), vec!["safety", "lively"]);
        assert_eq!(cfg.min_coverage, Some(4));
        assert_eq!(cfg.seed, Some(3));
    }

    #[test]
    fn test_default_template_parses_and_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        create_default_config(&path).unwrap();
        let cfg = load_config(&path).unwrap();
        assert!(cfg.min_coverage.is_none());
        assert!(create_default_config(&path).is_err());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "min_coverage = \"lots\"").unwrap();
        assert!(load_config(&path).is_err());
    }
}
