//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::{fs, path::Path};

/// Get the path to the booth config file, `~/.booth/config.json`.
pub fn get_config_path() -> Result<PathBuf, std::io::Error> {
    let home_path = home::home_dir().ok_or(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "Home directory not found",
    ))?;
    let config_path = home_path.join(".booth").join("config.json");
    Ok(config_path)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Environment name. Empty means the default environment.
    #[serde(default)]
    pub environment: String,

    /// Cloud identifier of the upload account.
    #[serde(default)]
    pub cloud_name: String,

    /// Pre-shared unsigned upload preset for the upload account.
    #[serde(default)]
    pub upload_preset: String,

    /// Owner of the inference deployment jobs are submitted to.
    #[serde(default)]
    pub deployment_owner: String,

    /// Name of the inference deployment.
    #[serde(default)]
    pub deployment_name: String,
}

impl Config {
    /// Create a Config with the given identifiers.
    pub fn new(
        environment: String,
        cloud_name: String,
        upload_preset: String,
        deployment_owner: String,
        deployment_name: String,
    ) -> Self {
        Config {
            environment,
            cloud_name,
            upload_preset,
            deployment_owner,
            deployment_name,
        }
    }

    /// Loads configuration from a JSON file at the given path.
    ///
    /// # Errors
    /// Returns an `std::io::Error` if reading from file fails or JSON is invalid.
    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let buf = fs::read(path)?;
        let config: Config = serde_json::from_slice(&buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(config)
    }

    /// Saves the configuration to a JSON file at the given path.
    ///
    /// Directories will be created if they don't exist. This method overwrites existing files.
    ///
    /// # Errors
    /// Returns an `std::io::Error` if writing to file fails or serialization fails.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    /// Helper function to create a test configuration.
    fn get_config() -> Config {
        Config {
            environment: "production".to_string(),
            cloud_name: "booth-cloud".to_string(),
            upload_preset: "booth-unsigned".to_string(),
            deployment_owner: "muva".to_string(),
            deployment_name: "booth-img2img".to_string(),
        }
    }

    #[test]
    // Loading a saved configuration file should return the same configuration.
    fn test_load_recovers_saved_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = get_config();
        config.save(&path).unwrap();

        let loaded_config = Config::load_from_file(&path).unwrap();
        assert_eq!(config, loaded_config);
    }

    #[test]
    // Saving a configuration should create directories if they don't exist.
    fn test_save_creates_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nonexistent_dir").join("config.json");
        let config = get_config();
        let result = config.save(&path);

        assert!(result.is_ok(), "Failed to save config");
        assert!(
            path.parent().unwrap().exists(),
            "Parent directory does not exist"
        );
    }

    #[test]
    // Saving a configuration should overwrite an existing file.
    fn test_save_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config1 = get_config();
        config1.cloud_name = "first-cloud".to_string();
        config1.save(&path).unwrap();

        let mut config2 = get_config();
        config2.cloud_name = "second-cloud".to_string();
        config2.save(&path).unwrap();

        let loaded_config = Config::load_from_file(&path).unwrap();
        assert_eq!(config2, loaded_config);
    }

    #[test]
    // Loading an invalid JSON file should return an error.
    fn test_load_rejects_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid_config.json");

        let mut file = File::create(&path).unwrap();
        writeln!(file, "invalid json").unwrap();

        let result = Config::load_from_file(&path);
        assert!(result.is_err());
    }

    #[test]
    // Missing fields should come back as empty strings rather than errors.
    fn test_load_config_with_partial_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut file = File::create(&path).unwrap();
        writeln!(file, r#"{{ "cloud_name": "booth-cloud" }}"#).unwrap();

        match Config::load_from_file(&path) {
            Ok(config) => {
                assert_eq!(config.cloud_name, "booth-cloud");
                assert!(config.environment.is_empty());
                assert!(config.upload_preset.is_empty());
                assert!(config.deployment_owner.is_empty());
                assert!(config.deployment_name.is_empty());
            }
            Err(e) => {
                panic!("Failed to load config with partial fields: {}", e);
            }
        }
    }

    #[test]
    // Should ignore unexpected fields in the JSON.
    fn test_load_config_with_additional_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{ "cloud_name": "booth-cloud", "extra_field": "value" }}"#
        )
        .unwrap();

        match Config::load_from_file(&path) {
            Ok(config) => {
                assert_eq!(config.cloud_name, "booth-cloud");
            }
            Err(e) => {
                panic!("Failed to load config with additional fields: {}", e);
            }
        }
    }
}
