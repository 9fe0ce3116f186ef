//! Configuration management module.
//!
//! This module handles loading and saving the YAML configuration file that
//! holds the theme selection and the defaults every widget is built with.

mod error;

pub use error::ConfigError;

use crate::error::AppError;
use crate::widgets::notifications::NotificationConfig;
use crate::widgets::{AcceptPattern, OtpConfig, StepConfig, ToastPosition, UploadConfig};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

const FILE_NAME: &str = "config.yml";
const DEFAULT_DIRECTORY_PATH: &str = ".config/launchkit";
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Oversees management of configuration file.
///
#[derive(Clone, Debug)]
pub struct Config {
    pub spec: FileSpec,
    file_path: Option<PathBuf>,
}

/// Define specification for configuration file. Every key is optional.
///
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileSpec {
    pub theme_name: String,
    pub steps: StepsSection,
    pub upload: UploadSection,
    pub otp: OtpSection,
    pub notifications: NotificationsSection,
    pub table: TableSection,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StepsSection {
    pub auto_save: bool,
    pub auto_save_interval_secs: u64,
    pub allow_skip: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadSection {
    pub max_file_size_mb: u64,
    pub max_files: usize,
    pub accept: Option<String>,
    pub allowed_types: Vec<String>,
    pub multiple: bool,
    pub progress_step_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OtpSection {
    pub resend_countdown_secs: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationsSection {
    pub max: usize,
    pub position: ToastPosition,
    pub default_duration_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TableSection {
    pub page_sizes: Vec<usize>,
    pub default_page_size: usize,
}

fn default_theme_name() -> String {
    "tokyo-night".to_string()
}

impl Default for StepsSection {
    fn default() -> Self {
        StepsSection {
            auto_save: true,
            auto_save_interval_secs: 30,
            allow_skip: false,
        }
    }
}

impl Default for UploadSection {
    fn default() -> Self {
        UploadSection {
            max_file_size_mb: 10,
            max_files: 5,
            accept: None,
            allowed_types: vec![],
            multiple: true,
            progress_step_ms: 200,
        }
    }
}

impl Default for OtpSection {
    fn default() -> Self {
        OtpSection {
            resend_countdown_secs: 60,
        }
    }
}

impl Default for NotificationsSection {
    fn default() -> Self {
        NotificationsSection {
            max: 5,
            position: ToastPosition::TopRight,
            default_duration_ms: 5000,
        }
    }
}

impl Default for TableSection {
    fn default() -> Self {
        TableSection {
            page_sizes: vec![10, 20, 30, 40, 50],
            default_page_size: 10,
        }
    }
}

impl StepsSection {
    pub fn to_step_config(&self) -> StepConfig {
        StepConfig {
            auto_save: self.auto_save,
            auto_save_interval: Duration::from_secs(self.auto_save_interval_secs.max(1)),
            allow_skip: self.allow_skip,
            ..StepConfig::default()
        }
    }
}

impl UploadSection {
    pub fn to_upload_config(&self) -> Result<UploadConfig, ConfigError> {
        let accept = match &self.accept {
            Some(pattern) => Some(AcceptPattern::parse(pattern).map_err(|e| ConfigError::InvalidValue {
                key: "upload.accept".to_string(),
                message: e.to_string(),
            })?),
            None => None,
        };
        Ok(UploadConfig {
            accept,
            multiple: self.multiple,
            max_file_size: self.max_file_size_mb.saturating_mul(BYTES_PER_MB),
            max_files: self.max_files,
            allowed_types: self.allowed_types.clone(),
            progress_step: Duration::from_millis(self.progress_step_ms),
        })
    }
}

impl OtpSection {
    pub fn to_otp_config(&self) -> OtpConfig {
        OtpConfig {
            resend_countdown_secs: self.resend_countdown_secs,
        }
    }
}

impl NotificationsSection {
    pub fn to_notification_config(&self) -> NotificationConfig {
        NotificationConfig {
            max: self.max.max(1),
            position: self.position,
            default_duration: Duration::from_millis(self.default_duration_ms),
        }
    }
}

impl TableSection {
    /// Page size menu in its configured order, falling back to the defaults
    /// when no usable size is configured.
    ///
    pub fn page_size_menu(&self) -> Vec<usize> {
        let sizes: Vec<usize> = self.page_sizes.iter().copied().filter(|s| *s > 0).collect();
        if sizes.is_empty() {
            return TableSection::default().page_sizes;
        }
        sizes
    }
}

impl Config {
    /// Return a new instance holding the defaults.
    ///
    pub fn new() -> Config {
        Config {
            spec: FileSpec {
                theme_name: default_theme_name(),
                ..FileSpec::default()
            },
            file_path: None,
        }
    }

    /// Try to load an existing configuration from the disk using the custom
    /// directory if provided. When no file exists yet, write one holding the
    /// defaults.
    ///
    pub fn load(&mut self, custom_path: Option<&str>) -> Result<(), AppError> {
        // Use default path unless custom path provided
        let dir_path = match custom_path {
            Some(path) => Path::new(&path).to_path_buf(),
            None => Config::default_path()?,
        };

        if !dir_path.exists() {
            fs::create_dir_all(&dir_path).map_err(|e| ConfigError::CreateDirectoryFailed {
                path: dir_path.clone(),
                source: e,
            })?;
        }

        self.file_path = Some(dir_path.join(Path::new(FILE_NAME)));
        let file_path = self.file_path.as_ref().ok_or(ConfigError::FilePathNotSet)?;

        if file_path.exists() {
            let contents = fs::read_to_string(file_path).map_err(|e| ConfigError::LoadFailed {
                path: file_path.clone(),
                message: format!("IO error: {}", e),
            })?;
            let mut spec: FileSpec = if contents.trim().is_empty() {
                FileSpec::default()
            } else {
                serde_yaml::from_str(&contents)
                    .map_err(|e| ConfigError::DeserializationFailed(e.to_string()))?
            };
            if spec.theme_name.is_empty() {
                spec.theme_name = default_theme_name();
            }
            self.spec = spec;
        } else {
            self.save()?;
        }

        // Surface bad values at startup rather than when the widget is built
        self.spec.upload.to_upload_config()?;
        Ok(())
    }

    /// Save the current configuration to disk.
    ///
    pub fn save(&self) -> Result<(), AppError> {
        let file_path = self.file_path.as_ref().ok_or(ConfigError::FilePathNotSet)?;
        let content = serde_yaml::to_string(&self.spec)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = file_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::CreateDirectoryFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let mut file = fs::File::create(file_path).map_err(|e| ConfigError::SaveFailed {
            path: file_path.clone(),
            source: e,
        })?;
        write!(file, "{}", content).map_err(|e| ConfigError::SaveFailed {
            path: file_path.clone(),
            source: e,
        })?;
        file.flush().map_err(|e| ConfigError::SaveFailed {
            path: file_path.clone(),
            source: e,
        })?;
        Ok(())
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Returns the path buffer for the default configuration directory or an
    /// error if the home directory could not be found.
    ///
    fn default_path() -> Result<PathBuf, AppError> {
        match dirs::home_dir() {
            Some(home) => {
                let home_path = Path::new(&home);
                let default_config_path = Path::new(DEFAULT_DIRECTORY_PATH);
                Ok(home_path.join(default_config_path))
            }
            None => Err(ConfigError::HomeDirectoryNotFound.into()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_creates_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested");
        let mut config = Config::new();
        config.load(path.to_str()).unwrap();

        let file_path = path.join(FILE_NAME);
        assert!(file_path.exists());
        assert_eq!(config.spec.theme_name, "tokyo-night");
        assert_eq!(config.spec.upload.max_files, 5);

        let mut reloaded = Config::new();
        reloaded.load(path.to_str()).unwrap();
        assert_eq!(reloaded.spec, config.spec);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(FILE_NAME),
            "theme_name: dracula\nupload:\n  max_files: 2\nnotifications:\n  position: bottom-center\n",
        )
        .unwrap();

        let mut config = Config::new();
        config.load(dir.path().to_str()).unwrap();
        assert_eq!(config.spec.theme_name, "dracula");
        assert_eq!(config.spec.upload.max_files, 2);
        assert_eq!(config.spec.upload.max_file_size_mb, 10);
        assert_eq!(config.spec.notifications.position, ToastPosition::BottomCenter);
        assert_eq!(config.spec.otp.resend_countdown_secs, 60);
        assert!(config.spec.steps.auto_save);
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FILE_NAME), "upload: 42\n").unwrap();
        let mut config = Config::new();
        let result = config.load(dir.path().to_str());
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::DeserializationFailed(_)))
        ));
    }

    #[test]
    fn test_save_persists_theme() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new();
        config.load(dir.path().to_str()).unwrap();
        config.spec.theme_name = "dracula".to_string();
        config.save().unwrap();

        let contents = fs::read_to_string(dir.path().join(FILE_NAME)).unwrap();
        assert!(contents.contains("dracula"));
    }

    #[test]
    fn test_save_without_path_fails() {
        let config = Config::new();
        assert!(matches!(
            config.save(),
            Err(AppError::Config(ConfigError::FilePathNotSet))
        ));
    }

    #[test]
    fn test_section_conversions() {
        let spec = FileSpec::default();
        let upload = spec.upload.to_upload_config().unwrap();
        assert_eq!(upload.max_file_size, 10 * 1024 * 1024);
        assert_eq!(upload.progress_step, Duration::from_millis(200));

        let steps = spec.steps.to_step_config();
        assert_eq!(steps.auto_save_interval, Duration::from_secs(30));
        assert!(!steps.allow_skip);

        assert_eq!(spec.otp.to_otp_config().resend_countdown_secs, 60);
        assert_eq!(spec.notifications.to_notification_config().max, 5);

        let table = TableSection {
            page_sizes: vec![10, 25, 50],
            default_page_size: 25,
        };
        assert_eq!(table.page_size_menu(), vec![10, 25, 50]);

        let empty = TableSection {
            page_sizes: vec![0],
            default_page_size: 30,
        };
        assert_eq!(empty.page_size_menu(), vec![10, 20, 30, 40, 50]);
    }
}
