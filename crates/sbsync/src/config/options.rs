//! Account credentials from the add-on options file.

use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

/// SwitchBot cloud credentials.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub switchbot_token: String,

    #[serde(default)]
    pub switchbot_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("switchbot_token", &"<redacted>")
            .field("switchbot_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Load from the JSON options file. Both keys must be present and non-empty.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let credentials: Credentials =
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        if credentials.switchbot_token.is_empty() {
            return Err(ConfigError::MissingOption {
                path: path.to_path_buf(),
                key: "switchbot_token",
            });
        }
        if credentials.switchbot_secret.is_empty() {
            return Err(ConfigError::MissingOption {
                path: path.to_path_buf(),
                key: "switchbot_secret",
            });
        }

        Ok(credentials)
    }
}

/// Read the supervisor-issued bearer token from environment variable `name`.
pub fn supervisor_token(name: &str) -> Result<String, ConfigError> {
    require_token(name, std::env::var(name).ok())
}

fn require_token(name: &str, value: Option<String>) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnv(name.to_string()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn options_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_credentials() {
        let file = options_file(r#"{"switchbot_token": "tok", "switchbot_secret": "sec", "log_level": "info"}"#);
        let credentials = Credentials::from_file(file.path()).unwrap();
        assert_eq!(credentials.switchbot_token, "tok");
        assert_eq!(credentials.switchbot_secret, "sec");
    }

    #[test]
    fn test_missing_secret() {
        let file = options_file(r#"{"switchbot_token": "tok"}"#);
        let err = Credentials::from_file(file.path()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingOption {
                key: "switchbot_secret",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_token() {
        let file = options_file(r#"{"switchbot_token": "", "switchbot_secret": "sec"}"#);
        let err = Credentials::from_file(file.path()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingOption {
                key: "switchbot_token",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Credentials::from_file(&dir.path().join("options.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let file = options_file("{not json");
        let err = Credentials::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let file = options_file(r#"{"switchbot_token": "tok", "switchbot_secret": "sec"}"#);
        let credentials = Credentials::from_file(file.path()).unwrap();
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("sec\""));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_require_token() {
        assert_eq!(
            require_token("SUPERVISOR_TOKEN", Some("abc".to_string())).unwrap(),
            "abc"
        );
        assert!(matches!(
            require_token("SUPERVISOR_TOKEN", Some(String::new())),
            Err(ConfigError::MissingEnv(_))
        ));
        assert!(matches!(
            require_token("SUPERVISOR_TOKEN", None),
            Err(ConfigError::MissingEnv(_))
        ));
    }
}
