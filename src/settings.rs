use crate::summary::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::upload::MAX_FILE_SIZE;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Server {
    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Upload {
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Summary {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Auth {
    pub verify_passwords: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub storage: StorageSettings,
    pub server: Server,
    pub upload: Upload,
    pub summary: Summary,
    pub auth: Auth,
}

impl Settings {
    /// Defaults, then `noteshare.toml` if present, then `NOTESHARE__SECTION__KEY`
    /// variables. `API_KEY` is used for the summary key when nothing else sets it.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_sources(Some("noteshare.toml"))
    }

    pub fn from_sources(file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("storage.dir", ".noteshare")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("upload.max_file_size", MAX_FILE_SIZE)?
            .set_default("summary.model", DEFAULT_MODEL)?
            .set_default("summary.base_url", DEFAULT_BASE_URL)?
            .set_default("auth.verify_passwords", false)?;

        if let Some(path) = file {
            builder = builder.add_source(File::with_name(path).format(FileFormat::Toml).required(false));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("NOTESHARE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;
        if settings.summary.api_key.is_none() {
            settings.summary.api_key = std::env::var("API_KEY").ok();
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::{remove_var, set_var};

    #[test]
    fn test_settings() {
        set_var("NOTESHARE__SERVER__PORT", "4100");
        set_var("NOTESHARE__AUTH__VERIFY_PASSWORDS", "true");
        set_var("NOTESHARE__SUMMARY__API_KEY", "from-env");

        let settings = Settings::from_sources(None).unwrap();

        remove_var("NOTESHARE__SERVER__PORT");
        remove_var("NOTESHARE__AUTH__VERIFY_PASSWORDS");
        remove_var("NOTESHARE__SUMMARY__API_KEY");

        assert_eq!(settings.server.port, 4100);
        assert!(settings.auth.verify_passwords);
        assert_eq!(settings.summary.api_key.as_deref(), Some("from-env"));
        assert_eq!(settings.upload.max_file_size, 10 * 1024 * 1024);
        assert_eq!(settings.storage.dir, PathBuf::from(".noteshare"));
        assert_eq!(settings.summary.model, DEFAULT_MODEL);
        assert_eq!(settings.server.addr().unwrap().port(), 4100);
    }
}
