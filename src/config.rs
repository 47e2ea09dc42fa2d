use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Top-level server configuration, loaded from parlor.toml.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub storage: StorageSection,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub web_address: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            web_address: "0.0.0.0:8080".into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub upload_dir: String,
    pub max_file_size_mb: usize,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            upload_dir: "static/uploads".into(),
            max_file_size_mb: 16,
        }
    }
}

impl ServerConfig {
    /// Load config from a TOML file. Falls back to defaults if the file
    /// doesn't exist. Environment variables override TOML values.
    pub fn load(path: &str) -> Self {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .unwrap_or_else(|e| panic!("failed to read config file {}: {}", path, e));
            toml::from_str(&contents)
                .unwrap_or_else(|e| panic!("failed to parse config file {}: {}", path, e))
        } else {
            info!("No config file found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("WEB_ADDRESS") {
            self.server.web_address = v;
        }
        if let Ok(v) = std::env::var("UPLOAD_DIR") {
            self.storage.upload_dir = v;
        }
        if let Ok(v) = std::env::var("MAX_FILE_SIZE_MB")
            && let Ok(mb) = v.parse()
        {
            self.storage.max_file_size_mb = mb;
        }
    }
}
