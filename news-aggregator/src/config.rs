//! Environment-driven service configuration.

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub timeout_seconds: u64,
    pub manager_config_path: PathBuf,
    pub storage_path: PathBuf,
    pub cert_file_path: Option<PathBuf>,
    pub key_file_path: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8443),
            timeout_seconds: env::var("TIMEOUT")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(30),
            manager_config_path: env::var("MANAGER_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config/feeds_dictionary.json")),
            storage_path: env::var("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("storage")),
            cert_file_path: env::var("CERT_FILE_PATH").ok().map(PathBuf::from),
            key_file_path: env::var("KEY_FILE_PATH").ok().map(PathBuf::from),
        }
    }

    pub fn tls_paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        match (&self.cert_file_path, &self.key_file_path) {
            (Some(cert), Some(key)) => Some((cert, key)),
            _ => None,
        }
    }
}
