//! Server configuration.

use std::path::PathBuf;

use crate::detection::oracle::default_cascade_dir;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Where raw uploads are written
    pub upload_dir: PathBuf,
    /// Where annotated images are written and served from
    pub processed_dir: PathBuf,
    /// Directory holding the stock `haarcascade_*.xml` files (and the SeetaFace model)
    pub cascade_dir: PathBuf,
    /// Max request body size
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            upload_dir: PathBuf::from("uploads"),
            processed_dir: PathBuf::from("processed"),
            cascade_dir: default_cascade_dir(),
            max_body_size: 20 * 1024 * 1024, // 20MB
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("FACESCOPE_HOST").unwrap_or(defaults.host),
            port: std::env::var("FACESCOPE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            upload_dir: std::env::var("FACESCOPE_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            processed_dir: std::env::var("FACESCOPE_PROCESSED_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.processed_dir),
            cascade_dir: std::env::var("FACESCOPE_CASCADE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cascade_dir),
            max_body_size: std::env::var("FACESCOPE_MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
