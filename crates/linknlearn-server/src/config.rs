//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Explicit SQLite database file path. When unset, the store picks
    /// the platform data directory.
    /// Env: `DATABASE_PATH`
    pub database_path: Option<PathBuf>,

    /// Filesystem path where uploaded images are stored.
    /// Env: `BLOB_STORAGE_PATH`
    /// Default: `./blobs`
    pub blob_storage_path: PathBuf,

    /// Maximum uploaded image size in bytes (10 MiB).
    pub max_blob_size: usize,

    /// Key for the password digest (hex-encoded, 64 chars).
    /// Env: `PASSWORD_KEY`
    /// Default: all-zeros (development only).
    pub password_key: [u8; 32],

    /// Endpoint of the external image host used for report screenshots.
    /// Env: `IMAGE_HOST_URL`
    /// Default: `https://api.imgur.com/3/image`
    pub image_host_url: String,

    /// Client id for the external image host. When unset, external
    /// uploads are disabled; never embedded in code.
    /// Env: `IMAGE_HOST_CLIENT_ID`
    pub image_host_client_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], linknlearn_shared::constants::DEFAULT_HTTP_PORT).into(),
            database_path: None,
            blob_storage_path: PathBuf::from("./blobs"),
            max_blob_size: linknlearn_shared::constants::MAX_IMAGE_SIZE,
            password_key: [0u8; 32],
            image_host_url: "https://api.imgur.com/3/image".to_string(),
            image_host_client_id: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("BLOB_STORAGE_PATH") {
            config.blob_storage_path = PathBuf::from(path);
        }

        if let Ok(hex_key) = std::env::var("PASSWORD_KEY") {
            match parse_hex_key(&hex_key) {
                Ok(key) => config.password_key = key,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Invalid PASSWORD_KEY, using default (dev-only)"
                    );
                }
            }
        }

        if let Ok(url) = std::env::var("IMAGE_HOST_URL") {
            config.image_host_url = url;
        }

        if let Ok(id) = std::env::var("IMAGE_HOST_CLIENT_ID") {
            if !id.is_empty() {
                config.image_host_client_id = Some(id);
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

/// Parse a 64-character hex string into a 32-byte array.
fn parse_hex_key(hex: &str) -> Result<[u8; 32], String> {
    let hex = hex.trim();
    if hex.len() != 64 {
        return Err(format!("expected 64 hex chars, got {}", hex.len()));
    }

    let mut bytes = [0u8; 32];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let hi = hex_digit(chunk[0])?;
        let lo = hex_digit(chunk[1])?;
        bytes[i] = (hi << 4) | lo;
    }
    Ok(bytes)
}

fn hex_digit(c: u8) -> Result<u8, String> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(format!("invalid hex digit: {}", c as char)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.password_key, [0u8; 32]);
        assert!(config.image_host_client_id.is_none());
    }

    #[test]
    fn test_parse_hex_key() {
        let hex = "ab".repeat(32);
        let key = parse_hex_key(&hex).unwrap();
        assert_eq!(key, [0xab; 32]);
    }

    #[test]
    fn test_parse_hex_key_wrong_length() {
        assert!(parse_hex_key("abcd").is_err());
    }
}
