//! Configuration management
//!
//! All settings come from environment variables (a `.env` file is honored).
//! Server and database settings have defaults; the render settings and the
//! preview root do not, because a wrong default would silently produce wrong
//! artifacts. Startup fails fast when they are missing or out of range.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub render: RenderConfig,
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Rasterization settings handed to the render pipeline at construction.
#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    /// Output resolution in dots per inch. Must be positive.
    pub dpi: u32,
    /// JPEG quality in (0, 1]; 1.0 selects the encoder default.
    pub quality: f32,
}

#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Root directory of the on-disk preview store.
    pub root: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let dpi: u32 = required("RENDER_DPI")?
            .parse()
            .map_err(|e| invalid("RENDER_DPI", format!("{e}")))?;
        if dpi == 0 {
            return Err(invalid("RENDER_DPI", "must be positive".into()));
        }

        let quality: f32 = required("RENDER_QUALITY")?
            .parse()
            .map_err(|e| invalid("RENDER_QUALITY", format!("{e}")))?;
        if !(quality > 0.0 && quality <= 1.0) {
            return Err(invalid(
                "RENDER_QUALITY",
                format!("{quality} is outside (0, 1]"),
            ));
        }

        let root = PathBuf::from(required("PREVIEW_ROOT")?);

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(3000),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:docpreview.db".to_string()),
            },
            render: RenderConfig { dpi, quality },
            preview: PreviewConfig { root },
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn invalid(name: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { name, reason }
}
