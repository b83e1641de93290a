//! Access token loading for the Drive backend.
//!
//! The OAuth consent flow is handled by external tooling; this module only
//! reads the token it leaves behind.

use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const ENV_GOOGLE_ACCESS_TOKEN: &str = "GOOGLE_ACCESS_TOKEN";

const TOKEN_FILE_NAME: &str = "token.json";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No access token: set {env} or provide a token file at {path}")]
    MissingToken { env: &'static str, path: PathBuf },

    #[error("Failed to read token file {path}: {message}")]
    InvalidTokenFile { path: PathBuf, message: String },
}

/// Persisted OAuth token as written by standard tooling.
#[derive(Debug, Deserialize)]
struct StoredToken {
    #[serde(alias = "token")]
    access_token: String,
}

/// `<config dir>/skurename/token.json`, falling back to `./token.json`.
pub fn default_token_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("skurename").join(TOKEN_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(TOKEN_FILE_NAME))
}

/// Read the access token from a token file.
pub fn read_token_file(path: &Path) -> Result<String, AuthError> {
    let invalid = |message: String| AuthError::InvalidTokenFile {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path).map_err(|e| invalid(e.to_string()))?;
    let token: StoredToken =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| invalid(e.to_string()))?;

    if token.access_token.trim().is_empty() {
        return Err(invalid("access_token is empty".to_string()));
    }

    Ok(token.access_token)
}

/// Resolve the access token: `GOOGLE_ACCESS_TOKEN` first, then the token file.
pub fn load_access_token(token_file: &Path) -> Result<String, AuthError> {
    if let Ok(token) = env::var(ENV_GOOGLE_ACCESS_TOKEN) {
        if !token.trim().is_empty() {
            debug!("Using access token from {}", ENV_GOOGLE_ACCESS_TOKEN);
            return Ok(token);
        }
    }

    if !token_file.exists() {
        return Err(AuthError::MissingToken {
            env: ENV_GOOGLE_ACCESS_TOKEN,
            path: token_file.to_path_buf(),
        });
    }

    debug!("Reading access token from {:?}", token_file);
    read_token_file(token_file)
}
