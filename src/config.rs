use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// AppConfig
///
/// Holds the client's entire configuration. Immutable once loaded, and shared
/// by the transport (base URL, timeout) and the credential store (directory).
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Base URL every API path is joined onto, e.g. http://localhost:8000/api.
    pub api_base_url: String,
    // Directory holding the persisted session entries.
    pub credential_dir: PathBuf,
    // Per-request timeout applied by the HTTP transport.
    pub request_timeout: Duration,
    // Runtime environment marker. Controls log format and fail-fast checks.
    pub env: Env,
}

/// Env
///
/// Local development talks to a backend on localhost with pretty logs;
/// production requires an explicit API URL and logs JSON.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking values for tests and scaffolding. The credential
    /// directory is relative so nothing outside the working tree is touched.
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            credential_dir: PathBuf::from(".postboard"),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads configuration from environment variables:
    ///
    /// - `APP_ENV`: `production` or anything else for local.
    /// - `POSTBOARD_API_URL`: required in production.
    /// - `POSTBOARD_CREDENTIAL_DIR`: defaults to the platform data directory.
    /// - `POSTBOARD_REQUEST_TIMEOUT_SECS`: defaults to 30.
    ///
    /// # Panics
    /// Panics in production when `POSTBOARD_API_URL` is missing, so the client
    /// never silently talks to a development backend.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let api_base_url = match env {
            Env::Production => env::var("POSTBOARD_API_URL")
                .expect("FATAL: POSTBOARD_API_URL must be set in production."),
            Env::Local => {
                env::var("POSTBOARD_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string())
            }
        };

        let credential_dir = env::var("POSTBOARD_CREDENTIAL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_credential_dir());

        // A malformed timeout falls back to the default rather than failing.
        let request_timeout = env::var("POSTBOARD_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        Self {
            api_base_url,
            credential_dir,
            request_timeout,
            env,
        }
    }
}

fn default_credential_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("postboard"))
        .unwrap_or_else(|| PathBuf::from(".postboard"))
}
