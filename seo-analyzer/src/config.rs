// Configuration loading and parsing (analyzer.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub websocket: WebsocketConfig,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// analyzer.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire analyzer.toml file.
#[derive(Debug, Clone, Deserialize)]
struct AnalyzerFile {
    llm: LlmConfig,
    websocket: WebsocketConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    /// Messages API endpoint. Overridable for proxies and tests.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    pub report_max_tokens: u32,
    pub score_max_tokens: u32,
    pub summary_max_tokens: u32,
    /// Upper bound on model turns spent calling auxiliary tools before a
    /// flow must produce its output.
    pub max_tool_rounds: u32,
}

fn default_api_url() -> String {
    crate::llm::client::DEFAULT_API_URL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebsocketConfig {
    pub enabled: bool,
    pub port: u16,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub anthropic_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/analyzer.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// This does not copy defaults; `load_config()` does.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- analyzer.toml (required) ---
    let analyzer_path = config_dir.join("analyzer.toml");
    let analyzer_text = read_file(&analyzer_path)?;
    let analyzer_file: AnalyzerFile =
        toml::from_str(&analyzer_text).map_err(|e| ConfigError::ParseError {
            path: analyzer_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        llm: analyzer_file.llm,
        websocket: analyzer_file.websocket,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Never overwrite a user's config.
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

const MAX_TOOL_ROUNDS_LIMIT: u32 = 16;

fn validate(config: &Config) -> Result<(), ConfigError> {
    let llm = &config.llm;

    if llm.model.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "llm.model".into(),
            message: "must not be empty".into(),
        });
    }

    match url::Url::parse(&llm.api_url) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
        Ok(u) => {
            return Err(ConfigError::ValidationError {
                field: "llm.api_url".into(),
                message: format!("must be an http(s) URL, got scheme `{}`", u.scheme()),
            });
        }
        Err(e) => {
            return Err(ConfigError::ValidationError {
                field: "llm.api_url".into(),
                message: format!("invalid URL: {e}"),
            });
        }
    }

    let token_fields: &[(&str, u32)] = &[
        ("llm.report_max_tokens", llm.report_max_tokens),
        ("llm.score_max_tokens", llm.score_max_tokens),
        ("llm.summary_max_tokens", llm.summary_max_tokens),
    ];
    for (name, val) in token_fields {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    if llm.max_tool_rounds == 0 || llm.max_tool_rounds > MAX_TOOL_ROUNDS_LIMIT {
        return Err(ConfigError::ValidationError {
            field: "llm.max_tool_rounds".into(),
            message: format!(
                "must be between 1 and {MAX_TOOL_ROUNDS_LIMIT}, got {}",
                llm.max_tool_rounds
            ),
        });
    }

    if config.websocket.enabled && config.websocket.port == 0 {
        return Err(ConfigError::ValidationError {
            field: "websocket.port".into(),
            message: "must be > 0 when the server is enabled".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
