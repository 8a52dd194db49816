//! Configuration types for PDF-to-Pohoda conversion.
//!
//! Two layers:
//!
//! * [`Settings`]: the five values every run needs from the environment
//!   (API key and the Pohoda mServer credentials). Loaded once, up front,
//!   and handed down explicitly; nothing below the binary reads the
//!   environment on its own.
//! * [`ConversionConfig`]: the behavioural knobs, built via
//!   [`ConversionConfigBuilder`]. Validation and remote submission are
//!   switched on here; both default to off.

use crate::error::Pdf2PohodaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Environment variable holding the OpenAI API key.
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable holding the Pohoda mServer URL.
pub const ENV_POHODA_URL: &str = "POHODA_URL";
/// Environment variable holding the Pohoda username.
pub const ENV_POHODA_USERNAME: &str = "POHODA_USERNAME";
/// Environment variable holding the Pohoda password.
pub const ENV_POHODA_PASSWORD: &str = "POHODA_PASSWORD";
/// Environment variable holding the agenda (ledger) identifier.
pub const ENV_POHODA_AGENDA: &str = "POHODA_AGENDA";

/// Default relative path of the append-only error log.
pub const DEFAULT_LOG_PATH: &str = "pdf2pohoda_errors.log";

/// Default relative path of the XSD used by the validator.
pub const DEFAULT_SCHEMA_PATH: &str = "schema/invoice.xsd";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4";

// ── Settings ─────────────────────────────────────────────────────────────

/// Where and as whom a generated invoice is submitted.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    pub url: String,
    pub username: String,
    pub password: String,
    /// Agenda (accounting ledger) the import targets.
    pub agenda: String,
}

impl fmt::Debug for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteEndpoint")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("agenda", &self.agenda)
            .finish()
    }
}

/// Required process-wide values, read once from the environment.
#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub endpoint: RemoteEndpoint,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// Call after `dotenvy::dotenv()` so values from a `.env` file are seen.
    pub fn from_env() -> Result<Self, Pdf2PohodaError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary lookup function.
    ///
    /// Variables are checked in a fixed order and the first missing (or
    /// empty) one is reported.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Pdf2PohodaError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |var: &'static str| -> Result<String, Pdf2PohodaError> {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(Pdf2PohodaError::MissingEnv { var })
        };

        Ok(Self {
            api_key: require(ENV_API_KEY)?,
            endpoint: RemoteEndpoint {
                url: require(ENV_POHODA_URL)?,
                username: require(ENV_POHODA_USERNAME)?,
                password: require(ENV_POHODA_PASSWORD)?,
                agenda: require(ENV_POHODA_AGENDA)?,
            },
        })
    }
}

// ── ConversionConfig ─────────────────────────────────────────────────────

/// Configuration for a batch conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2pohoda::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .model("gpt-4o")
///     .validate(true)
///     .build()
///     .unwrap();
/// assert!(!config.submit);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Chat model identifier. Default: `gpt-4`.
    pub model: String,

    /// Sampling temperature. Default: 0.0 (greedy decoding).
    ///
    /// The output is a data document, not prose; any creativity shows up as
    /// invented field values.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: None (provider default).
    pub max_tokens: Option<usize>,

    /// Custom system prompt. If None, uses the built-in one.
    pub system_prompt: Option<String>,

    /// Validate each generated XML against `schema_path`. Default: false.
    pub validate: bool,

    /// Path to the XSD used for validation.
    pub schema_path: PathBuf,

    /// POST each generated XML to the Pohoda endpoint. Default: false.
    ///
    /// When `validate` is also on, only documents that pass validation are
    /// submitted.
    pub submit: bool,

    /// Append-only error log.
    pub log_path: PathBuf,

    /// Directory containing the pdfium shared library. If None, the system
    /// library is used.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Treat any per-file failure as a failed run. Default: false.
    pub fail_on_error: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_tokens: None,
            system_prompt: None,
            validate: false,
            schema_path: PathBuf::from(DEFAULT_SCHEMA_PATH),
            submit: false,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            pdfium_lib_path: None,
            fail_on_error: false,
        }
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn validate(mut self, v: bool) -> Self {
        self.config.validate = v;
        self
    }

    pub fn schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.schema_path = path.into();
        self
    }

    pub fn submit(mut self, v: bool) -> Self {
        self.config.submit = v;
        self
    }

    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_path = path.into();
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn fail_on_error(mut self, v: bool) -> Self {
        self.config.fail_on_error = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2PohodaError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(Pdf2PohodaError::InvalidConfig(
                "Model name must not be empty".into(),
            ));
        }
        if c.max_tokens == Some(0) {
            return Err(Pdf2PohodaError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.log_path.as_os_str().is_empty() {
            return Err(Pdf2PohodaError::InvalidConfig(
                "Error log path must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
