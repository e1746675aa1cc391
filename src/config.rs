//! Configuration types for rendering and inference.
//!
//! Two structs, one per pipeline stage, both built through a builder with
//! validated defaults. The inference config carries the API credential; it
//! is loaded once at startup and then passed by value into the analyzer.
//! Only [`InferenceConfig::from_env`] touches the process environment.

use crate::error::AtsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Environment variable overriding the model identifier.
pub const MODEL_ENV: &str = "RESUME_ATS_MODEL";

/// Environment variable overriding the REST base URL.
pub const API_BASE_ENV: &str = "RESUME_ATS_API_BASE";

/// Default generative model.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Gemini REST base URL used by the Developer API.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

// ── Rendering ────────────────────────────────────────────────────────────

/// How the resume page is rasterised.
///
/// # Example
/// ```rust
/// use resume_ats::RenderConfig;
///
/// let config = RenderConfig::builder().scale(2.0).build().unwrap();
/// assert_eq!(config.page_index, 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Zero-based page to render. Default: 0.
    pub page_index: usize,

    /// Multiplier applied to the page size in PDF points. Default: 1.0.
    ///
    /// 1.0 renders one pixel per point (72 DPI), the renderer's natural
    /// resolution. A US-letter page comes out at 612 × 792 px.
    pub scale: f32,

    /// Cap on the longest rendered edge in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Explicit pdfium shared library (file or directory). When `None`, the
    /// working directory and then the system library path are tried.
    pub pdfium_library: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page_index: 0,
            scale: 1.0,
            max_rendered_pixels: 2000,
            password: None,
            pdfium_library: None,
        }
    }
}

impl RenderConfig {
    /// Create a new builder for `RenderConfig`.
    pub fn builder() -> RenderConfigBuilder {
        RenderConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RenderConfig`].
#[derive(Debug)]
pub struct RenderConfigBuilder {
    config: RenderConfig,
}

impl RenderConfigBuilder {
    pub fn page_index(mut self, index: usize) -> Self {
        self.config.page_index = index;
        self
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale.clamp(0.25, 8.0);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RenderConfig, AtsError> {
        let c = &self.config;
        if !c.scale.is_finite() || c.scale <= 0.0 {
            return Err(AtsError::InvalidConfig(format!(
                "scale must be a positive number, got {}",
                c.scale
            )));
        }
        Ok(self.config)
    }
}

// ── Inference ────────────────────────────────────────────────────────────

/// Connection settings for the generative service.
///
/// Built via [`InferenceConfig::builder()`] or [`InferenceConfig::from_env()`].
#[derive(Clone)]
pub struct InferenceConfig {
    /// API key sent in the `x-goog-api-key` header.
    pub api_key: String,

    /// Model identifier, e.g. "gemini-1.5-flash". Fixed for the lifetime of
    /// the client.
    pub model: String,

    /// REST base URL. Overridable for proxies and tests.
    pub base_url: String,

    /// Timeout for the whole generate call in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Sampling temperature. `None` leaves the service default.
    pub temperature: Option<f32>,

    /// Output token cap. `None` leaves the service default.
    pub max_output_tokens: Option<u32>,
}

impl fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

impl InferenceConfig {
    /// Create a new builder for `InferenceConfig`.
    pub fn builder() -> InferenceConfigBuilder {
        InferenceConfigBuilder {
            config: Self {
                api_key: String::new(),
                model: DEFAULT_MODEL.to_string(),
                base_url: DEFAULT_API_BASE.to_string(),
                api_timeout_secs: 60,
                temperature: None,
                max_output_tokens: None,
            },
        }
    }

    /// Read the configuration from the process environment.
    ///
    /// Call this once at startup (after loading any `.env` file) and pass the
    /// result down; it is never re-read.
    pub fn from_env() -> Result<Self, AtsError> {
        let mut builder = Self::builder();
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => builder = builder.api_key(key),
            _ => {
                return Err(AtsError::MissingApiKey {
                    var: API_KEY_ENV.to_string(),
                })
            }
        }
        if let Ok(model) = std::env::var(MODEL_ENV) {
            if !model.is_empty() {
                builder = builder.model(model);
            }
        }
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            if !base.is_empty() {
                builder = builder.base_url(base);
            }
        }
        builder.build()
    }
}

/// Builder for [`InferenceConfig`].
#[derive(Debug)]
pub struct InferenceConfigBuilder {
    config: InferenceConfig,
}

impl InferenceConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = Some(n);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<InferenceConfig, AtsError> {
        let c = &self.config;
        if c.api_key.trim().is_empty() {
            return Err(AtsError::MissingApiKey {
                var: API_KEY_ENV.to_string(),
            });
        }
        if c.model.trim().is_empty() {
            return Err(AtsError::InvalidConfig("model must not be empty".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(AtsError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
