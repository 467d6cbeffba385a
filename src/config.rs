//! Configuration management for docintake using the prefer crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::llm::{LlmConfig, DEFAULT_MAX_CONTENT_CHARS};
use crate::ocr::{OcrConfig, ToolPaths, DEFAULT_TEXT_TIMEOUT};

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "docintake.db";

/// Subdirectory for cached copies of stored files.
pub const CACHE_SUBDIR: &str = "cache";

/// Extraction limits and tool locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Maximum number of PDF pages to OCR.
    #[serde(default = "default_max_ocr_pages")]
    pub max_ocr_pages: usize,
    /// Hard timeout for PDF text-layer extraction, in seconds.
    #[serde(default = "default_text_timeout_secs")]
    pub text_timeout_secs: u64,
    /// Tesseract language code(s), e.g. "eng" or "eng+deu".
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,
    /// Rasterization resolution for scanned PDFs.
    #[serde(default = "default_ocr_dpi")]
    pub ocr_dpi: u32,
    /// Characters of each text source sent to the model.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    /// External binaries.
    #[serde(default)]
    pub tools: ToolPaths,
}

fn default_max_ocr_pages() -> usize {
    OcrConfig::default().max_pages
}

fn default_text_timeout_secs() -> u64 {
    DEFAULT_TEXT_TIMEOUT.as_secs()
}

fn default_ocr_language() -> String {
    OcrConfig::default().language
}

fn default_ocr_dpi() -> u32 {
    OcrConfig::default().dpi
}

fn default_max_content_chars() -> usize {
    DEFAULT_MAX_CONTENT_CHARS
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::base_default().with_env_overrides()
    }
}

impl ExtractionConfig {
    /// Base default without env overrides.
    pub fn base_default() -> Self {
        Self {
            max_ocr_pages: default_max_ocr_pages(),
            text_timeout_secs: default_text_timeout_secs(),
            ocr_language: default_ocr_language(),
            ocr_dpi: default_ocr_dpi(),
            max_content_chars: default_max_content_chars(),
            tools: ToolPaths::default(),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `EXTRACT_MAX_OCR_PAGES`: page cap for OCR
    /// - `EXTRACT_TEXT_TIMEOUT`: pdftotext timeout in seconds
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("EXTRACT_MAX_OCR_PAGES") {
            if let Ok(n) = val.parse() {
                self.max_ocr_pages = n;
            }
        }
        if let Ok(val) = std::env::var("EXTRACT_TEXT_TIMEOUT") {
            if let Ok(n) = val.parse() {
                self.text_timeout_secs = n;
            }
        }
        self
    }

    pub fn text_timeout(&self) -> Duration {
        Duration::from_secs(self.text_timeout_secs)
    }

    /// OCR engine settings derived from this config.
    pub fn ocr_config(&self) -> OcrConfig {
        OcrConfig {
            language: self.ocr_language.clone(),
            max_pages: self.max_ocr_pages,
            dpi: self.ocr_dpi,
        }
    }
}

/// Resolved runtime paths.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename inside `data_dir`.
    pub database_filename: String,
}

impl Default for Settings {
    fn default() -> Self {
        // Default to the platform data dir, e.g. ~/.local/share/docintake
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docintake");
        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Full path to the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Directory for cached copies of stored files.
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join(CACHE_SUBDIR)
    }
}

/// Configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory (absolute, `~`-prefixed, or relative to the config file).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default, skip_serializing_if = "LlmConfig::is_default")]
    pub llm: LlmConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers docintake config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("docintake").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("{}", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            // No config file found, use defaults with env overrides
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML, and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse config text in the format named by `ext`. Environment
    /// variables win over file values.
    pub fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        let mut config: Config = match ext {
            "toml" => toml::from_str(contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };
        config.extraction = config.extraction.with_env_overrides();
        config.llm = config.llm.with_env_overrides();
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Build runtime settings from this config.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        let base_dir = self
            .base_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, &base_dir);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        settings
    }
}
