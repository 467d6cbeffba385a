//! External tool detection.
//!
//! Extraction shells out to three Poppler/Tesseract binaries. Their presence
//! is probed once per process and cached; a missing tool is a capability gap,
//! never an error.

use std::path::PathBuf;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Binaries used for extraction. Names are resolved through PATH unless an
/// absolute path is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    /// Text layer extractor (Poppler).
    #[serde(default = "default_pdftotext")]
    pub pdftotext: PathBuf,
    /// PDF rasterizer (Poppler).
    #[serde(default = "default_pdftoppm")]
    pub pdftoppm: PathBuf,
    /// OCR engine.
    #[serde(default = "default_tesseract")]
    pub tesseract: PathBuf,
}

fn default_pdftotext() -> PathBuf {
    PathBuf::from("pdftotext")
}

fn default_pdftoppm() -> PathBuf {
    PathBuf::from("pdftoppm")
}

fn default_tesseract() -> PathBuf {
    PathBuf::from("tesseract")
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            pdftotext: default_pdftotext(),
            pdftoppm: default_pdftoppm(),
            tesseract: default_tesseract(),
        }
    }
}

/// Check if a binary is available in PATH (or at the given path).
pub fn check_binary(name: impl AsRef<std::ffi::OsStr>) -> bool {
    which::which(name).is_ok()
}

/// Which extraction tools are usable in this environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub pdftotext: bool,
    pub pdftoppm: bool,
    pub tesseract: bool,
}

static CAPABILITIES: OnceLock<Capabilities> = OnceLock::new();

impl Capabilities {
    /// Probe the given tools without caching.
    pub fn probe(tools: &ToolPaths) -> Self {
        let caps = Self {
            pdftotext: check_binary(&tools.pdftotext),
            pdftoppm: check_binary(&tools.pdftoppm),
            tesseract: check_binary(&tools.tesseract),
        };
        tracing::debug!(
            pdftotext = caps.pdftotext,
            pdftoppm = caps.pdftoppm,
            tesseract = caps.tesseract,
            "probed extraction tools"
        );
        caps
    }

    /// Process-wide capabilities. The first call probes; every later call
    /// returns the same record regardless of `tools`.
    pub fn detect(tools: &ToolPaths) -> Self {
        *CAPABILITIES.get_or_init(|| Self::probe(tools))
    }

    /// Everything missing. Useful for forcing the degraded paths.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn has_pdftotext(&self) -> bool {
        self.pdftotext
    }

    pub fn has_pdftoppm(&self) -> bool {
        self.pdftoppm
    }

    pub fn has_tesseract(&self) -> bool {
        self.tesseract
    }

    /// Scanned PDFs need both the rasterizer and the OCR engine.
    pub fn ocr_for_pdf(&self) -> bool {
        self.pdftoppm && self.tesseract
    }

    /// Images go straight to the OCR engine.
    pub fn ocr_for_images(&self) -> bool {
        self.tesseract
    }

    /// Whether OCR can run for a file of this MIME type.
    pub fn ocr_for_mime(&self, mime: &str) -> bool {
        if crate::utils::is_pdf(mime) {
            self.ocr_for_pdf()
        } else if crate::utils::is_image(mime) {
            self.ocr_for_images()
        } else {
            false
        }
    }

    /// Tool name / availability pairs for status output.
    pub fn report(&self, tools: &ToolPaths) -> Vec<(String, bool)> {
        vec![
            (tools.pdftotext.display().to_string(), self.pdftotext),
            (tools.pdftoppm.display().to_string(), self.pdftoppm),
            (tools.tesseract.display().to_string(), self.tesseract),
        ]
    }
}
