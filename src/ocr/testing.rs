//! Shell-script stand-ins for pdftotext, pdftoppm and tesseract.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::tools::ToolPaths;

/// Fake tool set living in a temp directory.
///
/// - pdftoppm writes `pages` empty PNGs (honoring `-l`)
/// - tesseract prints a two-word table, "Scanned <image stem>"
/// - pdftotext prints the configured text layer
pub(crate) struct FakeTools {
    dir: TempDir,
    pages: usize,
    failing_page: Option<usize>,
    ocr_delay: Option<&'static str>,
    pdf_text: String,
    text_delay: Option<&'static str>,
}

impl FakeTools {
    pub(crate) fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
            pages: 1,
            failing_page: None,
            ocr_delay: None,
            pdf_text: "Text layer".to_string(),
            text_delay: None,
        }
    }

    pub(crate) fn with_pages(mut self, pages: usize) -> Self {
        self.pages = pages;
        self
    }

    pub(crate) fn failing_page(mut self, page: usize) -> Self {
        self.failing_page = Some(page);
        self
    }

    pub(crate) fn with_ocr_delay(mut self, secs: &'static str) -> Self {
        self.ocr_delay = Some(secs);
        self
    }

    pub(crate) fn with_pdf_text(mut self, text: &str) -> Self {
        self.pdf_text = text.to_string();
        self
    }

    pub(crate) fn with_text_delay(mut self, secs: &'static str) -> Self {
        self.text_delay = Some(secs);
        self
    }

    fn log_path(&self) -> PathBuf {
        self.dir.path().join("tesseract.log")
    }

    /// Number of tesseract invocations so far.
    pub(crate) fn ocr_calls(&self) -> usize {
        std::fs::read_to_string(self.log_path())
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    /// Write the scripts and return their paths.
    pub(crate) fn paths(&self) -> ToolPaths {
        let dir = self.dir.path();

        let text_file = dir.join("layer.txt");
        std::fs::write(&text_file, &self.pdf_text).expect("write text layer");
        let pdftotext = write_script(
            dir,
            "pdftotext",
            &format!(
                "{}cat '{}'\n",
                sleep_line(self.text_delay),
                text_file.display()
            ),
        );

        let pdftoppm = write_script(
            dir,
            "pdftoppm",
            &format!(
                r#"last=""
while [ $# -gt 2 ]; do
  if [ "$1" = "-l" ]; then last="$2"; shift; fi
  shift
done
prefix="$2"
pages={pages}
if [ -n "$last" ] && [ "$last" -lt "$pages" ]; then pages=$last; fi
i=1
while [ $i -le $pages ]; do
  : > "$prefix-$i.png"
  i=$((i+1))
done
"#,
                pages = self.pages
            ),
        );

        let failing = self
            .failing_page
            .map(|p| format!("page-{}", p))
            .unwrap_or_else(|| "__never__".to_string());
        let tesseract = write_script(
            dir,
            "tesseract",
            &format!(
                r#"echo "$1" >> '{log}'
{sleep}name=$(basename "$1")
name=${{name%.*}}
case "$name" in
  {failing}) echo "cannot read image" >&2; exit 1;;
esac
printf 'level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n'
printf '5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t96.0\tScanned\n'
printf '5\t1\t1\t1\t1\t2\t12\t0\t10\t10\t91.0\t%s\n' "$name"
"#,
                log = self.log_path().display(),
                sleep = sleep_line(self.ocr_delay),
                failing = failing,
            ),
        );

        ToolPaths {
            pdftotext,
            pdftoppm,
            tesseract,
        }
    }
}

fn sleep_line(delay: Option<&str>) -> String {
    delay.map(|d| format!("sleep {}\n", d)).unwrap_or_default()
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).expect("write script");
    let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod");
    path
}
