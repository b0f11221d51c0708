//! Document Text Extraction
//!
//! Pure Rust text extraction from uploaded documents - no system libraries required.
//!
//! ## Supported Formats
//! - PDF: page text via pdf-extract
//! - Word: .docx (and .doc, routed to the same OOXML reader) via docx-rs
//! - Excel: .xlsx, .xls via calamine
//! - PowerPoint: .pptx via zip + quick-xml
//! - Text: .txt (direct read)

mod pptx;

use calamine::{Reader, Xls, Xlsx};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Closed set of formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Word,
    Xlsx,
    Xls,
    Pptx,
    PlainText,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 6] = [
        Self::Pdf,
        Self::Word,
        Self::Xlsx,
        Self::Xls,
        Self::Pptx,
        Self::PlainText,
    ];

    /// Resolve a format from a file extension (case-insensitive, leading dot allowed)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "doc" | "docx" => Some(Self::Word),
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "pptx" => Some(Self::Pptx),
            "txt" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Resolve a format from the extension of a path or filename
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Word => "word",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Pptx => "pptx",
            Self::PlainText => "text",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why text could not be extracted
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {format} document: {reason}")]
    Decode {
        format: DocumentFormat,
        reason: String,
    },
}

impl ExtractionError {
    /// True when the input was rejected because of its format rather than an I/O fault
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedFormat(_))
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn decode(format: DocumentFormat, reason: impl fmt::Display) -> Self {
        Self::Decode {
            format,
            reason: reason.to_string(),
        }
    }
}

/// Text extractor dispatching on [`DocumentFormat`]
#[derive(Debug, Default, Clone, Copy)]
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract text from `path`, choosing the strategy from `extension`
    pub fn extract(&self, path: &Path, extension: &str) -> Result<String, ExtractionError> {
        let format = DocumentFormat::from_extension(extension)
            .ok_or_else(|| ExtractionError::UnsupportedFormat(extension.to_string()))?;
        self.extract_format(path, format)
    }

    /// Extract text from `path` using an already resolved format
    pub fn extract_format(
        &self,
        path: &Path,
        format: DocumentFormat,
    ) -> Result<String, ExtractionError> {
        tracing::debug!("[Extractor] Extracting {} from {}", format, path.display());

        let text = match format {
            DocumentFormat::Pdf => self.extract_pdf(path)?,
            DocumentFormat::Word => self.extract_word(path)?,
            DocumentFormat::Xlsx => {
                let workbook: Xlsx<_> = open_workbook_from(path, format)?;
                dump_workbook(workbook)
            }
            DocumentFormat::Xls => {
                let workbook: Xls<_> = open_workbook_from(path, format)?;
                dump_workbook(workbook)
            }
            DocumentFormat::Pptx => {
                let file = File::open(path).map_err(|e| ExtractionError::io(path, e))?;
                pptx::extract_slide_text(BufReader::new(file))
                    .map_err(|e| ExtractionError::decode(format, e))?
            }
            DocumentFormat::PlainText => {
                std::fs::read_to_string(path).map_err(|e| ExtractionError::io(path, e))?
            }
        };

        tracing::info!(
            "[Extractor] {} extracted: {} chars, {} words from {}",
            format,
            text.len(),
            text.split_whitespace().count(),
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        Ok(text)
    }

    /// Extract text from PDF using pdf-extract, one page at a time
    /// Wrapped in catch_unwind to handle panics from malformed PDFs
    fn extract_pdf(&self, path: &Path) -> Result<String, ExtractionError> {
        let bytes = std::fs::read(path).map_err(|e| ExtractionError::io(path, e))?;

        tracing::debug!("[Extractor] PDF file size: {} bytes", bytes.len());

        // pdf_extract (and its cff-parser dependency) can panic on certain fonts/glyphs
        let pages = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })) {
            Ok(Ok(pages)) => pages,
            Ok(Err(e)) => {
                tracing::warn!("[Extractor] PDF extraction FAILED for {}: {}", path.display(), e);
                return Err(ExtractionError::decode(DocumentFormat::Pdf, e));
            }
            Err(_panic) => {
                tracing::error!(
                    "[Extractor] PDF extraction PANICKED for {} - likely malformed font/glyph",
                    path.display()
                );
                return Err(ExtractionError::decode(
                    DocumentFormat::Pdf,
                    "extraction panicked - likely contains malformed fonts",
                ));
            }
        };

        tracing::debug!("[Extractor] PDF pages: {}", pages.len());

        Ok(pages.join("\n"))
    }

    /// Extract paragraph text from a Word document using docx-rs
    fn extract_word(&self, path: &Path) -> Result<String, ExtractionError> {
        let bytes = std::fs::read(path).map_err(|e| ExtractionError::io(path, e))?;

        let doc = docx_rs::read_docx(&bytes)
            .map_err(|e| ExtractionError::decode(DocumentFormat::Word, e))?;

        let paragraphs: Vec<String> = doc
            .document
            .children
            .iter()
            .filter_map(|child| match child {
                docx_rs::DocumentChild::Paragraph(para) => Some(paragraph_text(para)),
                _ => None,
            })
            .collect();

        Ok(paragraphs.join("\n"))
    }
}

/// Extract text from `path`, choosing the strategy from `extension`
/// Convenience function for one-off extraction
pub fn extract(path: &Path, extension: &str) -> Result<String, ExtractionError> {
    TextExtractor::new().extract(path, extension)
}

/// Concatenate the text runs of a paragraph, including hyperlink runs
fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut output = String::new();

    for child in &para.children {
        match child {
            docx_rs::ParagraphChild::Run(run) => push_run_text(run, &mut output),
            docx_rs::ParagraphChild::Hyperlink(link) => {
                for run in &link.children {
                    if let docx_rs::ParagraphChild::Run(r) = run {
                        push_run_text(r, &mut output);
                    }
                }
            }
            _ => {}
        }
    }

    output
}

fn push_run_text(run: &docx_rs::Run, output: &mut String) {
    for run_child in &run.children {
        if let docx_rs::RunChild::Text(text) = run_child {
            output.push_str(&text.text);
        }
    }
}

fn open_workbook_from<R>(path: &Path, format: DocumentFormat) -> Result<R, ExtractionError>
where
    R: Reader<BufReader<File>>,
    R::Error: fmt::Display,
{
    let file = File::open(path).map_err(|e| ExtractionError::io(path, e))?;
    R::new(BufReader::new(file)).map_err(|e| ExtractionError::decode(format, e))
}

/// Render every sheet as a text dump: a sheet banner, then one ` | `-joined line per row
fn dump_workbook<RS, R>(mut workbook: R) -> String
where
    RS: Read + Seek,
    R: Reader<RS>,
{
    let mut all_text = String::new();
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

    for sheet_name in &sheet_names {
        let Ok(range) = workbook.worksheet_range(sheet_name) else {
            tracing::warn!("[Extractor] Skipping unreadable sheet: {}", sheet_name);
            continue;
        };

        all_text.push_str(&format!("=== Sheet: {} ===\n", sheet_name));

        for row in range.rows() {
            let row_text: Vec<String> = row
                .iter()
                .map(|cell| cell.to_string())
                .filter(|s| !s.is_empty())
                .collect();

            if !row_text.is_empty() {
                all_text.push_str(&row_text.join(" | "));
                all_text.push('\n');
            }
        }
    }

    all_text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::spreadsheet::render_spreadsheet;
    use crate::requirements::RequirementSet;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    /// Build a single-page PDF using a standard Type1 font, with a correct xref table
    fn minimal_pdf(text: &str) -> Vec<u8> {
        let content = format!("BT /F1 24 Tf 72 700 Td ({}) Tj ET", text);
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
             /Resources << /Font << /F1 5 0 R >> >> >>"
                .to_string(),
            format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                content.len(),
                content
            ),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        ];

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }

        let xref_offset = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
        pdf.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_offset
            )
            .as_bytes(),
        );
        pdf
    }

    fn write_docx(path: &Path, paragraphs: &[&str]) {
        let mut docx = docx_rs::Docx::new();
        for text in paragraphs {
            docx = docx.add_paragraph(
                docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*text)),
            );
        }
        let file = File::create(path).unwrap();
        docx.build().pack(file).unwrap();
    }

    fn write_pptx(path: &Path, slides: &[&[&str]]) {
        use zip::write::SimpleFileOptions;

        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        // Written out of order on purpose: slide10 must sort after slide2
        for (index, shapes) in slides.iter().enumerate().rev() {
            let mut body = String::new();
            for shape in *shapes {
                body.push_str(&format!(
                    "<p:sp><p:nvSpPr><p:cNvPr id=\"2\" name=\"Shape\"/></p:nvSpPr>\
                     <p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>",
                    shape
                ));
            }
            let xml = format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                 <p:sld xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
                 xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\">\
                 <p:cSld><p:spTree>{}</p:spTree></p:cSld></p:sld>",
                body
            );
            zip.start_file(
                format!("ppt/slides/slide{}.xml", index + 1),
                SimpleFileOptions::default(),
            )
            .unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_extension("PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension(".docx"), Some(DocumentFormat::Word));
        assert_eq!(DocumentFormat::from_extension("doc"), Some(DocumentFormat::Word));
        assert_eq!(DocumentFormat::from_extension("xls"), Some(DocumentFormat::Xls));
        assert_eq!(DocumentFormat::from_extension("pptx"), Some(DocumentFormat::Pptx));
        assert_eq!(DocumentFormat::from_extension("txt"), Some(DocumentFormat::PlainText));
        assert_eq!(DocumentFormat::from_extension("exe"), None);
        assert_eq!(DocumentFormat::from_extension("ppt"), None);
        assert_eq!(
            DocumentFormat::from_path(Path::new("specs/Brief.PPTX")),
            Some(DocumentFormat::Pptx)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_plain_text_is_verbatim() {
        let mut file = NamedTempFile::with_suffix(".txt").unwrap();
        write!(file, "  Users can log in.\n\n  Users can log out.  ").unwrap();

        let text = extract(file.path(), "txt").unwrap();
        assert_eq!(text, "  Users can log in.\n\n  Users can log out.  ");
    }

    #[test]
    fn test_unsupported_extension() {
        let file = NamedTempFile::with_suffix(".exe").unwrap();

        let err = extract(file.path(), "exe").unwrap_err();
        assert!(err.is_unsupported());
        assert!(matches!(err, ExtractionError::UnsupportedFormat(ref e) if e == "exe"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = extract(&dir.path().join("missing.txt"), "txt").unwrap_err();

        assert!(!err.is_unsupported());
        match err {
            ExtractionError::Io { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound)
            }
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_utf8_is_io_error() {
        let mut file = NamedTempFile::with_suffix(".txt").unwrap();
        file.write_all(&[0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let err = extract(file.path(), "txt").unwrap_err();
        assert!(matches!(err, ExtractionError::Io { .. }));
    }

    #[test]
    fn test_pdf_extraction() {
        let mut file = NamedTempFile::with_suffix(".pdf").unwrap();
        file.write_all(&minimal_pdf("Users must log in")).unwrap();

        let text = extract(file.path(), "pdf").unwrap();
        assert!(text.contains("log in"), "unexpected PDF text: {text:?}");
    }

    #[test]
    fn test_malformed_pdf_is_decode_error() {
        let mut file = NamedTempFile::with_suffix(".pdf").unwrap();
        file.write_all(b"this is not a pdf").unwrap();

        let err = extract(file.path(), "pdf").unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Decode { format: DocumentFormat::Pdf, .. }
        ));
    }

    #[test]
    fn test_word_paragraphs_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("brief.docx");
        write_docx(&path, &["Project brief", "The portal lets users log in.", "It must be fast."]);

        let text = extract(&path, "docx").unwrap();
        assert_eq!(
            text,
            "Project brief\nThe portal lets users log in.\nIt must be fast."
        );
    }

    #[test]
    fn test_legacy_doc_routes_to_word_reader() {
        let mut file = NamedTempFile::with_suffix(".doc").unwrap();
        file.write_all(b"\xd0\xcf\x11\xe0 legacy binary").unwrap();

        let err = extract(file.path(), "doc").unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Decode { format: DocumentFormat::Word, .. }
        ));
    }

    #[test]
    fn test_xlsx_dump() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sheet.xlsx");
        let set = RequirementSet::new(vec!["Login".into()], vec!["Fast response".into()]);
        render_spreadsheet(&set, &path).unwrap();

        let text = extract(&path, "xlsx").unwrap();
        assert!(text.starts_with("=== Sheet: Requirements ===\n"));
        assert!(text.contains("Type | Requirement | Priority"));
        assert!(text.contains("Functional | Login | Should Have"));
        assert!(text.contains("Non-Functional | Fast response | Should Have"));
    }

    #[test]
    fn test_pptx_slides_then_shapes_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        let slides: Vec<&[&str]> = vec![
            &["Title slide", "Subtitle"],
            &["Second"],
            &[],
            &[],
            &[],
            &[],
            &[],
            &[],
            &[],
            &["Tenth &amp; last"],
        ];
        write_pptx(&path, &slides);

        let text = extract(&path, "pptx").unwrap();
        assert_eq!(text, "Title slide\nSubtitle\nSecond\nTenth & last");
    }

    #[test]
    fn test_every_supported_format_yields_text() {
        let dir = tempdir().unwrap();
        let set = RequirementSet::new(vec!["Login".into()], vec!["Fast response".into()]);

        for format in DocumentFormat::ALL {
            let (path, ext) = match format {
                DocumentFormat::Pdf => {
                    let path = dir.path().join("a.pdf");
                    std::fs::write(&path, minimal_pdf("Login")).unwrap();
                    (path, "pdf")
                }
                DocumentFormat::Word => {
                    let path = dir.path().join("a.docx");
                    write_docx(&path, &["Login"]);
                    (path, "docx")
                }
                DocumentFormat::Xlsx => {
                    let path = dir.path().join("a.xlsx");
                    render_spreadsheet(&set, &path).unwrap();
                    (path, "xlsx")
                }
                // Nothing in the dependency tree writes BIFF, and a hand-built OLE2
                // container is out of proportion here. `.xls` reaches the same
                // `dump_workbook` as `.xlsx`; its opener is covered by
                // `test_xls_opener_rejects_non_biff` below.
                DocumentFormat::Xls => continue,
                DocumentFormat::Pptx => {
                    let path = dir.path().join("a.pptx");
                    write_pptx(&path, &[&["Login"][..]]);
                    (path, "pptx")
                }
                DocumentFormat::PlainText => {
                    let path = dir.path().join("a.txt");
                    std::fs::write(&path, "Login").unwrap();
                    (path, "txt")
                }
            };

            let text = extract(&path, ext).unwrap();
            assert!(!text.trim().is_empty(), "{format} produced no text");
        }
    }

    #[test]
    fn test_xls_opener_rejects_non_biff() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.xls");
        let set = RequirementSet::new(vec!["Login".into()], vec!["Fast response".into()]);
        render_spreadsheet(&set, &path).unwrap();

        let err = extract(&path, "xls").unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Decode { format: DocumentFormat::Xls, .. }
        ));
    }
}
