//! Word document emitter (docx-rs)

use super::EmitError;
use crate::requirements::{RequirementCategory, RequirementSet};
use docx_rs::{
    AbstractNumbering, Docx, IndentLevel, Level, LevelJc, LevelText, NumberFormat, Numbering,
    NumberingId, Paragraph, Run, SpecialIndentType, Start, Style, StyleType,
};
use std::fs::File;
use std::path::Path;

pub const DOCUMENT_TITLE: &str = "Extracted Software Requirements";

const TITLE_STYLE: &str = "Heading1";
const SECTION_STYLE: &str = "Heading2";
const BULLET_NUMBERING: usize = 1;

/// Build the requirements document: title, then one bulleted section per category
pub fn build_document(set: &RequirementSet) -> Docx {
    let mut docx = Docx::new()
        .add_style(
            Style::new(TITLE_STYLE, StyleType::Paragraph)
                .name("Heading 1")
                .size(32)
                .bold(),
        )
        .add_style(
            Style::new(SECTION_STYLE, StyleType::Paragraph)
                .name("Heading 2")
                .size(26)
                .bold(),
        )
        .add_abstract_numbering(
            AbstractNumbering::new(BULLET_NUMBERING).add_level(
                Level::new(
                    0,
                    Start::new(1),
                    NumberFormat::new("bullet"),
                    LevelText::new("•"),
                    LevelJc::new("left"),
                )
                .indent(Some(720), Some(SpecialIndentType::Hanging(360)), None, None),
            ),
        )
        .add_numbering(Numbering::new(BULLET_NUMBERING, BULLET_NUMBERING))
        .add_paragraph(heading(DOCUMENT_TITLE, TITLE_STYLE));

    for category in RequirementCategory::ALL {
        docx = docx.add_paragraph(heading(category.heading(), SECTION_STYLE));

        for requirement in set.get(category) {
            docx = docx.add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text(requirement.as_str()))
                    .numbering(NumberingId::new(BULLET_NUMBERING), IndentLevel::new(0)),
            );
        }
    }

    docx
}

/// Write the requirements document to `path`, replacing any existing file
pub fn render_document(set: &RequirementSet, path: &Path) -> Result<(), EmitError> {
    let file = File::create(path).map_err(|source| EmitError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    build_document(set)
        .build()
        .pack(file)
        .map_err(|e| EmitError::Document {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    tracing::debug!(
        "[Emitter] Document: {} requirements -> {}",
        set.len(),
        path.display()
    );

    Ok(())
}

fn heading(text: &str, style: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text)).style(style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::extract;
    use std::io::Read;
    use tempfile::tempdir;

    fn document_xml(path: &Path) -> String {
        let file = File::open(path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn test_sections_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("requirements.docx");
        let set = RequirementSet::new(
            vec!["Login".into(), "Logout".into()],
            vec!["Fast response".into()],
        );

        render_document(&set, &path).unwrap();

        let text = extract(&path, "docx").unwrap();
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec![
                DOCUMENT_TITLE,
                "Functional Requirements",
                "Login",
                "Logout",
                "Non-Functional Requirements",
                "Fast response",
            ]
        );
    }

    #[test]
    fn test_requirements_are_bulleted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("requirements.docx");
        let set = RequirementSet::new(
            vec!["Login".into(), "Logout".into()],
            vec!["Fast response".into()],
        );

        render_document(&set, &path).unwrap();

        let xml = document_xml(&path);
        assert_eq!(xml.matches("<w:numPr>").count(), 3);
        assert_eq!(xml.matches("Heading2").count(), 2);
        assert_eq!(xml.matches("Heading1").count(), 1);
    }
}
