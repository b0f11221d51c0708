//! Slide deck text extraction
//!
//! A .pptx file is a zip container with one `ppt/slides/slideN.xml` part per slide.
//! Text lives in `<a:t>` runs inside `<a:p>` paragraphs of `<p:sp>` shapes.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Read, Seek};
use zip::ZipArchive;

/// Concatenate the text of every text-bearing shape, slide by slide
pub(super) fn extract_slide_text<R: Read + Seek>(reader: R) -> Result<String, String> {
    let mut archive =
        ZipArchive::new(reader).map_err(|e| format!("Not a valid pptx container: {}", e))?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    slides.sort_by_key(|(n, _)| *n);

    if slides.is_empty() {
        return Err("No slides found in presentation".to_string());
    }

    let mut shapes = Vec::new();
    for (_, name) in &slides {
        let mut xml = String::new();
        archive
            .by_name(name)
            .map_err(|e| format!("Failed to open {}: {}", name, e))?
            .read_to_string(&mut xml)
            .map_err(|e| format!("Failed to read {}: {}", name, e))?;

        shapes.extend(shape_texts(&xml).map_err(|e| format!("{}: {}", name, e))?);
    }

    tracing::debug!(
        "[Extractor] PPTX: {} slides, {} text shapes",
        slides.len(),
        shapes.len()
    );

    Ok(shapes.join("\n"))
}

/// `ppt/slides/slide12.xml` -> 12
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Text of each shape in document order; a shape's paragraphs are newline-joined
fn shape_texts(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);

    let mut shapes = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_shape = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"p:sp" => {
                    in_shape = true;
                    paragraphs.clear();
                }
                b"a:p" if in_shape => current.clear(),
                b"a:t" if in_shape => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if in_shape && e.name().as_ref() == b"a:br" => {
                current.push('\n');
            }
            Ok(Event::Text(e)) if in_text => {
                let text = e.unescape().map_err(|e| e.to_string())?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"a:t" => in_text = false,
                b"a:p" if in_shape => paragraphs.push(std::mem::take(&mut current)),
                b"p:sp" => {
                    in_shape = false;
                    let text = paragraphs.join("\n");
                    if !text.trim().is_empty() {
                        shapes.push(text);
                    }
                    paragraphs.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "Malformed slide XML at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
    }

    Ok(shapes)
}
