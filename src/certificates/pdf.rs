//! Text overlay onto the first page of a PDF template.
//!
//! The template's own content is wrapped in `q`/`Q` so whatever graphics
//! state it leaves behind cannot leak into the overlay, then one extra
//! content stream with the text runs is appended to the page.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::fonts::{encode_win_ansi, StandardFont};
use super::layout::CertificateLayout;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Template PDF not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Template PDF has no pages")]
    NoPages,

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Could not write {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },
}

/// One piece of text placed at an absolute page position
#[derive(Debug, Clone)]
pub struct TextRun {
    pub text: String,
    pub font: StandardFont,
    pub size: f64,
    pub x: f64,
    pub y: f64,
    pub rgb: [f64; 3],
}

/// Lay out every configured field that has a non-empty value in `data`
pub fn layout_runs(layout: &CertificateLayout, data: &BTreeMap<&str, String>) -> Vec<TextRun> {
    layout
        .fields
        .iter()
        .filter_map(|(field, style)| {
            let text = data.get(field.as_str()).filter(|t| !t.is_empty())?;
            let font = style.font(&layout.font_family);
            Some(TextRun {
                text: text.clone(),
                font,
                size: style.font_size,
                x: style.start_x(text, font),
                y: style.y,
                rgb: style.rgb(),
            })
        })
        .collect()
}

/// Render `runs` onto the template's first page and save to `output_path`
pub fn fill_certificate(
    template_path: &Path,
    runs: &[TextRun],
    output_path: &Path,
) -> Result<(), PdfError> {
    if !template_path.exists() {
        return Err(PdfError::TemplateNotFound(template_path.to_path_buf()));
    }

    let mut doc = Document::load(template_path)?;
    let page_id = *doc.get_pages().values().next().ok_or(PdfError::NoPages)?;

    overlay_page(&mut doc, page_id, runs)?;

    doc.save(output_path).map_err(|e| PdfError::Write {
        path: output_path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(())
}

pub fn overlay_page(doc: &mut Document, page_id: ObjectId, runs: &[TextRun]) -> Result<(), PdfError> {
    let mut resources = effective_resources(doc, page_id)?;

    let mut fonts = match resources.get(b"Font") {
        Ok(Object::Reference(id)) => doc.get_object(*id)?.as_dict()?.clone(),
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    let used: BTreeSet<StandardFont> = runs.iter().map(|r| r.font).collect();
    for font in used {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), Object::Reference(font_id));
    }
    resources.set("Font", Object::Dictionary(fonts));

    let mut contents = vec![Object::Reference(
        doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec())),
    )];
    contents.extend(existing_contents(doc, page_id)?);
    contents.push(Object::Reference(
        doc.add_object(Stream::new(Dictionary::new(), b"Q\n".to_vec())),
    ));
    let overlay = Content { operations: text_operations(runs) }.encode()?;
    contents.push(Object::Reference(doc.add_object(Stream::new(Dictionary::new(), overlay))));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Contents", Object::Array(contents));
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Resources dictionary in effect for a page, following `/Parent` for
/// inherited resources
fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, PdfError> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let node = doc.get_object(id)?.as_dict()?;
        if let Ok(resources) = node.get(b"Resources") {
            return Ok(match resources {
                Object::Reference(rid) => doc.get_object(*rid)?.as_dict()?.clone(),
                Object::Dictionary(dict) => dict.clone(),
                _ => Dictionary::new(),
            });
        }
        current = node.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    Ok(Dictionary::new())
}

fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, PdfError> {
    let page = doc.get_object(page_id)?.as_dict()?;
    Ok(match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id)? {
            Object::Array(items) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    })
}

fn text_operations(runs: &[TextRun]) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(runs.len() * 6);
    for run in runs {
        let [r, g, b] = run.rgb;
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![
                Object::Name(run.font.resource_name().as_bytes().to_vec()),
                Object::Real(run.size as f32),
            ],
        ));
        ops.push(Operation::new(
            "rg",
            vec![Object::Real(r as f32), Object::Real(g as f32), Object::Real(b as f32)],
        ));
        ops.push(Operation::new(
            "Td",
            vec![Object::Real(run.x as f32), Object::Real(run.y as f32)],
        ));
        ops.push(Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(&run.text))]));
        ops.push(Operation::new("ET", vec![]));
    }
    ops
}
