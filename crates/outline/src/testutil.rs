//! Fixture PDFs built with `lopdf` for the shell tests.

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// One line of fixture text: content, font size, bold.
pub type Line<'a> = (&'a str, i64, bool);

/// A one-page US Letter PDF with each line set on its own baseline, top down.
pub fn pdf_bytes(lines: &[Line]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => bold_id, "F2" => regular_id },
    });

    let mut operations = vec![Operation::new("BT", vec![])];
    let mut y: i64 = 740;
    for (text, size, bold) in lines {
        let font = if *bold { "F1" } else { "F2" };
        operations.push(Operation::new("Tf", vec![font.into(), (*size).into()]));
        operations.push(Operation::new(
            "Tm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                72.into(),
                y.into(),
            ],
        ));
        operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
        y -= size * 3;
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// A short report: a bold title, two bold section headings and body text.
pub fn report_lines() -> Vec<Line<'static>> {
    vec![
        ("Annual Report", 24, true),
        ("Introduction", 16, true),
        ("The company had a steady year with growth in every region", 11, false),
        ("Results", 16, true),
        ("Revenue grew while costs stayed flat across the whole period", 11, false),
    ]
}

pub fn write_pdf(dir: &Path, name: &str, lines: &[Line]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, pdf_bytes(lines)).unwrap();
    path
}
