// Phase 5: NO-METADATA サニタイザテスト

use std::sync::Arc;

use lopdf::{Document, Object, Stream, dictionary};
use pdf_mixer::pdf::page::{Page, PageStream, Rotation, SourceDocument};
use pdf_mixer::pdf::sanitizer::{has_document_metadata, residual_metadata_streams, sanitize};
use pdf_mixer::pdf::writer::{assemble, save_document};
use pdf_mixer::transform::{RotateTarget, rotate};

const XMP: &[u8] = b"<?xpacket begin=''?><x:xmpmeta xmlns:x='adobe:ns:meta/'/><?xpacket end='w'?>";

/// 文書情報・XMP・ページ単位のメタデータを全て持つ2ページのPDF。
fn build_pdf_with_metadata() -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let page_xmp_id = doc.add_object(Stream::new(
        dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
        XMP.to_vec(),
    ));

    let mut kids = Vec::new();
    for i in 1..=2 {
        let content = format!("BT (m{i}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Metadata" => page_xmp_id,
            "PieceInfo" => dictionary! {
                "Editor" => dictionary! { "Private" => "secret" },
            },
            "LastModified" => Object::string_literal("D:20240101000000Z"),
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => 2,
        }),
    );

    let doc_xmp_id = doc.add_object(Stream::new(
        dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
        XMP.to_vec(),
    ));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "Metadata" => doc_xmp_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Author" => Object::string_literal("Jane Doe"),
        "Producer" => Object::string_literal("Scanner 3000"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc
}

fn reload(stream: &PageStream) -> Document {
    let mut doc = assemble(stream).expect("assemble");
    let bytes = save_document(&mut doc).expect("save");
    Document::load_mem(&bytes).expect("reload")
}

// ============================================================
// 1. メタデータ除去
// ============================================================

#[test]
fn test_source_fixture_has_metadata() {
    let doc = build_pdf_with_metadata();
    assert!(has_document_metadata(&doc));
    assert_eq!(residual_metadata_streams(&doc), 2);
}

#[test]
fn test_sanitize_removes_document_metadata() {
    let source = PageStream::from_document("meta", build_pdf_with_metadata());
    let sanitized = sanitize(&source);

    assert!(!sanitized.report.is_degraded(), "{:?}", sanitized.report);
    let doc = reload(&sanitized.stream);
    assert!(!has_document_metadata(&doc));
    assert_eq!(residual_metadata_streams(&doc), 0);
}

#[test]
fn test_sanitize_strips_page_level_entries() {
    let source = PageStream::from_document("meta", build_pdf_with_metadata());
    let sanitized = sanitize(&source);
    // 2ページ × (Metadata, PieceInfo, LastModified)
    assert_eq!(sanitized.report.stripped_entries, 6);

    let doc = reload(&sanitized.stream);
    for page_id in doc.get_pages().values() {
        let page = doc.get_dictionary(*page_id).expect("page");
        assert!(!page.has(b"Metadata"));
        assert!(!page.has(b"PieceInfo"));
        assert!(!page.has(b"LastModified"));
    }
}

#[test]
fn test_sanitize_keeps_page_content_and_rotation() {
    let source = PageStream::from_document("meta", build_pdf_with_metadata());
    let pages = [2].into_iter().collect();
    let rotated = rotate(&source, &RotateTarget::Pages(pages), Rotation::Deg180);

    let sanitized = sanitize(&rotated);
    assert_eq!(sanitized.stream.len(), 2);
    assert_eq!(
        sanitized.stream.content_fingerprint().expect("fingerprint"),
        rotated.content_fingerprint().expect("fingerprint")
    );
    let rotations: Vec<u16> = sanitized.stream.iter().map(|p| p.rotation()).collect();
    assert_eq!(rotations, vec![0, 180]);
}

#[test]
fn test_sanitize_without_metadata_adds_none() {
    let mut doc = build_pdf_with_metadata();
    doc.trailer.remove(b"Info");
    let source = PageStream::from_document("plain", doc);
    let sanitized = sanitize(&source);
    assert!(!has_document_metadata(&reload(&sanitized.stream)));
}

// ============================================================
// 2. 冪等性
// ============================================================

#[test]
fn test_sanitize_is_idempotent() {
    let source = PageStream::from_document("meta", build_pdf_with_metadata());
    let once = sanitize(&source);
    let twice = sanitize(&once.stream);

    assert_eq!(
        once.stream.content_fingerprint().expect("fingerprint"),
        twice.stream.content_fingerprint().expect("fingerprint")
    );
    assert_eq!(twice.report.stripped_entries, 0);
    assert!(!twice.report.is_degraded());

    let mut first = assemble(&once.stream).expect("assemble");
    let mut second = assemble(&twice.stream).expect("assemble");
    assert_eq!(
        save_document(&mut first).expect("save"),
        save_document(&mut second).expect("save")
    );
}

// ============================================================
// 3. 劣化（処理は止めない）
// ============================================================

#[test]
fn test_sanitize_reports_metadata_reachable_from_resources() {
    let mut doc = build_pdf_with_metadata();
    let stray_xmp = doc.add_object(Stream::new(
        dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
        XMP.to_vec(),
    ));
    let first_page = *doc.get_pages().get(&1).expect("page 1");
    if let Ok(Object::Dictionary(page)) = doc.get_object_mut(first_page) {
        page.set(
            "Resources",
            dictionary! { "XObject" => dictionary! { "X1" => stray_xmp } },
        );
    }

    let source = PageStream::from_document("stray", doc);
    let sanitized = sanitize(&source);
    assert!(sanitized.report.is_degraded());
    assert_eq!(sanitized.report.warnings().len(), 1);
    assert_eq!(
        sanitized.report.degradations,
        ["1 XMP metadata stream(s) left in the rebuilt document".to_string()]
    );
    // ページは出力される
    assert_eq!(sanitized.stream.len(), 2);
}

#[test]
fn test_sanitize_keeps_original_pages_when_rebuild_fails() {
    let mut doc = build_pdf_with_metadata();
    let first_page = *doc.get_pages().get(&1).expect("page 1");
    let not_a_page = doc.add_object(Object::Integer(7));

    let source = Arc::new(SourceDocument::new("broken", doc));
    let stream = PageStream::new(vec![
        Page::new(Arc::clone(&source), first_page, 1, 90),
        Page::new(Arc::clone(&source), not_a_page, 2, 0),
    ]);

    let sanitized = sanitize(&stream);
    assert!(sanitized.report.is_degraded());
    assert_eq!(sanitized.report.stripped_entries, 0);
    assert_eq!(sanitized.report.degradations.len(), 1);
    assert!(
        sanitized.report.degradations[0].starts_with("rebuild failed:"),
        "got {:?}",
        sanitized.report.degradations
    );
    // 元のページがそのまま（同じ文書・同じ回転で）返る
    assert_eq!(sanitized.stream, stream);
    assert!(Arc::ptr_eq(sanitized.stream.pages()[0].source(), &source));
    assert_eq!(sanitized.stream.pages()[0].rotation(), 90);
}

#[test]
fn test_sanitize_empty_stream() {
    let sanitized = sanitize(&PageStream::default());
    assert!(sanitized.stream.is_empty());
    assert!(!sanitized.report.is_degraded());
}
