// Phase 3: 交互結合テスト

use lopdf::{Document, Object, Stream, dictionary};
use pdf_mixer::pdf::page::PageStream;
use pdf_mixer::transform::{InterleaveMode, InterleaveSpec, interleave, interleave_streams};

fn build_pdf(label: &str, count: u32) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for i in 1..=count {
        let content = format!("BT ({label}{i}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => i64::from(count),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn stream(label: &str, count: u32) -> PageStream {
    PageStream::from_document(label, build_pdf(label, count))
}

fn labels(stream: &PageStream) -> Vec<String> {
    stream
        .iter()
        .map(|page| {
            let content = page.content().expect("page content");
            let text = String::from_utf8_lossy(&content).into_owned();
            let start = text.find('(').expect("label start") + 1;
            let end = text.find(')').expect("label end");
            text[start..end].to_string()
        })
        .collect()
}

fn spec(mode: InterleaveMode, start_from: u32) -> InterleaveSpec {
    InterleaveSpec::new(mode, start_from).expect("valid spec")
}

// ============================================================
// 1. alternate
// ============================================================

#[test]
fn test_alternate_appends_longer_tail() {
    let out = interleave(&stream("a", 3), &stream("b", 2), &InterleaveSpec::default());
    assert_eq!(labels(&out), ["a1", "b1", "a2", "b2", "a3"]);
}

#[test]
fn test_alternate_b_longer() {
    let out = interleave(&stream("a", 1), &stream("b", 3), &InterleaveSpec::default());
    assert_eq!(labels(&out), ["a1", "b1", "b2", "b3"]);
}

#[test]
fn test_alternate_consumes_every_page() {
    let (a, b) = (stream("a", 4), stream("b", 7));
    let out = interleave(&a, &b, &InterleaveSpec::default());
    assert_eq!(out.len(), a.len() + b.len());
}

#[test]
fn test_alternate_start_from_skips_leading_pages() {
    let out = interleave(
        &stream("a", 3),
        &stream("b", 3),
        &spec(InterleaveMode::Alternate, 2),
    );
    assert_eq!(labels(&out), ["a2", "b2", "a3", "b3"]);
}

#[test]
fn test_alternate_with_empty_b() {
    let out = interleave(&stream("a", 2), &PageStream::default(), &InterleaveSpec::default());
    assert_eq!(labels(&out), ["a1", "a2"]);
}

// ============================================================
// 2. parity modes
// ============================================================

#[test]
fn test_a_odd_b_even_takes_by_position() {
    let out = interleave(
        &stream("a", 4),
        &stream("b", 4),
        &spec(InterleaveMode::AOddBEven, 1),
    );
    assert_eq!(labels(&out), ["a1", "b2", "a3", "b4"]);
}

#[test]
fn test_a_even_b_odd_takes_by_position() {
    let out = interleave(
        &stream("a", 4),
        &stream("b", 4),
        &spec(InterleaveMode::AEvenBOdd, 1),
    );
    assert_eq!(labels(&out), ["b1", "a2", "b3", "a4"]);
}

#[test]
fn test_a_odd_b_even_unequal_lengths() {
    let out = interleave(
        &stream("a", 5),
        &stream("b", 2),
        &spec(InterleaveMode::AOddBEven, 1),
    );
    assert_eq!(labels(&out), ["a1", "b2", "a3", "a5"]);
}

#[test]
fn test_parity_uses_absolute_position_with_offset() {
    let out = interleave(
        &stream("a", 4),
        &stream("b", 4),
        &spec(InterleaveMode::AOddBEven, 2),
    );
    assert_eq!(labels(&out), ["b2", "a3", "b4"]);
}

#[test]
fn test_a_odd_single_source() {
    let out = interleave(
        &stream("a", 5),
        &PageStream::default(),
        &spec(InterleaveMode::AOdd, 1),
    );
    assert_eq!(labels(&out), ["a1", "a3", "a5"]);
}

#[test]
fn test_b_even_single_source() {
    let out = interleave(
        &stream("a", 5),
        &stream("b", 5),
        &spec(InterleaveMode::BEven, 1),
    );
    assert_eq!(labels(&out), ["b2", "b4"]);
}

// ============================================================
// 3. 検証
// ============================================================

#[test]
fn test_start_from_zero_is_rejected() {
    assert!(InterleaveSpec::new(InterleaveMode::Alternate, 0).is_err());
}

#[test]
fn test_interleave_streams_requires_two_inputs() {
    let result = interleave_streams(&[stream("a", 2)], &InterleaveSpec::default());
    assert!(result.is_err(), "alternate with one input should fail");
}

#[test]
fn test_interleave_streams_rejects_no_inputs() {
    assert!(interleave_streams(&[], &spec(InterleaveMode::AOdd, 1)).is_err());
}

#[test]
fn test_interleave_streams_rejects_three_inputs() {
    let inputs = [stream("a", 1), stream("b", 1), stream("c", 1)];
    assert!(interleave_streams(&inputs, &InterleaveSpec::default()).is_err());
}

#[test]
fn test_interleave_streams_a_odd_with_single_input() {
    let out = interleave_streams(&[stream("a", 3)], &spec(InterleaveMode::AOdd, 1))
        .expect("single input is enough for a_odd");
    assert_eq!(labels(&out), ["a1", "a3"]);
}

#[test]
fn test_mode_deserializes_from_snake_case() {
    let mode: InterleaveMode = serde_yml::from_str("a_odd_b_even").expect("parse mode");
    assert_eq!(mode, InterleaveMode::AOddBEven);
    let mode: InterleaveMode = serde_yml::from_str("alternating").expect("parse alias");
    assert_eq!(mode, InterleaveMode::Alternate);
}
