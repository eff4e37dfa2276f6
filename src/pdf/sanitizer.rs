// Phase 5: NO-METADATA サニタイザ
//
// Rebuilds a page stream into a fresh document that carries pages only:
// no /Info, no catalog /Metadata, and no per-object /Metadata, /PieceInfo
// or /LastModified entries. The pass is best-effort; when the rebuild fails
// the input pages are handed back untouched together with a degradation
// note, so the caller can still write its output.

use lopdf::{Document, Object};
use tracing::{debug, warn};

use crate::error::Warning;
use crate::pdf::page::PageStream;
use crate::pdf::writer::PdfPageWriter;

const SANITIZED_LABEL: &str = "sanitized";

/// サニタイズ結果の報告。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    /// コピー時に落としたメタデータエントリの数。
    pub stripped_entries: usize,
    /// 完全には除去できなかった理由。空なら劣化なし。
    pub degradations: Vec<String>,
}

impl SanitizeReport {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.degradations
            .iter()
            .map(|d| Warning::sanitize_degradation(d.clone()))
            .collect()
    }
}

pub struct Sanitized {
    pub stream: PageStream,
    pub report: SanitizeReport,
}

/// ページ内容のみを持つ新しいPageStreamへ書き直す。失敗しても元のページを返す。
pub fn sanitize(stream: &PageStream) -> Sanitized {
    let mut writer = PdfPageWriter::with_metadata_stripping();
    if let Err(e) = writer.write_pages(stream) {
        warn!(error = %e, "sanitize failed, keeping pages with their metadata");
        return Sanitized {
            stream: stream.clone(),
            report: SanitizeReport {
                stripped_entries: 0,
                degradations: vec![format!("rebuild failed: {e}")],
            },
        };
    }

    let stripped_entries = writer.stripped_entries();
    let doc = writer.into_document();

    let mut degradations = Vec::new();
    let residual = residual_metadata_streams(&doc);
    if residual > 0 {
        degradations.push(format!(
            "{residual} XMP metadata stream(s) left in the rebuilt document"
        ));
    }

    let sanitized = PageStream::from_document(SANITIZED_LABEL, doc);
    if sanitized.len() != stream.len() {
        warn!(
            expected = stream.len(),
            actual = sanitized.len(),
            "sanitized page count mismatch, keeping original pages"
        );
        return Sanitized {
            stream: stream.clone(),
            report: SanitizeReport {
                stripped_entries: 0,
                degradations: vec![format!(
                    "rebuilt document has {} pages instead of {}",
                    sanitized.len(),
                    stream.len()
                )],
            },
        };
    }

    debug!(
        pages = sanitized.len(),
        stripped_entries, residual, "sanitized page stream"
    );
    Sanitized {
        stream: sanitized,
        report: SanitizeReport {
            stripped_entries,
            degradations,
        },
    }
}

/// 文書レベルのメタデータ（`/Info`、Catalogの `/Metadata`）が残っているかを返す。
pub fn has_document_metadata(doc: &Document) -> bool {
    if doc.trailer.has(b"Info") {
        return true;
    }
    doc.catalog()
        .map(|catalog| catalog.has(b"Metadata"))
        .unwrap_or(false)
}

/// `/Type /Metadata` または `/Subtype /XML` のストリーム数を数える。
pub fn residual_metadata_streams(doc: &Document) -> usize {
    doc.objects
        .values()
        .filter(|object| {
            let Object::Stream(stream) = object else {
                return false;
            };
            let is_name = |key: &[u8], expected: &[u8]| {
                stream
                    .dict
                    .get(key)
                    .and_then(Object::as_name)
                    .is_ok_and(|name| name == expected)
            };
            is_name(b"Type", b"Metadata") || is_name(b"Subtype", b"XML")
        })
        .count()
}
