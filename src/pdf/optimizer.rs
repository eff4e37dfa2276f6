// Phase 6: FlateDecode圧縮、孤立オブジェクト除去

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Document, Object, ObjectId};

/// ドキュメント内の未圧縮ストリームにFlateDecode圧縮を適用する。
///
/// 既にフィルターが設定されているストリームはスキップする（二重圧縮防止）。
/// 圧縮しても小さくならないストリームはそのまま残す。
pub fn compress_streams(doc: &mut Document) {
    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();

    for id in ids {
        let Some(Object::Stream(stream)) = doc.objects.get_mut(&id) else {
            continue;
        };
        // Skip streams that already have a filter
        if stream.dict.get(b"Filter").is_ok() || stream.content.is_empty() {
            continue;
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        if encoder.write_all(&stream.content).is_err() {
            continue;
        }
        let Ok(compressed) = encoder.finish() else {
            continue;
        };
        if compressed.len() >= stream.content.len() {
            continue;
        }

        stream.dict.set("Filter", "FlateDecode");
        stream.set_content(compressed);
    }
}

/// 孤立オブジェクト（どこからも参照されていないオブジェクト）を除去する。
pub fn delete_unused_objects(doc: &mut Document) {
    doc.prune_objects();
}

/// 出力前の最適化パスを順序通りに実行する。
///
/// 1. 未圧縮ストリームを圧縮
/// 2. 孤立オブジェクトを除去
pub fn optimize(doc: &mut Document) {
    compress_streams(doc);
    delete_unused_objects(doc);
}
