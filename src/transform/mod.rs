// Phase 3: ページ変換エンジン
//
// Pure functions over PageStreams. Inputs are borrowed and never modified;
// every operation returns a new stream. Only structurally impossible
// requests fail; out-of-range selections simply select fewer pages.

pub mod interleave;

use std::collections::BTreeSet;

use crate::error::PdfMixError;
use crate::pdf::page::{PageStream, Rotation};

pub use interleave::{InterleaveMode, InterleaveSpec, interleave, interleave_streams};

/// 回転対象のページ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotateTarget {
    All,
    Pages(BTreeSet<u32>),
}

impl RotateTarget {
    fn contains(&self, position: u32) -> bool {
        match self {
            RotateTarget::All => true,
            RotateTarget::Pages(pages) => pages.contains(&position),
        }
    }
}

/// 全ストリームのページをリスト順に連結する。回転はそのまま保持する。
pub fn merge(streams: &[PageStream]) -> crate::error::Result<PageStream> {
    if streams.is_empty() {
        return Err(PdfMixError::validation("No documents to merge"));
    }
    Ok(streams
        .iter()
        .flat_map(|stream| stream.iter().cloned())
        .collect())
}

/// 指定順（1-based）のページを抜き出す。範囲外の番号は無視する。
pub fn extract(source: &PageStream, order: &[u32]) -> PageStream {
    order
        .iter()
        .filter_map(|&position| source.get(position).cloned())
        .collect()
}

/// 指定集合に含まれないページを元の順で残す。
pub fn delete(source: &PageStream, pages: &BTreeSet<u32>) -> PageStream {
    positioned(source)
        .filter(|(position, _)| !pages.contains(position))
        .map(|(_, page)| page.clone())
        .collect()
}

/// 対象ページの回転に `rotation` を加える（360で剰余）。対象外はそのまま。
pub fn rotate(source: &PageStream, target: &RotateTarget, rotation: Rotation) -> PageStream {
    positioned(source)
        .map(|(position, page)| {
            if target.contains(position) {
                page.rotated(rotation)
            } else {
                page.clone()
            }
        })
        .collect()
}

/// ページを逆順に並べる。
pub fn reverse(source: &PageStream) -> PageStream {
    source.iter().rev().cloned().collect()
}

/// 最大 `pages_per_chunk` ページずつの連続したチャンクに分割する。
///
/// `pages_per_chunk == 0` はエラー。空のストリームは空のリストになる。
pub fn split(source: &PageStream, pages_per_chunk: usize) -> crate::error::Result<Vec<PageStream>> {
    if pages_per_chunk == 0 {
        return Err(PdfMixError::validation(
            "split size must be a positive number of pages",
        ));
    }
    Ok(source
        .pages()
        .chunks(pages_per_chunk)
        .map(|chunk| PageStream::new(chunk.to_vec()))
        .collect())
}

/// 表示上縦長のページを90°回転して横長に揃える。
pub fn auto_landscape(source: &PageStream) -> PageStream {
    source
        .iter()
        .map(|page| {
            if page.is_portrait() {
                page.rotated(Rotation::Deg90)
            } else {
                page.clone()
            }
        })
        .collect()
}

/// 分割チャンクの元文書でのページ範囲（1-based、両端含む）を返す。
pub fn chunk_bounds(total: usize, pages_per_chunk: usize) -> Vec<(usize, usize)> {
    if pages_per_chunk == 0 {
        return Vec::new();
    }
    (0..total)
        .step_by(pages_per_chunk)
        .map(|start| (start + 1, (start + pages_per_chunk).min(total)))
        .collect()
}

/// ページと1-basedの位置の組を列挙する。
fn positioned(source: &PageStream) -> impl Iterator<Item = (u32, &crate::pdf::page::Page)> {
    (1u32..).zip(source.iter())
}
