use std::path::{Path, PathBuf};

use lopdf::Document;
use tracing::debug;

use crate::error::PdfMixError;
use crate::pdf::page::PageStream;

pub struct PdfReader {
    label: String,
    doc: Document,
}

impl PdfReader {
    /// PDFファイルを開いてPdfReaderを作成する。
    ///
    /// ファイルは読み込み時に全てメモリへ展開され、ハンドルはこの関数の中で閉じられる。
    pub fn open(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        let doc = Document::load(path).map_err(|e| {
            PdfMixError::input(format!("cannot open {}: {e}", path.display()))
        })?;
        let reader = Self {
            label: path.display().to_string(),
            doc,
        };
        debug!(path = %path.display(), pages = reader.page_count(), "loaded PDF");
        Ok(reader)
    }

    /// メモリ上のPDFバイト列からPdfReaderを作成する。
    pub fn from_bytes(label: impl Into<String>, bytes: &[u8]) -> crate::error::Result<Self> {
        let label = label.into();
        let doc = Document::load_mem(bytes)
            .map_err(|e| PdfMixError::input(format!("cannot parse {label}: {e}")))?;
        Ok(Self { label, doc })
    }

    /// 内部のlopdf Documentへの参照を返す。
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// ページ数を返す。
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// 全ページをPageStreamに変換する。
    pub fn into_page_stream(self) -> PageStream {
        PageStream::from_document(self.label, self.doc)
    }
}

/// 入力パスを展開する。ディレクトリは直下の `*.pdf` をファイル名順に並べたものに置き換える。
pub fn expand_pdf_inputs(paths: &[PathBuf]) -> crate::error::Result<Vec<PathBuf>> {
    let mut expanded = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
                .map_err(|e| {
                    PdfMixError::input(format!("cannot list directory {}: {e}", path.display()))
                })?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && has_pdf_extension(p))
                .collect();
            entries.sort_by_key(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().to_lowercase())
                    .unwrap_or_default()
            });
            expanded.extend(entries);
        } else {
            expanded.push(path.clone());
        }
    }

    Ok(expanded)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
