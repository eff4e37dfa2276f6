pub mod image;

use std::path::Path;

use crate::pdf::page::PageStream;

/// PDF以外の入力をPageStreamに変換するアダプタ。
///
/// `output_dir` は中間ファイルを書き出す必要がある実装のための作業ディレクトリ。
/// オフィス文書の変換はこのトレイトの外部実装として提供する。
pub trait Converter {
    fn convert(&self, input: &Path, output_dir: &Path) -> crate::error::Result<PageStream>;
}

pub use self::image::{ImageConverter, ImageOptions, PageSize};
