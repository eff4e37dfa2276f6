use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfMixError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Input error: {0}")]
    InputError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("PDF write error: {0}")]
    PdfWriteError(String),

    #[error("Conversion error: {0}")]
    ConvertError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`PdfMixError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl PdfMixError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create an input error (unreadable or malformed source).
    input => InputError,
    /// Create a validation error (structurally invalid parameters).
    validation => ValidationError,
    /// Create a PDF write error.
    pdf_write => PdfWriteError,
    /// Create a conversion error.
    convert => ConvertError,
}

impl From<image::ImageError> for PdfMixError {
    fn from(e: image::ImageError) -> Self {
        Self::ConvertError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PdfMixError>;

/// 処理を止めない異常。結果に添付して呼び出し側へ報告する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// ページ指定が空、または範囲外のトークンを含んでいた。
    PartialSelection { detail: String },
    /// メタデータ除去が完全には行えなかった（ページ自体は出力済み）。
    SanitizeDegradation { detail: String },
    /// 読み込めなかった入力をスキップした。
    SkippedInput { path: PathBuf, reason: String },
}

impl Warning {
    pub fn partial_selection(detail: impl Into<String>) -> Self {
        Self::PartialSelection {
            detail: detail.into(),
        }
    }

    pub fn sanitize_degradation(detail: impl Into<String>) -> Self {
        Self::SanitizeDegradation {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::PartialSelection { detail } => write!(f, "partial selection: {detail}"),
            Warning::SanitizeDegradation { detail } => {
                write!(f, "metadata not fully stripped: {detail}")
            }
            Warning::SkippedInput { path, reason } => {
                write!(f, "skipped {}: {reason}", path.display())
            }
        }
    }
}
