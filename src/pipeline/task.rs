// Phase 9: ジョブ操作の検証済み表現
//
// Built from the YAML operation before any file is opened, so malformed
// parameters fail the job without touching the filesystem.

use crate::config::job::Operation;
use crate::convert::ImageOptions;
use crate::error::PdfMixError;
use crate::pdf::page::Rotation;
use crate::transform::InterleaveSpec;

#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    Merge,
    Interleave(InterleaveSpec),
    Extract { pages: String },
    Delete { pages: String },
    /// `pages` が `None` なら全ページ。
    Rotate {
        rotation: Rotation,
        pages: Option<String>,
    },
    Reverse,
    Split { every: usize },
    Landscape,
    Images(ImageOptions),
}

impl Task {
    /// YAMLの操作を検証してTaskにする。画像変換は `images` の設定を使う。
    pub fn from_operation(operation: &Operation, images: &ImageOptions) -> crate::error::Result<Self> {
        Ok(match operation {
            Operation::Merge => Task::Merge,
            Operation::Interleave { mode, start_from } => {
                Task::Interleave(InterleaveSpec::new(*mode, *start_from)?)
            }
            Operation::Extract { pages } => Task::Extract {
                pages: pages.clone(),
            },
            Operation::Delete { pages } => Task::Delete {
                pages: pages.clone(),
            },
            Operation::Rotate { degrees, pages } => Task::Rotate {
                rotation: Rotation::try_from(*degrees)?,
                pages: pages
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string),
            },
            Operation::Reverse => Task::Reverse,
            Operation::Split { every } => {
                let every = usize::try_from(*every)
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        PdfMixError::validation(format!(
                            "split size must be a positive number of pages, got {every}"
                        ))
                    })?;
                Task::Split { every }
            }
            Operation::Landscape => Task::Landscape,
            Operation::Images { .. } => {
                images.validate()?;
                Task::Images(images.clone())
            }
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Task::Merge => "merge",
            Task::Interleave(_) => "interleave",
            Task::Extract { .. } => "extract",
            Task::Delete { .. } => "delete",
            Task::Rotate { .. } => "rotate",
            Task::Reverse => "reverse",
            Task::Split { .. } => "split",
            Task::Landscape => "landscape",
            Task::Images(_) => "images",
        }
    }

    /// 受け付ける入力数の範囲（最小, 最大）。`None` は上限なし。
    pub fn input_arity(&self) -> (usize, Option<usize>) {
        match self {
            Task::Merge | Task::Images(_) => (1, None),
            Task::Interleave(spec) => (spec.mode().required_inputs(), Some(2)),
            _ => (1, Some(1)),
        }
    }

    /// 入力数がこの操作で受け付けられるか検査する。
    pub fn check_inputs(&self, count: usize) -> crate::error::Result<()> {
        let (min, max) = self.input_arity();
        let too_many = max.is_some_and(|max| count > max);
        if count < min || too_many {
            let expected = match max {
                Some(max) if max == min => format!("{min}"),
                Some(max) => format!("{min}-{max}"),
                None => format!("at least {min}"),
            };
            return Err(PdfMixError::validation(format!(
                "{} expects {expected} input(s), got {count}",
                self.name()
            )));
        }
        Ok(())
    }

    /// 出力が複数ファイル（ディレクトリ）になる操作か。
    pub fn writes_directory(&self) -> bool {
        matches!(self, Task::Split { .. })
    }
}
