use serde::Deserialize;

use crate::transform::InterleaveMode;

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    /// 入力ファイル（またはディレクトリ）。`input: a.pdf` の単数形も受け付ける。
    #[serde(alias = "input", deserialize_with = "deserialize_one_or_many")]
    pub inputs: Vec<String>,
    pub output: Option<String>,
    /// split の出力先ディレクトリ。
    pub output_dir: Option<String>,
    #[serde(flatten)]
    pub operation: Operation,
    pub sanitize: Option<bool>,
    pub compress: Option<bool>,
    pub skip_unreadable: Option<bool>,
}

/// ジョブが行う操作。YAMLでは `operation:` キーで選ぶ。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    Merge,
    Interleave {
        mode: InterleaveMode,
        #[serde(default = "default_start_from")]
        start_from: u32,
    },
    /// `pages` は範囲文字列。`pages: 5` のような単一ページの整数も受け付ける。
    Extract {
        #[serde(deserialize_with = "deserialize_page_spec")]
        pages: String,
    },
    Delete {
        #[serde(deserialize_with = "deserialize_page_spec")]
        pages: String,
    },
    Rotate {
        degrees: i64,
        /// 省略または空文字列なら全ページ。
        #[serde(default, deserialize_with = "deserialize_optional_page_spec")]
        pages: Option<String>,
    },
    Reverse,
    Split {
        every: i64,
    },
    Landscape,
    Images {
        page_size: Option<String>,
        margin_mm: Option<f64>,
        keep_aspect: Option<bool>,
        center: Option<bool>,
        dpi: Option<u32>,
        sort_by_name: Option<bool>,
        jpeg_quality: Option<u8>,
    },
}

impl Operation {
    /// 操作名（ログ・既定の出力名用）。
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Merge => "merge",
            Operation::Interleave { .. } => "interleave",
            Operation::Extract { .. } => "extract",
            Operation::Delete { .. } => "delete",
            Operation::Rotate { .. } => "rotate",
            Operation::Reverse => "reverse",
            Operation::Split { .. } => "split",
            Operation::Landscape => "landscape",
            Operation::Images { .. } => "images",
        }
    }
}

fn default_start_from() -> u32 {
    1
}

/// 文字列1つ、または文字列のリストを受け付けるデシリアライザ
fn deserialize_one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageSpec {
    Text(String),
    Number(i64),
}

impl From<PageSpec> for String {
    fn from(spec: PageSpec) -> Self {
        match spec {
            PageSpec::Text(s) => s,
            PageSpec::Number(n) => n.to_string(),
        }
    }
}

/// ページ範囲文字列、または単一ページの整数を受け付けるデシリアライザ
fn deserialize_page_spec<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(PageSpec::deserialize(deserializer)?.into())
}

fn deserialize_optional_page_spec<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<PageSpec>::deserialize(deserializer)?.map(String::from))
}
