use std::path::Path;

use serde::Deserialize;

use crate::convert::ImageOptions;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 出力前にNO-METADATAサニタイズを行うか。
    pub sanitize: bool,
    /// 出力前に未圧縮ストリームの圧縮と孤立オブジェクトの除去を行うか。
    pub compress: bool,
    /// 同時に実行するジョブ数。0はCPU数に合わせる。
    pub parallel_workers: usize,
    /// 読み込めない入力をスキップして続行するか。
    pub skip_unreadable: bool,
    /// 画像変換の既定値。
    pub images: ImageOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            sanitize: true,
            compress: true,
            parallel_workers: 0,
            skip_unreadable: false,
            images: ImageOptions::default(),
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::PdfMixError::config(format!("Failed to parse settings YAML: {e}"))
        })
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
