pub mod job;
pub mod merged;
pub mod settings;

use settings::Settings;
use std::path::Path;

use job::JobFile;

/// ジョブファイルのパスからsettings.yamlを自動検出して読み込む。
///
/// ジョブファイルと同じディレクトリに `settings.yaml` が存在すれば読み込み、
/// 存在しなければデフォルト設定を返す。
pub fn load_settings_for_job(job_file_path: &Path) -> crate::error::Result<Settings> {
    let dir = job_file_path
        .parent()
        .ok_or_else(|| crate::error::PdfMixError::config("Cannot determine job file directory"))?;

    let settings_path = dir.join("settings.yaml");

    if settings_path.exists() {
        Settings::from_file(&settings_path)
    } else {
        Ok(Settings::default())
    }
}

/// ジョブファイルを読み込んでパースする。
pub fn load_job_file(job_file_path: &Path) -> crate::error::Result<JobFile> {
    let content = std::fs::read_to_string(job_file_path).map_err(|e| {
        crate::error::PdfMixError::config(format!(
            "Failed to read job file {}: {e}",
            job_file_path.display()
        ))
    })?;
    serde_yml::from_str(&content).map_err(|e| {
        crate::error::PdfMixError::config(format!(
            "Failed to parse job file {}: {e}",
            job_file_path.display()
        ))
    })
}
