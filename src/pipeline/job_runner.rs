// Phase 10: ジョブ単位: 入力読込 -> ページ変換 -> サニタイズ -> 出力PDF組立

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::job::Job;
use crate::config::merged::MergedConfig;
use crate::convert::ImageConverter;
use crate::error::{PdfMixError, Warning};
use crate::pdf::optimizer;
use crate::pdf::page::PageStream;
use crate::pdf::reader::{PdfReader, expand_pdf_inputs};
use crate::pdf::sanitizer::sanitize;
use crate::pdf::writer::{assemble, save_document};
use crate::pipeline::task::Task;
use crate::range::PageSelection;
use crate::transform::{self, RotateTarget};

/// 出力先。splitはディレクトリに `<stem>_part_<start>-<end>.pdf` を並べる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutput {
    File(PathBuf),
    Directory { dir: PathBuf, stem: String },
}

/// Configuration for a single job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub inputs: Vec<PathBuf>,
    pub output: JobOutput,
    pub task: Task,
    pub sanitize: bool,
    pub compress: bool,
    pub skip_unreadable: bool,
}

/// 書き出した1ファイルの情報。
#[derive(Debug, Clone, Serialize)]
pub struct OutputFile {
    pub path: PathBuf,
    pub pages: usize,
    /// 出力ページ内容のSHA-256。
    pub digest: String,
}

/// Result of processing a single job.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub operation: &'static str,
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<OutputFile>,
    pub warnings: Vec<Warning>,
}

impl JobConfig {
    /// YAMLのジョブと設定からJobConfigを作る。相対パスはジョブファイルのディレクトリ基準。
    ///
    /// 操作パラメータと入力数はここで検証し、ファイルには触れない。
    pub fn from_job(job: &Job, merged: &MergedConfig, job_dir: &Path) -> crate::error::Result<Self> {
        let task = Task::from_operation(&job.operation, &merged.images)?;
        if job.inputs.is_empty() {
            return Err(PdfMixError::validation(format!(
                "{} job has no inputs",
                task.name()
            )));
        }
        let inputs: Vec<PathBuf> = job
            .inputs
            .iter()
            .map(|input| resolve_path(job_dir, input))
            .collect();
        // ディレクトリ入力は展開後に数が変わるため、ここではファイル指定のみ検査する
        if inputs.iter().all(|p| !p.is_dir()) {
            task.check_inputs(inputs.len())?;
        }

        let output = if task.writes_directory() {
            let dir = job
                .output_dir
                .as_deref()
                .or(job.output.as_deref())
                .map(|d| resolve_path(job_dir, d))
                .unwrap_or_else(|| job_dir.to_path_buf());
            JobOutput::Directory {
                dir,
                stem: file_stem(&inputs[0]),
            }
        } else {
            let name = match &job.output {
                Some(output) => output.clone(),
                None => default_output_name(&task, &inputs[0]),
            };
            JobOutput::File(resolve_path(job_dir, &name))
        };

        Ok(JobConfig {
            inputs,
            output,
            task,
            sanitize: merged.sanitize,
            compress: merged.compress,
            skip_unreadable: merged.skip_unreadable,
        })
    }
}

/// Run a single job.
///
/// 入力の読込 → 変換 → （サニタイズ）→ 組立 → （最適化）→ 書き出し。
/// 範囲外のページ指定などは警告として結果に残し、処理は続ける。
pub fn run_job(config: &JobConfig) -> crate::error::Result<JobResult> {
    info!(
        operation = config.task.name(),
        inputs = config.inputs.len(),
        "running job"
    );
    let mut warnings = Vec::new();

    let streams = load_inputs(config, &mut warnings)?;
    let outputs = apply_task(config, &streams, &mut warnings)?;

    let mut written = Vec::new();
    for (path, stream) in outputs {
        if let Some(file) = write_output(config, &path, &stream, &mut warnings)? {
            written.push(file);
        }
    }

    for warning in &warnings {
        warn!(operation = config.task.name(), "{warning}");
    }
    info!(
        operation = config.task.name(),
        outputs = written.len(),
        warnings = warnings.len(),
        "job finished"
    );

    Ok(JobResult {
        operation: config.task.name(),
        inputs: config.inputs.clone(),
        outputs: written,
        warnings,
    })
}

/// 入力をPageStreamに読み込む。画像ジョブは1本のストリームに変換する。
fn load_inputs(
    config: &JobConfig,
    warnings: &mut Vec<Warning>,
) -> crate::error::Result<Vec<PageStream>> {
    if let Task::Images(options) = &config.task {
        let converter = ImageConverter::new(options.clone())?;
        return Ok(vec![converter.convert_all(&config.inputs)?]);
    }

    let paths = expand_pdf_inputs(&config.inputs)?;
    let mut streams = Vec::with_capacity(paths.len());
    for path in paths {
        match PdfReader::open(&path) {
            Ok(reader) => streams.push(reader.into_page_stream()),
            Err(e) if config.skip_unreadable => {
                warnings.push(Warning::SkippedInput {
                    path,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    config.task.check_inputs(streams.len())?;
    Ok(streams)
}

/// 変換を適用し、（出力パス, ページ列）の組を返す。
fn apply_task(
    config: &JobConfig,
    streams: &[PageStream],
    warnings: &mut Vec<Warning>,
) -> crate::error::Result<Vec<(PathBuf, PageStream)>> {
    let stream = match &config.task {
        Task::Merge => transform::merge(streams)?,
        Task::Interleave(spec) => transform::interleave_streams(streams, spec)?,
        Task::Extract { pages } => {
            let selection = select(&streams[0], pages, warnings);
            transform::extract(&streams[0], selection.ordered())
        }
        Task::Delete { pages } => {
            let selection = select(&streams[0], pages, warnings);
            transform::delete(&streams[0], &selection.to_set())
        }
        Task::Rotate { rotation, pages } => {
            let target = match pages {
                Some(pages) => RotateTarget::Pages(select(&streams[0], pages, warnings).to_set()),
                None => RotateTarget::All,
            };
            transform::rotate(&streams[0], &target, *rotation)
        }
        Task::Reverse => transform::reverse(&streams[0]),
        Task::Landscape => transform::auto_landscape(&streams[0]),
        Task::Images(_) => streams[0].clone(),
        Task::Split { every } => {
            let JobOutput::Directory { dir, stem } = &config.output else {
                return Err(PdfMixError::validation("split requires an output directory"));
            };
            let source = &streams[0];
            let chunks = transform::split(source, *every)?;
            let bounds = transform::chunk_bounds(source.len(), *every);
            return Ok(chunks
                .into_iter()
                .zip(bounds)
                .map(|(chunk, (start, end))| {
                    (dir.join(format!("{stem}_part_{start}-{end}.pdf")), chunk)
                })
                .collect());
        }
    };

    match &config.output {
        JobOutput::File(path) => Ok(vec![(path.clone(), stream)]),
        JobOutput::Directory { .. } => Err(PdfMixError::validation(format!(
            "{} writes a single file, not a directory",
            config.task.name()
        ))),
    }
}

fn select(source: &PageStream, pages: &str, warnings: &mut Vec<Warning>) -> PageSelection {
    let selection = PageSelection::parse(pages, source.page_count());
    if let Some(detail) = selection.shortfall() {
        warnings.push(Warning::partial_selection(format!("'{pages}': {detail}")));
    }
    selection
}

/// 1ファイルを書き出す。ページが無ければ書かずに警告を残す。
fn write_output(
    config: &JobConfig,
    path: &Path,
    stream: &PageStream,
    warnings: &mut Vec<Warning>,
) -> crate::error::Result<Option<OutputFile>> {
    if stream.is_empty() {
        warnings.push(Warning::partial_selection(format!(
            "no pages left for {}, nothing written",
            path.display()
        )));
        return Ok(None);
    }

    let stream = if config.sanitize {
        let sanitized = sanitize(stream);
        warnings.extend(sanitized.report.warnings());
        sanitized.stream
    } else {
        stream.clone()
    };

    let mut doc = assemble(&stream)?;
    if config.compress {
        optimizer::optimize(&mut doc);
    }
    let bytes = save_document(&mut doc)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;

    let digest = stream.digest().unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "cannot fingerprint output pages");
        String::new()
    });
    info!(path = %path.display(), pages = stream.len(), "wrote output");

    Ok(Some(OutputFile {
        path: path.to_path_buf(),
        pages: stream.len(),
        digest,
    }))
}

/// 出力名が省略されたときの既定名。
fn default_output_name(task: &Task, first_input: &Path) -> String {
    let stem = file_stem(first_input);
    match task {
        Task::Merge => "merged.pdf".to_string(),
        Task::Interleave(_) => "interleaved.pdf".to_string(),
        Task::Images(_) => "images.pdf".to_string(),
        Task::Extract { .. } => format!("extract_{stem}.pdf"),
        Task::Delete { .. } => format!("deleted_{stem}.pdf"),
        Task::Rotate { .. } => format!("rotated_{stem}.pdf"),
        Task::Reverse => format!("reversed_{stem}.pdf"),
        Task::Landscape => format!("landscape_{stem}.pdf"),
        Task::Split { .. } => stem,
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

/// Resolve a potentially relative path against a base directory.
/// If the path is already absolute, return it as-is.
pub fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}
