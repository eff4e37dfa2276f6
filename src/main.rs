use std::path::Path;
use std::process::ExitCode;

use pdf_mixer::config::merged::MergedConfig;
use pdf_mixer::config::{self};
use pdf_mixer::pipeline::job_runner::{JobConfig, JobResult};
use pdf_mixer::pipeline::orchestrator::run_all_jobs;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: pdf_mixer [--json] <jobs.yaml>...");
        eprintln!("  Merge, interleave, extract, delete, rotate, reverse and split PDF pages");
        eprintln!("  according to job specifications.");
        eprintln!("  --json  print a JSON report of all jobs to stdout");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("pdf_mixer {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pdf_mixer=info")),
        )
        .init();

    let json = args.iter().any(|a| a == "--json");
    let job_files: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    if job_files.is_empty() {
        eprintln!("ERROR: No job files given");
        return ExitCode::FAILURE;
    }

    // Collect job configs from all job files.
    let mut job_configs: Vec<JobConfig> = Vec::new();
    let mut parallel_workers = 0;

    for job_file_arg in job_files {
        let job_file_path = Path::new(job_file_arg);

        // Load settings from the same directory as the job file.
        let settings = match config::load_settings_for_job(job_file_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to load settings for {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };
        parallel_workers = settings.parallel_workers;

        let job_file = match config::load_job_file(job_file_path) {
            Ok(jf) => jf,
            Err(e) => {
                eprintln!("ERROR: {e}");
                return ExitCode::FAILURE;
            }
        };

        // Resolve job file directory for relative paths.
        let job_dir = job_file_path.parent().unwrap_or_else(|| Path::new("."));

        for (index, job) in job_file.jobs.iter().enumerate() {
            let merged = MergedConfig::new(&settings, job);
            match JobConfig::from_job(job, &merged, job_dir) {
                Ok(jc) => job_configs.push(jc),
                Err(e) => {
                    eprintln!(
                        "ERROR: {job_file_arg}: job {} ({}): {e}",
                        index + 1,
                        job.operation.name()
                    );
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    // Run all jobs through the pipeline.
    let results = run_all_jobs(&job_configs, parallel_workers);

    // Report results.
    let mut has_error = false;
    let mut report: Vec<serde_json::Value> = Vec::new();
    for (i, result) in results.iter().enumerate() {
        match result {
            Ok(job_result) => {
                print_result(job_result);
                if json {
                    report.push(serde_json::to_value(job_result).unwrap_or_default());
                }
            }
            Err(e) => {
                eprintln!("ERROR: {}: {e}", job_configs[i].task.name());
                if json {
                    report.push(serde_json::json!({
                        "operation": job_configs[i].task.name(),
                        "error": e.to_string(),
                    }));
                }
                has_error = true;
            }
        }
    }

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("ERROR: Failed to serialize report: {e}");
                has_error = true;
            }
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_result(result: &JobResult) {
    if result.outputs.is_empty() {
        eprintln!("OK: {} (no output written)", result.operation);
    }
    for output in &result.outputs {
        eprintln!(
            "OK: {} -> {} ({} pages)",
            result.operation,
            output.path.display(),
            output.pages
        );
    }
    for warning in &result.warnings {
        eprintln!("WARN: {warning}");
    }
}
