// Phase 10: 全ジョブ実行

use rayon::prelude::*;
use tracing::warn;

use crate::pipeline::job_runner::{JobConfig, JobResult, run_job};

/// Run multiple jobs, collecting results in job order.
/// One job failure does NOT prevent other jobs from running.
///
/// `parallel_workers` は同時に実行するジョブ数。0はCPU数、1は逐次実行。
pub fn run_all_jobs(
    jobs: &[JobConfig],
    parallel_workers: usize,
) -> Vec<crate::error::Result<JobResult>> {
    if parallel_workers == 1 || jobs.len() <= 1 {
        return jobs.iter().map(run_job).collect();
    }

    match rayon::ThreadPoolBuilder::new()
        .num_threads(parallel_workers)
        .build()
    {
        Ok(pool) => pool.install(|| jobs.par_iter().map(run_job).collect()),
        Err(e) => {
            warn!(error = %e, "cannot build job thread pool, running jobs sequentially");
            jobs.iter().map(run_job).collect()
        }
    }
}
