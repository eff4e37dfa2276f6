// Phase 11: 常駐ワーカー
//
// A background thread that receives jobs over a channel and reports each
// one back as an event, for callers (such as a GUI front-end) that must not
// block while a job runs. Jobs are processed one at a time in submission
// order.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::debug;

use crate::error::PdfMixError;
use crate::pipeline::job_runner::{JobConfig, JobResult, run_job};

/// ワーカーからの通知。`id` は `submit` が返した番号。
#[derive(Debug)]
pub enum JobEvent {
    Started { id: u64 },
    Finished { id: u64, result: JobResult },
    Failed { id: u64, error: PdfMixError },
}

impl JobEvent {
    pub fn id(&self) -> u64 {
        match self {
            JobEvent::Started { id } | JobEvent::Finished { id, .. } | JobEvent::Failed { id, .. } => {
                *id
            }
        }
    }
}

pub struct JobWorker {
    jobs: Option<Sender<(u64, JobConfig)>>,
    events: Receiver<JobEvent>,
    handle: Option<JoinHandle<()>>,
    next_id: u64,
}

impl JobWorker {
    pub fn spawn() -> Self {
        let (job_tx, job_rx) = unbounded::<(u64, JobConfig)>();
        let (event_tx, event_rx) = unbounded::<JobEvent>();

        let handle = thread::spawn(move || {
            for (id, config) in job_rx {
                if event_tx.send(JobEvent::Started { id }).is_err() {
                    break;
                }
                let event = match run_job(&config) {
                    Ok(result) => JobEvent::Finished { id, result },
                    Err(error) => JobEvent::Failed { id, error },
                };
                if event_tx.send(event).is_err() {
                    break;
                }
            }
            debug!("job worker stopped");
        });

        Self {
            jobs: Some(job_tx),
            events: event_rx,
            handle: Some(handle),
            next_id: 0,
        }
    }

    /// ジョブを投入して番号を返す。ワーカーが停止済みならエラー。
    pub fn submit(&mut self, config: JobConfig) -> crate::error::Result<u64> {
        let id = self.next_id;
        let sender = self
            .jobs
            .as_ref()
            .ok_or_else(|| PdfMixError::config("job worker is shut down"))?;
        sender
            .send((id, config))
            .map_err(|_| PdfMixError::config("job worker is not running"))?;
        self.next_id += 1;
        Ok(id)
    }

    /// 通知の受信側。
    pub fn events(&self) -> &Receiver<JobEvent> {
        &self.events
    }

    /// 新規投入を締め切り、投入済みのジョブが終わるまで待つ。
    pub fn shutdown(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("job worker thread panicked");
        }
    }
}

impl Drop for JobWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
