//! 报告任务队列与执行器
//!
//! 有界 mpsc 通道承载任务，Semaphore 限制同时执行的任务数；
//! 在途集合保证同一线索同时最多一个任务。

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::config::PipelineSection;
use crate::core::StoreError;
use crate::store::LeadStore;

use super::job::{run_final_report, ReportJob};
use super::ReportClients;

type InFlight = Arc<Mutex<HashSet<String>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Queued,
    /// 同一线索已有任务在排队或执行
    AlreadyQueued,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("Report queue is full")]
    Full,

    #[error("Report worker has stopped")]
    Closed,
}

/// 任务提交端，可在多个请求之间克隆共享
#[derive(Clone)]
pub struct ReportQueue {
    tx: mpsc::Sender<ReportJob>,
    in_flight: InFlight,
}

/// 任务接收端，交给 [`ReportWorker::run`]
pub struct ReportReceiver {
    rx: mpsc::Receiver<ReportJob>,
    in_flight: InFlight,
}

impl ReportQueue {
    pub fn new(capacity: usize) -> (Self, ReportReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let in_flight: InFlight = Arc::new(Mutex::new(HashSet::new()));
        (
            Self {
                tx,
                in_flight: in_flight.clone(),
            },
            ReportReceiver { rx, in_flight },
        )
    }

    /// 提交任务，不等待执行
    pub fn enqueue(&self, job: ReportJob) -> Result<Enqueued, EnqueueError> {
        let lead_id = job.lead_id.clone();
        {
            let mut in_flight = self.in_flight.lock().map_err(|_| EnqueueError::Closed)?;
            if !in_flight.insert(lead_id.clone()) {
                return Ok(Enqueued::AlreadyQueued);
            }
        }

        match self.tx.try_send(job) {
            Ok(()) => {
                tracing::info!(lead_id = %lead_id, "report job queued");
                Ok(Enqueued::Queued)
            }
            Err(e) => {
                release(&self.in_flight, &lead_id);
                match e {
                    mpsc::error::TrySendError::Full(_) => Err(EnqueueError::Full),
                    mpsc::error::TrySendError::Closed(_) => Err(EnqueueError::Closed),
                }
            }
        }
    }

    /// 启动时重新提交上次没有完成的报告；队列满时剩余线索保持 PENDING
    pub async fn requeue_unfinished(&self, store: &LeadStore) -> Result<usize, StoreError> {
        let mut queued = 0;
        for lead in store.unfinished_reports().await? {
            let job = ReportJob {
                lead_id: lead.id.clone(),
                url: lead.url_analyzed.clone(),
                name: lead.name.clone().unwrap_or_default(),
            };
            match self.enqueue(job) {
                Ok(Enqueued::Queued) => queued += 1,
                Ok(Enqueued::AlreadyQueued) => {}
                Err(e) => {
                    tracing::warn!(lead_id = %lead.id, error = %e, "unfinished report not requeued");
                    break;
                }
            }
        }
        if queued > 0 {
            tracing::info!(count = queued, "unfinished reports requeued");
        }
        Ok(queued)
    }

    pub fn is_in_flight(&self, lead_id: &str) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.contains(lead_id))
            .unwrap_or(false)
    }
}

fn release(in_flight: &InFlight, lead_id: &str) {
    if let Ok(mut set) = in_flight.lock() {
        set.remove(lead_id);
    }
}

/// 后台执行器
pub struct ReportWorker {
    store: LeadStore,
    clients: Arc<dyn ReportClients>,
    max_concurrent: usize,
    threshold: f64,
}

impl ReportWorker {
    pub fn new(
        store: LeadStore,
        clients: Arc<dyn ReportClients>,
        cfg: &PipelineSection,
        threshold: f64,
    ) -> Self {
        Self {
            store,
            clients,
            max_concurrent: cfg.workers.max(1),
            threshold,
        }
    }

    /// 取任务执行，直到通道关闭或收到关闭信号；退出前等待在途任务结束
    pub async fn run(self, receiver: ReportReceiver, shutdown: CancellationToken) {
        let ReportReceiver { mut rx, in_flight } = receiver;
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        tracing::info!(workers = self.max_concurrent, "report worker started");

        loop {
            let job = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                job = rx.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let store = self.store.clone();
            let audit = self.clients.audit();
            let llm = self.clients.llm();
            let in_flight = in_flight.clone();
            let threshold = self.threshold;

            tokio::spawn(async move {
                let _permit = permit;
                run_final_report(&store, audit.as_ref(), llm.as_ref(), &job, threshold).await;
                release(&in_flight, &job.lead_id);
            });
        }

        rx.close();
        // 还在缓冲里的任务不再执行：线索保持 PENDING，下次启动时重新提交
        while let Ok(job) = rx.try_recv() {
            tracing::warn!(lead_id = %job.lead_id, "report job dropped at shutdown, left PENDING");
            release(&in_flight, &job.lead_id);
        }
        let workers = u32::try_from(self.max_concurrent).unwrap_or(u32::MAX);
        let _ = semaphore.acquire_many(workers).await;
        tracing::info!("report worker stopped");
    }
}
