//! Mock 诊断客户端（用于测试，无需网络）

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::audit::{AuditCheck, AuditClient, AuditReport};
use crate::core::AuditError;

/// 返回预设结果，并记录调用次数
pub struct MockAuditClient {
    result: Mutex<Result<AuditReport, AuditError>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockAuditClient {
    pub fn with_report(report: AuditReport) -> Self {
        Self {
            result: Mutex::new(Ok(report)),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// 指定分数，附带一条失败检查与一条满分检查
    pub fn with_score(score: f64) -> Self {
        Self::with_report(AuditReport {
            score,
            checks: vec![
                AuditCheck {
                    title: "Document does not have a meta description".to_string(),
                    description: "Meta descriptions may be included in search results.".to_string(),
                    score: 0.0,
                },
                AuditCheck {
                    title: "Page has successful HTTP status code".to_string(),
                    description: String::new(),
                    score: 1.0,
                },
            ],
        })
    }

    pub fn failing(err: AuditError) -> Self {
        Self {
            result: Mutex::new(Err(err)),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// 每次调用前等待，模拟慢速上游
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 替换后续调用的结果
    pub fn set_result(&self, result: Result<AuditReport, AuditError>) {
        if let Ok(mut guard) = self.result.lock() {
            *guard = result;
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditClient for MockAuditClient {
    async fn audit(&self, _url: &str) -> Result<AuditReport, AuditError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.result.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => Err(AuditError::Network("mock poisoned".to_string())),
        }
    }
}
