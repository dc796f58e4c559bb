//! 后台完整报告流水线
//!
//! 采集接口把任务放进 [`ReportQueue`] 后立即返回；[`ReportWorker`] 按配置的并发数取任务执行。
//! 每个任务自带诊断与生成客户端，存储只通过连接池按操作取连接，不与请求路径共享连接。
//!
//! 防重复：队列按线索记录在途任务，任务本身只在 PENDING → PROCESSING 成功时才开始。

pub mod job;
pub mod queue;

use std::sync::Arc;

use crate::audit::{AuditClient, PageSpeedClient};
use crate::config::{AuditSection, LlmSection};
use crate::llm::{create_llm_from_config, LlmClient};

pub use job::{run_final_report, ReportJob};
pub use queue::{EnqueueError, Enqueued, ReportQueue, ReportReceiver, ReportWorker};

/// 为每个任务提供外部服务客户端
pub trait ReportClients: Send + Sync {
    fn audit(&self) -> Arc<dyn AuditClient>;
    fn llm(&self) -> Arc<dyn LlmClient>;
}

/// 每次都按配置新建客户端，任务之间互不共享
pub struct ConfiguredClients {
    audit: AuditSection,
    llm: LlmSection,
}

impl ConfiguredClients {
    pub fn new(audit: AuditSection, llm: LlmSection) -> Self {
        Self { audit, llm }
    }
}

impl ReportClients for ConfiguredClients {
    fn audit(&self) -> Arc<dyn AuditClient> {
        Arc::new(PageSpeedClient::new(&self.audit))
    }

    fn llm(&self) -> Arc<dyn LlmClient> {
        create_llm_from_config(&self.llm)
    }
}

/// 固定客户端（测试与 Mock 模式使用）
pub struct FixedClients {
    audit: Arc<dyn AuditClient>,
    llm: Arc<dyn LlmClient>,
}

impl FixedClients {
    pub fn new(audit: Arc<dyn AuditClient>, llm: Arc<dyn LlmClient>) -> Self {
        Self { audit, llm }
    }
}

impl ReportClients for FixedClients {
    fn audit(&self) -> Arc<dyn AuditClient> {
        self.audit.clone()
    }

    fn llm(&self) -> Arc<dyn LlmClient> {
        self.llm.clone()
    }
}
