//! 单个完整报告任务

use crate::audit::AuditClient;
use crate::flow::prompts;
use crate::lead::AnalysisStatus;
use crate::llm::{LlmClient, Message};
use crate::store::LeadStore;

/// 一个待生成的完整报告
#[derive(Debug, Clone, PartialEq)]
pub struct ReportJob {
    pub lead_id: String,
    pub url: String,
    pub name: String,
}

/// 执行一个报告任务；错误只记日志并写入 FAILED，不向调用方抛出
///
/// 返回本次写入的终态；线索不在 PENDING（已开始或已结束）时返回 None 且不做任何事。
pub async fn run_final_report(
    store: &LeadStore,
    audit: &dyn AuditClient,
    llm: &dyn LlmClient,
    job: &ReportJob,
    threshold: f64,
) -> Option<AnalysisStatus> {
    let lead_id = job.lead_id.as_str();

    match store.begin_analysis(lead_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(lead_id, "report already started or finished, skipping");
            return None;
        }
        Err(e) => {
            tracing::error!(lead_id, error = %e, "could not mark report as processing");
            return None;
        }
    }
    tracing::info!(lead_id, url = %job.url, "final report started");

    let (status, text) = match audit.audit(&job.url).await {
        Err(e) => {
            tracing::warn!(lead_id, error = %e, "final report audit failed");
            (AnalysisStatus::Failed, e.user_message())
        }
        Ok(report) => {
            let failing = report.failing_checks(threshold);
            let instruction = prompts::final_report(&job.name, &job.url, report.score, &failing);
            match llm
                .complete(&[
                    Message::system(instruction),
                    Message::user(prompts::FINAL_REPORT_REQUEST),
                ])
                .await
            {
                Ok(text) => (AnalysisStatus::Done, text),
                Err(e) => {
                    tracing::warn!(lead_id, error = %e, "final report generation failed");
                    (AnalysisStatus::Failed, format!("Erro ao gerar o relatório: {}", e))
                }
            }
        }
    };

    match store.finish_analysis(lead_id, status, &text).await {
        Ok(true) => {
            tracing::info!(lead_id, status = status.as_str(), "final report finished");
            Some(status)
        }
        Ok(false) => {
            tracing::warn!(lead_id, "report left PROCESSING elsewhere, result dropped");
            None
        }
        Err(e) => {
            tracing::error!(lead_id, error = %e, "could not persist final report");
            None
        }
    }
}
