//! 销售通知：预算收集完成后把线索推给销售系统
//!
//! 尽力而为：失败只记日志，不影响对话流程。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::SalesSection;
use crate::lead::Lead;

/// 预算阶段的收尾信息
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BudgetInfo {
    /// 访客给出预算的那条消息
    pub last_message: String,
    /// 去掉结束标记后的机器人回复
    pub closing_reply: String,
}

#[derive(Serialize)]
struct SalesPayload<'a> {
    lead_info: &'a Lead,
    budget_info: &'a BudgetInfo,
}

/// 销售通知能力
#[async_trait]
pub trait SalesNotifier: Send + Sync {
    async fn notify(&self, lead: &Lead, budget: &BudgetInfo);
}

/// POST `{lead_info, budget_info}` 到配置的 Webhook
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SalesNotifier for WebhookNotifier {
    async fn notify(&self, lead: &Lead, budget: &BudgetInfo) {
        let payload = SalesPayload {
            lead_info: lead,
            budget_info: budget,
        };
        match self.client.post(&self.url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(lead_id = %lead.id, "sales webhook delivered");
            }
            Ok(resp) => {
                tracing::warn!(lead_id = %lead.id, status = resp.status().as_u16(), "sales webhook rejected");
            }
            Err(e) => {
                tracing::warn!(lead_id = %lead.id, error = %e, "sales webhook failed");
            }
        }
    }
}

/// 未配置 Webhook 时使用
pub struct DisabledNotifier;

#[async_trait]
impl SalesNotifier for DisabledNotifier {
    async fn notify(&self, lead: &Lead, _budget: &BudgetInfo) {
        tracing::debug!(lead_id = %lead.id, "sales webhook not configured, skipping");
    }
}

pub fn create_notifier(cfg: &SalesSection) -> Arc<dyn SalesNotifier> {
    match cfg.webhook_url.as_deref().filter(|u| !u.is_empty()) {
        Some(url) => Arc::new(WebhookNotifier::new(url, Duration::from_secs(cfg.timeout_secs))),
        None => Arc::new(DisabledNotifier),
    }
}
