//! 线索对话状态机
//!
//! 每轮对话：读线索 → 按状态分派 → （可能）调用诊断与文本生成 → 一个事务写回。
//! 外部调用都放在事务之前完成，生成失败时不留下任何半截写入，访客可以原样重试。
//!
//! 同一线索的多轮对话通过按线索的异步锁串行执行，对话记录的顺序即到达顺序。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::audit::AuditClient;
use crate::core::FlowError;
use crate::lead::{looks_like_url, normalize_url, ChatEntry, ContactField, Lead, LeadStatus};
use crate::llm::{LlmClient, Message};
use crate::notify::{BudgetInfo, SalesNotifier};
use crate::store::LeadStore;

use super::marker::{split_report, strip_budget_marker};
use super::prompts;
use super::state::{closing_text, first_missing_field, missing_fields, reannounce, recover_stage};

const ASK_FOR_URL: &str = "Olá! Para começar, preciso que você **cole a URL completa** do seu site (ex: `https://seusite.com.br`) para eu poder analisar.";

/// 一轮对话的回复；访客尚未给出 URL 时没有 lead_id
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub message: String,
    pub lead_id: Option<String>,
}

impl TurnReply {
    fn new(message: impl Into<String>, lead_id: &str) -> Self {
        Self {
            message: message.into(),
            lead_id: Some(lead_id.to_string()),
        }
    }
}

pub struct LeadFlow {
    store: LeadStore,
    audit: Arc<dyn AuditClient>,
    llm: Arc<dyn LlmClient>,
    notifier: Arc<dyn SalesNotifier>,
    bait_threshold: f64,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LeadFlow {
    pub fn new(
        store: LeadStore,
        audit: Arc<dyn AuditClient>,
        llm: Arc<dyn LlmClient>,
        notifier: Arc<dyn SalesNotifier>,
        bait_threshold: f64,
    ) -> Self {
        Self {
            store,
            audit,
            llm,
            notifier,
            bait_threshold,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &LeadStore {
        &self.store
    }

    /// 处理一条访客消息
    pub async fn handle_turn(
        &self,
        message: &str,
        lead_id: Option<&str>,
    ) -> Result<TurnReply, FlowError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(FlowError::InvalidInput("A mensagem não pode ser vazia.".to_string()));
        }

        let lead_id = match lead_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => return self.start_lead(message).await,
        };

        let lock = self.lead_lock(lead_id);
        let result = {
            let _guard = lock.lock().await;
            self.continue_lead(lead_id, message).await
        };
        drop(lock);
        self.release_lock(lead_id);
        result
    }

    fn lead_lock(&self, lead_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        match self.locks.lock() {
            Ok(mut locks) => locks.entry(lead_id.to_string()).or_default().clone(),
            // 锁表中毒时退化为不串行
            Err(_) => Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    fn release_lock(&self, lead_id: &str) {
        if let Ok(mut locks) = self.locks.lock() {
            if locks.get(lead_id).is_some_and(|l| Arc::strong_count(l) == 1) {
                locks.remove(lead_id);
            }
        }
    }

    /// 没有 lead_id：只有像 URL 的消息才建线索
    async fn start_lead(&self, message: &str) -> Result<TurnReply, FlowError> {
        if !looks_like_url(message) {
            tracing::info!("new visitor without URL, asking for one");
            return Ok(TurnReply {
                message: ASK_FOR_URL.to_string(),
                lead_id: None,
            });
        }

        let url = normalize_url(message);
        let lead = self.store.create_lead(&url, &ChatEntry::user(message)).await?;
        tracing::info!(lead_id = %lead.id, url = %url, "lead created");

        self.first_audit(&lead.id, &url).await
    }

    /// CollectingUrl → CollectingData / AuditError
    async fn first_audit(&self, lead_id: &str, url: &str) -> Result<TurnReply, FlowError> {
        match self.audit.audit(url).await {
            Ok(report) => {
                let reply = format!(
                    "🚀 Análise rápida concluída! Seu score de SEO mobile é **{:.0}/100**. Detectei algumas falhas que podemos corrigir.\n\n{}",
                    report.score,
                    ContactField::Name.question()
                );
                let mut turn = self.store.begin_turn(lead_id).await?;
                turn.set_score(report.score).await?;
                turn.set_status(&LeadStatus::CollectingData).await?;
                turn.append_entry(&ChatEntry::bot(&reply)).await?;
                turn.commit().await?;
                tracing::info!(lead_id, score = report.score, status = %LeadStatus::CollectingData, "first audit done");
                Ok(TurnReply::new(reply, lead_id))
            }
            Err(e) => {
                let reply = e.user_message();
                let mut turn = self.store.begin_turn(lead_id).await?;
                turn.set_status(&LeadStatus::AuditError).await?;
                turn.append_entry(&ChatEntry::bot(&reply)).await?;
                turn.commit().await?;
                tracing::warn!(lead_id, error = %e, status = %LeadStatus::AuditError, "first audit failed");
                Ok(TurnReply::new(reply, lead_id))
            }
        }
    }

    async fn continue_lead(&self, lead_id: &str, message: &str) -> Result<TurnReply, FlowError> {
        let lead = self
            .store
            .get(lead_id)
            .await?
            .ok_or_else(|| FlowError::LeadNotFound(lead_id.to_string()))?;
        tracing::info!(lead_id, status = %lead.status, "turn received");

        match lead.status.clone() {
            LeadStatus::CollectingUrl => {
                // 首次诊断被中断：补记这条消息后重做
                self.store.append_entry(lead_id, &ChatEntry::user(message)).await?;
                self.first_audit(lead_id, &lead.url_analyzed).await
            }
            LeadStatus::CollectingData | LeadStatus::GeneratingBait => {
                self.collect_data(lead, message).await
            }
            LeadStatus::BaitDelivered | LeadStatus::CollectingBudget => {
                self.negotiate_budget(lead, message).await
            }
            LeadStatus::BudgetCollected | LeadStatus::AuditError => {
                self.closed(&lead, message).await
            }
            LeadStatus::Unknown(label) => {
                tracing::warn!(lead_id, status = %label, "unknown status, re-deriving stage");
                self.self_heal(&lead, message).await
            }
        }
    }

    /// 逐个收集联系方式；最后一个字段写入后生成诱饵报告
    async fn collect_data(&self, mut lead: Lead, message: &str) -> Result<TurnReply, FlowError> {
        let lead_id = lead.id.clone();

        let Some(field) = first_missing_field(&lead) else {
            // 字段已齐（生成中断后的重入）
            let mut turn = self.store.begin_turn(&lead_id).await?;
            turn.append_entry(&ChatEntry::user(message)).await?;
            turn.set_status(&LeadStatus::GeneratingBait).await?;
            turn.commit().await?;
            return self.deliver_bait(lead).await;
        };

        lead.fill_contact(field, message);
        let missing = missing_fields(&lead);

        if missing.is_empty() {
            let mut turn = self.store.begin_turn(&lead_id).await?;
            turn.append_entry(&ChatEntry::user(message)).await?;
            turn.set_contact_if_missing(field, message).await?;
            turn.set_status(&LeadStatus::GeneratingBait).await?;
            turn.commit().await?;
            tracing::info!(lead_id = %lead_id, field = field.column(), status = %LeadStatus::GeneratingBait, "contact data complete");
            return self.deliver_bait(lead).await;
        }

        let instruction = prompts::collecting_data(&lead, &missing, message);
        let reply = self
            .llm
            .complete(&[Message::system(instruction), Message::user(message)])
            .await?;

        let mut turn = self.store.begin_turn(&lead_id).await?;
        turn.append_entry(&ChatEntry::user(message)).await?;
        let written = turn.set_contact_if_missing(field, message).await?;
        turn.append_entry(&ChatEntry::bot(&reply)).await?;
        turn.commit().await?;
        tracing::info!(lead_id = %lead_id, field = field.column(), written, "contact field collected");

        Ok(TurnReply::new(reply, &lead_id))
    }

    /// GeneratingBait → BaitDelivered；失败时退回 CollectingData
    async fn deliver_bait(&self, lead: Lead) -> Result<TurnReply, FlowError> {
        match self.generate_bait(&lead).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                tracing::warn!(lead_id = %lead.id, error = %e, "bait generation failed, reverting status");
                if let Err(revert) = self
                    .store
                    .update_status_if(&lead.id, &LeadStatus::GeneratingBait, &LeadStatus::CollectingData)
                    .await
                {
                    tracing::error!(lead_id = %lead.id, error = %revert, "failed to revert status");
                }
                Err(e)
            }
        }
    }

    async fn generate_bait(&self, lead: &Lead) -> Result<TurnReply, FlowError> {
        let report = self
            .audit
            .audit(&lead.url_analyzed)
            .await
            .map_err(FlowError::ReportAudit)?;
        let failing = report.failing_checks(self.bait_threshold);

        let instruction = prompts::bait_report(lead, report.score, &failing);
        let text = self
            .llm
            .complete(&[Message::system(instruction), Message::user(prompts::BAIT_REQUEST)])
            .await?;

        let split = split_report(&text);
        if split.report.is_none() {
            tracing::warn!(lead_id = %lead.id, "bait reply has no report marker, nothing persisted as report");
        }
        let message = split.message();

        let mut turn = self.store.begin_turn(&lead.id).await?;
        turn.set_score(report.score).await?;
        if let Some(report_text) = &split.report {
            turn.set_report_text(report_text).await?;
        }
        turn.set_status(&LeadStatus::BaitDelivered).await?;
        turn.append_entry(&ChatEntry::bot(&message)).await?;
        turn.commit().await?;
        tracing::info!(lead_id = %lead.id, score = report.score, failing = failing.len(), status = %LeadStatus::BaitDelivered, "bait report delivered");

        Ok(TurnReply::new(message, &lead.id))
    }

    /// BaitDelivered / CollectingBudget → CollectingBudget / BudgetCollected
    async fn negotiate_budget(&self, lead: Lead, message: &str) -> Result<TurnReply, FlowError> {
        let text = self
            .llm
            .complete(&[Message::system(prompts::budget()), Message::user(message)])
            .await?;
        let (reply, finished) = strip_budget_marker(&text);
        let next = if finished {
            LeadStatus::BudgetCollected
        } else {
            LeadStatus::CollectingBudget
        };

        let mut turn = self.store.begin_turn(&lead.id).await?;
        turn.append_entry(&ChatEntry::user(message)).await?;
        turn.set_status(&next).await?;
        turn.append_entry(&ChatEntry::bot(&reply)).await?;
        let first_completion = finished && turn.mark_budget_collected().await?;
        turn.commit().await?;
        tracing::info!(lead_id = %lead.id, status = %next, "budget turn handled");

        // 销售通知每条线索只发一次
        if first_completion {
            self.spawn_sales_notification(&lead.id, message, &reply).await;
        } else if finished {
            tracing::warn!(lead_id = %lead.id, "budget already collected, sales webhook not repeated");
        }

        Ok(TurnReply::new(reply, &lead.id))
    }

    async fn spawn_sales_notification(&self, lead_id: &str, message: &str, reply: &str) {
        let lead = match self.store.get(lead_id).await {
            Ok(Some(lead)) => lead,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(lead_id, error = %e, "could not reload lead for sales webhook");
                return;
            }
        };
        let budget = BudgetInfo {
            last_message: message.to_string(),
            closing_reply: reply.to_string(),
        };
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            notifier.notify(&lead, &budget).await;
        });
    }

    /// 终态线索：固定回复，状态不变
    async fn closed(&self, lead: &Lead, message: &str) -> Result<TurnReply, FlowError> {
        let reply = closing_text(&lead.status);
        let mut turn = self.store.begin_turn(&lead.id).await?;
        turn.append_entry(&ChatEntry::user(message)).await?;
        turn.append_entry(&ChatEntry::bot(reply)).await?;
        turn.commit().await?;
        Ok(TurnReply::new(reply, &lead.id))
    }

    /// 未知状态（通常是管理接口写入的标签）：按已存数据回到对应阶段
    async fn self_heal(&self, lead: &Lead, message: &str) -> Result<TurnReply, FlowError> {
        let stage = recover_stage(lead);
        match stage {
            // 预算已收集：保留管理接口写入的标签，只给固定回复
            LeadStatus::BudgetCollected => {
                let reply = closing_text(&stage);
                let mut turn = self.store.begin_turn(&lead.id).await?;
                turn.append_entry(&ChatEntry::user(message)).await?;
                turn.append_entry(&ChatEntry::bot(reply)).await?;
                turn.commit().await?;
                tracing::info!(lead_id = %lead.id, status = %lead.status, "budget already collected, status kept");
                return Ok(TurnReply::new(reply, &lead.id));
            }
            // 从未拿到分数：重做首次诊断
            LeadStatus::CollectingUrl => {
                self.store.append_entry(&lead.id, &ChatEntry::user(message)).await?;
                return self.first_audit(&lead.id, &lead.url_analyzed).await;
            }
            _ => {}
        }
        let reply = reannounce(lead, &stage);

        let mut turn = self.store.begin_turn(&lead.id).await?;
        turn.append_entry(&ChatEntry::user(message)).await?;
        turn.set_status(&stage).await?;
        turn.append_entry(&ChatEntry::bot(&reply)).await?;
        turn.commit().await?;
        tracing::info!(lead_id = %lead.id, status = %stage, "stage recovered");

        Ok(TurnReply::new(reply, &lead.id))
    }
}
