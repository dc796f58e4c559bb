//! 阶段判定：缺失字段与状态自愈
//!
//! "缺什么"只由空字段推出：按 name → email → phone → role 的固定顺序，第一个为空的字段就是本轮要填的。

use crate::lead::{ContactField, Lead, LeadStatus};

/// 第一个仍为空的联系字段
pub fn first_missing_field(lead: &Lead) -> Option<ContactField> {
    ContactField::ORDER
        .into_iter()
        .find(|field| lead.contact(*field).is_none())
}

/// 所有仍为空的联系字段（保持收集顺序）
pub fn missing_fields(lead: &Lead) -> Vec<ContactField> {
    ContactField::ORDER
        .into_iter()
        .filter(|field| lead.contact(*field).is_none())
        .collect()
}

/// 从已存数据推出未知状态应回到的阶段
///
/// 状态只往前走：收过预算的线索停在 BudgetCollected，没有分数的线索回到首次诊断。
pub fn recover_stage(lead: &Lead) -> LeadStatus {
    if lead.budget_collected_at.is_some() {
        LeadStatus::BudgetCollected
    } else if lead.seo_score.is_none() {
        LeadStatus::CollectingUrl
    } else if first_missing_field(lead).is_some() || lead.report_text.is_none() {
        LeadStatus::CollectingData
    } else {
        LeadStatus::CollectingBudget
    }
}

/// 自愈后重新说明当前阶段的固定文本
pub fn reannounce(lead: &Lead, stage: &LeadStatus) -> String {
    let prompt = match (stage, first_missing_field(lead)) {
        (LeadStatus::CollectingData, Some(field)) => field.question().to_string(),
        (LeadStatus::CollectingData, None) => {
            "Já tenho todos os seus dados. Envie qualquer mensagem para eu gerar seu diagnóstico completo."
                .to_string()
        }
        _ => "Seu diagnóstico já foi entregue. Gostaria de um orçamento?".to_string(),
    };
    format!("Estou reiniciando meu fluxo. {}", prompt)
}

/// 终态线索的固定回复
pub fn closing_text(status: &LeadStatus) -> &'static str {
    match status {
        LeadStatus::AuditError => {
            "Não consegui analisar esse site. Recarregue a página e envie outra URL para começar de novo."
        }
        _ => "Obrigado! Seu orçamento já foi registrado e nossa equipe entrará em contato em breve.",
    }
}
