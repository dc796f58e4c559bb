//! Lead 记录、会话状态与联系方式字段

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// 会话状态
///
/// 持久化时使用下游工作流（n8n 等）已经在用的标签；
/// 管理接口可以写入任意标签，读回时落入 `Unknown`。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeadStatus {
    CollectingUrl,
    CollectingData,
    GeneratingBait,
    BaitDelivered,
    CollectingBudget,
    /// 终态：预算已收集
    BudgetCollected,
    /// 终态：首次诊断失败
    AuditError,
    Unknown(String),
}

impl LeadStatus {
    pub fn as_str(&self) -> &str {
        match self {
            LeadStatus::CollectingUrl => "Coletando URL",
            LeadStatus::CollectingData => "Coletando Dados",
            LeadStatus::GeneratingBait => "Gerando Isca",
            LeadStatus::BaitDelivered => "Isca Entregue",
            LeadStatus::CollectingBudget => "Coletando Orçamento",
            LeadStatus::BudgetCollected => "Orçamento Coletado",
            LeadStatus::AuditError => "Erro PageSpeed",
            LeadStatus::Unknown(s) => s.as_str(),
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Coletando URL" => LeadStatus::CollectingUrl,
            "Coletando Dados" => LeadStatus::CollectingData,
            "Gerando Isca" => LeadStatus::GeneratingBait,
            "Isca Entregue" => LeadStatus::BaitDelivered,
            "Coletando Orçamento" => LeadStatus::CollectingBudget,
            "Orçamento Coletado" => LeadStatus::BudgetCollected,
            "Erro PageSpeed" => LeadStatus::AuditError,
            other => LeadStatus::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LeadStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// 后台报告流水线的状态，与会话状态相互独立
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "PENDING",
            AnalysisStatus::Processing => "PROCESSING",
            AnalysisStatus::Done => "DONE",
            AnalysisStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(AnalysisStatus::Pending),
            "PROCESSING" => Some(AnalysisStatus::Processing),
            "DONE" => Some(AnalysisStatus::Done),
            "FAILED" => Some(AnalysisStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Done | AnalysisStatus::Failed)
    }
}

/// 需要收集的联系方式字段，按固定顺序逐个索取
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    Name,
    Email,
    Phone,
    Role,
}

impl ContactField {
    /// 收集顺序：name → email → phone → role
    pub const ORDER: [ContactField; 4] = [
        ContactField::Name,
        ContactField::Email,
        ContactField::Phone,
        ContactField::Role,
    ];

    /// 对应的数据库列；只从这里取列名，不接受外部拼接
    pub fn column(&self) -> &'static str {
        match self {
            ContactField::Name => "name",
            ContactField::Email => "email",
            ContactField::Phone => "phone",
            ContactField::Role => "role",
        }
    }

    /// 给文本生成后端看的字段说明
    pub fn describe(&self) -> &'static str {
        match self {
            ContactField::Name => "nome (nome do cliente)",
            ContactField::Email => "email (email profissional)",
            ContactField::Phone => "whatsapp (número com DDD)",
            ContactField::Role => "cargo (ex: Diretor, Marketing, Dono)",
        }
    }

    /// 不经过文本生成时直接使用的提问
    pub fn question(&self) -> &'static str {
        match self {
            ContactField::Name => "Para começar, qual o seu nome?",
            ContactField::Email => "Qual o seu email profissional?",
            ContactField::Phone => "Qual o seu WhatsApp (com DDD)?",
            ContactField::Role => "E qual o seu cargo na empresa?",
        }
    }
}

/// 对话记录中的发言方
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Bot,
}

/// 对话记录的一条
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: Speaker,
    pub text: String,
}

impl ChatEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Speaker::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: Speaker::Bot,
            text: text.into(),
        }
    }
}

/// 一条线索记录
#[derive(Clone, Debug, Serialize)]
pub struct Lead {
    pub id: String,
    pub status: LeadStatus,
    pub url_analyzed: String,
    pub seo_score: Option<f64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    /// 诱饵报告（isca）
    pub report_text: Option<String>,
    pub conversation_log: Vec<ChatEntry>,
    pub analysis_status: AnalysisStatus,
    pub final_report: Option<String>,
    pub email_notified: bool,
    /// 预算收集完成的时间；管理接口改写状态后仍保留
    pub budget_collected_at: Option<String>,
    pub created_at: String,
}

impl Lead {
    pub fn contact(&self, field: ContactField) -> Option<&str> {
        let value = match field {
            ContactField::Name => &self.name,
            ContactField::Email => &self.email,
            ContactField::Phone => &self.phone,
            ContactField::Role => &self.role,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }

    /// 仅在字段为空时写入；已有值保持不变
    pub fn fill_contact(&mut self, field: ContactField, value: impl Into<String>) -> bool {
        if self.contact(field).is_some() {
            return false;
        }
        let slot = match field {
            ContactField::Name => &mut self.name,
            ContactField::Email => &mut self.email,
            ContactField::Phone => &mut self.phone,
            ContactField::Role => &mut self.role,
        };
        *slot = Some(value.into());
        true
    }

    /// 分数按整数展示，如 "42/100"
    pub fn score_label(&self) -> String {
        format!("{:.0}/100", self.seo_score.unwrap_or(0.0))
    }
}
