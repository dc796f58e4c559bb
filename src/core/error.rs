//! 错误类型
//!
//! 按来源分层：诊断（AuditError）、文本生成（LlmError）、存储（StoreError），
//! 对话状态机统一汇总为 FlowError，由 HTTP 层映射为状态码。

use thiserror::Error;

/// 站点诊断服务的错误；HTTP 层失败与网络失败分开，便于给用户更准确的提示
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuditError {
    #[error("Audit service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Audit network error: {0}")]
    Network(String),

    #[error("Audit request timed out")]
    Timeout,

    #[error("Audit response parse error: {0}")]
    Parse(String),

    #[error("Audit response has no SEO score")]
    MissingScore,
}

impl AuditError {
    /// 写入对话记录、返回给访客的提示文本
    pub fn user_message(&self) -> String {
        match self {
            AuditError::Http { message, .. } => {
                format!("Erro: A API do Google falhou ({}).", message)
            }
            AuditError::MissingScore => "Erro: Não foi possível extrair o score.".to_string(),
            _ => "Erro: Não foi possível analisar essa URL.".to_string(),
        }
    }
}

/// 文本生成后端的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Text generation backend not configured")]
    NotConfigured,

    #[error("Text generation request failed: {0}")]
    Request(String),

    #[error("Text generation timed out")]
    Timeout,

    #[error("Text generation returned no content")]
    EmptyResponse,

    #[error("Text generation blocked: {0}")]
    Blocked(String),
}

/// 线索存储错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lead not found: {0}")]
    NotFound(String),
}

/// 单轮对话处理中的错误；同步路径在边界处转换为结构化错误响应
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Lead not found: {0}")]
    LeadNotFound(String),

    #[error(transparent)]
    Generation(#[from] LlmError),

    /// 生成诱饵报告前的二次诊断失败
    #[error("Report audit failed: {0}")]
    ReportAudit(AuditError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FlowError {
    /// 给访客看的错误文本（不暴露内部细节）
    pub fn user_message(&self) -> String {
        match self {
            FlowError::InvalidInput(msg) => msg.clone(),
            FlowError::LeadNotFound(_) => "Lead não encontrado.".to_string(),
            FlowError::Generation(_) => {
                "Desculpe, tive um problema ao processar sua solicitação.".to_string()
            }
            FlowError::ReportAudit(_) => {
                "Não consegui re-analisar seu site para o relatório final.".to_string()
            }
            FlowError::Store(_) => {
                "Ocorreu um erro fatal no processamento do chat.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_http_error_mentions_upstream_detail() {
        let err = AuditError::Http {
            status: 400,
            message: "Lighthouse returned error: FAILED_DOCUMENT_REQUEST".to_string(),
        };
        assert!(err.user_message().contains("FAILED_DOCUMENT_REQUEST"));
    }

    #[test]
    fn test_audit_network_error_is_generic() {
        let err = AuditError::Network("dns failure".to_string());
        assert!(!err.user_message().contains("dns"));
    }

    #[test]
    fn test_flow_store_error_hides_details() {
        let err = FlowError::Store(StoreError::NotFound("abc".to_string()));
        assert!(!err.user_message().contains("abc"));
    }
}
