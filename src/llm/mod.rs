//! 文本生成层：客户端抽象与实现（Gemini / OpenAI 兼容 / Mock）
//!
//! 状态机只依赖 [`LlmClient`]：给一段角色指令和访客输入，拿回一段文本。
//! 不保存多轮记忆，需要的上下文都由调用方写进指令里。

pub mod gemini;
pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::LlmSection;

pub use gemini::GeminiClient;
pub use message::{Message, Role};
pub use mock::{MockLlmClient, UnconfiguredLlmClient};
pub use openai::OpenAiClient;
pub use traits::LlmClient;

/// 根据配置选择文本生成后端
///
/// 缺少 API Key 时返回 [`UnconfiguredLlmClient`]：每次调用都报 NotConfigured，
/// 对话接口据此返回通用错误，而不是悄悄换成 Mock。
pub fn create_llm_from_config(cfg: &LlmSection) -> Arc<dyn LlmClient> {
    let provider = cfg.provider.to_lowercase();
    let api_key = cfg.api_key.clone().filter(|k| !k.is_empty());

    match (provider.as_str(), api_key) {
        ("mock", _) => {
            tracing::warn!("Using Mock LLM");
            Arc::new(MockLlmClient::new())
        }
        ("openai", Some(key)) => {
            tracing::info!(model = %cfg.model, "Using OpenAI-compatible LLM");
            Arc::new(OpenAiClient::new(&key, cfg))
        }
        ("gemini", Some(key)) => {
            tracing::info!(model = %cfg.model, "Using Gemini LLM");
            Arc::new(GeminiClient::new(&key, cfg))
        }
        (other, _) => {
            tracing::error!(provider = other, "LLM API key missing or provider unknown; chat replies will fail");
            Arc::new(UnconfiguredLlmClient)
        }
    }
}

/// 连通性探测用的候选客户端：同一后端与凭据，只换模型；跳过与当前模型相同的项
pub fn create_candidate_clients(cfg: &LlmSection) -> Vec<Arc<dyn LlmClient>> {
    cfg.candidate_models
        .iter()
        .filter(|model| !model.trim().is_empty() && **model != cfg.model)
        .map(|model| {
            create_llm_from_config(&LlmSection {
                model: model.clone(),
                ..cfg.clone()
            })
        })
        .collect()
}
