//! 文本生成客户端抽象

use async_trait::async_trait;

use crate::core::LlmError;
use crate::llm::Message;

/// 文本生成客户端：输入角色指令 + 对话消息，返回生成文本
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成；System 消息作为角色指令
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 当前使用的模型名（用于日志与探测接口）
    fn model_name(&self) -> &str;
}
