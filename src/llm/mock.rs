//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按顺序返回预设回复；预设用完后回显最后一条 User 消息。记录每次调用收到的消息。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::LlmError;
use crate::llm::{LlmClient, Message, Role};

#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::default();
        for reply in replies {
            client.push_reply(reply);
        }
        client
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Ok(reply.into()));
        }
    }

    pub fn push_error(&self, err: LlmError) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Err(err));
        }
    }

    /// 每次调用收到的完整消息列表
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// 最近一次调用的 System 指令
    pub fn last_instruction(&self) -> Option<String> {
        self.calls().last().and_then(|msgs| {
            msgs.iter()
                .find(|m| m.role == Role::System)
                .map(|m| m.content.clone())
        })
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }

        let scripted = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        if let Some(reply) = scripted {
            return reply;
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(format!("Echo from Mock: {}", last_user))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

/// 未配置 API Key 时使用：每次调用都失败
#[derive(Debug, Default)]
pub struct UnconfiguredLlmClient;

#[async_trait]
impl LlmClient for UnconfiguredLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
        Err(LlmError::NotConfigured)
    }

    fn model_name(&self) -> &str {
        "unconfigured"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_then_echo() {
        let llm = MockLlmClient::with_replies(["primeira"]);
        llm.push_error(LlmError::Timeout);

        let msgs = [Message::system("instr"), Message::user("Ana")];
        assert_eq!(llm.complete(&msgs).await.unwrap(), "primeira");
        assert_eq!(llm.complete(&msgs).await.unwrap_err(), LlmError::Timeout);
        assert_eq!(llm.complete(&msgs).await.unwrap(), "Echo from Mock: Ana");
        assert_eq!(llm.call_count(), 3);
        assert_eq!(llm.last_instruction().as_deref(), Some("instr"));
    }
}
