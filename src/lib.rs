//! Fluxo de Ouro - 对话式线索资格审核后端
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与优雅关闭
//! - **lead**: 线索模型、状态与 URL 处理
//! - **store**: SQLite 线索存储（sqlx）
//! - **audit**: 站点诊断客户端（PageSpeed / Mock）
//! - **llm**: 文本生成客户端（Gemini / OpenAI 兼容 / Mock）
//! - **flow**: 线索对话状态机
//! - **pipeline**: 后台完整报告队列
//! - **notify**: 销售 Webhook 通知
//! - **server**: axum HTTP 接口
//! - **observability**: 日志初始化

pub mod audit;
pub mod config;
pub mod core;
pub mod flow;
pub mod lead;
pub mod llm;
pub mod notify;
pub mod observability;
pub mod pipeline;
pub mod server;
pub mod store;
