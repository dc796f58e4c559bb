//! 线索对话流程
//!
//! - [`engine`]：状态机本体 [`LeadFlow`]
//! - [`state`]：缺失字段与阶段推断
//! - [`prompts`]：各阶段的生成指令
//! - [`marker`]：生成文本中的完成标记

pub mod engine;
pub mod marker;
pub mod prompts;
pub mod state;

pub use engine::{LeadFlow, TurnReply};
