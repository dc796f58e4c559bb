//! 线索（Lead）领域模型
//!
//! 一个线索对应漏斗中的一次完整交互：诊断 URL、联系方式、对话记录、诱饵报告与后台完整报告。

pub mod model;
pub mod url;

pub use model::{AnalysisStatus, ChatEntry, ContactField, Lead, LeadStatus, Speaker};
pub use url::{looks_like_url, normalize_url};
