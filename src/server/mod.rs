//! HTTP 接口（axum）
//!
//! 路由：
//! - POST /api/chat：对话主入口
//! - POST /api/get-pagespeed：只返回 SEO 分数的快速诊断
//! - POST /api/capture-lead：表单采集，后台生成完整报告
//! - GET  /api/leads/:id/report：轮询完整报告
//! - POST /api/update-status-n8n：管理 Webhook（Bearer 密钥）
//! - GET  /api/test-llm：文本生成后端连通性探测
//! - GET  /api/health

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::audit::AuditClient;
use crate::flow::LeadFlow;
use crate::llm::LlmClient;
use crate::pipeline::ReportQueue;
use crate::store::LeadStore;

pub use error::ApiError;

/// 所有处理函数共享的状态
pub struct AppState {
    pub flow: LeadFlow,
    pub store: LeadStore,
    pub audit: Arc<dyn AuditClient>,
    pub llm: Arc<dyn LlmClient>,
    /// 连通性探测在 `llm` 之后依次尝试的候选模型
    pub candidate_llms: Vec<Arc<dyn LlmClient>>,
    pub reports: ReportQueue,
    pub admin_secret: String,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(handlers::api_chat))
        .route("/api/get-pagespeed", post(handlers::api_get_pagespeed))
        .route("/api/capture-lead", post(handlers::api_capture_lead))
        .route("/api/leads/:id/report", get(handlers::api_lead_report))
        .route("/api/update-status-n8n", post(handlers::api_update_status))
        .route("/api/test-llm", get(handlers::api_test_llm))
        .route("/api/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
