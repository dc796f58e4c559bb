//! 路由处理函数

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::{AuditError, LlmError};
use crate::flow::prompts::CHECK_INSTRUCTION;
use crate::lead::{normalize_url, AnalysisStatus};
use crate::llm::{LlmClient, Message};
use crate::pipeline::{Enqueued, ReportJob};
use crate::store::CapturedLead;

use super::error::INVALID_BODY;
use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub lead_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub lead_id: Option<String>,
}

pub async fn api_chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload?;
    let message = req.message.unwrap_or_default();
    let reply = state
        .flow
        .handle_turn(&message, req.lead_id.as_deref())
        .await?;
    Ok(Json(ChatResponse {
        message: reply.message,
        lead_id: reply.lead_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PageSpeedRequest {
    #[serde(default)]
    pub inspected_url: Option<String>,
}

fn status_message(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "status_message": message.into() }))).into_response()
}

/// 快速诊断：只返回 SEO 分数，不建线索
pub async fn api_get_pagespeed(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PageSpeedRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            tracing::info!(error = %rejection.body_text(), "rejected quick diagnostic body");
            return status_message(StatusCode::BAD_REQUEST, INVALID_BODY);
        }
    };
    let Some(raw) = req.inspected_url.filter(|u| !u.trim().is_empty()) else {
        return status_message(StatusCode::BAD_REQUEST, "Erro: Nenhuma URL fornecida.");
    };
    let url = normalize_url(&raw);

    match state.audit.audit(&url).await {
        Ok(report) => status_message(
            StatusCode::OK,
            format!("Diagnóstico Mobile: 🚀 SEO: {:.0}/100.", report.score),
        ),
        Err(e @ AuditError::MissingScore) => {
            status_message(StatusCode::INTERNAL_SERVER_ERROR, e.user_message())
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "quick diagnostic failed");
            status_message(StatusCode::BAD_GATEWAY, e.user_message())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub url_analyzed: Option<String>,
    #[serde(default)]
    pub seo_score: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub lead_id: String,
    pub analysis_status: AnalysisStatus,
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 表单采集：建线索（或复用同邮箱同 URL 的线索），提交后台报告后立即返回 202
pub async fn api_capture_lead(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CaptureRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CaptureResponse>), ApiError> {
    let Json(req) = payload?;
    let (Some(name), Some(email), Some(url)) = (
        required(req.name),
        required(req.email),
        required(req.url_analyzed),
    ) else {
        return Err(ApiError::bad_request(
            "name, email e url_analyzed são obrigatórios.",
        ));
    };
    let url = normalize_url(&url);

    let lead = match state.store.find_by_contact(&email, &url).await? {
        Some(existing) => {
            tracing::info!(lead_id = %existing.id, "capture retried, reusing lead");
            existing
        }
        None => {
            state
                .store
                .create_captured(&CapturedLead {
                    name: name.clone(),
                    email,
                    phone: required(req.phone).unwrap_or_default(),
                    url_analyzed: url.clone(),
                    seo_score: req.seo_score,
                })
                .await?
        }
    };

    if lead.analysis_status == AnalysisStatus::Pending {
        state.store.mark_report_requested(&lead.id).await?;
        let queued = state.reports.enqueue(ReportJob {
            lead_id: lead.id.clone(),
            url: lead.url_analyzed.clone(),
            name,
        })?;
        if queued == Enqueued::AlreadyQueued {
            tracing::info!(lead_id = %lead.id, "report already queued");
        }
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(CaptureResponse {
            lead_id: lead.id,
            analysis_status: lead.analysis_status,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub lead_id: String,
    pub analysis_status: AnalysisStatus,
    pub final_report: Option<String>,
}

pub async fn api_lead_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>, ApiError> {
    let lead = state.store.get(&id).await?.ok_or_else(ApiError::not_found)?;
    Ok(Json(ReportResponse {
        lead_id: lead.id,
        analysis_status: lead.analysis_status,
        final_report: lead.final_report,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AdminStatusRequest {
    #[serde(default)]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub new_status: Option<String>,
    #[serde(default, alias = "email_notified")]
    pub email_enviado: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct AdminStatusResponse {
    pub success: bool,
    pub lead_id: String,
    pub new_status: String,
}

/// 取出 `Authorization: Bearer <token>` 中的 token
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// 管理 Webhook：先鉴权再解析请求体，鉴权失败不透露线索是否存在
pub async fn api_update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AdminStatusResponse>, ApiError> {
    if bearer_token(&headers) != Some(state.admin_secret.as_str()) {
        tracing::warn!("unauthorized admin status update");
        return Err(ApiError::unauthorized());
    }

    let req: AdminStatusRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::bad_request(INVALID_BODY))?;
    let (Some(lead_id), Some(new_status)) = (required(req.lead_id), required(req.new_status)) else {
        return Err(ApiError::bad_request("lead_id e new_status são obrigatórios."));
    };

    let updated = state
        .store
        .admin_update(&lead_id, &new_status, req.email_enviado.unwrap_or(false))
        .await?;
    if !updated {
        return Err(ApiError::not_found());
    }
    tracing::info!(lead_id = %lead_id, status = %new_status, "status overridden by admin webhook");

    Ok(Json(AdminStatusResponse {
        success: true,
        lead_id,
        new_status,
    }))
}

/// 探测结果
enum CheckOutcome {
    Accepted,
    Unexpected(String),
    Failed(LlmError),
}

async fn check_model(llm: &dyn LlmClient) -> CheckOutcome {
    match llm.complete(&[Message::user(CHECK_INSTRUCTION)]).await {
        Ok(text) if text.trim().trim_end_matches('.').eq_ignore_ascii_case("ok") => {
            CheckOutcome::Accepted
        }
        Ok(text) => CheckOutcome::Unexpected(text.trim().to_string()),
        Err(e) => CheckOutcome::Failed(e),
    }
}

/// 用固定指令探测文本生成后端：先试当前模型，再依次试候选模型，报告第一个可用的
pub async fn api_test_llm(State(state): State<Arc<AppState>>) -> Response {
    let model = state.llm.model_name().to_string();
    let mut attempts = Vec::new();

    for llm in std::iter::once(&state.llm).chain(state.candidate_llms.iter()) {
        let name = llm.model_name().to_string();
        match check_model(llm.as_ref()).await {
            CheckOutcome::Accepted => {
                tracing::info!(model = %name, "LLM check accepted");
                let message = if name == model {
                    format!("O modelo {} respondeu corretamente.", name)
                } else {
                    format!("O modelo {} falhou, mas {} respondeu corretamente.", model, name)
                };
                return (
                    StatusCode::OK,
                    Json(json!({
                        "status": "success",
                        "model": model,
                        "accepted_model": name,
                        "message": message,
                    })),
                )
                    .into_response();
            }
            // 凭据缺失对所有候选都一样，不必继续
            CheckOutcome::Failed(LlmError::NotConfigured) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "status": "error", "model": model, "message": "IA não configurada." })),
                )
                    .into_response();
            }
            CheckOutcome::Failed(e) => {
                tracing::warn!(model = %name, error = %e, "LLM check failed");
                attempts.push(format!("{}: {}", name, e));
            }
            CheckOutcome::Unexpected(text) => {
                tracing::warn!(model = %name, reply = %text, "LLM check got unexpected reply");
                attempts.push(format!("{}: resposta inesperada \"{}\"", name, text));
            }
        }
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "fail",
            "model": model,
            "message": format!("Nenhum modelo respondeu corretamente. {}", attempts.join("; ")),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert_eq!(bearer_token(&headers), Some("s3cret"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic s3cret"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
