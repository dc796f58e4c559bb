//! 站点诊断：调用外部审计服务，得到 SEO 分数与检查项
//!
//! - [`AuditClient`]：诊断能力抽象（一次调用 = 一次完整审计）
//! - [`PageSpeedClient`]：Google PageSpeed Insights v5 实现
//! - [`MockAuditClient`]：测试用，固定结果并计数

pub mod mock;
pub mod pagespeed;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::core::AuditError;

pub use mock::MockAuditClient;
pub use pagespeed::PageSpeedClient;

/// 诊断客户端：输入绝对 URL，返回分数与检查项
#[async_trait]
pub trait AuditClient: Send + Sync {
    async fn audit(&self, url: &str) -> Result<AuditReport, AuditError>;
}

/// 单个检查项；score 取值 0.0 ~ 1.0
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuditCheck {
    pub title: String,
    pub description: String,
    pub score: f64,
}

/// 一次审计的结果
#[derive(Clone, Debug, PartialEq)]
pub struct AuditReport {
    /// SEO 分数，0 ~ 100
    pub score: f64,
    /// 所有有分数的检查项，最差的在前
    pub checks: Vec<AuditCheck>,
}

impl AuditReport {
    /// 解析 Lighthouse 结果：`lighthouseResult.categories.seo.score` × 100 为分数，
    /// `lighthouseResult.audits` 中跳过 informative / notApplicable 与无分数的项
    pub fn from_lighthouse(json: &Value) -> Result<Self, AuditError> {
        let result = json
            .get("lighthouseResult")
            .ok_or_else(|| AuditError::Parse("missing lighthouseResult".to_string()))?;

        let score = result
            .pointer("/categories/seo/score")
            .and_then(Value::as_f64)
            .ok_or(AuditError::MissingScore)?
            * 100.0;

        let mut checks: Vec<AuditCheck> = result
            .get("audits")
            .and_then(Value::as_object)
            .map(|audits| {
                audits
                    .values()
                    .filter(|a| {
                        !matches!(
                            a.get("scoreDisplayMode").and_then(Value::as_str),
                            Some("informative") | Some("notApplicable")
                        )
                    })
                    .filter_map(|a| {
                        let score = a.get("score").and_then(Value::as_f64)?;
                        Some(AuditCheck {
                            title: a.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
                            description: a
                                .get("description")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                            score,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        checks.sort_by(|a, b| a.score.total_cmp(&b.score));

        Ok(Self { score, checks })
    }

    /// 得分严格低于 threshold 的检查项
    pub fn failing_checks(&self, threshold: f64) -> Vec<AuditCheck> {
        let failing: Vec<AuditCheck> = self
            .checks
            .iter()
            .filter(|c| c.score < threshold)
            .cloned()
            .collect();
        tracing::debug!(count = failing.len(), threshold, "extracted failing checks");
        failing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "lighthouseResult": {
                "categories": {"seo": {"score": 0.42}},
                "audits": {
                    "meta-description": {
                        "title": "Document does not have a meta description",
                        "description": "Meta descriptions may be included in search results.",
                        "score": 0.0,
                        "scoreDisplayMode": "binary"
                    },
                    "largest-contentful-paint": {
                        "title": "Largest Contentful Paint",
                        "description": "LCP marks the time...",
                        "score": 0.95,
                        "scoreDisplayMode": "numeric"
                    },
                    "http-status-code": {
                        "title": "Page has successful HTTP status code",
                        "description": "",
                        "score": 1.0,
                        "scoreDisplayMode": "binary"
                    },
                    "diagnostics": {
                        "title": "Diagnostics",
                        "description": "",
                        "score": 0.1,
                        "scoreDisplayMode": "informative"
                    },
                    "hreflang": {
                        "title": "hreflang",
                        "description": "",
                        "score": null,
                        "scoreDisplayMode": "notApplicable"
                    },
                    "canonical": {
                        "title": "Document has a valid rel=canonical",
                        "description": "",
                        "score": null,
                        "scoreDisplayMode": "binary"
                    }
                }
            }
        })
    }

    #[test]
    fn test_score_is_scaled_to_100() {
        let report = AuditReport::from_lighthouse(&sample()).unwrap();
        assert!((report.score - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_informative_and_unscored_checks_are_skipped() {
        let report = AuditReport::from_lighthouse(&sample()).unwrap();
        let titles: Vec<_> = report.checks.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles.len(), 3);
        assert!(!titles.contains(&"Diagnostics"));
        assert!(!titles.contains(&"hreflang"));
        // 最差的在前
        assert_eq!(report.checks[0].score, 0.0);
    }

    #[test]
    fn test_failing_checks_threshold_is_strict() {
        let report = AuditReport::from_lighthouse(&sample()).unwrap();
        assert_eq!(report.failing_checks(0.9).len(), 1);
        assert_eq!(report.failing_checks(1.0).len(), 2);
        assert_eq!(report.failing_checks(0.0).len(), 0);
    }

    #[test]
    fn test_missing_seo_score() {
        let json = json!({"lighthouseResult": {"categories": {}, "audits": {}}});
        assert_eq!(AuditReport::from_lighthouse(&json), Err(AuditError::MissingScore));
    }

    #[test]
    fn test_missing_lighthouse_result() {
        let err = AuditReport::from_lighthouse(&json!({"kind": "x"})).unwrap_err();
        assert!(matches!(err, AuditError::Parse(_)));
    }
}
