//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `FLUXO__*` 覆盖（双下划线表示嵌套，如 `FLUXO__LLM__PROVIDER=openai`）。
//! 配置只在启动时读取一次，随后以 `AppConfig` 显式传给各组件；组件内部不读进程环境。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub audit: AuditSection,
    pub llm: LlmSection,
    pub sales: SalesSection,
    pub admin: AdminSection,
    pub pipeline: PipelineSection,
}

/// [server] 段：监听地址
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// [database] 段：SQLite 连接串与连接池大小
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite:fluxo.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

/// [audit] 段：PageSpeed 诊断服务
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub strategy: String,
    pub categories: Vec<String>,
    /// 上游诊断很慢，默认给足 45 秒
    pub timeout_secs: u64,
    /// 诱饵报告：得分低于此值的检查项视为失败
    pub bait_threshold: f64,
    /// 完整报告：任何不满分的检查项都列出
    pub report_threshold: f64,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://www.googleapis.com/pagespeedonline/v5/runPagespeed".to_string(),
            strategy: "MOBILE".to_string(),
            categories: vec![
                "SEO".to_string(),
                "PERFORMANCE".to_string(),
                "BEST_PRACTICES".to_string(),
            ],
            timeout_secs: 45,
            bait_threshold: 0.9,
            report_threshold: 1.0,
        }
    }
}

/// [llm] 段：文本生成后端选择、温度与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：gemini / openai / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// /api/test-llm 在当前模型之后依次尝试的候选模型
    pub candidate_models: Vec<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-pro".to_string(),
            base_url: None,
            api_key: None,
            temperature: 0.4,
            timeout_secs: 60,
            candidate_models: Vec::new(),
        }
    }
}

/// [sales] 段：销售 Webhook；未配置 URL 时不发送
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SalesSection {
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SalesSection {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 5,
        }
    }
}

pub const DEFAULT_ADMIN_SECRET: &str = "change-me";

/// [admin] 段：管理 Webhook 的共享密钥
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminSection {
    pub secret: String,
}

impl Default for AdminSection {
    fn default() -> Self {
        Self {
            secret: DEFAULT_ADMIN_SECRET.to_string(),
        }
    }
}

/// [pipeline] 段：后台报告 worker 并发与队列容量
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
        }
    }
}

/// 从 config 目录加载配置，环境变量 FLUXO__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 FLUXO__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("FLUXO")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("audit.categories")
            .with_list_parse_key("llm.candidate_models")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.audit.timeout_secs, 45);
        assert!((cfg.audit.bait_threshold - 0.9).abs() < f64::EPSILON);
        assert!((cfg.llm.temperature - 0.4).abs() < f32::EPSILON);
        assert_eq!(cfg.sales.timeout_secs, 5);
        assert!(cfg.sales.webhook_url.is_none());
        assert_eq!(cfg.admin.secret, DEFAULT_ADMIN_SECRET);
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "[llm]\nprovider = \"mock\"\ncandidate_models = [\"gemini-1.5-flash\"]\n\n[admin]\nsecret = \"s3cr3t\"\n\n[pipeline]\nworkers = 4"
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.llm.candidate_models, vec!["gemini-1.5-flash".to_string()]);
        assert_eq!(cfg.admin.secret, "s3cr3t");
        assert_eq!(cfg.pipeline.workers, 4);
        // 未出现的键保留默认值
        assert_eq!(cfg.pipeline.queue_capacity, 64);
        assert_eq!(cfg.audit.strategy, "MOBILE");
    }
}
