//! Fluxo de Ouro HTTP 服务
//!
//! 入口：加载配置、初始化日志与存储，启动后台报告 worker 和 HTTP 服务。
//! 用法：`fluxo [config.toml]`，端口可由 PORT 环境变量覆盖。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use fluxo::audit::{AuditClient, PageSpeedClient};
use fluxo::config::{load_config, DEFAULT_ADMIN_SECRET};
use fluxo::core::{ShutdownManager, ShutdownReason};
use fluxo::flow::LeadFlow;
use fluxo::llm::{create_llm_from_config, create_candidate_clients};
use fluxo::notify::create_notifier;
use fluxo::pipeline::{ConfiguredClients, ReportQueue, ReportWorker};
use fluxo::server::{build_router, AppState};
use fluxo::store::LeadStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fluxo::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load configuration")?;

    if cfg.admin.secret == DEFAULT_ADMIN_SECRET {
        tracing::warn!("admin secret is the default value; set FLUXO__ADMIN__SECRET");
    }
    if cfg.audit.api_key.as_deref().map_or(true, str::is_empty) {
        tracing::warn!("PageSpeed API key not set; audits run without a key and may be rate limited");
    }

    let store = LeadStore::connect(&cfg.database.url, cfg.database.max_connections)
        .await
        .context("Failed to open lead store")?;

    let audit: Arc<dyn AuditClient> = Arc::new(PageSpeedClient::new(&cfg.audit));
    let llm = create_llm_from_config(&cfg.llm);
    let notifier = create_notifier(&cfg.sales);
    let flow = LeadFlow::new(
        store.clone(),
        audit.clone(),
        llm.clone(),
        notifier,
        cfg.audit.bait_threshold,
    );

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let (reports, receiver) = ReportQueue::new(cfg.pipeline.queue_capacity);
    let worker = ReportWorker::new(
        store.clone(),
        Arc::new(ConfiguredClients::new(cfg.audit.clone(), cfg.llm.clone())),
        &cfg.pipeline,
        cfg.audit.report_threshold,
    );
    let requeued = reports
        .requeue_unfinished(&store)
        .await
        .context("Failed to requeue unfinished reports")?;
    if requeued > 0 {
        tracing::info!(count = requeued, "resuming unfinished reports");
    }
    let worker_handle = tokio::spawn(worker.run(receiver, shutdown.token()));

    let state = Arc::new(AppState {
        flow,
        store: store.clone(),
        audit,
        llm,
        candidate_llms: create_candidate_clients(&cfg.llm),
        reports,
        admin_secret: cfg.admin.secret.clone(),
    });
    let app = build_router(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(cfg.server.port);
    let addr = format!("{}:{}", cfg.server.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Fluxo listening on http://{}", addr);

    let signal = Arc::clone(&shutdown);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.wait_for_shutdown().await })
        .await;

    if !shutdown.is_shutdown() {
        shutdown.shutdown(ShutdownReason::FatalError("HTTP server stopped".to_string()));
    }
    let _ = worker_handle.await;
    store.close().await;

    served.context("HTTP server error")?;
    Ok(())
}
