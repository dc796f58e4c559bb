//! 线索存储（SQLite，sqlx 异步连接池）
//!
//! 每个操作从连接池取连接、用完即还，不在多轮对话之间持有连接。
//! 单字段更新都是一条 UPDATE；需要一起生效的多处写入放进 [`LeadTurn`] 事务，
//! 事务未提交即被丢弃时自动回滚。

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Row, Sqlite, Transaction};

use crate::core::StoreError;
use crate::lead::{AnalysisStatus, ChatEntry, ContactField, Lead, LeadStatus};

const LEAD_COLUMNS: &str = "id, status, url_analyzed, seo_score, name, email, phone, role, \
    report_text, conversation_log, analysis_status, final_report, email_notified, \
    budget_collected_at, created_at";

/// 通过独立入口（线索采集表单）一次性提交的数据
#[derive(Debug, Clone)]
pub struct CapturedLead {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub url_analyzed: String,
    pub seo_score: Option<f64>,
}

/// 线索存储：克隆只复制连接池句柄
#[derive(Clone)]
pub struct LeadStore {
    pool: SqlitePool,
}

impl LeadStore {
    /// 按连接串创建连接池并初始化表结构
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    /// 打开指定路径的数据库文件（不存在则创建）
    pub async fn open(db_path: impl AsRef<std::path::Path>) -> Result<Self, StoreError> {
        let url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());
        Self::connect(&url, 5).await
    }

    async fn init_tables(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS leads (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                url_analyzed TEXT NOT NULL,
                seo_score REAL,
                name TEXT,
                email TEXT,
                phone TEXT,
                role TEXT,
                report_text TEXT,
                conversation_log TEXT NOT NULL DEFAULT '[]',
                analysis_status TEXT NOT NULL DEFAULT 'PENDING',
                final_report TEXT,
                email_notified INTEGER NOT NULL DEFAULT 0,
                budget_collected_at TEXT,
                report_requested_at TEXT,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        // 旧库缺少的列
        for column in ["budget_collected_at", "report_requested_at"] {
            let exists: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info('leads') WHERE name = ?")
                    .bind(column)
                    .fetch_one(&self.pool)
                    .await?;
            if exists == 0 {
                sqlx::query(&format!("ALTER TABLE leads ADD COLUMN {column} TEXT"))
                    .execute(&self.pool)
                    .await?;
            }
        }

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_email_url ON leads(email, url_analyzed)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// 新建线索：状态 CollectingUrl，对话记录以访客首条消息开头
    pub async fn create_lead(
        &self,
        url_analyzed: &str,
        first_entry: &ChatEntry,
    ) -> Result<Lead, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let log = serde_json::to_string(&vec![first_entry])?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO leads (id, status, url_analyzed, conversation_log, analysis_status, created_at)
             VALUES (?, ?, ?, ?, 'PENDING', ?)",
        )
        .bind(&id)
        .bind(LeadStatus::CollectingUrl.as_str())
        .bind(url_analyzed)
        .bind(&log)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.require(&id).await
    }

    /// 采集表单创建的线索：联系方式与分数一次写入，对话记录为空
    pub async fn create_captured(&self, capture: &CapturedLead) -> Result<Lead, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO leads (id, status, url_analyzed, seo_score, name, email, phone, conversation_log, analysis_status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, '[]', 'PENDING', ?)",
        )
        .bind(&id)
        .bind(LeadStatus::CollectingData.as_str())
        .bind(&capture.url_analyzed)
        .bind(capture.seo_score)
        .bind(&capture.name)
        .bind(&capture.email)
        .bind(&capture.phone)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.require(&id).await
    }

    /// 按邮箱 + URL 查找已有线索（采集接口重试时复用）
    pub async fn find_by_contact(
        &self,
        email: &str,
        url_analyzed: &str,
    ) -> Result<Option<Lead>, StoreError> {
        let sql = format!(
            "SELECT {} FROM leads WHERE email = ? AND url_analyzed = ? ORDER BY created_at ASC LIMIT 1",
            LEAD_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(email)
            .bind(url_analyzed)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| lead_from_row(&r)).transpose()
    }

    pub async fn get(&self, lead_id: &str) -> Result<Option<Lead>, StoreError> {
        let sql = format!("SELECT {} FROM leads WHERE id = ?", LEAD_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(lead_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| lead_from_row(&r)).transpose()
    }

    pub async fn require(&self, lead_id: &str) -> Result<Lead, StoreError> {
        self.get(lead_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(lead_id.to_string()))
    }

    pub async fn update_status(&self, lead_id: &str, status: &LeadStatus) -> Result<(), StoreError> {
        set_status_with(&self.pool, lead_id, status).await
    }

    /// 仅当当前状态为 `from` 时改为 `to`；返回是否生效
    pub async fn update_status_if(
        &self,
        lead_id: &str,
        from: &LeadStatus,
        to: &LeadStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE leads SET status = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(lead_id)
            .bind(from.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn append_entry(&self, lead_id: &str, entry: &ChatEntry) -> Result<(), StoreError> {
        append_entry_with(&self.pool, lead_id, entry).await
    }

    pub async fn set_contact_if_missing(
        &self,
        lead_id: &str,
        field: ContactField,
        value: &str,
    ) -> Result<bool, StoreError> {
        set_contact_with(&self.pool, lead_id, field, value).await
    }

    /// 管理接口：直接改写状态与通知标记，绕过状态机；返回线索是否存在
    pub async fn admin_update(
        &self,
        lead_id: &str,
        status: &str,
        email_notified: bool,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE leads SET status = ?, email_notified = ? WHERE id = ?")
            .bind(status)
            .bind(email_notified)
            .bind(lead_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// 记下线索请求过后台报告；重复调用保留第一次的时间
    pub async fn mark_report_requested(&self, lead_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE leads SET report_requested_at = COALESCE(report_requested_at, ?) WHERE id = ?",
        )
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(lead_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(lead_id.to_string()));
        }
        Ok(())
    }

    /// 已请求但未完成的后台报告，按请求顺序返回
    ///
    /// 只在执行器启动前调用：上次进程中途退出留下的 PROCESSING 先放回 PENDING。
    pub async fn unfinished_reports(&self) -> Result<Vec<Lead>, StoreError> {
        let reset = sqlx::query(
            "UPDATE leads SET analysis_status = 'PENDING'
             WHERE analysis_status = 'PROCESSING' AND report_requested_at IS NOT NULL",
        )
        .execute(&self.pool)
        .await?;
        if reset.rows_affected() > 0 {
            tracing::warn!(count = reset.rows_affected(), "interrupted reports reset to PENDING");
        }

        let sql = format!(
            "SELECT {} FROM leads
             WHERE analysis_status = 'PENDING' AND report_requested_at IS NOT NULL
             ORDER BY report_requested_at ASC",
            LEAD_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(lead_from_row).collect()
    }

    /// PENDING → PROCESSING；已经开始或结束的线索返回 false，用于防止重复触发
    pub async fn begin_analysis(&self, lead_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE leads SET analysis_status = 'PROCESSING' WHERE id = ? AND analysis_status = 'PENDING'",
        )
        .bind(lead_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// PROCESSING → DONE / FAILED，同时写入完整报告（失败时为错误描述）
    ///
    /// 终态只写一次：不在 PROCESSING 的线索返回 false 且不做修改。
    pub async fn finish_analysis(
        &self,
        lead_id: &str,
        status: AnalysisStatus,
        final_report: &str,
    ) -> Result<bool, StoreError> {
        debug_assert!(status.is_terminal());
        let result = sqlx::query(
            "UPDATE leads SET analysis_status = ?, final_report = ?
             WHERE id = ? AND analysis_status = 'PROCESSING'",
        )
        .bind(status.as_str())
        .bind(final_report)
        .bind(lead_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// 开启一轮对话的写事务
    pub async fn begin_turn(&self, lead_id: &str) -> Result<LeadTurn, StoreError> {
        Ok(LeadTurn {
            tx: self.pool.begin().await?,
            lead_id: lead_id.to_string(),
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// 一轮对话内需要一起生效的写入；未调用 `commit` 就被丢弃时全部回滚
pub struct LeadTurn {
    tx: Transaction<'static, Sqlite>,
    lead_id: String,
}

impl LeadTurn {
    pub async fn append_entry(&mut self, entry: &ChatEntry) -> Result<(), StoreError> {
        append_entry_with(&mut *self.tx, &self.lead_id, entry).await
    }

    pub async fn set_contact_if_missing(
        &mut self,
        field: ContactField,
        value: &str,
    ) -> Result<bool, StoreError> {
        set_contact_with(&mut *self.tx, &self.lead_id, field, value).await
    }

    pub async fn set_status(&mut self, status: &LeadStatus) -> Result<(), StoreError> {
        set_status_with(&mut *self.tx, &self.lead_id, status).await
    }

    pub async fn set_score(&mut self, score: f64) -> Result<(), StoreError> {
        sqlx::query("UPDATE leads SET seo_score = ? WHERE id = ?")
            .bind(score)
            .bind(&self.lead_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    pub async fn set_report_text(&mut self, report: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE leads SET report_text = ? WHERE id = ?")
            .bind(report)
            .bind(&self.lead_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    /// 记下预算收集完成的时间；只有第一次生效，返回本次是否写入
    pub async fn mark_budget_collected(&mut self) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE leads SET budget_collected_at = ? WHERE id = ? AND budget_collected_at IS NULL",
        )
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&self.lead_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

async fn append_entry_with<'e, E>(exec: E, lead_id: &str, entry: &ChatEntry) -> Result<(), StoreError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let json = serde_json::to_string(entry)?;
    // json_insert 的 '$[#]' 表示追加到数组末尾，单条语句完成
    let result = sqlx::query(
        "UPDATE leads SET conversation_log = json_insert(conversation_log, '$[#]', json(?)) WHERE id = ?",
    )
    .bind(&json)
    .bind(lead_id)
    .execute(exec)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(lead_id.to_string()));
    }
    Ok(())
}

async fn set_contact_with<'e, E>(
    exec: E,
    lead_id: &str,
    field: ContactField,
    value: &str,
) -> Result<bool, StoreError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let column = field.column();
    let sql = format!(
        "UPDATE leads SET {column} = ? WHERE id = ? AND ({column} IS NULL OR trim({column}) = '')"
    );
    let result = sqlx::query(&sql).bind(value).bind(lead_id).execute(exec).await?;
    Ok(result.rows_affected() == 1)
}

async fn set_status_with<'e, E>(exec: E, lead_id: &str, status: &LeadStatus) -> Result<(), StoreError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE leads SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(lead_id)
        .execute(exec)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(lead_id.to_string()));
    }
    Ok(())
}

fn lead_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Lead, StoreError> {
    let status: String = row.try_get("status")?;
    let analysis: String = row.try_get("analysis_status")?;
    let log: String = row.try_get("conversation_log")?;

    Ok(Lead {
        id: row.try_get("id")?,
        status: LeadStatus::parse(&status),
        url_analyzed: row.try_get("url_analyzed")?,
        seo_score: row.try_get("seo_score")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        role: row.try_get("role")?,
        report_text: row.try_get("report_text")?,
        conversation_log: serde_json::from_str(&log)?,
        analysis_status: AnalysisStatus::parse(&analysis).unwrap_or(AnalysisStatus::Pending),
        final_report: row.try_get("final_report")?,
        email_notified: row.try_get("email_notified")?,
        budget_collected_at: row.try_get("budget_collected_at")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::Speaker;
    use tempfile::TempDir;

    async fn test_store() -> (TempDir, LeadStore) {
        let dir = TempDir::new().unwrap();
        let store = LeadStore::open(dir.path().join("leads.db")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_create_lead_assigns_id_and_initial_state() {
        let (_dir, store) = test_store().await;
        let lead = store
            .create_lead("https://example.com", &ChatEntry::user("example.com"))
            .await
            .unwrap();

        assert!(!lead.id.is_empty());
        assert_eq!(lead.status, LeadStatus::CollectingUrl);
        assert_eq!(lead.analysis_status, AnalysisStatus::Pending);
        assert_eq!(lead.conversation_log, vec![ChatEntry::user("example.com")]);
        assert!(lead.seo_score.is_none());
        assert!(!lead.email_notified);
    }

    #[tokio::test]
    async fn test_append_entry_preserves_order() {
        let (_dir, store) = test_store().await;
        let lead = store
            .create_lead("https://example.com", &ChatEntry::user("example.com"))
            .await
            .unwrap();

        store.append_entry(&lead.id, &ChatEntry::bot("score 42")).await.unwrap();
        store.append_entry(&lead.id, &ChatEntry::user("Ana")).await.unwrap();
        store.append_entry(&lead.id, &ChatEntry::bot("email?")).await.unwrap();

        let log = store.require(&lead.id).await.unwrap().conversation_log;
        let texts: Vec<_> = log.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["example.com", "score 42", "Ana", "email?"]);
        assert_eq!(log[1].role, Speaker::Bot);
    }

    #[tokio::test]
    async fn test_append_entry_unknown_lead() {
        let (_dir, store) = test_store().await;
        let err = store.append_entry("missing", &ChatEntry::bot("x")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_contact_written_only_when_missing() {
        let (_dir, store) = test_store().await;
        let lead = store
            .create_lead("https://example.com", &ChatEntry::user("example.com"))
            .await
            .unwrap();

        assert!(store.set_contact_if_missing(&lead.id, ContactField::Name, "Ana").await.unwrap());
        assert!(!store.set_contact_if_missing(&lead.id, ContactField::Name, "Bia").await.unwrap());

        let lead = store.require(&lead.id).await.unwrap();
        assert_eq!(lead.name.as_deref(), Some("Ana"));
        assert!(lead.email.is_none());
    }

    #[tokio::test]
    async fn test_turn_rolls_back_when_dropped() {
        let (_dir, store) = test_store().await;
        let lead = store
            .create_lead("https://example.com", &ChatEntry::user("example.com"))
            .await
            .unwrap();

        {
            let mut turn = store.begin_turn(&lead.id).await.unwrap();
            turn.append_entry(&ChatEntry::user("Ana")).await.unwrap();
            turn.set_contact_if_missing(ContactField::Name, "Ana").await.unwrap();
            turn.set_status(&LeadStatus::CollectingData).await.unwrap();
            // 不提交
        }

        let lead = store.require(&lead.id).await.unwrap();
        assert_eq!(lead.status, LeadStatus::CollectingUrl);
        assert!(lead.name.is_none());
        assert_eq!(lead.conversation_log.len(), 1);
    }

    #[tokio::test]
    async fn test_turn_commit_applies_all_writes() {
        let (_dir, store) = test_store().await;
        let lead = store
            .create_lead("https://example.com", &ChatEntry::user("example.com"))
            .await
            .unwrap();

        let mut turn = store.begin_turn(&lead.id).await.unwrap();
        turn.set_score(42.0).await.unwrap();
        turn.set_status(&LeadStatus::CollectingData).await.unwrap();
        turn.append_entry(&ChatEntry::bot("42/100")).await.unwrap();
        turn.commit().await.unwrap();

        let lead = store.require(&lead.id).await.unwrap();
        assert_eq!(lead.seo_score, Some(42.0));
        assert_eq!(lead.status, LeadStatus::CollectingData);
        assert_eq!(lead.conversation_log.len(), 2);
    }

    #[tokio::test]
    async fn test_analysis_status_transitions_once() {
        let (_dir, store) = test_store().await;
        let lead = store
            .create_lead("https://example.com", &ChatEntry::user("example.com"))
            .await
            .unwrap();

        // 未开始时不能直接结束
        assert!(!store.finish_analysis(&lead.id, AnalysisStatus::Done, "x").await.unwrap());

        assert!(store.begin_analysis(&lead.id).await.unwrap());
        assert!(!store.begin_analysis(&lead.id).await.unwrap());

        assert!(store.finish_analysis(&lead.id, AnalysisStatus::Done, "report").await.unwrap());
        assert!(!store.finish_analysis(&lead.id, AnalysisStatus::Failed, "late").await.unwrap());

        let lead = store.require(&lead.id).await.unwrap();
        assert_eq!(lead.analysis_status, AnalysisStatus::Done);
        assert_eq!(lead.final_report.as_deref(), Some("report"));
    }

    #[tokio::test]
    async fn test_admin_update_and_unknown_status() {
        let (_dir, store) = test_store().await;
        let lead = store
            .create_lead("https://example.com", &ChatEntry::user("example.com"))
            .await
            .unwrap();

        assert!(store.admin_update(&lead.id, "Email Enviado", true).await.unwrap());
        assert!(!store.admin_update("missing", "Email Enviado", true).await.unwrap());

        let lead = store.require(&lead.id).await.unwrap();
        assert_eq!(lead.status, LeadStatus::Unknown("Email Enviado".to_string()));
        assert!(lead.email_notified);
    }

    #[tokio::test]
    async fn test_captured_lead_lookup() {
        let (_dir, store) = test_store().await;
        let capture = CapturedLead {
            name: "Ana".to_string(),
            email: "ana@loja.com".to_string(),
            phone: "11999999999".to_string(),
            url_analyzed: "https://loja.com".to_string(),
            seo_score: Some(77.0),
        };
        let created = store.create_captured(&capture).await.unwrap();
        assert_eq!(created.phone.as_deref(), Some("11999999999"));

        let found = store
            .find_by_contact("ana@loja.com", "https://loja.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert!(store
            .find_by_contact("ana@loja.com", "https://outra.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_budget_collected_marked_once() {
        let (_dir, store) = test_store().await;
        let lead = store
            .create_lead("https://example.com", &ChatEntry::user("example.com"))
            .await
            .unwrap();
        assert!(lead.budget_collected_at.is_none());

        let mut turn = store.begin_turn(&lead.id).await.unwrap();
        assert!(turn.mark_budget_collected().await.unwrap());
        turn.commit().await.unwrap();
        let first = store.require(&lead.id).await.unwrap().budget_collected_at;
        assert!(first.is_some());

        let mut turn = store.begin_turn(&lead.id).await.unwrap();
        assert!(!turn.mark_budget_collected().await.unwrap());
        turn.commit().await.unwrap();
        assert_eq!(store.require(&lead.id).await.unwrap().budget_collected_at, first);

        // 管理接口改状态不影响这条记录
        store.admin_update(&lead.id, "Email Enviado", true).await.unwrap();
        assert_eq!(store.require(&lead.id).await.unwrap().budget_collected_at, first);
    }

    #[tokio::test]
    async fn test_unfinished_reports_only_requested_leads() {
        let (_dir, store) = test_store().await;
        let chat_lead = store
            .create_lead("https://example.com", &ChatEntry::user("example.com"))
            .await
            .unwrap();
        let capture = |email: &str| CapturedLead {
            name: "Ana".to_string(),
            email: email.to_string(),
            phone: String::new(),
            url_analyzed: "https://loja.com".to_string(),
            seo_score: None,
        };
        let waiting = store.create_captured(&capture("a@loja.com")).await.unwrap();
        let interrupted = store.create_captured(&capture("b@loja.com")).await.unwrap();
        let finished = store.create_captured(&capture("c@loja.com")).await.unwrap();
        for lead in [&waiting, &interrupted, &finished] {
            store.mark_report_requested(&lead.id).await.unwrap();
        }
        assert!(store.begin_analysis(&interrupted.id).await.unwrap());
        assert!(store.begin_analysis(&finished.id).await.unwrap());
        assert!(store.finish_analysis(&finished.id, AnalysisStatus::Done, "ok").await.unwrap());

        let ids: Vec<String> = store
            .unfinished_reports()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&waiting.id));
        assert!(ids.contains(&interrupted.id));
        assert!(!ids.contains(&chat_lead.id));
        assert_eq!(
            store.require(&interrupted.id).await.unwrap().analysis_status,
            AnalysisStatus::Pending
        );

        let err = store.mark_report_requested("missing").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_status_if_is_compare_and_set() {
        let (_dir, store) = test_store().await;
        let lead = store
            .create_lead("https://example.com", &ChatEntry::user("example.com"))
            .await
            .unwrap();

        assert!(!store
            .update_status_if(&lead.id, &LeadStatus::GeneratingBait, &LeadStatus::CollectingData)
            .await
            .unwrap());
        assert!(store
            .update_status_if(&lead.id, &LeadStatus::CollectingUrl, &LeadStatus::AuditError)
            .await
            .unwrap());
        assert_eq!(store.require(&lead.id).await.unwrap().status, LeadStatus::AuditError);
    }
}
