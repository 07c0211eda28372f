use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{Cents, Operation, OperationDraft, OperationId, OperationKind, User, UserId};

use super::store::commit_timestamp;
use super::{LedgerStore, MIGRATION_001_INITIAL};

const OPERATION_COLUMNS: &str =
    "id, user_id, receiver_id, kind, amount_cents, description, created_at";

/// SQLite-backed ledger store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database file at `path`, optionally creating it.
    pub async fn connect(path: &Path, create_if_missing: bool) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (create + migrate).
    pub async fn init(path: &Path) -> Result<Self> {
        let store = Self::connect(path, true).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Open an existing, already initialized database.
    pub async fn open(path: &Path) -> Result<Self> {
        Self::connect(path, false).await
    }

    fn row_to_user(row: &SqliteRow) -> Result<User> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(User {
            id: Uuid::parse_str(&id_str).context("Invalid user ID")?,
            name: row.get("name"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    fn row_to_operation(row: &SqliteRow) -> Result<Operation> {
        let id_str: String = row.get("id");
        let user_id_str: String = row.get("user_id");
        let receiver_id_str: Option<String> = row.get("receiver_id");
        let kind_str: String = row.get("kind");
        let created_at_str: String = row.get("created_at");

        Ok(Operation {
            id: Uuid::parse_str(&id_str).context("Invalid operation ID")?,
            user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
            receiver_id: receiver_id_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid receiver ID")?,
            kind: OperationKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid operation kind: {}", kind_str))?,
            amount: row.get("amount_cents"),
            description: row.get("description"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }
}

/// Fixed-width RFC 3339 so that text order in SQL equals time order.
fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .context("Invalid timestamp")?
        .with_timezone(&Utc))
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn insert_user(&self, user: &User) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(format_timestamp(user.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save user")?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by email")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn append_operation(&self, draft: OperationDraft) -> Result<Operation> {
        let operation = draft.commit(Uuid::now_v7(), commit_timestamp());

        sqlx::query(
            r#"
            INSERT INTO operations
                (id, user_id, receiver_id, kind, amount_cents, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(operation.id.to_string())
        .bind(operation.user_id.to_string())
        .bind(operation.receiver_id.map(|id| id.to_string()))
        .bind(operation.kind.as_str())
        .bind(operation.amount)
        .bind(&operation.description)
        .bind(format_timestamp(operation.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save operation")?;

        Ok(operation)
    }

    async fn list_operations(&self, user_id: UserId) -> Result<Vec<Operation>> {
        let user_id_str = user_id.to_string();
        let query = format!(
            "SELECT {OPERATION_COLUMNS} FROM operations \
             WHERE user_id = ? OR receiver_id = ? \
             ORDER BY created_at, id"
        );

        let rows = sqlx::query(&query)
            .bind(&user_id_str)
            .bind(&user_id_str)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list operations")?;

        rows.iter().map(Self::row_to_operation).collect()
    }

    async fn find_operation(&self, id: OperationId) -> Result<Option<Operation>> {
        let query = format!("SELECT {OPERATION_COLUMNS} FROM operations WHERE id = ?");

        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch operation")?;

        row.as_ref().map(Self::row_to_operation).transpose()
    }

    /// Computed with an integer SQL aggregation instead of loading the statement.
    /// Rows are summed in statement order, so every partial sum is a past balance.
    async fn balance_of(&self, user_id: UserId) -> Result<Cents> {
        let user_id_str = user_id.to_string();

        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(effect), 0) AS balance
            FROM (
                SELECT CASE
                    WHEN kind = 'deposit' AND user_id = ? THEN amount_cents
                    WHEN kind = 'withdraw' AND user_id = ? THEN -amount_cents
                    WHEN kind = 'transfer' AND user_id = ? AND receiver_id = ? THEN 0
                    WHEN kind = 'transfer' AND user_id = ? THEN -amount_cents
                    WHEN kind = 'transfer' AND receiver_id = ? THEN amount_cents
                    ELSE 0
                END AS effect
                FROM operations
                WHERE user_id = ? OR receiver_id = ?
                ORDER BY created_at, id
            )
            "#,
        )
        .bind(&user_id_str)
        .bind(&user_id_str)
        .bind(&user_id_str)
        .bind(&user_id_str)
        .bind(&user_id_str)
        .bind(&user_id_str)
        .bind(&user_id_str)
        .bind(&user_id_str)
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute balance")?;

        Ok(row.get("balance"))
    }
}
