//! PostgreSQL entity store
//!
//! One table, keyed by identifier:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS entity (
//!     uuid TEXT NOT NULL PRIMARY KEY,
//!     data TEXT
//! );
//! ```
//!
//! Every statement binds its inputs; `data` is free-form text and never
//! reaches the SQL string.

use crate::config::PostgresConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use exquisite_core::{BackendKind, Entity, EntityStore, ListQuery, StoreError};
use regex::Regex;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPoolOptions};
use sqlx::{Connection, PgPool};
use tracing::{info, warn};

type StoreResult<T> = exquisite_core::Result<T>;

/// Database names we are willing to splice into `CREATE DATABASE`
const DATABASE_NAME_PATTERN: &str = "^[a-zA-Z_]+$";

/// Database used to look up and create the configured one
const MAINTENANCE_DATABASE: &str = "postgres";

const INSERT_SQL: &str = "INSERT INTO entity (uuid, data) VALUES ($1, $2)";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect with the configured settings and make sure the table exists.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let options = connect_options(config)?;
        info!(
            "Connecting to PostgreSQL at {} (database {})",
            config.db_url, config.database
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to PostgreSQL at {}", config.db_url))?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and make sure the table exists.
    pub async fn from_pool(pool: PgPool) -> Result<Self> {
        let store = Self { pool };
        store
            .ensure_schema()
            .await
            .context("Failed to create entity table")?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entity (
                uuid TEXT NOT NULL PRIMARY KEY,
                data TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, None))?;

        Ok(())
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Create the configured database on the server if it is not there yet.
pub async fn create_database_if_missing(config: &PostgresConfig) -> Result<()> {
    let options = connect_options(config)?.database(MAINTENANCE_DATABASE);
    let mut conn = PgConnection::connect_with(&options)
        .await
        .with_context(|| format!("Failed to connect to PostgreSQL at {}", config.db_url))?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pg_database WHERE datname = $1")
        .bind(&config.database)
        .fetch_one(&mut conn)
        .await
        .context("Failed to look up database")?;

    if existing == 0 {
        info!("Database {} does not exist, creating it", config.database);
        validate_database_name(&config.database)?;
        // Identifiers cannot be bound; the name was checked above
        let statement = format!("CREATE DATABASE {}", config.database);
        sqlx::query(&statement)
            .execute(&mut conn)
            .await
            .with_context(|| format!("Failed to create database {}", config.database))?;
    }

    conn.close().await.ok();
    Ok(())
}

fn validate_database_name(name: &str) -> Result<()> {
    let pattern = Regex::new(DATABASE_NAME_PATTERN).context("Invalid database name pattern")?;
    if !pattern.is_match(name) {
        anyhow::bail!(
            "Invalid database name: {}. Database name must match {}",
            name,
            DATABASE_NAME_PATTERN
        );
    }
    Ok(())
}

fn connect_options(config: &PostgresConfig) -> Result<PgConnectOptions> {
    let (host, port) = config.host_port()?;
    Ok(PgConnectOptions::new()
        .host(&host)
        .port(port)
        .username(&config.username)
        .password(&config.password)
        .database(&config.database))
}

/// Sort a driver error into the store taxonomy.
///
/// `id` names the entity the statement was about, when there is one.
fn classify(err: sqlx::Error, id: Option<&str>) -> StoreError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => {
            warn!("Database connectivity failure: {}", err);
            StoreError::connectivity(err.to_string())
        }
        sqlx::Error::RowNotFound => StoreError::not_found(id.unwrap_or_default()),
        sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some("23505") => {
            match id {
                Some(id) => StoreError::duplicate(id),
                None => StoreError::persistence(db_err.message()),
            }
        }
        other => StoreError::persistence(other.to_string()),
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

// Helper struct for sqlx query_as
#[derive(sqlx::FromRow)]
struct EntityRow {
    uuid: String,
    data: Option<String>,
}

impl From<EntityRow> for Entity {
    fn from(r: EntityRow) -> Self {
        Entity {
            id: r.uuid,
            data: r.data.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl EntityStore for PgStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    async fn get(&self, id: &str) -> StoreResult<Entity> {
        let row: Option<EntityRow> =
            sqlx::query_as("SELECT uuid, data FROM entity WHERE uuid = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| classify(e, Some(id)))?;

        row.map(Entity::from)
            .ok_or_else(|| StoreError::not_found(id))
    }

    async fn list(&self, query: &ListQuery) -> StoreResult<Vec<Entity>> {
        let rows: Vec<EntityRow> = sqlx::query_as(
            r#"
            SELECT uuid, data FROM entity
            WHERE COALESCE(data, '') LIKE $1
            ORDER BY uuid
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(query.pattern.as_sql())
        .bind(to_i64(query.limit))
        .bind(to_i64(query.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify(e, None))?;

        Ok(rows.into_iter().map(Entity::from).collect())
    }

    async fn insert(&self, entity: &Entity) -> StoreResult<()> {
        sqlx::query(INSERT_SQL)
            .bind(&entity.id)
            .bind(&entity.data)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, Some(&entity.id)))?;

        Ok(())
    }

    async fn update(&self, id: &str, data: &str) -> StoreResult<Entity> {
        let row: Option<EntityRow> =
            sqlx::query_as("UPDATE entity SET data = $1 WHERE uuid = $2 RETURNING uuid, data")
                .bind(data)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| classify(e, Some(id)))?;

        // Zero rows touched means the id does not exist
        row.map(Entity::from)
            .ok_or_else(|| StoreError::not_found(id))
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM entity WHERE uuid = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, Some(id)))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(id));
        }
        Ok(())
    }

    async fn insert_batch(&self, entities: &[Entity]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| classify(e, None))?;

        // The statement is prepared once on this connection and reused
        for entity in entities {
            let inserted = sqlx::query(INSERT_SQL)
                .bind(&entity.id)
                .bind(&entity.data)
                .execute(&mut *tx)
                .await;

            if let Err(e) = inserted {
                let err = classify(e, Some(&entity.id));
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback of entity batch failed: {}", rollback_err);
                }
                return Err(err);
            }
        }

        tx.commit().await.map_err(|e| classify(e, None))?;
        Ok(())
    }

    async fn count(&self) -> StoreResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entity")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, None))?;

        Ok(usize::try_from(count).unwrap_or_default())
    }
}
