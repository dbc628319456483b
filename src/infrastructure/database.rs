use crate::entities::{work_files, works};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm::{ConnectionTrait, Schema};
use std::env;
use std::time::Duration;
use tracing::info;

const CONNECT_ATTEMPTS: u32 = 3;
const BACKOFF_CAP: Duration = Duration::from_secs(5);

pub async fn setup_database() -> anyhow::Result<DatabaseConnection> {
    let db_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    info!("📂 Database: {}", db_url);

    let mut opt = ConnectOptions::new(&db_url);
    opt.max_connections(50)
        .min_connections(0)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(45))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = connect_with_retry(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

/// Retry the initial connection with exponential backoff capped at 5 seconds.
async fn connect_with_retry(opt: ConnectOptions) -> anyhow::Result<DatabaseConnection> {
    for attempt in 1..=CONNECT_ATTEMPTS {
        match Database::connect(opt.clone()).await {
            Ok(db) => return Ok(db),
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                let backoff =
                    Duration::from_millis(1000 * 2u64.pow(attempt)).min(BACKOFF_CAP);
                tracing::warn!(
                    "Database connection attempt {}/{} failed: {} (retrying in {:?})",
                    attempt,
                    CONNECT_ATTEMPTS,
                    e,
                    backoff
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to connect to database after {} attempts: {}",
                    CONNECT_ATTEMPTS,
                    e
                ));
            }
        }
    }
    unreachable!("connect loop returns or errors on the last attempt")
}

pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    info!("🔄 Running auto-migrations...");

    // Order matters for foreign keys: Works -> WorkFiles
    let stmts = vec![
        (
            "works",
            schema
                .create_table_from_entity(works::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "work_files",
            schema
                .create_table_from_entity(work_files::Entity)
                .if_not_exists()
                .to_owned(),
        ),
    ];

    for (name, stmt) in stmts {
        let stmt = builder.build(&stmt);
        match db.execute(stmt).await {
            Ok(_) => info!("   - Table '{}' checked/created", name),
            Err(e) => tracing::warn!("   - Failed to create table '{}': {}", name, e),
        }
    }

    // The unique index on access_code is the authoritative collision guard
    // for code issuance; the pre-check in the issuance loop is only an
    // optimization.
    let index_updates = vec![
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_works_access_code ON works(access_code)",
        "CREATE INDEX IF NOT EXISTS idx_works_expires_at ON works(expires_at)",
        "CREATE INDEX IF NOT EXISTS idx_work_files_work_id ON work_files(work_id)",
    ];

    for query in index_updates {
        match db
            .execute(sea_orm::Statement::from_string(builder, query))
            .await
        {
            Ok(_) => info!("   - Executed index update: {}", query),
            Err(e) => {
                let err_msg = e.to_string().to_lowercase();
                if err_msg.contains("already exists") {
                    info!("   - Index already present (skipped): {}", query);
                } else {
                    tracing::warn!("   - Index update warning: {} -> {}", query, e);
                }
            }
        }
    }

    Ok(())
}
