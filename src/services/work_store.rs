use crate::entities::{prelude::*, work_files, works};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use thiserror::Error;
use uuid::Uuid;

/// A work ready to be persisted. The store assigns row ids and timestamps.
#[derive(Debug, Clone)]
pub struct NewWork {
    pub title: String,
    pub description: String,
    pub access_code: String,
    pub expires_at: chrono::DateTime<Utc>,
    pub files: Vec<NewWorkFile>,
}

#[derive(Debug, Clone)]
pub struct NewWorkFile {
    pub url: String,
    pub storage_key: String,
    pub content_type: Option<String>,
    pub filename: String,
}

#[derive(Error, Debug)]
pub enum InsertError {
    /// The unique index on `access_code` rejected the row. The issuance loop
    /// treats this as a collision and regenerates.
    #[error("access code already taken")]
    DuplicateCode,

    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Durable code -> work mapping. All mutation goes through these operations;
/// the core never caches the mapping in-process.
#[async_trait]
pub trait WorkStore: Send + Sync {
    async fn insert(&self, new_work: NewWork) -> Result<works::Model, InsertError>;

    /// Latest committed work and its files in display order.
    async fn find_by_code(
        &self,
        code: &str,
    ) -> Result<Option<(works::Model, Vec<work_files::Model>)>, DbErr>;

    async fn code_exists(&self, code: &str) -> Result<bool, DbErr>;

    /// Single-statement column increment, safe under concurrent redemptions.
    async fn increment_views(&self, code: &str) -> Result<(), DbErr>;

    /// Returns false if no work carries the code.
    async fn set_status(&self, code: &str, status: &str) -> Result<bool, DbErr>;
}

pub struct SeaOrmWorkStore {
    db: DatabaseConnection,
}

impl SeaOrmWorkStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl WorkStore for SeaOrmWorkStore {
    async fn insert(&self, new_work: NewWork) -> Result<works::Model, InsertError> {
        let now = Utc::now();
        let work_id = Uuid::new_v4().to_string();

        let work = works::ActiveModel {
            id: Set(work_id.clone()),
            title: Set(new_work.title),
            description: Set(new_work.description),
            access_code: Set(new_work.access_code),
            status: Set(works::STATUS_ACTIVE.to_string()),
            views: Set(0),
            expires_at: Set(new_work.expires_at),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let txn = self.db.begin().await?;

        let inserted = match work.insert(&txn).await {
            Ok(model) => model,
            Err(e) => {
                let _ = txn.rollback().await;
                return Err(match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => InsertError::DuplicateCode,
                    _ => InsertError::Db(e),
                });
            }
        };

        for (position, file) in new_work.files.into_iter().enumerate() {
            let row = work_files::ActiveModel {
                id: Set(Uuid::new_v4().to_string()),
                work_id: Set(work_id.clone()),
                url: Set(file.url),
                storage_key: Set(file.storage_key),
                content_type: Set(file.content_type),
                filename: Set(file.filename),
                position: Set(position as i32),
            };
            if let Err(e) = row.insert(&txn).await {
                let _ = txn.rollback().await;
                return Err(InsertError::Db(e));
            }
        }

        txn.commit().await?;
        Ok(inserted)
    }

    async fn find_by_code(
        &self,
        code: &str,
    ) -> Result<Option<(works::Model, Vec<work_files::Model>)>, DbErr> {
        let Some(work) = Works::find()
            .filter(works::Column::AccessCode.eq(code))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let files = WorkFiles::find()
            .filter(work_files::Column::WorkId.eq(&work.id))
            .order_by_asc(work_files::Column::Position)
            .all(&self.db)
            .await?;

        Ok(Some((work, files)))
    }

    async fn code_exists(&self, code: &str) -> Result<bool, DbErr> {
        Ok(Works::find()
            .filter(works::Column::AccessCode.eq(code))
            .one(&self.db)
            .await?
            .is_some())
    }

    async fn increment_views(&self, code: &str) -> Result<(), DbErr> {
        Works::update_many()
            .col_expr(
                works::Column::Views,
                Expr::col(works::Column::Views).add(1),
            )
            .col_expr(works::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(works::Column::AccessCode.eq(code))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn set_status(&self, code: &str, status: &str) -> Result<bool, DbErr> {
        let result = Works::update_many()
            .col_expr(works::Column::Status, Expr::value(status))
            .col_expr(works::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(works::Column::AccessCode.eq(code))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
