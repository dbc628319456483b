use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A shared work: one access code owns exactly one work.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "works")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub description: String,
    #[sea_orm(unique)]
    pub access_code: String,
    /// "active" or "expired". Natural expiry is evaluated lazily against
    /// `expires_at`; this column only flips on manual deactivation.
    pub status: String,
    pub views: i64,
    pub expires_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::work_files::Entity")]
    WorkFiles,
}

impl Related<super::work_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkFiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_EXPIRED: &str = "expired";
