use crate::api::error::AppError;
use crate::entities::{work_files, works};
use crate::services::code::normalize_code;
use crate::services::work_store::WorkStore;
use chrono::Utc;
use std::sync::Arc;

/// Content snapshot handed back on a successful redemption. `views` already
/// includes this redemption; concurrent redeemers may each see a count that
/// is stale by one, which is acceptable.
pub struct RedeemedWork {
    pub title: String,
    pub description: String,
    pub files: Vec<work_files::Model>,
    pub views: i64,
    pub created_at: chrono::DateTime<Utc>,
}

pub struct RedemptionService {
    store: Arc<dyn WorkStore>,
}

impl RedemptionService {
    pub fn new(store: Arc<dyn WorkStore>) -> Self {
        Self { store }
    }

    /// Validate a user-supplied code and, if it grants access, record the
    /// view and return the bound content.
    ///
    /// Expiry is evaluated lazily here on every attempt; a code whose
    /// `expires_at` has passed is rejected even if its status column still
    /// says "active".
    pub async fn redeem(&self, input: &str) -> Result<RedeemedWork, AppError> {
        let code = normalize_code(input);
        if code.is_empty() {
            return Err(AppError::InvalidInput(
                "Access code is required".to_string(),
            ));
        }

        let Some((work, files)) = self.store.find_by_code(&code).await? else {
            return Err(AppError::NotFound("Work not found".to_string()));
        };

        if work.status == works::STATUS_EXPIRED || Utc::now() > work.expires_at {
            return Err(AppError::Expired);
        }

        if files.is_empty() {
            return Err(AppError::NoContent);
        }

        self.store.increment_views(&code).await?;

        tracing::info!("Access code {} redeemed (views: {})", code, work.views + 1);

        Ok(RedeemedWork {
            title: work.title,
            description: work.description,
            files,
            views: work.views + 1,
            created_at: work.created_at,
        })
    }
}
