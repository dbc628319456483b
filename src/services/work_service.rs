use crate::api::error::AppError;
use crate::config::UploadConfig;
use crate::entities::works;
use crate::services::code::CodeGenerator;
use crate::services::code::normalize_code;
use crate::services::storage::StorageService;
use crate::services::work_store::{InsertError, NewWork, NewWorkFile, WorkStore};
use crate::utils::validation::sanitize_filename;
use bytes::Bytes;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// One file as it arrived in the multipart form, fully buffered.
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// The issued work plus the file descriptors for the upload response.
pub struct IssuedWork {
    pub work: works::Model,
    pub files: Vec<NewWorkFile>,
}

pub struct WorkService {
    store: Arc<dyn WorkStore>,
    storage: Arc<dyn StorageService>,
    generator: CodeGenerator,
    config: UploadConfig,
}

impl WorkService {
    pub fn new(
        store: Arc<dyn WorkStore>,
        storage: Arc<dyn StorageService>,
        config: UploadConfig,
    ) -> Self {
        Self {
            store,
            storage,
            generator: CodeGenerator::new(config.code_length),
            config,
        }
    }

    /// Upload the files to storage, then bind them to a freshly issued,
    /// collision-free access code. No partial state is visible to redeemers
    /// until the final insert commits.
    pub async fn create_work(
        &self,
        title: String,
        description: String,
        files: Vec<UploadedFile>,
    ) -> Result<IssuedWork, AppError> {
        if files.is_empty() {
            return Err(AppError::InvalidInput("No files uploaded".to_string()));
        }
        if files.len() > self.config.max_files {
            return Err(AppError::InvalidInput(format!(
                "Too many files: {} (maximum is {})",
                files.len(),
                self.config.max_files
            )));
        }

        let mut stored_files = Vec::with_capacity(files.len());
        for file in files {
            if file.data.len() > self.config.max_file_size {
                self.discard_uploads(&stored_files).await;
                return Err(AppError::InvalidInput(format!(
                    "File '{}' exceeds the {} MB limit",
                    file.filename,
                    self.config.max_file_size / 1024 / 1024
                )));
            }

            let filename = match sanitize_filename(&file.filename) {
                Ok(name) => name,
                Err(e) => {
                    self.discard_uploads(&stored_files).await;
                    return Err(AppError::InvalidInput(e.to_string()));
                }
            };

            let stored = match self
                .storage
                .upload(
                    &self.config.storage_folder,
                    &filename,
                    file.content_type.as_deref(),
                    file.data,
                )
                .await
            {
                Ok(stored) => stored,
                Err(e) => {
                    self.discard_uploads(&stored_files).await;
                    return Err(AppError::Storage {
                        message: "Error uploading files".to_string(),
                        details: format!("Failed to upload file {}: {}", filename, e),
                    });
                }
            };

            stored_files.push(NewWorkFile {
                url: stored.url,
                storage_key: stored.key,
                content_type: file.content_type,
                filename,
            });
        }

        match self.issue(title, description, stored_files.clone()).await {
            Ok(work) => Ok(IssuedWork {
                work,
                files: stored_files,
            }),
            Err(e) => {
                self.discard_uploads(&stored_files).await;
                Err(e)
            }
        }
    }

    /// Nothing references staged objects until the work record commits, so
    /// any failure after an upload must remove them again. Best-effort:
    /// delete errors are logged, not propagated.
    async fn discard_uploads(&self, files: &[NewWorkFile]) {
        for file in files {
            if let Err(e) = self.storage.delete(&file.storage_key).await {
                tracing::warn!(
                    "Failed to delete orphaned upload {}: {}",
                    file.storage_key,
                    e
                );
            }
        }
    }

    /// Bounded issuance loop. The `code_exists` pre-check keeps collisions
    /// out of the common path, but the unique index on `works.access_code`
    /// is the authoritative guard: a duplicate insert regenerates instead of
    /// failing the upload.
    async fn issue(
        &self,
        title: String,
        description: String,
        files: Vec<NewWorkFile>,
    ) -> Result<works::Model, AppError> {
        let expires_at = Utc::now() + Duration::days(self.config.code_ttl_days);

        for _attempt in 0..self.config.code_max_attempts {
            let candidate = self.generator.generate();

            if self.store.code_exists(&candidate).await? {
                continue;
            }

            let new_work = NewWork {
                title: title.clone(),
                description: description.clone(),
                access_code: candidate.clone(),
                expires_at,
                files: files.clone(),
            };

            match self.store.insert(new_work).await {
                Ok(work) => {
                    tracing::info!("Issued access code {} for work {}", work.access_code, work.id);
                    return Ok(work);
                }
                Err(InsertError::DuplicateCode) => {
                    tracing::warn!("Access code {} collided at insert, regenerating", candidate);
                    continue;
                }
                Err(InsertError::Db(e)) => return Err(e.into()),
            }
        }

        Err(AppError::ExhaustedRetries)
    }

    /// Manual deactivation: flips the code to "expired" regardless of the
    /// time remaining to natural expiry. There is no reactivation.
    pub async fn deactivate(&self, code: &str) -> Result<(), AppError> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(AppError::InvalidInput("Access code is required".to_string()));
        }

        let updated = self
            .store
            .set_status(&code, works::STATUS_EXPIRED)
            .await?;
        if !updated {
            return Err(AppError::NotFound("Work not found".to_string()));
        }

        tracing::info!("Access code {} deactivated", code);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{work_files, works};
    use crate::services::storage::InMemoryStorage;
    use crate::services::work_store::InsertError;
    use async_trait::async_trait;
    use sea_orm::DbErr;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Store where every candidate already exists: issuance must exhaust.
    #[derive(Default)]
    struct CollidingStore {
        checks: AtomicU32,
    }

    #[async_trait]
    impl WorkStore for CollidingStore {
        async fn insert(&self, _new_work: NewWork) -> Result<works::Model, InsertError> {
            panic!("insert must not be reached when every candidate exists");
        }

        async fn find_by_code(
            &self,
            _code: &str,
        ) -> Result<Option<(works::Model, Vec<work_files::Model>)>, DbErr> {
            Ok(None)
        }

        async fn code_exists(&self, _code: &str) -> Result<bool, DbErr> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }

        async fn increment_views(&self, _code: &str) -> Result<(), DbErr> {
            Ok(())
        }

        async fn set_status(&self, _code: &str, _status: &str) -> Result<bool, DbErr> {
            Ok(false)
        }
    }

    /// Store whose pre-check passes but whose first insert hits the unique
    /// index, simulating the check-then-insert race losing once.
    #[derive(Default)]
    struct RacyStore {
        duplicate_inserts: AtomicU32,
        inserts: AtomicU32,
    }

    impl RacyStore {
        fn failing_once() -> Self {
            Self {
                duplicate_inserts: AtomicU32::new(1),
                inserts: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl WorkStore for RacyStore {
        async fn insert(&self, new_work: NewWork) -> Result<works::Model, InsertError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            if self
                .duplicate_inserts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(InsertError::DuplicateCode);
            }

            let now = Utc::now();
            Ok(works::Model {
                id: "work-1".to_string(),
                title: new_work.title,
                description: new_work.description,
                access_code: new_work.access_code,
                status: works::STATUS_ACTIVE.to_string(),
                views: 0,
                expires_at: new_work.expires_at,
                created_at: now,
                updated_at: now,
            })
        }

        async fn find_by_code(
            &self,
            _code: &str,
        ) -> Result<Option<(works::Model, Vec<work_files::Model>)>, DbErr> {
            Ok(None)
        }

        async fn code_exists(&self, _code: &str) -> Result<bool, DbErr> {
            Ok(false)
        }

        async fn increment_views(&self, _code: &str) -> Result<(), DbErr> {
            Ok(())
        }

        async fn set_status(&self, _code: &str, _status: &str) -> Result<bool, DbErr> {
            Ok(false)
        }
    }

    /// Store whose insert always fails with a plain database error.
    struct BrokenStore;

    #[async_trait]
    impl WorkStore for BrokenStore {
        async fn insert(&self, _new_work: NewWork) -> Result<works::Model, InsertError> {
            Err(InsertError::Db(DbErr::Custom("disk full".to_string())))
        }

        async fn find_by_code(
            &self,
            _code: &str,
        ) -> Result<Option<(works::Model, Vec<work_files::Model>)>, DbErr> {
            Ok(None)
        }

        async fn code_exists(&self, _code: &str) -> Result<bool, DbErr> {
            Ok(false)
        }

        async fn increment_views(&self, _code: &str) -> Result<(), DbErr> {
            Ok(())
        }

        async fn set_status(&self, _code: &str, _status: &str) -> Result<bool, DbErr> {
            Ok(false)
        }
    }

    fn service_with(store: Arc<dyn WorkStore>) -> WorkService {
        WorkService::new(
            store,
            Arc::new(InMemoryStorage::new()),
            UploadConfig::development(),
        )
    }

    fn one_file() -> Vec<UploadedFile> {
        vec![UploadedFile {
            filename: "a.png".to_string(),
            content_type: Some("image/png".to_string()),
            data: Bytes::from_static(b"\x89PNG"),
        }]
    }

    #[tokio::test]
    async fn test_forced_collisions_exhaust_after_attempt_cap() {
        let store = Arc::new(CollidingStore::default());
        let service = service_with(store.clone());

        let result = service
            .create_work("Portfolio A".to_string(), String::new(), one_file())
            .await;

        assert!(matches!(result, Err(AppError::ExhaustedRetries)));
        assert_eq!(store.checks.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_duplicate_insert_regenerates_and_succeeds() {
        let store = Arc::new(RacyStore::failing_once());
        let service = service_with(store.clone());

        let issued = service
            .create_work("Portfolio A".to_string(), String::new(), one_file())
            .await
            .unwrap();

        assert_eq!(store.inserts.load(Ordering::SeqCst), 2);
        assert_eq!(issued.work.access_code.len(), 8);
        assert_eq!(issued.files.len(), 1);
    }

    #[tokio::test]
    async fn test_no_files_rejected_before_any_storage_call() {
        let storage = Arc::new(InMemoryStorage::new());
        let service = WorkService::new(
            Arc::new(RacyStore::default()),
            storage.clone(),
            UploadConfig::development(),
        );

        let result = service
            .create_work("Portfolio A".to_string(), String::new(), vec![])
            .await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_oversize_file_rejected() {
        let service = service_with(Arc::new(RacyStore::default()));
        let big = vec![UploadedFile {
            filename: "big.png".to_string(),
            content_type: Some("image/png".to_string()),
            data: Bytes::from(vec![0u8; 10 * 1024 * 1024 + 1]),
        }];

        let result = service
            .create_work("Portfolio A".to_string(), String::new(), big)
            .await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_failed_issuance_discards_uploaded_files() {
        let storage = Arc::new(InMemoryStorage::new());
        let service = WorkService::new(
            Arc::new(CollidingStore::default()),
            storage.clone(),
            UploadConfig::development(),
        );

        let result = service
            .create_work("Portfolio A".to_string(), String::new(), one_file())
            .await;

        assert!(matches!(result, Err(AppError::ExhaustedRetries)));
        assert!(
            storage.is_empty(),
            "staged upload must not outlive a failed issuance"
        );
    }

    #[tokio::test]
    async fn test_oversize_file_discards_earlier_uploads() {
        let storage = Arc::new(InMemoryStorage::new());
        let service = WorkService::new(
            Arc::new(RacyStore::default()),
            storage.clone(),
            UploadConfig::development(),
        );

        let files = vec![
            UploadedFile {
                filename: "a.png".to_string(),
                content_type: Some("image/png".to_string()),
                data: Bytes::from_static(b"\x89PNG"),
            },
            UploadedFile {
                filename: "big.png".to_string(),
                content_type: Some("image/png".to_string()),
                data: Bytes::from(vec![0u8; 10 * 1024 * 1024 + 1]),
            },
        ];

        let result = service
            .create_work("Portfolio A".to_string(), String::new(), files)
            .await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(storage.is_empty(), "earlier upload leaked past a rejection");
    }

    #[tokio::test]
    async fn test_database_failure_discards_uploaded_files() {
        let storage = Arc::new(InMemoryStorage::new());
        let service = WorkService::new(
            Arc::new(BrokenStore),
            storage.clone(),
            UploadConfig::development(),
        );

        let result = service
            .create_work("Portfolio A".to_string(), String::new(), one_file())
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(storage.is_empty(), "upload leaked past an insert failure");
    }

    #[tokio::test]
    async fn test_expiry_is_thirty_days_out() {
        let service = service_with(Arc::new(RacyStore::default()));
        let issued = service
            .create_work("Portfolio A".to_string(), String::new(), one_file())
            .await
            .unwrap();

        let ttl = issued.work.expires_at - issued.work.created_at;
        assert!(ttl >= Duration::days(29) && ttl <= Duration::days(31));
    }
}
