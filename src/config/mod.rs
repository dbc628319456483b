use std::env;

/// Upload and code-issuance limits
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Maximum size per uploaded file in bytes (default: 10 MB)
    pub max_file_size: usize,

    /// Maximum number of files per work (default: 10)
    pub max_files: usize,

    /// Access code length, clamped to 6..=8 characters (default: 8)
    pub code_length: usize,

    /// Attempt cap for finding a collision-free code (default: 10)
    pub code_max_attempts: u32,

    /// Days until a freshly issued code expires (default: 30)
    pub code_ttl_days: i64,

    /// Storage folder prefix for uploaded files (default: "show-the-work")
    pub storage_folder: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024, // 10 MB
            max_files: 10,
            code_length: 8,
            code_max_attempts: 10,
            code_ttl_days: 30,
            storage_folder: "show-the-work".to_string(),
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            max_files: env::var("MAX_FILES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_files),

            code_length: env::var("CODE_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(|v: usize| v.clamp(6, 8))
                .unwrap_or(default.code_length),

            code_max_attempts: env::var("CODE_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.code_max_attempts),

            code_ttl_days: env::var("CODE_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.code_ttl_days),

            storage_folder: env::var("STORAGE_FOLDER").unwrap_or(default.storage_folder),
        }
    }

    /// Create config for development and tests (small works, short codes)
    pub fn development() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            max_files: 10,
            code_length: 8,
            code_max_attempts: 10,
            code_ttl_days: 30,
            storage_folder: "show-the-work-dev".to_string(),
        }
    }

    /// Body limit for the whole multipart request: every file at the cap
    /// plus headroom for boundaries and text fields.
    pub fn body_limit(&self) -> usize {
        self.max_file_size * self.max_files + 1024 * 1024
    }
}
