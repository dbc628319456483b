use crate::api::error::AppError;
use crate::entities::work_files;
use crate::services::work_service::UploadedFile;
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Serialize, ToSchema)]
pub struct FileInfo {
    pub url: String,
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

impl From<&work_files::Model> for FileInfo {
    fn from(file: &work_files::Model) -> Self {
        Self {
            url: file.url.clone(),
            name: file.filename.clone(),
            content_type: file.content_type.clone(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuedWorkBody {
    pub title: String,
    pub description: String,
    pub files: Vec<FileInfo>,
    pub access_code: String,
    pub expires_at: chrono::DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub work: IssuedWorkBody,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemedWorkBody {
    pub title: String,
    pub description: String,
    pub files: Vec<FileInfo>,
    pub views: i64,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct ViewWorkResponse {
    pub message: String,
    pub work: RedeemedWorkBody,
}

#[derive(Serialize, ToSchema)]
pub struct DeactivateResponse {
    pub message: String,
}

#[derive(Deserialize, IntoParams)]
pub struct ViewWorkQuery {
    /// Access code, case-insensitive
    pub code: Option<String>,
}

#[derive(Validate)]
struct UploadMeta {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    title: String,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    description: String,
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = Multipart, description = "Work upload: title, description and up to 10 files"),
    responses(
        (status = 200, description = "Work created and access code issued", body = UploadResponse),
        (status = 400, description = "No files, too many files, or a file over the size cap"),
        (status = 500, description = "Storage failure or code issuance exhausted")
    ),
    tag = "works"
)]
pub async fn upload_work(
    State(state): State<crate::AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut files: Vec<UploadedFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "files" || name == "file" {
            let filename = field.file_name().unwrap_or("unnamed").to_string();
            let content_type = field.content_type().map(|s| s.to_string());

            let data = field.bytes().await.map_err(|e| {
                let err_msg = e.to_string();
                if err_msg.contains("length limit exceeded") {
                    AppError::InvalidInput(
                        "Request body exceeds the maximum allowed limit".to_string(),
                    )
                } else {
                    AppError::InvalidInput(err_msg)
                }
            })?;

            files.push(UploadedFile {
                filename,
                content_type,
                data,
            });
        } else if name == "title" {
            title = Some(
                field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Invalid title field: {}", e)))?,
            );
        } else if name == "description" {
            description = Some(field.text().await.map_err(|e| {
                AppError::InvalidInput(format!("Invalid description field: {}", e))
            })?);
        }
    }

    let meta = UploadMeta {
        title: title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Untitled".to_string()),
        description: description.unwrap_or_default(),
    };
    meta.validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let issued = state
        .work_service
        .create_work(meta.title, meta.description, files)
        .await?;

    Ok(Json(UploadResponse {
        message: "Work created successfully".to_string(),
        work: IssuedWorkBody {
            title: issued.work.title,
            description: issued.work.description,
            files: issued
                .files
                .iter()
                .map(|f| FileInfo {
                    url: f.url.clone(),
                    name: f.filename.clone(),
                    content_type: f.content_type.clone(),
                })
                .collect(),
            access_code: issued.work.access_code,
            expires_at: issued.work.expires_at,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/view-work",
    params(ViewWorkQuery),
    responses(
        (status = 200, description = "Work found, view recorded", body = ViewWorkResponse),
        (status = 400, description = "Missing access code"),
        (status = 404, description = "Unknown, expired, or empty work")
    ),
    tag = "works"
)]
pub async fn view_work(
    State(state): State<crate::AppState>,
    Query(query): Query<ViewWorkQuery>,
) -> Result<Json<ViewWorkResponse>, AppError> {
    let code = query
        .code
        .ok_or_else(|| AppError::InvalidInput("Access code is required".to_string()))?;

    let redeemed = state.redemption.redeem(&code).await?;

    Ok(Json(ViewWorkResponse {
        message: "Work found".to_string(),
        work: RedeemedWorkBody {
            title: redeemed.title,
            description: redeemed.description,
            files: redeemed.files.iter().map(FileInfo::from).collect(),
            views: redeemed.views,
            created_at: redeemed.created_at,
        },
    }))
}

#[utoipa::path(
    patch,
    path = "/works/{code}/deactivate",
    params(
        ("code" = String, Path, description = "Access code to deactivate")
    ),
    responses(
        (status = 200, description = "Access code deactivated", body = DeactivateResponse),
        (status = 404, description = "No work carries this code")
    ),
    tag = "works"
)]
pub async fn deactivate_work(
    State(state): State<crate::AppState>,
    Path(code): Path<String>,
) -> Result<Json<DeactivateResponse>, AppError> {
    state.work_service.deactivate(&code).await?;

    Ok(Json(DeactivateResponse {
        message: "Access code deactivated".to_string(),
    }))
}
