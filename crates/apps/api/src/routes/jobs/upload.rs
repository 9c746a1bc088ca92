use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use common_services::api::jobs::error::JobsError;
use common_services::api::jobs::interfaces::Upload;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use utoipa::ToSchema;

/// Multipart form accepted by the upload endpoints, for the API docs.
#[derive(ToSchema)]
pub struct UploadRequest {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// `{"planogram": [[label, ...], ...]}` as text.
    pub planogram: Option<String>,
}

/// The `file` part of an upload form plus the optional `planogram` text part.
pub struct UploadForm {
    pub upload: Upload,
    pub planogram: Option<String>,
}

fn bad_request(err: MultipartError) -> JobsError {
    JobsError::BadRequest(err.body_text())
}

/// Spools the `file` part into a temp file under `spool_dir`.
///
/// `spool_dir` should be on the same filesystem as the jobs so the upload can be moved into
/// place without copying. Unknown parts are ignored.
pub async fn read_upload_form(spool_dir: &Path, mut multipart: Multipart) -> Result<UploadForm, JobsError> {
    let mut upload = None;
    let mut planogram = None;

    while let Some(mut field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_owned);
                fs::create_dir_all(spool_dir).await?;
                let temp = NamedTempFile::new_in(spool_dir)?;
                let mut writer = File::from_std(temp.reopen()?);
                let mut size = 0;
                while let Some(chunk) = field.chunk().await.map_err(bad_request)? {
                    size += chunk.len();
                    writer.write_all(&chunk).await?;
                }
                writer.flush().await?;
                debug!("Received upload {file_name:?} ({size} bytes)");
                upload = Some(Upload { file_name, file: temp });
            }
            Some("planogram") => planogram = Some(field.text().await.map_err(bad_request)?),
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| JobsError::BadRequest("missing multipart field `file`".to_owned()))?;
    Ok(UploadForm { upload, planogram })
}
