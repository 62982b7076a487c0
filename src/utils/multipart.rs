use actix_multipart::{Field, Multipart};
use futures_util::StreamExt;

use crate::errors::AppError;
use crate::services::employee::{CreateEmployeeRequest, PhotoUpload};

const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Reads the creation form. Text parts fill the form; the `photo` part is kept up to `max_photo_bytes`.
pub async fn read_employee_submission(
    mut payload: Multipart,
    max_photo_bytes: usize,
) -> Result<CreateEmployeeRequest, AppError> {
    let mut request = CreateEmployeeRequest::default();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|err| AppError::BadRequest(format!("Malformed multipart body: {}", err)))?;
        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        if name == "photo" {
            let has_filename = field
                .content_disposition()
                .get_filename()
                .map(|f| !f.is_empty())
                .unwrap_or(false);
            let upload = read_file(&mut field, max_photo_bytes).await?;
            // Browsers send an empty part when no file was chosen.
            if has_filename || !upload.bytes.is_empty() {
                request.photo = Some(upload);
            }
        } else {
            let value = read_text(&mut field, &name).await?;
            request.form.set_field(&name, value);
        }
    }

    Ok(request)
}

async fn read_file(field: &mut Field, limit: usize) -> Result<PhotoUpload, AppError> {
    let mut upload = PhotoUpload::default();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|err| AppError::BadRequest(format!("Failed to read photo: {}", err)))?;
        if upload.truncated {
            continue;
        }
        if upload.bytes.len() + chunk.len() > limit {
            upload.truncated = true;
            upload.bytes.clear();
            continue;
        }
        upload.bytes.extend_from_slice(&chunk);
    }
    Ok(upload)
}

async fn read_text(field: &mut Field, name: &str) -> Result<String, AppError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|err| AppError::BadRequest(format!("Failed to read {}: {}", name, err)))?;
        if bytes.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::BadRequest(format!("Field {} is too large", name)));
        }
        bytes.extend_from_slice(&chunk);
    }
    String::from_utf8(bytes).map_err(|_| AppError::BadRequest(format!("Field {} is not valid UTF-8", name)))
}
