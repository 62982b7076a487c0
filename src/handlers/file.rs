use actix_web::http::header;
use actix_web::{web, HttpResponse};

use crate::errors::AppError;
use crate::services::employee::EmployeeService;

/// Public photo download; keys come from the `photo` column of an employee row.
pub async fn get_photo(
    service: web::Data<EmployeeService>,
    key: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let key = key.into_inner();
    let bytes = service
        .photo(&key)
        .await?
        .ok_or_else(|| AppError::NotFound("Photo not found".to_string()))?;

    let content_type = infer::get(&bytes)
        .map(|t| t.mime_type())
        .unwrap_or("application/octet-stream");

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, content_type))
        .insert_header((header::CACHE_CONTROL, "public, max-age=86400"))
        .body(bytes))
}
