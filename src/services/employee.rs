use chrono::Utc;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ValidationLimits;
use crate::db::EmployeeRepository;
use crate::errors::{AppError, FieldErrors};
use crate::models::department::Department;
use crate::models::employee::{Employee, EmployeeForm};
use crate::models::pagination::{ListQuery, Paginated};
use crate::storage::{photo_key, BlobStore, StorageError, PHOTO_PREFIX};

const ALLOWED_PHOTO_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];

/// File part of a creation request as read off the wire.
#[derive(Debug, Clone, Default)]
pub struct PhotoUpload {
    pub bytes: Vec<u8>,
    /// The part was longer than the configured limit and was not kept in full.
    pub truncated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CreateEmployeeRequest {
    pub form: EmployeeForm,
    pub photo: Option<PhotoUpload>,
}

#[derive(Debug)]
struct ValidatedPhoto {
    bytes: Vec<u8>,
    mime_type: &'static str,
    extension: &'static str,
}

fn validate_photo(upload: PhotoUpload, max_bytes: usize) -> Result<ValidatedPhoto, String> {
    if upload.truncated || upload.bytes.len() > max_bytes {
        return Err(format!(
            "The photo field must not be greater than {} kilobytes.",
            max_bytes / 1024
        ));
    }

    let file_type = infer::get(&upload.bytes)
        .filter(|t| ALLOWED_PHOTO_TYPES.contains(&t.mime_type()))
        .ok_or_else(|| "The photo field must be a file of type: jpeg, png, jpg, gif.".to_string())?;

    Ok(ValidatedPhoto {
        mime_type: file_type.mime_type(),
        extension: file_type.extension(),
        bytes: upload.bytes,
    })
}

pub struct EmployeeService {
    repo: Arc<dyn EmployeeRepository>,
    blobs: Arc<dyn BlobStore>,
    limits: ValidationLimits,
    transaction_timeout: Duration,
}

impl EmployeeService {
    pub fn new(
        repo: Arc<dyn EmployeeRepository>,
        blobs: Arc<dyn BlobStore>,
        limits: ValidationLimits,
        transaction_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            blobs,
            limits,
            transaction_timeout,
        }
    }

    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    pub async fn list(&self, query: &ListQuery, path: &str) -> Result<Paginated<Employee>, AppError> {
        let (employees, total) = self.repo.list_employees(query).await?;
        Ok(Paginated::new(employees, total, query, path))
    }

    pub async fn find(&self, emp_no: i32) -> Result<Employee, AppError> {
        self.repo
            .find_employee(emp_no)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", emp_no)))
    }

    pub async fn departments(&self) -> Result<Vec<Department>, AppError> {
        Ok(self.repo.list_departments().await?)
    }

    pub async fn photo(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        match self.blobs.get(key).await {
            Ok(bytes) => Ok(bytes),
            Err(StorageError::InvalidKey(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Validates, allocates the next emp_no and stores the row with its photo as one unit.
    pub async fn create(&self, request: CreateEmployeeRequest) -> Result<i32, AppError> {
        let CreateEmployeeRequest { form, photo } = request;
        let old = form.old_input();

        let mut errors = FieldErrors::new();
        let employee = match form.to_new_employee(&self.limits) {
            Ok(employee) => Some(employee),
            Err(field_errors) => {
                errors.extend(field_errors);
                None
            }
        };

        let photo = match photo.map(|upload| validate_photo(upload, self.limits.photo_max_bytes)) {
            Some(Ok(photo)) => Some(photo),
            Some(Err(message)) => {
                errors.insert("photo".to_string(), message);
                None
            }
            None => None,
        };

        if !form.dept_no.is_empty() && !errors.contains_key("dept_no") {
            match self.repo.department_exists(&form.dept_no).await {
                Ok(true) => {}
                Ok(false) => {
                    errors.insert("dept_no".to_string(), "The selected dept no is invalid.".to_string());
                }
                Err(err) => {
                    error!("Department lookup failed: {}", err);
                    return Err(AppError::PersistenceFailed { old });
                }
            }
        }

        let employee = match employee {
            Some(employee) if errors.is_empty() => employee,
            _ => {
                warn!("Rejected employee submission: {:?}", errors.keys().collect::<Vec<_>>());
                return Err(AppError::ValidationFailed { errors, old });
            }
        };

        let stored_key = match photo {
            Some(photo) => {
                let key = photo_key(photo.extension);
                if let Err(err) = self.blobs.put(&key, photo.bytes, photo.mime_type).await {
                    error!("Photo upload failed: {}", err);
                    return Err(AppError::PersistenceFailed { old });
                }
                Some(key)
            }
            None => None,
        };

        let outcome = tokio::time::timeout(
            self.transaction_timeout,
            self.repo.insert_with_next_emp_no(&employee, stored_key.as_deref()),
        )
        .await;

        match outcome {
            Ok(Ok(emp_no)) => Ok(emp_no),
            Ok(Err(err)) => {
                error!("Transaction failed: {}", err);
                if let Some(key) = stored_key {
                    self.discard_photo(&key).await;
                }
                Err(AppError::PersistenceFailed { old })
            }
            Err(_) => {
                // The commit may still land; an unreferenced photo is left to the orphan sweep.
                error!(
                    "Transaction timed out after {:?}; photo {:?} left for reconciliation",
                    self.transaction_timeout, stored_key
                );
                Err(AppError::PersistenceFailed { old })
            }
        }
    }

    async fn discard_photo(&self, key: &str) {
        if let Err(err) = self.blobs.delete(key).await {
            warn!("Failed to remove photo {} after rollback: {}", key, err);
        }
    }

    /// Deletes stored photos that no employee references and that are older than `grace`.
    pub async fn reconcile_orphans(&self, grace: Duration) -> Result<usize, AppError> {
        let cutoff = match chrono::Duration::from_std(grace)
            .ok()
            .and_then(|grace| Utc::now().checked_sub_signed(grace))
        {
            Some(cutoff) => cutoff,
            None => return Ok(0),
        };

        let referenced = self.repo.photo_references().await?;
        let stored = self.blobs.list(PHOTO_PREFIX).await?;

        let mut removed = 0;
        for blob in stored {
            if referenced.contains(&blob.key) || blob.modified >= cutoff {
                continue;
            }
            match self.blobs.delete(&blob.key).await {
                Ok(()) => removed += 1,
                Err(err) => warn!("Failed to remove orphaned photo {}: {}", blob.key, err),
            }
        }

        if removed > 0 {
            info!("Removed {} orphaned photo(s)", removed);
        }
        Ok(removed)
    }
}

/// Runs the orphan sweep every `interval` for the life of the process.
pub fn spawn_orphan_sweeper(service: Arc<EmployeeService>, interval: Duration, grace: Duration) {
    if interval.is_zero() {
        info!("Orphaned photo sweep disabled");
        return;
    }

    actix_web::rt::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(err) = service.reconcile_orphans(grace).await {
                error!("Orphaned photo sweep failed: {}", err);
            }
        }
    });
}
