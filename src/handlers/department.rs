use actix_web::{web, HttpResponse};

use crate::errors::AppError;
use crate::services::employee::EmployeeService;
use crate::utils::jwt::AuthenticatedUser;

pub async fn get_departments(
    _user: AuthenticatedUser,
    service: web::Data<EmployeeService>,
) -> Result<HttpResponse, AppError> {
    let departments = service.departments().await?;
    Ok(HttpResponse::Ok().json(departments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationLimits;
    use crate::testing::{InMemoryBlobStore, InMemoryRepository};
    use crate::utils::jwt::{generate_token, JwtSecret};
    use actix_web::{test, App};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    #[actix_web::test]
    async fn lists_every_department() {
        let secret = JwtSecret("test-secret".to_string());
        let token = generate_token("hr@example.com", &secret);
        let service = EmployeeService::new(
            Arc::new(InMemoryRepository::with_departments()),
            Arc::new(InMemoryBlobStore::default()),
            ValidationLimits::default(),
            Duration::from_secs(5),
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service))
                .app_data(web::Data::new(secret))
                .route("/v1/department", web::get().to(get_departments)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/v1/department")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(
            body,
            json!([
                {"dept_no": "d001", "dept_name": "Marketing"},
                {"dept_no": "d002", "dept_name": "Finance"}
            ])
        );
    }
}
