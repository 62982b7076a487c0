use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::employee::Employee;
use crate::models::pagination::ListQuery;
use crate::services::employee::EmployeeService;
use crate::storage::PhotoUrls;
use crate::utils::jwt::AuthenticatedUser;
use crate::utils::multipart::read_employee_submission;

#[derive(Deserialize)]
pub struct EmployeeQueryParams {
    search: Option<String>,
    order: Option<String>,
    page: Option<String>,
}

#[derive(Serialize)]
struct EmployeeResponse {
    emp_no: i32,
    birth_date: NaiveDate,
    first_name: String,
    last_name: String,
    gender: String,
    hire_date: NaiveDate,
    dept_no: Option<String>,
    photo: Option<String>,
    photo_url: Option<String>,
}

impl EmployeeResponse {
    fn new(employee: Employee, urls: &PhotoUrls) -> Self {
        let photo_url = employee.photo.as_deref().and_then(|key| urls.url_for(key));
        Self {
            emp_no: employee.emp_no,
            birth_date: employee.birth_date,
            first_name: employee.first_name,
            last_name: employee.last_name,
            gender: employee.gender,
            hire_date: employee.hire_date,
            dept_no: employee.dept_no,
            photo: employee.photo,
            photo_url,
        }
    }
}

#[derive(Serialize)]
struct EmployeeCreatedResponse {
    emp_no: i32,
    message: &'static str,
}

pub async fn get_employees(
    _user: AuthenticatedUser,
    req: HttpRequest,
    service: web::Data<EmployeeService>,
    urls: web::Data<PhotoUrls>,
    params: web::Query<EmployeeQueryParams>,
) -> Result<HttpResponse, AppError> {
    let query = ListQuery::from_params(
        params.search.as_deref(),
        params.order.as_deref(),
        params.page.as_deref(),
    );

    let page = service
        .list(&query, req.path())
        .await?
        .map(|employee| EmployeeResponse::new(employee, &urls));

    Ok(HttpResponse::Ok().json(page))
}

pub async fn create_employee(
    user: AuthenticatedUser,
    service: web::Data<EmployeeService>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let request = read_employee_submission(payload, service.limits().photo_max_bytes).await?;
    let emp_no = service.create(request).await?;

    info!("Employee {} created by {}", emp_no, user.subject);

    Ok(HttpResponse::Created().json(EmployeeCreatedResponse {
        emp_no,
        message: "Employee created successfully.",
    }))
}

pub async fn get_employee(
    _user: AuthenticatedUser,
    service: web::Data<EmployeeService>,
    urls: web::Data<PhotoUrls>,
    emp_no: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let raw = emp_no.into_inner();
    let emp_no = raw
        .parse::<i32>()
        .map_err(|_| AppError::NotFound(format!("Employee {} not found", raw)))?;

    let employee = service.find(emp_no).await?;
    Ok(HttpResponse::Ok().json(EmployeeResponse::new(employee, &urls)))
}

pub async fn update_employee(
    _user: AuthenticatedUser,
    _emp_no: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    Err(AppError::NotImplemented("Updating employees is not supported".to_string()))
}

pub async fn delete_employee(
    _user: AuthenticatedUser,
    _emp_no: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    Err(AppError::NotImplemented("Deleting employees is not supported".to_string()))
}
