use async_trait::async_trait;
use log::info;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashSet;

use crate::config::Settings;
use crate::models::department::Department;
use crate::models::employee::{Employee, NewEmployee};
use crate::models::pagination::ListQuery;

mod postgres;


pub use postgres::PgEmployeeRepository;

pub async fn create_pool(settings: &Settings) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.database_max_connections)
        .connect(&settings.database_url)
        .await?;

    if settings.run_migrations {
        info!("Applying database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    Ok(pool)
}

/// Storage seam for everything the directory reads and writes in the relational store.
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// One page of matching employees plus the total number of matches.
    async fn list_employees(&self, query: &ListQuery) -> Result<(Vec<Employee>, i64), sqlx::Error>;

    async fn find_employee(&self, emp_no: i32) -> Result<Option<Employee>, sqlx::Error>;

    async fn list_departments(&self) -> Result<Vec<Department>, sqlx::Error>;

    async fn department_exists(&self, dept_no: &str) -> Result<bool, sqlx::Error>;

    /// Allocates `max(emp_no) + 1` and inserts the row in a single transaction.
    async fn insert_with_next_emp_no(
        &self,
        employee: &NewEmployee,
        photo: Option<&str>,
    ) -> Result<i32, sqlx::Error>;

    async fn photo_references(&self) -> Result<HashSet<String>, sqlx::Error>;
}
