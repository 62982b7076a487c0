use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashSet;

use super::EmployeeRepository;
use crate::models::department::Department;
use crate::models::employee::{Employee, NewEmployee};
use crate::models::pagination::{ListQuery, PER_PAGE};

/// Key for the transaction-scoped advisory lock that serializes emp_no allocation.
const EMP_NO_LOCK_KEY: i64 = 0x656d_705f_6e6f; // "emp_no"

// CHAR(4) department codes come back blank-padded; every read trims them here.
const EMPLOYEE_COLUMNS: &str =
    "emp_no, birth_date, first_name, last_name, gender, hire_date, photo, RTRIM(dept_no) AS dept_no";

pub struct PgEmployeeRepository {
    pool: PgPool,
}

impl PgEmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escapes LIKE metacharacters so the filter matches as a literal substring.
pub(crate) fn contains_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_search_filter(builder: &mut QueryBuilder<'_, Postgres>, search: &str) {
    if search.is_empty() {
        return;
    }
    let pattern = contains_pattern(search);
    builder
        .push(" WHERE CAST(emp_no AS TEXT) LIKE ")
        .push_bind(pattern.clone())
        .push(" ESCAPE '\\' OR first_name LIKE ")
        .push_bind(pattern.clone())
        .push(" ESCAPE '\\' OR last_name LIKE ")
        .push_bind(pattern)
        .push(" ESCAPE '\\'");
}

pub(crate) fn build_list_query(query: &ListQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM employees", EMPLOYEE_COLUMNS));
    push_search_filter(&mut builder, &query.search);
    builder
        .push(" ORDER BY emp_no ")
        .push(query.order.as_sql())
        .push(" LIMIT ")
        .push_bind(PER_PAGE)
        .push(" OFFSET ")
        .push_bind(query.offset());
    builder
}

pub(crate) fn build_count_query(query: &ListQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM employees");
    push_search_filter(&mut builder, &query.search);
    builder
}

#[async_trait]
impl EmployeeRepository for PgEmployeeRepository {
    async fn list_employees(&self, query: &ListQuery) -> Result<(Vec<Employee>, i64), sqlx::Error> {
        // Postgres text cannot hold NUL, so no row can contain such a filter.
        if query.search.contains('\0') {
            return Ok((Vec::new(), 0));
        }

        let total = build_count_query(query)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let employees = build_list_query(query)
            .build_query_as::<Employee>()
            .fetch_all(&self.pool)
            .await?;

        Ok((employees, total))
    }

    async fn find_employee(&self, emp_no: i32) -> Result<Option<Employee>, sqlx::Error> {
        sqlx::query_as::<_, Employee>(&format!(
            "SELECT {} FROM employees WHERE emp_no = $1",
            EMPLOYEE_COLUMNS
        ))
        .bind(emp_no)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_departments(&self) -> Result<Vec<Department>, sqlx::Error> {
        sqlx::query_as::<_, Department>(
            "SELECT RTRIM(dept_no) AS dept_no, dept_name FROM departments ORDER BY dept_no",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn department_exists(&self, dept_no: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM departments WHERE dept_no = $1)")
            .bind(dept_no)
            .fetch_one(&self.pool)
            .await
    }

    async fn insert_with_next_emp_no(
        &self,
        employee: &NewEmployee,
        photo: Option<&str>,
    ) -> Result<i32, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Held until commit or rollback, so concurrent creations never read the same maximum.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(EMP_NO_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let latest = sqlx::query_scalar::<_, Option<i32>>("SELECT MAX(emp_no) FROM employees")
            .fetch_one(&mut *tx)
            .await?;
        let emp_no = latest
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| sqlx::Error::Protocol("emp_no range exhausted".to_string()))?;

        sqlx::query(
            "INSERT INTO employees (emp_no, birth_date, first_name, last_name, gender, hire_date, photo, dept_no) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(emp_no)
        .bind(employee.birth_date)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(employee.gender.as_str())
        .bind(employee.hire_date)
        .bind(photo)
        .bind(&employee.dept_no)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(emp_no)
    }

    async fn photo_references(&self) -> Result<HashSet<String>, sqlx::Error> {
        let photos =
            sqlx::query_scalar::<_, String>("SELECT photo FROM employees WHERE photo IS NOT NULL")
                .fetch_all(&self.pool)
                .await?;
        Ok(photos.into_iter().collect())
    }
}
