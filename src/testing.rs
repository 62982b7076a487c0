//! In-memory fakes for the repository and blob store, plus fixtures.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::db::EmployeeRepository;
use crate::models::department::Department;
use crate::models::employee::{Employee, EmployeeForm, NewEmployee};
use crate::models::pagination::{ListQuery, SortDirection, PER_PAGE};
use crate::storage::{BlobStore, StorageError, StoredBlob};

pub fn png_bytes() -> Vec<u8> {
    vec![
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D',
        b'R', 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00,
    ]
}

pub fn gif_bytes() -> Vec<u8> {
    let mut bytes = b"GIF89a".to_vec();
    bytes.extend_from_slice(&[0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x3B]);
    bytes
}

pub fn form() -> EmployeeForm {
    EmployeeForm {
        birth_date: "1990-04-12".into(),
        first_name: "Ann".into(),
        last_name: "Lee".into(),
        gender: "F".into(),
        hire_date: "2020-01-06".into(),
        dept_no: "d001".into(),
    }
}

pub fn employee(emp_no: i32, first_name: &str, last_name: &str) -> Employee {
    Employee {
        emp_no,
        birth_date: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
        first_name: first_name.into(),
        last_name: last_name.into(),
        gender: "F".into(),
        hire_date: NaiveDate::from_ymd_opt(2020, 1, 6).unwrap(),
        photo: None,
        dept_no: Some("d001".into()),
    }
}

#[derive(Default)]
pub struct InMemoryRepository {
    employees: Mutex<Vec<Employee>>,
    departments: Vec<Department>,
    fail_inserts: AtomicBool,
    insert_delay: Mutex<Option<Duration>>,
}

impl InMemoryRepository {
    pub fn with_departments() -> Self {
        Self {
            departments: vec![
                Department { dept_no: "d001".into(), dept_name: "Marketing".into() },
                Department { dept_no: "d002".into(), dept_name: "Finance".into() },
            ],
            ..Self::default()
        }
    }

    pub fn seed(&self, employees: Vec<Employee>) {
        self.employees.lock().unwrap().extend(employees);
    }

    pub fn employees(&self) -> Vec<Employee> {
        self.employees.lock().unwrap().clone()
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Makes every insert stall for `delay` before touching the table.
    pub fn delay_inserts(&self, delay: Duration) {
        *self.insert_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl EmployeeRepository for InMemoryRepository {
    async fn list_employees(&self, query: &ListQuery) -> Result<(Vec<Employee>, i64), sqlx::Error> {
        let mut matches: Vec<Employee> = self
            .employees
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                e.emp_no.to_string().contains(&query.search)
                    || e.first_name.contains(&query.search)
                    || e.last_name.contains(&query.search)
            })
            .cloned()
            .collect();

        matches.sort_by_key(|e| e.emp_no);
        if query.order == SortDirection::Desc {
            matches.reverse();
        }

        let total = matches.len() as i64;
        let page = matches
            .into_iter()
            .skip(query.offset() as usize)
            .take(PER_PAGE as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_employee(&self, emp_no: i32) -> Result<Option<Employee>, sqlx::Error> {
        Ok(self
            .employees
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.emp_no == emp_no)
            .cloned())
    }

    async fn list_departments(&self) -> Result<Vec<Department>, sqlx::Error> {
        Ok(self.departments.clone())
    }

    async fn department_exists(&self, dept_no: &str) -> Result<bool, sqlx::Error> {
        Ok(self.departments.iter().any(|d| d.dept_no == dept_no))
    }

    async fn insert_with_next_emp_no(
        &self,
        employee: &NewEmployee,
        photo: Option<&str>,
    ) -> Result<i32, sqlx::Error> {
        let delay = *self.insert_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Protocol("insert rejected".into()));
        }

        let mut employees = self.employees.lock().unwrap();
        let emp_no = employees.iter().map(|e| e.emp_no).max().unwrap_or(0) + 1;
        employees.push(Employee {
            emp_no,
            birth_date: employee.birth_date,
            first_name: employee.first_name.clone(),
            last_name: employee.last_name.clone(),
            gender: employee.gender.as_str().to_string(),
            hire_date: employee.hire_date,
            photo: photo.map(str::to_string),
            dept_no: Some(employee.dept_no.clone()),
        });
        Ok(emp_no)
    }

    async fn photo_references(&self) -> Result<HashSet<String>, sqlx::Error> {
        Ok(self
            .employees
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.photo.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<BTreeMap<String, (Vec<u8>, DateTime<Utc>)>>,
    fail_writes: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn keys(&self) -> Vec<String> {
        self.blobs.lock().unwrap().keys().cloned().collect()
    }

    pub fn insert_at(&self, key: &str, bytes: Vec<u8>, modified: DateTime<Utc>) {
        self.blobs.lock().unwrap().insert(key.to_string(), (bytes, modified));
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("disk full".into()));
        }
        self.insert_at(key, bytes, Utc::now());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.blobs.lock().unwrap().get(key).map(|(bytes, _)| bytes.clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredBlob>, StorageError> {
        let prefix = format!("{}/", prefix);
        Ok(self
            .blobs
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(key, (_, modified))| StoredBlob { key: key.clone(), modified: *modified })
            .collect())
    }
}
