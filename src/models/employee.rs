use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use validator::{Validate, ValidationError};

use crate::config::ValidationLimits;
use crate::errors::{FieldErrors, OldInput};
use crate::utils::validation::collect_field_errors;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Employee {
    pub emp_no: i32,
    pub birth_date: NaiveDate,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub hire_date: NaiveDate,
    pub photo: Option<String>,
    pub dept_no: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    M,
    F,
}

impl Gender {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "M" => Some(Gender::M),
            "F" => Some(Gender::F),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::M => "M",
            Gender::F => "F",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A creation request that passed every field rule; the department may still be unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmployee {
    pub birth_date: NaiveDate,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub hire_date: NaiveDate,
    pub dept_no: String,
}

/// Raw text fields as submitted in the multipart form.
#[derive(Deserialize, Serialize, Validate, Debug, Clone, Default)]
pub struct EmployeeForm {
    #[validate(
        length(min = 1, message = "The birth date field is required."),
        custom = "validate_date"
    )]
    pub birth_date: String,
    #[validate(length(min = 1, message = "The first name field is required."))]
    pub first_name: String,
    #[validate(length(min = 1, message = "The last name field is required."))]
    pub last_name: String,
    #[validate(
        length(min = 1, message = "The gender field is required."),
        custom = "validate_gender"
    )]
    pub gender: String,
    #[validate(
        length(min = 1, message = "The hire date field is required."),
        custom = "validate_date"
    )]
    pub hire_date: String,
    #[validate(length(min = 1, message = "The dept no field is required."))]
    pub dept_no: String,
}

fn validate_gender(gender: &str) -> Result<(), ValidationError> {
    if gender.is_empty() || Gender::parse(gender).is_some() {
        return Ok(());
    }
    let mut err = ValidationError::new("in");
    err.message = Some(Cow::from("The selected gender is invalid."));
    Err(err)
}

fn validate_date(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || NaiveDate::parse_from_str(value, DATE_FORMAT).is_ok() {
        return Ok(());
    }
    let mut err = ValidationError::new("date");
    err.message = Some(Cow::from("The value is not a valid date."));
    Err(err)
}

impl EmployeeForm {
    /// Sets a text field by its form name; unknown names are ignored.
    pub fn set_field(&mut self, name: &str, value: String) {
        let value = value.trim().to_string();
        match name {
            "birth_date" => self.birth_date = value,
            "first_name" => self.first_name = value,
            "last_name" => self.last_name = value,
            "gender" => self.gender = value,
            "hire_date" => self.hire_date = value,
            "dept_no" => self.dept_no = value,
            _ => {}
        }
    }

    pub fn old_input(&self) -> OldInput {
        [
            ("birth_date", &self.birth_date),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("gender", &self.gender),
            ("hire_date", &self.hire_date),
            ("dept_no", &self.dept_no),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
    }

    /// Applies every field rule and returns the typed record, or one message per failing field.
    pub fn to_new_employee(&self, limits: &ValidationLimits) -> Result<NewEmployee, FieldErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(err) => collect_field_errors(&err),
        };

        check_max_len(&mut errors, "first_name", "first name", &self.first_name, limits.first_name_max_len);
        check_max_len(&mut errors, "last_name", "last name", &self.last_name, limits.last_name_max_len);
        for (field, label, value) in [
            ("first_name", "first name", &self.first_name),
            ("last_name", "last name", &self.last_name),
            ("dept_no", "dept no", &self.dept_no),
        ] {
            check_storable(&mut errors, field, label, value);
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let birth_date = parse_date(&mut errors, "birth_date", &self.birth_date);
        let hire_date = parse_date(&mut errors, "hire_date", &self.hire_date);
        let gender = Gender::parse(&self.gender);

        match (birth_date, hire_date, gender) {
            (Some(birth_date), Some(hire_date), Some(gender)) if errors.is_empty() => Ok(NewEmployee {
                birth_date,
                first_name: self.first_name.clone(),
                last_name: self.last_name.clone(),
                gender,
                hire_date,
                dept_no: self.dept_no.clone(),
            }),
            _ => {
                if gender.is_none() {
                    errors.insert("gender".into(), "The selected gender is invalid.".into());
                }
                Err(errors)
            }
        }
    }
}

fn check_max_len(errors: &mut FieldErrors, field: &str, label: &str, value: &str, max: u64) {
    if errors.contains_key(field) {
        return;
    }
    if value.chars().count() as u64 > max {
        errors.insert(
            field.to_string(),
            format!("The {} field must not be greater than {} characters.", label, max),
        );
    }
}

/// Postgres text columns reject NUL bytes.
fn check_storable(errors: &mut FieldErrors, field: &str, label: &str, value: &str) {
    if !errors.contains_key(field) && value.contains('\0') {
        errors.insert(field.to_string(), format!("The {} field contains invalid characters.", label));
    }
}

fn parse_date(errors: &mut FieldErrors, field: &str, value: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.insert(field.to_string(), "The value is not a valid date.".to_string());
            None
        }
    }
}
