use validator::ValidationErrors;

use crate::errors::FieldErrors;

/// Keeps the first failing rule per field, the way a form shows one message under each input.
pub fn collect_field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .iter()
        .filter_map(|(field, errs)| {
            errs.first().map(|err| {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("The {} field is invalid.", field.replace('_', " ")));
                (field.to_string(), message)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 1, message = "required"))]
        code: String,
        #[validate(length(max = 2))]
        short_name: String,
    }

    #[test]
    fn one_message_per_field_with_fallback_text() {
        let probe = Probe {
            code: String::new(),
            short_name: "abcd".into(),
        };
        let errors = collect_field_errors(&probe.validate().unwrap_err());
        assert_eq!(errors["code"], "required");
        assert_eq!(errors["short_name"], "The short name field is invalid.");
    }
}
