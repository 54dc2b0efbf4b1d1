//! Validation Utilities

use validator::ValidationErrors;

use super::error::RepositoryError;

/// Convert validation errors to RepositoryError
pub fn validation_error(errors: ValidationErrors) -> RepositoryError {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, message)
            })
        })
        .collect();
    messages.sort();

    if messages.is_empty() {
        RepositoryError::Validation("Validation failed".into())
    } else {
        RepositoryError::Validation(messages.join(", "))
    }
}
