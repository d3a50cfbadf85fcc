use crate::core::domain::error::ValidationError;

const MAX_NAME_LENGTH: usize = 64;

/// Validates a guest name before it becomes a domain name.
///
/// Names are limited to ASCII alphanumerics, `-`, `_` and `.`, and may not
/// start with a `.` or `-`.
pub(crate) fn validate_guest_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::Field {
            field: "name".to_string(),
            message: "Name cannot be empty".to_string(),
        });
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::ConstraintViolation(format!(
            "Name length exceeds maximum of {} characters",
            MAX_NAME_LENGTH
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ValidationError::Format(
            "Name can only contain alphanumeric characters, '-', '_' and '.'".to_string(),
        ));
    }

    if name.starts_with('.') || name.starts_with('-') {
        return Err(ValidationError::Format(
            "Name cannot start with '.' or '-'".to_string(),
        ));
    }

    Ok(())
}
