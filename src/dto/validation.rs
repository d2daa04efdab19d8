//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::dto::quiz::QuestionInput;

/// Number of characters in a session join code.
pub const JOIN_CODE_LENGTH: usize = 6;

/// Validates that a join code is exactly [`JOIN_CODE_LENGTH`] ASCII alphanumeric characters.
///
/// Case is not checked here: codes are normalised to uppercase by the lobby service.
///
/// # Examples
///
/// ```ignore
/// validate_join_code("K7QX2M") // Ok
/// validate_join_code("k7qx2m") // Ok
/// validate_join_code("K7QX2")  // Err - too short
/// validate_join_code("K7-X2M") // Err - punctuation
/// ```
pub fn validate_join_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != JOIN_CODE_LENGTH {
        let mut err = ValidationError::new("join_code_length");
        err.message = Some(
            format!(
                "Join code must be exactly {JOIN_CODE_LENGTH} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("join_code_format");
        err.message = Some("Join code must contain only letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Rejects blank strings (whitespace only).
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Cross-field check: the correct index must point at an existing, non-blank option.
pub fn validate_question(question: &QuestionInput) -> Result<(), ValidationError> {
    if question.correct_index >= question.options.len() {
        let mut err = ValidationError::new("correct_index_range");
        err.message = Some(
            format!(
                "correct_index {} is out of range for {} options",
                question.correct_index,
                question.options.len()
            )
            .into(),
        );
        return Err(err);
    }

    if question.options.iter().any(|option| option.trim().is_empty()) {
        let mut err = ValidationError::new("blank_option");
        err.message = Some("Options must not be blank".into());
        return Err(err);
    }

    Ok(())
}
