use std::sync::LazyLock;

use regex::Regex;
use strep_core::Error;

static STUDENT_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{1,20}$").unwrap());

/// Student ids are 1 to 20 ASCII digits.
pub fn validate_student_id(id: &str) -> Result<(), Error> {
    if id.is_empty() {
        return Err(Error::InvalidInput("student ID cannot be empty".into()));
    }
    if !STUDENT_ID.is_match(id) {
        return Err(Error::InvalidInput("student ID must be numeric (1-20 digits)".into()));
    }
    Ok(())
}
