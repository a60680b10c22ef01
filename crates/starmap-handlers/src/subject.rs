use crate::error::StarmapError;

/// GitHub's limit on username length.
const MAX_SUBJECT_LEN: usize = 39;

/// Check a requested username against GitHub's login rules.
///
/// Returns the trimmed username. Case is preserved; cache keys lowercase it.
pub fn validate_subject(raw: &str) -> Result<String, StarmapError> {
    let subject = raw.trim();
    let invalid = |reason: &str| StarmapError::InvalidSubject {
        subject: subject.to_string(),
        reason: reason.to_string(),
    };

    if subject.is_empty() {
        return Err(invalid("username is empty"));
    }
    if subject.len() > MAX_SUBJECT_LEN {
        return Err(invalid("username is longer than 39 characters"));
    }
    if !subject
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-')
    {
        return Err(invalid("only letters, digits and hyphens are allowed"));
    }
    if subject.starts_with('-') || subject.ends_with('-') {
        return Err(invalid("username cannot start or end with a hyphen"));
    }

    Ok(subject.to_string())
}
