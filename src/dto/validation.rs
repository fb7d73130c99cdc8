//! Validation helpers for DTOs.

use std::collections::HashSet;

use validator::ValidationError;

/// Longest accepted speech transcript.
pub const MAX_TRANSCRIPT_LEN: usize = 500;

/// Validates that a display name is not blank once trimmed.
///
/// # Examples
///
/// ```ignore
/// validate_display_name("Jan Novák") // Ok
/// validate_display_name("   ")       // Err - blank
/// ```
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("blank_name");
        err.message = Some("Name must contain at least one visible character".into());
        return Err(err);
    }
    Ok(())
}

/// Validates that an id list does not repeat an entry.
pub fn validate_unique_ids(ids: &[i64]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(ids.len());
    if let Some(duplicate) = ids.iter().find(|id| !seen.insert(**id)) {
        let mut err = ValidationError::new("duplicate_id");
        err.message = Some(format!("Identifier {duplicate} is listed more than once").into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a speech transcript stays within [`MAX_TRANSCRIPT_LEN`] characters.
pub fn validate_transcript(transcript: &str) -> Result<(), ValidationError> {
    let len = transcript.chars().count();
    if len > MAX_TRANSCRIPT_LEN {
        let mut err = ValidationError::new("transcript_length");
        err.message = Some(
            format!("Transcript must be at most {MAX_TRANSCRIPT_LEN} characters (got {len})")
                .into(),
        );
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("Jan").is_ok());
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name(" \t ").is_err());
    }

    #[test]
    fn test_validate_unique_ids() {
        assert!(validate_unique_ids(&[1, 2, 3]).is_ok());
        assert!(validate_unique_ids(&[]).is_ok());
        assert!(validate_unique_ids(&[1, 2, 1]).is_err());
    }

    #[test]
    fn test_validate_transcript() {
        assert!(validate_transcript("bod honza").is_ok());
        assert!(validate_transcript(&"á".repeat(MAX_TRANSCRIPT_LEN)).is_ok());
        assert!(validate_transcript(&"a".repeat(MAX_TRANSCRIPT_LEN + 1)).is_err());
    }
}
