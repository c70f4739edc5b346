//! Validation helpers for DTOs.

use validator::ValidationError;

/// Maximum nickname length in characters.
pub const NICKNAME_MAX_CHARS: usize = 24;

/// Validates a player nickname: 1 to 24 characters, no control characters,
/// and no `/` since the nickname becomes part of the player's store path.
///
/// Callers are expected to trim surrounding whitespace first.
pub fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    let chars = nickname.chars().count();
    if chars == 0 || chars > NICKNAME_MAX_CHARS {
        let mut err = ValidationError::new("nickname_length");
        err.message = Some(
            format!("Nickname must be between 1 and {NICKNAME_MAX_CHARS} characters (got {chars})")
                .into(),
        );
        return Err(err);
    }

    if nickname.chars().any(|c| c.is_control() || c == '/') {
        let mut err = ValidationError::new("nickname_format");
        err.message = Some("Nickname must not contain control characters or `/`".into());
        return Err(err);
    }

    Ok(())
}
