//! Boundary parsing for user-entered numbers.
//!
//! The reducer only sees validated integers. Anything typed into a score
//! field goes through here first.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Score input is empty")]
    Empty,

    #[error("Not a whole number: {0:?}")]
    NotANumber(String),

    #[error("Number out of range: {0:?}")]
    OutOfRange(String),
}

/// Parse an optionally signed decimal integer.
pub fn parse_score_input(raw: &str) -> Result<i64, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }

    let digits = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InputError::NotANumber(trimmed.to_string()));
    }

    trimmed
        .parse::<i64>()
        .map_err(|_| InputError::OutOfRange(trimmed.to_string()))
}

/// Parse a magnitude for increment/decrement.
pub fn parse_amount_input(raw: &str) -> Result<u32, InputError> {
    let value = parse_score_input(raw)?;
    if value < 0 {
        return Err(InputError::NotANumber(raw.trim().to_string()));
    }
    u32::try_from(value).map_err(|_| InputError::OutOfRange(raw.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        assert_eq!(parse_score_input("42"), Ok(42));
        assert_eq!(parse_score_input("  -7 "), Ok(-7));
        assert_eq!(parse_score_input("+3"), Ok(3));
        assert_eq!(parse_score_input("0"), Ok(0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_score_input(""), Err(InputError::Empty));
        assert_eq!(parse_score_input("   "), Err(InputError::Empty));
        assert!(matches!(parse_score_input("NaN"), Err(InputError::NotANumber(_))));
        assert!(matches!(parse_score_input("1.5"), Err(InputError::NotANumber(_))));
        assert!(matches!(parse_score_input("12abc"), Err(InputError::NotANumber(_))));
        assert!(matches!(parse_score_input("-"), Err(InputError::NotANumber(_))));
        assert!(matches!(parse_score_input("--1"), Err(InputError::NotANumber(_))));
    }

    #[test]
    fn test_parse_out_of_range() {
        assert!(matches!(
            parse_score_input("99999999999999999999"),
            Err(InputError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount_input("5"), Ok(5));
        assert!(parse_amount_input("-5").is_err());
        assert!(matches!(
            parse_amount_input("5000000000"),
            Err(InputError::OutOfRange(_))
        ));
    }
}
