//! Unified error interface.
//!
//! Every error enum in the berth workspace implements [`ErrorCode`] so that
//! failure envelopes and logs can carry a stable machine-readable code next
//! to the human-readable text.

/// Stable machine-readable error metadata.
///
/// Codes are `UPPER_SNAKE_CASE`, prefixed by the owning layer (`EXT_`,
/// `ARTIFACT_`, `STORE_`, `ENGINE_`), and never change once published.
/// `is_recoverable` tells callers whether retrying can possibly help.
pub trait ErrorCode {
    /// Returns the stable code for this error.
    fn code(&self) -> &'static str;

    /// Returns `true` when a retry may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that every error follows the code conventions: non-empty,
/// `UPPER_SNAKE_CASE`, and carrying the expected layer prefix.
///
/// Intended for the exhaustive per-enum tests each crate keeps next to its
/// error type.
///
/// # Panics
///
/// Panics with a descriptive message on the first violation.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        let code = err.code();
        assert!(!code.is_empty(), "error code must not be empty");
        assert!(
            code.starts_with(expected_prefix),
            "error code '{code}' must start with '{expected_prefix}'"
        );
        assert!(
            is_upper_snake_case(code),
            "error code '{code}' must be UPPER_SNAKE_CASE"
        );
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    !s.starts_with('_')
        && !s.ends_with('_')
        && !s.contains("__")
        && s.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
