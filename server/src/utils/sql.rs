//! SQL utility functions

/// Escape SQL LIKE metacharacters (%, _, \) in user input
///
/// Patterns built from the result must use `ESCAPE '\'`.
///
/// # Example
///
/// ```
/// use coachyard_server::utils::sql::escape_like_pattern;
///
/// let pattern = format!("%{}%", escape_like_pattern("100% brake_test"));
/// assert_eq!(pattern, "%100\\% brake\\_test%");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Comma-separated placeholders for an IN list
pub fn in_placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
