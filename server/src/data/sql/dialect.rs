//! SQL dialect trait
//!
//! Filter predicates render through a dialect so the same compiled filter
//! can target the embedded SQLite store or an external Postgres copy.

/// Database-specific SQL fragments used by the filter renderer
pub trait SqlDialect: Send + Sync {
    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Generate a parameter placeholder for the given index (1-based)
    ///
    /// - SQLite: Always returns "?"
    /// - PostgreSQL: Returns "$1", "$2", etc.
    fn placeholder(&self, index: usize) -> String;

    /// Case-insensitive LIKE with `\` as the escape character
    ///
    /// - SQLite: `LOWER(col) LIKE LOWER(?) ESCAPE '\'`
    /// - PostgreSQL: `col ILIKE $1 ESCAPE '\'`
    fn ilike(&self, col: &str, placeholder: &str) -> String {
        format!("LOWER({}) LIKE LOWER({}) ESCAPE '\\'", col, placeholder)
    }

    /// Case-insensitive equality
    fn equals_ignore_case(&self, col: &str, placeholder: &str) -> String {
        format!("LOWER({}) = LOWER({})", col, placeholder)
    }

    /// Wrap a date parameter so it compares as a date
    ///
    /// SQLite stores dates as ISO text, so the bound string is used as is.
    fn date_param(&self, placeholder: &str) -> String {
        placeholder.to_string()
    }

    /// Generate LIMIT/OFFSET clause
    fn limit_offset(&self, limit: u32, offset: u32) -> String {
        format!("LIMIT {} OFFSET {}", limit, offset)
    }
}
