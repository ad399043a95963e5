//! PostgreSQL SQL dialect implementation

use super::SqlDialect;

/// PostgreSQL SQL dialect
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn ilike(&self, col: &str, placeholder: &str) -> String {
        format!("{}::TEXT ILIKE {} ESCAPE '\\'", col, placeholder)
    }

    fn equals_ignore_case(&self, col: &str, placeholder: &str) -> String {
        format!("LOWER({}::TEXT) = LOWER({})", col, placeholder)
    }

    fn date_param(&self, placeholder: &str) -> String {
        format!("CAST({} AS DATE)", placeholder)
    }
}
