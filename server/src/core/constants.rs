// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "Coachyard";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "coachyard";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".coachyard";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "coachyard.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "COACHYARD_CONFIG";

// =============================================================================
// Environment Variables - Logging
// =============================================================================

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "COACHYARD_DEBUG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "COACHYARD_LOG";

// =============================================================================
// Environment Variables - Database
// =============================================================================

/// Environment variable for the SQLite database path
pub const ENV_DATABASE_PATH: &str = "COACHYARD_DATABASE_PATH";

// =============================================================================
// Environment Variables - Filters
// =============================================================================

/// Environment variable for the filter JSON size limit
pub const ENV_FILTER_MAX_JSON_BYTES: &str = "COACHYARD_FILTER_MAX_JSON_BYTES";

/// Environment variable for the filter condition count limit
pub const ENV_FILTER_MAX_CONDITIONS: &str = "COACHYARD_FILTER_MAX_CONDITIONS";

// =============================================================================
// Environment Variables - Audit
// =============================================================================

/// Environment variable for the natural identifier used to tag array diffs
pub const ENV_AUDIT_IDENTITY_FIELD: &str = "COACHYARD_AUDIT_IDENTITY_FIELD";

/// Environment variable to toggle change notifications
pub const ENV_AUDIT_NOTIFY: &str = "COACHYARD_AUDIT_NOTIFY";

/// Environment variable for the change notification channel capacity
pub const ENV_AUDIT_NOTIFY_CAPACITY: &str = "COACHYARD_AUDIT_NOTIFY_CAPACITY";

/// Environment variable for the acting user recorded in audit entries
pub const ENV_ACTOR: &str = "COACHYARD_ACTOR";

// =============================================================================
// Audit Defaults
// =============================================================================

/// Default change notification channel capacity
pub const DEFAULT_NOTIFY_CAPACITY: usize = 1024;

/// Actor recorded when none is configured
pub const DEFAULT_ACTOR: &str = "system";

/// Default page size for audit log listings
pub const DEFAULT_AUDIT_PAGE_SIZE: u32 = 50;

/// Default page size for coach searches
pub const DEFAULT_SEARCH_PAGE_SIZE: u32 = 100;

// =============================================================================
// SQLite Database
// =============================================================================

/// SQLite database filename
pub const SQLITE_DB_FILENAME: &str = "coachyard.db";

/// SQLite connection pool max connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// SQLite cache size (negative = KB, so -64000 = 64MB)
pub const SQLITE_CACHE_SIZE: &str = "-64000";

/// SQLite WAL auto-checkpoint threshold (pages, ~4MB at 1000)
pub const SQLITE_WAL_AUTOCHECKPOINT: &str = "1000";

/// Maximum bound parameters per statement, below SQLite's default limit
pub const SQLITE_MAX_BIND_PARAMS: usize = 900;
