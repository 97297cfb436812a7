//! Log database migrations - embedded SQL files
//!
//! Applied to logs.duckdb by `LoggingService`, tracked in the same
//! sys_migrations layout as the store database.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
