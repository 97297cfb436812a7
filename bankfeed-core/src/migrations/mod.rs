//! Store migrations - embedded SQL files
//!
//! Compiled in with include_str! and applied in order by `MigrationService`.

/// All store migrations as (filename, sql_content), in apply order.
///
/// New migrations get the next NNN_ prefix and an entry at the end.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
