//! Event log migrations - embedded SQL files
//!
//! Compiled into the binary with include_str! and applied in name order.

/// All log migrations as (filename, sql_content).
///
/// New migrations go in a new NNN_description.sql file with an entry here.
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
