/// Database layer for Taskdeck
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: embedded schema migrations
///
/// The row types and their stores live in `models` at the crate root.

pub mod migrations;
pub mod pool;
