/// Database models for Taskdeck
///
/// # Models
///
/// - `profile`: user profiles provisioned on first login, and `ProfileStore`
/// - `project`: projects (read-only here)
/// - `task`: tasks with their parent project summary (read-only here)

pub mod profile;
pub mod project;
pub mod task;
