/// Database models for SoftDesk
///
/// This module contains the persisted entities and their PostgreSQL queries.
/// The in-memory store reuses the same types and the `apply` helpers of the
/// update inputs, so both backends share one notion of a partial update.
///
/// # Models
///
/// - `user`: Accounts, including soft-deleted ones
/// - `project`: Root of the resource hierarchy
/// - `contributor`: Membership facts linking users to projects
/// - `issue`: Work items nested under a project
/// - `comment`: Discussion entries nested under an issue

pub mod comment;
pub mod contributor;
pub mod issue;
pub mod project;
pub mod user;
