//! # SoftDesk Shared Library
//!
//! Domain core of SoftDesk: the authorization model, the contributor
//! membership mechanism it rests on, and the Project → Issue → Comment
//! hierarchy it guards. The API server is a thin HTTP layer over this crate.
//!
//! ## Module Organization
//!
//! - `models`: Persisted entities and their PostgreSQL queries
//! - `store`: Transactional persistence seam (PostgreSQL and in-memory)
//! - `auth`: Passwords, JWTs, bearer resolution and the Authorization Engine
//! - `service`: Identity, membership and hierarchy operations
//! - `error`: Domain error taxonomy
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod store;

/// Current version of the SoftDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
