/// PostgreSQL plumbing
///
/// - `pool`: connection pool with fail-fast acquisition
/// - `migrations`: embedded schema migrations
///
/// Queries themselves live on the models; transactions are driven by
/// [`crate::store::postgres::PgStore`].

pub mod migrations;
pub mod pool;
