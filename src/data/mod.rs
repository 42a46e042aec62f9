//! Database schema and queries.

pub mod schema;
pub mod settings;
pub mod users;
