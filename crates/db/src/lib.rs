//! Sqlite persistence for Lucy sessions and acceptance records.

pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use repositories::{
    AcceptanceRepository, InMemoryAcceptanceRepository, InMemorySessionRepository,
    RepositoryError, SessionRepository, SqlAcceptanceRepository, SqlSessionRepository,
};
