//! PostgreSQL adapters for presence persistence.

mod identity_repository;
mod room_repository;

pub use identity_repository::PostgresIdentityRepository;
pub use room_repository::PostgresRoomRepository;
