//! In-memory storage adapters.
//!
//! Used when no database is configured and by the test suites.

mod in_memory_identity_repository;
mod in_memory_moderator_directory;
mod in_memory_room_repository;

pub use in_memory_identity_repository::InMemoryIdentityRepository;
pub use in_memory_moderator_directory::InMemoryModeratorDirectory;
pub use in_memory_room_repository::InMemoryRoomRepository;
