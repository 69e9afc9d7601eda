//! Breakout module - rooms and the partitioning that fills them.

mod errors;
mod partition;
mod room;

pub use errors::BreakoutError;
pub use partition::{
    max_room_count, partition, shuffle, validate_room_count, PartitionError, RoomPartitioner,
};
pub use room::Room;
