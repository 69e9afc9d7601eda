//! PostgreSQL implementation of RoomRepository.
//!
//! Persists Room records to the `breakout_rooms` table. Members are stored
//! as a `TEXT[]` of user ids.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::breakout::Room;
use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, RoomId, Timestamp, UserId,
};
use crate::ports::RoomRepository;

/// PostgreSQL implementation of RoomRepository.
#[derive(Clone)]
pub struct PostgresRoomRepository {
    pool: PgPool,
}

impl PostgresRoomRepository {
    /// Creates a new PostgresRoomRepository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| DomainError::database(format!("{}: {}", context, e))
}

const ROOM_COLUMNS: &str = "id, event_id, room_index, members, active, created_at";

#[async_trait]
impl RoomRepository for PostgresRoomRepository {
    async fn insert(&self, room: &Room) -> Result<RoomId, DomainError> {
        let members: Vec<String> = room.members().iter().map(|m| m.to_string()).collect();

        sqlx::query(
            r#"
            INSERT INTO breakout_rooms (
                id, event_id, room_index, members, active, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(room.id().as_uuid())
        .bind(room.event_id().as_str())
        .bind(room.index() as i32)
        .bind(&members)
        .bind(room.is_active())
        .bind(room.created_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to insert room"))?;

        Ok(*room.id())
    }

    async fn deactivate_by_event(&self, event_id: &EventId) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "UPDATE breakout_rooms SET active = FALSE WHERE event_id = $1 AND active",
        )
        .bind(event_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to deactivate rooms"))?;

        Ok(result.rows_affected())
    }

    async fn deactivate(&self, room_id: &RoomId) -> Result<(), DomainError> {
        sqlx::query("UPDATE breakout_rooms SET active = FALSE WHERE id = $1")
            .bind(room_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to deactivate room"))?;

        Ok(())
    }

    async fn update_members(&self, room: &Room) -> Result<(), DomainError> {
        let members: Vec<String> = room.members().iter().map(|m| m.to_string()).collect();

        let result = sqlx::query("UPDATE breakout_rooms SET members = $2 WHERE id = $1")
            .bind(room.id().as_uuid())
            .bind(&members)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to update room members"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::RoomNotFound,
                format!("Room not found: {}", room.id()),
            ));
        }

        Ok(())
    }

    async fn find_by_id(&self, room_id: &RoomId) -> Result<Option<Room>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM breakout_rooms WHERE id = $1",
            ROOM_COLUMNS
        ))
        .bind(room_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch room"))?;

        row.map(row_to_room).transpose()
    }

    async fn find_active_by_event(&self, event_id: &EventId) -> Result<Vec<Room>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM breakout_rooms WHERE event_id = $1 AND active ORDER BY room_index",
            ROOM_COLUMNS
        ))
        .bind(event_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch active rooms"))?;

        rows.into_iter().map(row_to_room).collect()
    }

    async fn find_containing_member(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<Vec<Room>, DomainError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM breakout_rooms
            WHERE event_id = $1 AND active AND $2 = ANY(members)
            ORDER BY created_at DESC
            "#,
            ROOM_COLUMNS
        ))
        .bind(event_id.as_str())
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch rooms for member"))?;

        rows.into_iter().map(row_to_room).collect()
    }
}

fn row_to_room(row: sqlx::postgres::PgRow) -> Result<Room, DomainError> {
    let id: uuid::Uuid = row.try_get("id").map_err(db_error("Failed to get id"))?;
    let event_id: String = row
        .try_get("event_id")
        .map_err(db_error("Failed to get event_id"))?;
    let index: i32 = row
        .try_get("room_index")
        .map_err(db_error("Failed to get room_index"))?;
    let members: Vec<String> = row
        .try_get("members")
        .map_err(db_error("Failed to get members"))?;
    let active: bool = row.try_get("active").map_err(db_error("Failed to get active"))?;
    let created_at: chrono::DateTime<chrono::Utc> = row
        .try_get("created_at")
        .map_err(db_error("Failed to get created_at"))?;

    let members = members
        .into_iter()
        .map(UserId::new)
        .collect::<Result<BTreeSet<_>, _>>()?;
    let index = u32::try_from(index).map_err(|_| {
        DomainError::database(format!("Negative room_index {} for room {}", index, id))
    })?;

    Ok(Room::reconstitute(
        RoomId::from_uuid(id),
        EventId::new(event_id)?,
        index,
        members,
        active,
        Timestamp::from_datetime(created_at),
    ))
}
