//! PostgreSQL implementation of IdentityRepository.
//!
//! Live connections are a `UUID[]` column on `presence_identities`. Adds are
//! deduplicated in SQL so concurrent connects of the same user cannot record
//! a connection twice.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::foundation::{AuthenticatedUser, ConnectionId, DomainError, UserId};
use crate::ports::IdentityRepository;

/// Profile columns are written only when the row is created; afterwards
/// only the live-connection set changes.
const ADD_LIVE_CONNECTION: &str = r#"
    INSERT INTO presence_identities (user_id, email, display_name, live_connections, updated_at)
    VALUES ($1, $2, $3, ARRAY[$4]::uuid[], now())
    ON CONFLICT (user_id) DO UPDATE SET
        live_connections = CASE
            WHEN $4 = ANY(presence_identities.live_connections)
                THEN presence_identities.live_connections
            ELSE array_append(presence_identities.live_connections, $4)
        END,
        updated_at = now()
"#;

/// PostgreSQL implementation of IdentityRepository.
#[derive(Clone)]
pub struct PostgresIdentityRepository {
    pool: PgPool,
}

impl PostgresIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    async fn add_live_connection(
        &self,
        user: &AuthenticatedUser,
        connection_id: ConnectionId,
    ) -> Result<(), DomainError> {
        sqlx::query(ADD_LIVE_CONNECTION)
            .bind(user.id.as_str())
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(connection_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to add live connection: {}", e)))?;

        Ok(())
    }

    async fn remove_live_connection(
        &self,
        user_id: &UserId,
        connection_id: ConnectionId,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE presence_identities
            SET live_connections = array_remove(live_connections, $2), updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .bind(connection_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to remove live connection: {}", e)))?;

        Ok(())
    }

    async fn find_by_connection_ids(
        &self,
        connection_ids: &[ConnectionId],
    ) -> Result<HashMap<ConnectionId, UserId>, DomainError> {
        if connection_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<Uuid> = connection_ids.iter().map(|c| *c.as_uuid()).collect();
        let rows = sqlx::query(
            r#"
            SELECT i.user_id, c.connection_id
            FROM presence_identities i
            CROSS JOIN LATERAL unnest(i.live_connections) AS c(connection_id)
            WHERE c.connection_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to resolve connections: {}", e)))?;

        let mut resolved = HashMap::with_capacity(rows.len());
        for row in rows {
            let user_id: String = row
                .try_get("user_id")
                .map_err(|e| DomainError::database(format!("Failed to get user_id: {}", e)))?;
            let connection_id: Uuid = row.try_get("connection_id").map_err(|e| {
                DomainError::database(format!("Failed to get connection_id: {}", e))
            })?;
            resolved.insert(ConnectionId::from_uuid(connection_id), UserId::new(user_id)?);
        }
        Ok(resolved)
    }
}
