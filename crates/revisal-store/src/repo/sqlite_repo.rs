//! SQLite version repository
//!
//! Persists version rows to the versions table and implements the core
//! `VersionRepository` contract over them.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use revisal_core::{
    IdentityStyle, NewVersion, OwnerRef, Result, RevisalConfig, Version, VersionId,
    VersionRepository,
};

use crate::errors::from_rusqlite;
use crate::migrations::apply_migrations;

/// SQLite-backed version repository
///
/// Owns its connection. Integrators wrapping a capture-then-prune sequence
/// in a transaction can reach the connection through [`Self::connection`].
pub struct SqliteVersionRepo {
    conn: Connection,
    user_fk: String,
    identity: IdentityStyle,
}

impl SqliteVersionRepo {
    /// Wrap a connection, applying pending migrations first
    pub fn open(mut conn: Connection, config: &RevisalConfig) -> Result<Self> {
        apply_migrations(&mut conn, config)?;
        tracing::debug!(identity = ?config.identity, "opened version repository");
        Ok(Self {
            conn,
            user_fk: config.user_foreign_key.clone(),
            identity: config.identity,
        })
    }

    /// The underlying connection (transaction boundary for integrators)
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn select_sql(&self, predicate: &str) -> String {
        format!(
            "SELECT id, {}, owner_type, owner_id, contents, created_at, updated_at, deleted_at
             FROM versions WHERE owner_type = ?1 AND owner_id = ?2 {}",
            self.user_fk, predicate
        )
    }

    fn id_value(id: &VersionId) -> rusqlite::types::Value {
        match id {
            VersionId::Numeric(n) => rusqlite::types::Value::Integer(*n),
            VersionId::Uuid(u) => rusqlite::types::Value::Text(u.to_string()),
        }
    }

    fn map_row(identity: IdentityStyle, row: &Row) -> rusqlite::Result<Version> {
        let id = match identity {
            IdentityStyle::Numeric => VersionId::Numeric(row.get(0)?),
            IdentityStyle::Uuid => {
                let raw: String = row.get(0)?;
                let uuid = Uuid::parse_str(&raw).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                VersionId::Uuid(uuid)
            }
        };

        let user_id: Option<String> = row.get(1)?;
        let owner_type: String = row.get(2)?;
        let owner_id: String = row.get(3)?;
        let contents_json: String = row.get(4)?;
        let created_at: i64 = row.get(5)?;
        let updated_at: i64 = row.get(6)?;
        let deleted_at: Option<i64> = row.get(7)?;

        Ok(Version {
            id,
            owner: OwnerRef::new(owner_type, owner_id),
            user_id,
            contents: serde_json::from_str(&contents_json).unwrap_or_default(),
            created_at: millis_to_datetime(created_at),
            updated_at: millis_to_datetime(updated_at),
            deleted_at: deleted_at.map(millis_to_datetime),
        })
    }

    fn select_many(&self, owner: &OwnerRef, predicate: &str) -> Result<Vec<Version>> {
        let identity = self.identity;
        let sql = self.select_sql(predicate);
        let mut stmt = self.conn.prepare(&sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(
                rusqlite::params![owner.owner_type, owner.owner_id],
                |row| Self::map_row(identity, row),
            )
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }

    fn select_one(
        &self,
        owner: &OwnerRef,
        id: &VersionId,
        predicate: &str,
    ) -> Result<Option<Version>> {
        let identity = self.identity;
        let sql = self.select_sql(&format!("AND id = ?3 {}", predicate));
        self.conn
            .query_row(
                &sql,
                rusqlite::params![owner.owner_type, owner.owner_id, Self::id_value(id)],
                |row| Self::map_row(identity, row),
            )
            .optional()
            .map_err(from_rusqlite)
    }
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

impl VersionRepository for SqliteVersionRepo {
    fn append(&mut self, version: NewVersion) -> Result<Version> {
        let now = Utc::now();
        let created_at = version.created_at.unwrap_or(now);
        let contents_json = serde_json::to_string(&version.contents)?;

        let id = match self.identity {
            IdentityStyle::Numeric => {
                self.conn
                    .execute(
                        &format!(
                            "INSERT INTO versions ({}, owner_type, owner_id, contents, created_at, updated_at)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                            self.user_fk
                        ),
                        rusqlite::params![
                            version.user_id,
                            version.owner.owner_type,
                            version.owner.owner_id,
                            contents_json,
                            created_at.timestamp_millis(),
                            now.timestamp_millis(),
                        ],
                    )
                    .map_err(from_rusqlite)?;
                VersionId::Numeric(self.conn.last_insert_rowid())
            }
            IdentityStyle::Uuid => {
                let uuid = Uuid::now_v7();
                self.conn
                    .execute(
                        &format!(
                            "INSERT INTO versions (id, {}, owner_type, owner_id, contents, created_at, updated_at)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                            self.user_fk
                        ),
                        rusqlite::params![
                            uuid.to_string(),
                            version.user_id,
                            version.owner.owner_type,
                            version.owner.owner_id,
                            contents_json,
                            created_at.timestamp_millis(),
                            now.timestamp_millis(),
                        ],
                    )
                    .map_err(from_rusqlite)?;
                VersionId::Uuid(uuid)
            }
        };

        Ok(Version {
            id,
            owner: version.owner,
            user_id: version.user_id,
            contents: version.contents,
            created_at,
            updated_at: now,
            deleted_at: None,
        })
    }

    fn all(&self, owner: &OwnerRef) -> Result<Vec<Version>> {
        self.select_many(
            owner,
            "AND deleted_at IS NULL ORDER BY created_at ASC, id ASC",
        )
    }

    fn trashed(&self, owner: &OwnerRef) -> Result<Vec<Version>> {
        self.select_many(
            owner,
            "AND deleted_at IS NOT NULL ORDER BY created_at ASC, id ASC",
        )
    }

    fn find(&self, owner: &OwnerRef, id: &VersionId) -> Result<Option<Version>> {
        self.select_one(owner, id, "AND deleted_at IS NULL")
    }

    fn find_trashed(&self, owner: &OwnerRef, id: &VersionId) -> Result<Option<Version>> {
        self.select_one(owner, id, "AND deleted_at IS NOT NULL")
    }

    fn soft_delete(&mut self, owner: &OwnerRef, id: &VersionId) -> Result<bool> {
        let now = Utc::now().timestamp_millis();
        let changed = self
            .conn
            .execute(
                "UPDATE versions SET deleted_at = ?1, updated_at = ?1
                 WHERE owner_type = ?2 AND owner_id = ?3 AND id = ?4 AND deleted_at IS NULL",
                rusqlite::params![now, owner.owner_type, owner.owner_id, Self::id_value(id)],
            )
            .map_err(from_rusqlite)?;
        Ok(changed > 0)
    }

    fn restore(&mut self, owner: &OwnerRef, id: &VersionId) -> Result<bool> {
        let now = Utc::now().timestamp_millis();
        let changed = self
            .conn
            .execute(
                "UPDATE versions SET deleted_at = NULL, updated_at = ?1
                 WHERE owner_type = ?2 AND owner_id = ?3 AND id = ?4 AND deleted_at IS NOT NULL",
                rusqlite::params![now, owner.owner_type, owner.owner_id, Self::id_value(id)],
            )
            .map_err(from_rusqlite)?;
        Ok(changed > 0)
    }

    fn hard_delete(&mut self, owner: &OwnerRef, id: &VersionId) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM versions WHERE owner_type = ?1 AND owner_id = ?2 AND id = ?3",
                rusqlite::params![owner.owner_type, owner.owner_id, Self::id_value(id)],
            )
            .map_err(from_rusqlite)?;
        Ok(changed > 0)
    }

    fn hard_delete_all(&mut self, owner: &OwnerRef) -> Result<usize> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM versions WHERE owner_type = ?1 AND owner_id = ?2",
                rusqlite::params![owner.owner_type, owner.owner_id],
            )
            .map_err(from_rusqlite)?;
        Ok(changed)
    }

    fn count(&self, owner: &OwnerRef) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM versions
                 WHERE owner_type = ?1 AND owner_id = ?2 AND deleted_at IS NULL",
                rusqlite::params![owner.owner_type, owner.owner_id],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;
        Ok(count as usize)
    }
}
