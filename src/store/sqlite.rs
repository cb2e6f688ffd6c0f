use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const FILE_COLUMNS: &str = "id, name, file_type, owner_user_id, org_id, should_delete, is_global, file_key, expires_at, blob_ref, created_at";

const TOKEN_COLUMNS: &str = "id, token_hash, token_lookup, is_admin, subject, display_name, created_at, expires_at, last_used_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width UTC timestamps so stored values order correctly as text.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn constraint_code(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            Some(e.extended_code)
        }
        _ => None,
    }
}

fn violates_blob_ref(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("files.blob_ref"))
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<File> {
    let file_type: String = row.get(2)?;
    let file_type = FileType::parse(&file_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown file type '{file_type}'").into(),
        )
    })?;

    Ok(File {
        id: row.get(0)?,
        name: row.get(1)?,
        file_type,
        owner_user_id: row.get(3)?,
        org_id: row.get(4)?,
        should_delete: row.get(5)?,
        is_global: row.get(6)?,
        file_key: row.get(7)?,
        expires_at: row.get::<_, Option<String>>(8)?.map(|s| parse_datetime(&s)),
        blob_ref: row.get(9)?,
        created_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<IdentityToken> {
    Ok(IdentityToken {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        is_admin: row.get(3)?,
        subject: row.get(4)?,
        display_name: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        expires_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(8)?.map(|s| parse_datetime(&s)),
    })
}

fn favorite_from_row(row: &Row<'_>) -> rusqlite::Result<Favorite> {
    Ok(Favorite {
        user_id: row.get(0)?,
        org_id: row.get(1)?,
        file_id: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn load_memberships(conn: &Connection, user_id: &str) -> Result<Vec<OrgMembership>> {
    let mut stmt = conn.prepare(
        "SELECT org_id, role FROM org_memberships WHERE user_id = ?1 ORDER BY org_id",
    )?;

    let rows = stmt.query_map(params![user_id], |row| {
        let role: String = row.get(1)?;
        let role = Role::parse(&role).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                Type::Text,
                format!("unknown role '{role}'").into(),
            )
        })?;
        Ok(OrgMembership {
            org_id: row.get(0)?,
            role,
        })
    })?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

fn load_user(conn: &Connection, column: &str, value: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            &format!(
                "SELECT id, token_identifier, name, image_url, created_at FROM users WHERE {column} = ?1"
            ),
            params![value],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    token_identifier: row.get(1)?,
                    name: row.get(2)?,
                    image_url: row.get(3)?,
                    memberships: Vec::new(),
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                })
            },
        )
        .optional()?;

    match user {
        Some(mut user) => {
            user.memberships = load_memberships(conn, &user.id)?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let result = tx.execute(
            "INSERT INTO users (id, token_identifier, name, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.token_identifier,
                user.name,
                user.image_url,
                format_datetime(&user.created_at),
            ],
        );

        if let Err(e) = result {
            return match constraint_code(&e) {
                Some(_) => Err(Error::Conflict("user already exists".into())),
                None => Err(Error::from(e)),
            };
        }

        for membership in &user.memberships {
            tx.execute(
                "INSERT INTO org_memberships (user_id, org_id, role, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.id,
                    membership.org_id,
                    membership.role.as_str(),
                    format_datetime(&user.created_at),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        load_user(&self.conn(), "id", id)
    }

    fn get_user_by_token_identifier(&self, token_identifier: &str) -> Result<Option<User>> {
        load_user(&self.conn(), "token_identifier", token_identifier)
    }

    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>> {
        let conn = self.conn();
        let ids = {
            let mut stmt =
                conn.prepare("SELECT id FROM users WHERE id > ?1 ORDER BY id LIMIT ?2")?;
            let rows = stmt.query_map(params![cursor, limit], |row| row.get::<_, String>(0))?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };

        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = load_user(&conn, "id", &id)? {
                users.push(user);
            }
        }
        Ok(users)
    }

    fn upsert_membership(&self, user_id: &str, membership: &OrgMembership) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO org_memberships (user_id, org_id, role, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, org_id) DO UPDATE SET role = excluded.role",
            params![
                user_id,
                membership.org_id,
                membership.role.as_str(),
                format_datetime(&Utc::now()),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if constraint_code(&e) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
                Err(Error::NotFound)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn delete_membership(&self, user_id: &str, org_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM org_memberships WHERE user_id = ?1 AND org_id = ?2",
            params![user_id, org_id],
        )?;
        Ok(rows > 0)
    }

    // Identity token operations

    fn create_token(&self, token: &IdentityToken) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO identity_tokens (id, token_hash, token_lookup, is_admin, subject, display_name, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.subject,
                token.display_name,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if constraint_code(&e) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) => {
                Err(Error::TokenLookupCollision)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_id(&self, id: &str) -> Result<Option<IdentityToken>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM identity_tokens WHERE id = ?1"),
            params![id],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<IdentityToken>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM identity_tokens WHERE token_lookup = ?1"),
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM identity_tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE identity_tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_admin_token(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM identity_tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // File operations

    fn create_file(&self, file: &File) -> Result<()> {
        let result = self.conn().execute(
            &format!("INSERT INTO files ({FILE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
            params![
                file.id,
                file.name,
                file.file_type.as_str(),
                file.owner_user_id,
                file.org_id,
                file.should_delete,
                file.is_global,
                file.file_key,
                file.expires_at.as_ref().map(format_datetime),
                file.blob_ref,
                format_datetime(&file.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) => match constraint_code(&e) {
                Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) if violates_blob_ref(&e) => Err(
                    Error::Conflict("blob is already attached to a file".into()),
                ),
                Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) if file.is_global => {
                    Err(Error::FileKeyCollision)
                }
                Some(rusqlite::ffi::SQLITE_CONSTRAINT_CHECK) => Err(Error::BadRequest(
                    "file must have exactly one of org id or share key".into(),
                )),
                Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => Err(Error::NotFound),
                _ => Err(Error::from(e)),
            },
        }
    }

    fn get_file(&self, id: &str) -> Result<Option<File>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1"),
            params![id],
            file_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_file_by_key(&self, file_key: &str) -> Result<Option<File>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {FILE_COLUMNS} FROM files WHERE file_key = ?1"),
            params![file_key],
            file_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_org_files(&self, org_id: &str) -> Result<Vec<File>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE org_id = ?1 ORDER BY created_at DESC, id"
        ))?;

        let rows = stmt.query_map(params![org_id], file_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_files_marked_for_deletion(&self) -> Result<Vec<File>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE should_delete = 1 ORDER BY id"
        ))?;

        let rows = stmt.query_map([], file_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn set_file_should_delete(&self, id: &str, should_delete: bool) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE files SET should_delete = ?1 WHERE id = ?2",
            params![should_delete, id],
        )?;
        Ok(rows > 0)
    }

    fn mark_expired_global_files(&self, now: DateTime<Utc>) -> Result<usize> {
        let rows = self.conn().execute(
            "UPDATE files SET should_delete = 1
             WHERE is_global = 1 AND should_delete = 0 AND expires_at < ?1",
            params![format_datetime(&now)],
        )?;
        Ok(rows)
    }

    fn delete_file(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM files WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn delete_marked_file(&self, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM files WHERE id = ?1 AND should_delete = 1",
            params![id],
        )?;
        Ok(rows > 0)
    }

    // Favorite operations

    fn insert_favorite(&self, favorite: &Favorite) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO favorites (user_id, org_id, file_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                favorite.user_id,
                favorite.org_id,
                favorite.file_id,
                format_datetime(&favorite.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) => match constraint_code(&e) {
                Some(rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
                | Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) => {
                    Err(Error::Conflict("favorite already exists".into()))
                }
                Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => Err(Error::NotFound),
                _ => Err(Error::from(e)),
            },
        }
    }

    fn get_favorite(
        &self,
        user_id: &str,
        org_id: &str,
        file_id: &str,
    ) -> Result<Option<Favorite>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, org_id, file_id, created_at FROM favorites
             WHERE user_id = ?1 AND org_id = ?2 AND file_id = ?3",
            params![user_id, org_id, file_id],
            favorite_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_favorite(&self, user_id: &str, org_id: &str, file_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM favorites WHERE user_id = ?1 AND org_id = ?2 AND file_id = ?3",
            params![user_id, org_id, file_id],
        )?;
        Ok(rows > 0)
    }

    fn list_favorites(&self, user_id: &str, org_id: &str) -> Result<Vec<Favorite>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, org_id, file_id, created_at FROM favorites
             WHERE user_id = ?1 AND org_id = ?2 ORDER BY created_at, file_id",
        )?;

        let rows = stmt.query_map(params![user_id, org_id], favorite_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}
