//! Login session storage.

use chrono::{Duration, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use super::{format_timestamp, parse_timestamp, Storage};
use crate::auth::{hash_token, new_session_token, Session};
use crate::error::{Error, Result};
use crate::model::User;

impl Storage {
    /// Open a session for `user_id` and return its bearer token.
    ///
    /// Only the token's hash is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if `ttl` overflows the calendar or the database
    /// operation fails.
    pub fn create_session(&self, user_id: &str, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| Error::internal(format!("session lifetime {ttl} is out of range")))?;

        let token = new_session_token();
        let session = Session {
            token_hash: hash_token(&token),
            user_id: user_id.to_string(),
            created_at: now,
            expires_at,
        };

        self.conn.execute(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.token_hash,
                session.user_id,
                format_timestamp(session.created_at),
                format_timestamp(session.expires_at),
            ],
        )?;

        debug!("Opened session for user {user_id}");
        Ok(token)
    }

    fn get_session(&self, token_hash: &str) -> Result<Option<Session>> {
        let session = self
            .conn
            .query_row(
                "SELECT token_hash, user_id, created_at, expires_at FROM sessions WHERE token_hash = ?1",
                [token_hash],
                |row| {
                    let created_at: String = row.get(2)?;
                    let expires_at: String = row.get(3)?;
                    Ok(Session {
                        token_hash: row.get(0)?,
                        user_id: row.get(1)?,
                        created_at: parse_timestamp(2, &created_at)?,
                        expires_at: parse_timestamp(3, &expires_at)?,
                    })
                },
            )
            .optional()?;
        Ok(session)
    }

    /// Resolve a bearer token to its user.
    ///
    /// Expired sessions are deleted on sight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if the token is unknown or expired.
    pub fn authenticate_token(&self, token: &str) -> Result<User> {
        let token_hash = hash_token(token);
        let Some(session) = self.get_session(&token_hash)? else {
            return Err(Error::unauthorized("invalid session token"));
        };

        if !session.is_active(Utc::now()) {
            self.conn
                .execute("DELETE FROM sessions WHERE token_hash = ?1", [&token_hash])?;
            debug!("Removed expired session for user {}", session.user_id);
            return Err(Error::unauthorized("session expired"));
        }

        self.get_user(&session.user_id)?
            .ok_or_else(|| Error::unauthorized("invalid session token"))
    }

    /// End the session identified by `token`.
    ///
    /// Returns `true` if a session was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM sessions WHERE token_hash = ?1", [hash_token(token)])?;
        Ok(removed > 0)
    }

    /// Delete all expired sessions, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn prune_expired_sessions(&self) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            [format_timestamp(Utc::now())],
        )?;
        if removed > 0 {
            info!("Pruned {removed} expired sessions");
        }
        Ok(removed)
    }
}
