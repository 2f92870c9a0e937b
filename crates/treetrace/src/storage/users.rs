//! User account storage.

use rusqlite::{params, OptionalExtension};
use tracing::{debug, info, warn};

use super::{format_timestamp, like_pattern, now, parse_timestamp, Storage};
use crate::error::{Error, Result};
use crate::model::user::normalize_email;
use crate::model::{new_id, Credentials, NewUser, User};

const USER_COLUMNS: &str = "id, email, first_name, last_name, created_at";

impl Storage {
    /// Create a user account, hashing the password.
    ///
    /// The payload is expected to have passed
    /// [`validate_registration`](crate::auth::validate_registration).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the email is already registered.
    pub fn register_user(&self, new_user: NewUser) -> Result<User> {
        let email = normalize_email(&new_user.email);
        if self.user_exists_by_email(&email)? {
            return Err(Error::conflict(format!("email {email} is already registered")));
        }

        let password_hash = self.hasher.hash(&new_user.password)?;
        let user = User {
            id: new_id(),
            email,
            first_name: new_user.first_name.trim().to_string(),
            last_name: new_user.last_name.trim().to_string(),
            created_at: now(),
        };

        self.conn.execute(
            r"
            INSERT INTO users (id, email, first_name, last_name, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                user.id,
                user.email,
                user.first_name,
                user.last_name,
                password_hash,
                format_timestamp(user.created_at),
            ],
        )?;

        info!("Registered user {}", user.id);
        Ok(user)
    }

    fn user_exists_by_email(&self, email: &str) -> Result<bool> {
        let count: i32 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            [email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Check login credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] for an unknown email or a wrong password;
    /// both cases report the same message.
    pub fn verify_credentials(&self, credentials: &Credentials) -> Result<User> {
        let email = normalize_email(&credentials.email);
        let found = self
            .conn
            .query_row(
                &format!(
                    "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"
                ),
                [&email],
                |row| {
                    let user = Self::row_to_user(row)?;
                    let password_hash: String = row.get(5)?;
                    Ok((user, password_hash))
                },
            )
            .optional()?;

        match found {
            Some((user, password_hash))
                if self.hasher.verify(&credentials.password, &password_hash) =>
            {
                debug!("Credentials verified for user {}", user.id);
                Ok(user)
            }
            _ => {
                warn!("Rejected login for {email}");
                Err(Error::unauthorized("invalid email or password"))
            }
        }
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Search users by email or name, excluding `exclude_id`.
    ///
    /// Matching is a case-insensitive substring match on email, first name,
    /// last name and full name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn search_users(&self, query: &str, exclude_id: &str, limit: usize) -> Result<Vec<User>> {
        let pattern = like_pattern(&query.trim().to_lowercase());
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {USER_COLUMNS} FROM users
            WHERE id != ?1 AND (
                lower(email) LIKE ?2 ESCAPE '\'
                OR lower(first_name) LIKE ?2 ESCAPE '\'
                OR lower(last_name) LIKE ?2 ESCAPE '\'
                OR lower(first_name || ' ' || last_name) LIKE ?2 ESCAPE '\'
            )
            ORDER BY last_name, first_name, email
            LIMIT ?3
            "
        ))?;

        let users = stmt
            .query_map(params![exclude_id, pattern, limit_i64], Self::row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let created_at: String = row.get(4)?;
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            created_at: parse_timestamp(4, &created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialHasher;
    use crate::storage::tests::register;

    fn storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    #[test]
    fn test_register_and_get() {
        let storage = storage();
        let user = register(&storage, "Ada@Example.com");

        assert_eq!(user.email, "ada@example.com");
        let fetched = storage.get_user(&user.id).unwrap().unwrap();
        assert_eq!(fetched, user);
        assert!(storage.get_user("missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let storage = storage();
        register(&storage, "ada@example.com");

        let err = storage
            .register_user(NewUser {
                email: " ADA@example.com".to_string(),
                password: "password123".to_string(),
                first_name: "A".to_string(),
                last_name: "B".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[test]
    fn test_verify_credentials() {
        let storage = storage();
        let user = register(&storage, "ada@example.com");

        let ok = storage
            .verify_credentials(&Credentials {
                email: "ADA@example.com".to_string(),
                password: "password123".to_string(),
            })
            .unwrap();
        assert_eq!(ok.id, user.id);

        let wrong = storage.verify_credentials(&Credentials {
            email: "ada@example.com".to_string(),
            password: "nope".to_string(),
        });
        assert!(matches!(wrong, Err(Error::Unauthorized(_))));

        let unknown = storage.verify_credentials(&Credentials {
            email: "who@example.com".to_string(),
            password: "password123".to_string(),
        });
        assert_eq!(
            unknown.unwrap_err().to_string(),
            wrong.unwrap_err().to_string()
        );
    }

    #[test]
    fn test_password_is_not_stored_in_clear() {
        let storage = storage();
        register(&storage, "ada@example.com");

        let hash: String = storage
            .conn
            .query_row("SELECT password_hash FROM users", [], |row| row.get(0))
            .unwrap();
        assert!(!hash.contains("password123"));
        assert!(hash.starts_with("$argon2id$"));
    }

    /// Stores passwords reversed so the stored column can be asserted on.
    #[derive(Debug)]
    struct ReversingHasher;

    impl CredentialHasher for ReversingHasher {
        fn hash(&self, password: &str) -> Result<String> {
            Ok(format!("rev${}", password.chars().rev().collect::<String>()))
        }

        fn verify(&self, password: &str, stored: &str) -> bool {
            self.hash(password).is_ok_and(|hash| hash == stored)
        }
    }

    #[test]
    fn test_custom_hasher_is_used() {
        let storage = storage().with_hasher(Box::new(ReversingHasher));
        let user = register(&storage, "ada@example.com");

        let hash: String = storage
            .conn
            .query_row("SELECT password_hash FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(hash, "rev$321drowssap");

        let ok = storage
            .verify_credentials(&Credentials {
                email: "ada@example.com".to_string(),
                password: "password123".to_string(),
            })
            .unwrap();
        assert_eq!(ok.id, user.id);
    }

    #[test]
    fn test_search_users() {
        let storage = storage();
        let me = register(&storage, "me@example.com");
        register(&storage, "ingrid.berg@example.com");
        register(&storage, "karl@example.com");

        let found = storage.search_users("BERG", &me.id, 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].email, "ingrid.berg@example.com");

        let all = storage.search_users("example", &me.id, 10).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|u| u.id != me.id));

        assert_eq!(storage.search_users("example", &me.id, 1).unwrap().len(), 1);
        assert!(storage.search_users("%", &me.id, 10).unwrap().is_empty());
    }
}
