pub mod error;
pub mod languages;
pub mod matching;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod users;

pub use error::{DbError, DbResult, VerifyEmailError};

use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Milliseconds in the 365.25-day year used for ages.
pub const YEAR_MS: i64 = 31_557_600_000;

/// Whole years elapsed between `birthday` and `now`, both in epoch milliseconds.
pub fn age_in_years(birthday: i64, now: i64) -> i64 {
    (now - birthday).div_euclid(YEAR_MS)
}

/// SQLite handle. Each statement is atomic on its own; eligibility rules are
/// expressed as WHERE guards and checked through affected-row counts, so no
/// caller holds the lock across more than one logical operation.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError::Pool(format!("DB lock poisoned: {}", e)))?;
        f(&conn)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::models::NewUserRow;
    use buddy_crypto::HashedSecret;
    use buddy_types::models::{Gender, Role};

    /// 2017-12-31T00:00:00Z
    pub const NOW: i64 = 1_514_678_400_000;

    pub fn secret(tag: &str) -> HashedSecret {
        HashedSecret {
            hash: format!("hash-{tag}"),
            salt: format!("salt-{tag}"),
            iterations: 1,
        }
    }

    pub fn new_user(username: &str, role: Role) -> NewUserRow {
        NewUserRow {
            username: username.to_string(),
            temporary_email: format!("{username}@example.com"),
            role,
            given_name: format!("Given {username}"),
            family_name: format!("Family {username}"),
            gender: Gender::Female,
            birthday: NOW - 30 * YEAR_MS,
            password: secret("password"),
            email_code: secret("code"),
            email_code_expire: NOW + 7_200_000,
            created: NOW,
        }
    }

    /// Insert a listed user with a verified email, bypassing the code check.
    pub fn verified_user(db: &Database, username: &str, role: Role) -> String {
        let id = db.create_user(&new_user(username, role)).unwrap();
        db.finalize_email_verification(username).unwrap();
        db.update_available(username, true).unwrap();
        id
    }
}
