use std::str::FromStr;

use buddy_crypto::{Credentials, HashedSecret};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use crate::error::expect_one;
use crate::models::{EmailVerificationRow, NewUserRow, UserRow};
use crate::{Database, DbError, DbResult, VerifyEmailError};

const USER_COLUMNS: &str = "id, username, email, temporary_email, role, admin, active, available,
     given_name, family_name, gender, birthday,
     password_hash, password_salt, password_iterations, created";

impl Database {
    // -- Users --

    /// Insert an unverified user. Fails with `Conflict` when the username is
    /// taken or the email already belongs to a verified user.
    pub fn create_user(&self, user: &NewUserRow) -> DbResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            let affected = conn.execute(
                "INSERT INTO users (
                    id, username, temporary_email, role, given_name, family_name, gender,
                    birthday, password_hash, password_salt, password_iterations,
                    te_hash, te_salt, te_iterations, te_expire, created
                 )
                 SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16
                 WHERE NOT EXISTS (SELECT 1 FROM users WHERE email = ?3)",
                params![
                    id,
                    user.username,
                    user.temporary_email,
                    user.role.as_str(),
                    user.given_name,
                    user.family_name,
                    user.gender.as_str(),
                    user.birthday,
                    user.password.hash,
                    user.password.salt,
                    user.password.iterations,
                    user.email_code.hash,
                    user.email_code.salt,
                    user.email_code.iterations,
                    user.email_code_expire,
                    user.created,
                ],
            )?;
            if affected == 0 {
                return Err(DbError::Conflict);
            }
            Ok(())
        })?;

        info!("Created user {}", user.username);
        Ok(id)
    }

    pub fn read_user(&self, username: &str) -> DbResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, username))
    }

    /// Check `code` against the pending verification credential and, on
    /// success, promote the temporary email to the verified one.
    pub fn verify_email(
        &self,
        credentials: &Credentials,
        username: &str,
        code: &str,
        now: i64,
    ) -> Result<(), VerifyEmailError> {
        // The KDF runs outside the connection lock.
        let pending = self
            .with_conn(|conn| query_email_verification(conn, username))?
            .ok_or(VerifyEmailError::UnknownUser)?;

        let (Some(_), Some(stored), Some(expire)) =
            (pending.temporary_email, pending.code, pending.expire)
        else {
            return Err(VerifyEmailError::AlreadyVerified);
        };

        if now > expire {
            return Err(VerifyEmailError::Expired);
        }

        let matches = credentials
            .compare(code, &stored)
            .map_err(|e| VerifyEmailError::Credential(e.to_string()))?;
        if !matches {
            return Err(VerifyEmailError::WrongCode);
        }

        match self.finalize_email_verification(username) {
            Ok(()) => Ok(()),
            // Someone else completed the verification in between.
            Err(DbError::NotFound) => Err(VerifyEmailError::AlreadyVerified),
            Err(e) => Err(e.into()),
        }
    }

    /// Move `temporary_email` to `email` and clear the verification credential.
    pub fn finalize_email_verification(&self, username: &str) -> DbResult<()> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE users
                 SET email = temporary_email, temporary_email = NULL,
                     te_hash = NULL, te_salt = NULL, te_iterations = NULL, te_expire = NULL
                 WHERE username = ?1 AND temporary_email IS NOT NULL",
                [username],
            )?;
            expect_one(affected)
        })?;

        info!("Verified email of {}", username);
        Ok(())
    }

    /// Only verified buddies can be (de)activated.
    pub fn update_active(&self, username: &str, active: bool) -> DbResult<()> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE users SET active = ?2
                 WHERE username = ?1 AND role = 'buddy' AND email IS NOT NULL",
                params![username, active],
            )?;
            expect_one(affected)
        })
    }

    pub fn update_available(&self, username: &str, available: bool) -> DbResult<()> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE users SET available = ?2 WHERE username = ?1",
                params![username, available],
            )?;
            expect_one(affected)
        })
    }

    pub fn update_admin(&self, username: &str, admin: bool) -> DbResult<()> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE users SET admin = ?2 WHERE username = ?1",
                params![username, admin],
            )?;
            expect_one(affected)
        })
    }
}

// -- Helper functions --

/// Parse a TEXT enum column, reporting bad values as a conversion failure.
pub(crate) fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn query_user(conn: &Connection, username: &str) -> DbResult<Option<UserRow>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            [username],
            |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    email: row.get(2)?,
                    temporary_email: row.get(3)?,
                    role: enum_column(row, 4)?,
                    admin: row.get(5)?,
                    active: row.get(6)?,
                    available: row.get(7)?,
                    given_name: row.get(8)?,
                    family_name: row.get(9)?,
                    gender: enum_column(row, 10)?,
                    birthday: row.get(11)?,
                    password: HashedSecret {
                        hash: row.get(12)?,
                        salt: row.get(13)?,
                        iterations: row.get(14)?,
                    },
                    created: row.get(15)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

fn query_email_verification(
    conn: &Connection,
    username: &str,
) -> DbResult<Option<EmailVerificationRow>> {
    let pending = conn
        .query_row(
            "SELECT temporary_email, te_hash, te_salt, te_iterations, te_expire
             FROM users WHERE username = ?1",
            [username],
            |row| {
                let hash: Option<String> = row.get(1)?;
                let salt: Option<String> = row.get(2)?;
                let iterations: Option<u32> = row.get(3)?;
                let code = match (hash, salt, iterations) {
                    (Some(hash), Some(salt), Some(iterations)) => Some(HashedSecret {
                        hash,
                        salt,
                        iterations,
                    }),
                    _ => None,
                };
                Ok(EmailVerificationRow {
                    temporary_email: row.get(0)?,
                    code,
                    expire: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{NOW, new_user, verified_user};
    use buddy_crypto::CredentialConfig;
    use buddy_types::models::Role;

    fn cheap() -> Credentials {
        Credentials::new(CredentialConfig {
            iterations: 1,
            memory_kib: 64,
        })
    }

    /// A user whose pending code is a real hash of `code`.
    fn pending_user(db: &Database, credentials: &Credentials, username: &str, code: &str) {
        let mut user = new_user(username, Role::Comer);
        user.email_code = credentials.hash(code).unwrap();
        db.create_user(&user).unwrap();
    }

    #[test]
    fn registration_keeps_email_pending() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&new_user("alice", Role::Buddy)).unwrap();

        let user = db.read_user("alice").unwrap().unwrap();
        assert_eq!(user.email, None);
        assert_eq!(user.temporary_email.as_deref(), Some("alice@example.com"));
        assert_eq!(user.role, Role::Buddy);
        assert!(!user.admin && !user.active && !user.available);
    }

    #[test]
    fn duplicate_username_conflicts_and_keeps_first_user() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&new_user("alice", Role::Buddy)).unwrap();

        let mut again = new_user("alice", Role::Comer);
        again.given_name = "Other".into();
        assert!(matches!(db.create_user(&again), Err(DbError::Conflict)));

        let user = db.read_user("alice").unwrap().unwrap();
        assert_eq!(user.role, Role::Buddy);
        assert_eq!(user.given_name, "Given alice");
    }

    #[test]
    fn email_of_verified_user_cannot_be_registered_again() {
        let db = Database::open_in_memory().unwrap();
        verified_user(&db, "alice", Role::Buddy);

        let mut other = new_user("bob", Role::Comer);
        other.temporary_email = "alice@example.com".into();
        assert!(matches!(db.create_user(&other), Err(DbError::Conflict)));
    }

    #[test]
    fn missing_user_reads_as_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.read_user("ghost").unwrap().is_none());
    }

    #[test]
    fn verify_with_correct_code_once() {
        let db = Database::open_in_memory().unwrap();
        let credentials = cheap();
        pending_user(&db, &credentials, "alice", "0123456789abcdef0123456789abcdef");

        db.verify_email(&credentials, "alice", "0123456789abcdef0123456789abcdef", NOW)
            .unwrap();

        let user = db.read_user("alice").unwrap().unwrap();
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert_eq!(user.temporary_email, None);

        let again =
            db.verify_email(&credentials, "alice", "0123456789abcdef0123456789abcdef", NOW);
        assert!(matches!(again, Err(VerifyEmailError::AlreadyVerified)));
    }

    #[test]
    fn verify_rejects_wrong_and_expired_codes() {
        let db = Database::open_in_memory().unwrap();
        let credentials = cheap();
        let code = "0123456789abcdef0123456789abcdef";
        pending_user(&db, &credentials, "alice", code);

        let wrong = db.verify_email(&credentials, "alice", "ffffffffffffffffffffffffffffffff", NOW);
        assert!(matches!(wrong, Err(VerifyEmailError::WrongCode)));

        let late = db.verify_email(&credentials, "alice", code, NOW + 7_200_001);
        assert!(matches!(late, Err(VerifyEmailError::Expired)));

        let unknown = db.verify_email(&credentials, "ghost", code, NOW);
        assert!(matches!(unknown, Err(VerifyEmailError::UnknownUser)));

        assert_eq!(db.read_user("alice").unwrap().unwrap().email, None);
    }

    #[test]
    fn verify_fails_when_email_was_taken_meanwhile() {
        let db = Database::open_in_memory().unwrap();
        let credentials = cheap();
        let code = "0123456789abcdef0123456789abcdef";
        pending_user(&db, &credentials, "alice", code);

        let mut rival = new_user("bob", Role::Buddy);
        rival.temporary_email = "alice@example.com".into();
        db.create_user(&rival).unwrap();
        db.finalize_email_verification("bob").unwrap();

        let result = db.verify_email(&credentials, "alice", code, NOW);
        assert!(matches!(result, Err(VerifyEmailError::Db(DbError::Conflict))));
    }

    #[test]
    fn only_verified_buddies_can_be_activated() {
        let db = Database::open_in_memory().unwrap();
        verified_user(&db, "buddy", Role::Buddy);
        verified_user(&db, "comer", Role::Comer);
        db.create_user(&new_user("pending", Role::Buddy)).unwrap();

        db.update_active("buddy", true).unwrap();
        assert!(db.read_user("buddy").unwrap().unwrap().active);

        assert!(matches!(db.update_active("comer", true), Err(DbError::NotFound)));
        assert!(matches!(db.update_active("pending", true), Err(DbError::NotFound)));
        assert!(matches!(db.update_active("ghost", true), Err(DbError::NotFound)));
    }

    #[test]
    fn available_and_admin_flags() {
        let db = Database::open_in_memory().unwrap();
        verified_user(&db, "alice", Role::Comer);

        db.update_available("alice", false).unwrap();
        db.update_admin("alice", true).unwrap();
        let user = db.read_user("alice").unwrap().unwrap();
        assert!(!user.available);
        assert!(user.admin);

        assert!(matches!(db.update_available("ghost", true), Err(DbError::NotFound)));
    }
}
