use rusqlite::ErrorCode;
use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// The target row does not exist or did not pass the statement's guards.
    #[error("not found")]
    NotFound,

    #[error("unique constraint violated")]
    Conflict,

    /// A statement keyed on unique columns touched more than one row.
    #[error("expected at most one affected row, got {0}")]
    TooManyRows(usize),

    #[error("sqlite: {0}")]
    Sqlite(rusqlite::Error),

    #[error("{0}")]
    Pool(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == ErrorCode::ConstraintViolation
                    && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY) =>
            {
                DbError::Conflict
            }
            _ => DbError::Sqlite(err),
        }
    }
}

/// Map an affected-row count of a single-row guarded statement.
pub(crate) fn expect_one(affected: usize) -> DbResult<()> {
    match affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        n => Err(DbError::TooManyRows(n)),
    }
}

#[derive(Debug, Error)]
pub enum VerifyEmailError {
    #[error("email already verified")]
    AlreadyVerified,

    #[error("expired code")]
    Expired,

    #[error("wrong code")]
    WrongCode,

    #[error("user not found")]
    UnknownUser,

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("credential check failed: {0}")]
    Credential(String),
}
