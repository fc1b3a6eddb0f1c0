use rusqlite::ErrorCode;
use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(rusqlite::Error),
    /// A UNIQUE or PRIMARY KEY constraint rejected the write. `field` is the
    /// offending column as SQLite reports it (e.g. `username`).
    #[error("Unique constraint failed on {field}")]
    UniqueViolation { field: String },
    #[error("Referenced row does not exist")]
    ForeignKey,
    #[error("Users cannot follow themselves")]
    SelfFollow,
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Password hashing failed: {0}")]
    Hash(String),
    #[error("DB lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, msg) = &err {
            if code.code == ErrorCode::ConstraintViolation {
                match code.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        return DbError::UniqueViolation {
                            field: constraint_field(msg.as_deref()),
                        };
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return DbError::ForeignKey,
                    _ => {}
                }
            }
        }
        DbError::Sqlite(err)
    }
}

/// SQLite reports "UNIQUE constraint failed: users.username"; pull out the
/// column name. Composite keys list several columns, comma separated.
fn constraint_field(msg: Option<&str>) -> String {
    msg.and_then(|m| m.split_once(": "))
        .map(|(_, cols)| {
            cols.split(", ")
                .map(|c| c.rsplit('.').next().unwrap_or(c))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_else(|| "unknown".to_string())
}
