use crate::domain_port::*;
use sqlx::mysql::MySqlDatabaseError;

pub fn is_dup_key(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return mysql_err.number() == 1062; // ER_DUP_ENTRY
        }
    }

    false
}

/// Errors that mean the database could not be reached at all.
pub fn is_unavailable(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

pub fn store_error(err: sqlx::Error) -> TokenStoreError {
    if is_unavailable(&err) {
        TokenStoreError::Unavailable(err.to_string())
    } else {
        TokenStoreError::Internal(err.to_string())
    }
}

pub fn directory_error(err: sqlx::Error) -> DirectoryError {
    if is_dup_key(&err) {
        DirectoryError::AlreadyExists
    } else if is_unavailable(&err) {
        DirectoryError::Unavailable(err.to_string())
    } else {
        DirectoryError::Internal(err.to_string())
    }
}
