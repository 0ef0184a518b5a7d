//! Stable error codes (§6) a collaborator-facing boundary can switch on
//! without matching `common::DbError`'s internal variants.

use common::DbError;

/// One of the stable codes named in §6. `Ok` is not itself returned by any
/// fallible operation — it exists so a C-ABI-style adaptor has a value to
/// report on success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    Ok = 0,
    Error,
    Busy,
    Locked,
    NoMem,
    ReadOnly,
    Misuse,
    NoLfs,
    Auth,
    Format,
    Range,
    NotADb,
}

impl From<&DbError> for ErrorCode {
    fn from(err: &DbError) -> Self {
        match err {
            DbError::InvalidParameterIndex(_) => ErrorCode::Range,
            DbError::OrderMismatch { .. } | DbError::InvalidValueType(_) => ErrorCode::Format,
            DbError::NoActiveTransaction | DbError::TransactionAlreadyActive => ErrorCode::Misuse,
            _ => ErrorCode::Error,
        }
    }
}

impl From<DbError> for ErrorCode {
    fn from(err: DbError) -> Self {
        ErrorCode::from(&err)
    }
}
