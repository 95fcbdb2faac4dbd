use mkw_core::FailureId;
use mkw_core::ResultId;
use mkw_database::PgErr;
use mkw_database::PoolErr;
use mkw_database::war::WarStoreError;
use mkw_records::RecordError;
use mkw_records::SessionStatus;

/// Failures from the session store. The HTTP layer maps these onto the
/// API's status codes (409 not-open, 410 expired, 404 missing).
#[derive(Debug)]
pub enum SessionError {
    NotFound,
    NotOpen(SessionStatus),
    Expired,
    ResultNotFound(ResultId),
    FailureNotFound(FailureId),
    /// An approved result had no players to materialize.
    EmptyPlayers(ResultId),
    Invalid(RecordError),
    /// Stored rows that no longer decode; schema-level corruption.
    Corrupt(String),
    Storage(PgErr),
    Pool(PoolErr),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "session not found"),
            Self::NotOpen(status) => write!(f, "session is {}", status),
            Self::Expired => write!(f, "session expired"),
            Self::ResultNotFound(id) => write!(f, "no result with id {}", id),
            Self::FailureNotFound(id) => write!(f, "no failure with id {}", id),
            Self::EmptyPlayers(id) => write!(f, "result {} has no players", id),
            Self::Invalid(e) => write!(f, "{}", e),
            Self::Corrupt(what) => write!(f, "corrupted session state: {}", what),
            Self::Storage(e) => write!(f, "storage error: {}", e),
            Self::Pool(e) => write!(f, "connection pool error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<PgErr> for SessionError {
    fn from(e: PgErr) -> Self {
        Self::Storage(e)
    }
}
impl From<PoolErr> for SessionError {
    fn from(e: PoolErr) -> Self {
        Self::Pool(e)
    }
}
impl From<RecordError> for SessionError {
    fn from(e: RecordError) -> Self {
        Self::Invalid(e)
    }
}
impl From<WarStoreError> for SessionError {
    fn from(e: WarStoreError) -> Self {
        match e {
            WarStoreError::Storage(pg) => Self::Storage(pg),
            WarStoreError::Invalid(record) => Self::Invalid(record),
            // The confirm path creates missing roster rows first, so an
            // unknown player here means the session rows are inconsistent.
            WarStoreError::UnknownPlayer(name) => Self::Corrupt(format!("unknown player {}", name)),
            WarStoreError::NotFound(id) => Self::Corrupt(format!("war {} vanished", id)),
        }
    }
}

impl SessionError {
    /// Transient storage failures worth retrying where §7 allows.
    pub fn retryable(&self) -> bool {
        match self {
            Self::Storage(e) => mkw_database::retryable(e),
            Self::Pool(_) => true,
            _ => false,
        }
    }
}
