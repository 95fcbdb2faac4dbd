use super::PgErr;
use mkw_core::RETRY_ATTEMPTS;
use mkw_core::RETRY_BACKOFF;
use tokio_postgres::error::SqlState;

/// True for transient storage failures worth retrying: serialization
/// conflicts, deadlocks, and dropped connections.
pub fn retryable(e: &PgErr) -> bool {
    matches!(
        e.code(),
        Some(&SqlState::T_R_SERIALIZATION_FAILURE) | Some(&SqlState::T_R_DEADLOCK_DETECTED)
    ) || e.is_closed()
}

/// Run `op` with exponential backoff on retryable errors, up to
/// [`RETRY_ATTEMPTS`] attempts total. Only hand idempotent operations to
/// this helper (reads, or writes guarded by a state check).
pub async fn with_retries<T, F, Fut>(mut op: F) -> Result<T, PgErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PgErr>>,
{
    let mut delay = RETRY_BACKOFF;
    for attempt in 1.. {
        match op().await {
            Err(e) if attempt < RETRY_ATTEMPTS && retryable(&e) => {
                log::warn!("retrying transient storage error (attempt {}): {}", attempt, e);
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            other => return other,
        }
    }
    unreachable!("retry loop always returns")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn success_passes_through() {
        let calls = AtomicUsize::new(0);
        let out: Result<i32, PgErr> = with_retries(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;
        assert_eq!(out.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
