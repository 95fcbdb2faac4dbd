use deadpool_postgres::Manager;
use deadpool_postgres::ManagerConfig;
use deadpool_postgres::Pool;
use deadpool_postgres::RecyclingMethod;

/// Shared connection pool handle.
pub type Db = Pool;
/// One checked-out connection; derefs to a `tokio_postgres::Client`.
pub type Conn = deadpool_postgres::Object;
/// Checkout failure (pool exhausted, backend unreachable).
pub type PoolErr = deadpool_postgres::PoolError;

/// Build the shared connection pool from a database URL.
///
/// Connections are created lazily; the first checkout surfaces
/// connectivity problems.
pub fn pool(url: &str, max: usize) -> Result<Db, super::PgErr> {
    log::info!("configuring database pool (max {})", max);
    let config = url.parse::<tokio_postgres::Config>()?;
    let manager = Manager::from_config(
        config,
        tokio_postgres::tls::NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );
    Ok(Pool::builder(manager)
        .max_size(max)
        .build()
        .expect("pool configuration is static"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_parse_failures_surface() {
        assert!(pool("not a dsn", 4).is_err());
    }

    #[test]
    fn well_formed_url_builds_lazily() {
        assert!(pool("postgres://user:pw@localhost:5432/mkw", 4).is_ok());
    }
}
