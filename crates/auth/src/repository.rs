use super::Session;
use mkw_core::ID;
use mkw_core::Unique;
use mkw_database::PgErr;
use mkw_database::Schema;
use mkw_database::USER_SESSIONS;
use tokio_postgres::GenericClient;

/// Create the auth-session table; run alongside the core migration.
pub async fn migrate(client: &tokio_postgres::Client) -> Result<(), PgErr> {
    client.batch_execute(Session::creates()).await?;
    client.batch_execute(Session::indices()).await?;
    Ok(())
}

/// Persistence for review-API sessions.
#[allow(async_fn_in_trait)]
pub trait SessionRepository {
    async fn signin(&self, session: &Session) -> Result<(), PgErr>;
    /// None when the session row is gone or the presented token's hash
    /// does not match the one issued (treat both as unauthorized).
    async fn session_revoked(&self, id: ID<Session>, hash: &[u8]) -> Result<Option<bool>, PgErr>;
    async fn revoke(&self, id: ID<Session>) -> Result<(), PgErr>;
}

impl<C: GenericClient> SessionRepository for C {
    async fn signin(&self, session: &Session) -> Result<(), PgErr> {
        let guilds = serde_json::to_value(session.guilds()).expect("grants serialize");
        self.execute(
            const_format::concatcp!(
                "INSERT INTO ",
                USER_SESSIONS,
                " (id, user_id, token_hash, guilds, expires_at, revoked)
                 VALUES ($1, $2, $3, $4, $5, FALSE)"
            ),
            &[
                &session.id().inner(),
                &session.user(),
                &session.hash(),
                &guilds,
                &session.expires_at(),
            ],
        )
        .await
        .map(|_| ())
    }
    async fn session_revoked(&self, id: ID<Session>, hash: &[u8]) -> Result<Option<bool>, PgErr> {
        self.query_opt(
            const_format::concatcp!(
                "SELECT revoked OR expires_at < now() FROM ",
                USER_SESSIONS,
                " WHERE id = $1 AND token_hash = $2"
            ),
            &[&id.inner(), &hash],
        )
        .await
        .map(|opt| opt.map(|row| row.get(0)))
    }
    async fn revoke(&self, id: ID<Session>) -> Result<(), PgErr> {
        self.execute(
            const_format::concatcp!(
                "UPDATE ",
                USER_SESSIONS,
                " SET revoked = TRUE WHERE id = $1"
            ),
            &[&id.inner()],
        )
        .await
        .map(|_| ())
    }
}
