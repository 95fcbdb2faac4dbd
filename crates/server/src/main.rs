use mkw_auth::PlatformIdentity;
use mkw_bulk::SessionStore;
use mkw_core::Config;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mkw_core::log();
    mkw_core::trap();
    let config = Config::from_env();
    let db = mkw_database::pool(&config.db_url, config.pool_max)?;
    {
        let client = db.get().await?;
        mkw_database::migrate(&**client).await?;
        mkw_auth::migrate(&**client).await?;
    }
    mkw_bulk::sweeper(SessionStore::new(db.clone()));
    let identity = Arc::new(PlatformIdentity::new(
        config.oauth_client_id.clone(),
        config.oauth_client_secret.clone(),
        config.oauth_redirect_uri.clone(),
    ));
    mkw_server::run(config, db, identity).await?;
    Ok(())
}
