use mkw_bot::ApiClient;
use mkw_bot::Context;
use mkw_bot::JsonlGateway;
use mkw_bot::Worker;
use mkw_bulk::SessionStore;
use mkw_core::Config;
use mkw_ocr::Engine;
use mkw_ocr::EngineConfig;
use mkw_ocr::TesseractCli;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mkw_core::log();
    mkw_core::trap();
    let config = Config::from_env();
    let db = mkw_database::pool(&config.db_url, config.pool_max)?;
    {
        let client = db.get().await?;
        mkw_database::migrate(&**client).await?;
    }
    let engine = Arc::new(Engine::new(
        Arc::new(TesseractCli::default()),
        EngineConfig::from(&config.ocr),
    ));
    engine.clone().start();
    let (gateway, events) = JsonlGateway::start();
    let ctx = Arc::new(Context {
        store: SessionStore::new(db.clone()),
        api: ApiClient::new(config.api_base_url.clone(), config.api_key.clone()),
        public_web_url: config.public_web_url.clone(),
        db,
        engine,
        gateway,
        pending: Mutex::new(HashMap::new()),
    });
    Worker::new(ctx).run(events).await;
    Ok(())
}
