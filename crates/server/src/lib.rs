//! Review API server.
//!
//! HTTP surface for the web review front-end and for bot-initiated
//! session creation, combined into a single actix-web server.
//!
//! ## Submodules
//!
//! - [`handlers`] — Route handlers per concern (auth, guilds, wars, stats, bulk)
//! - [`dto`] — Request/response wire shapes
//! - [`error`] — Store-error to status-code mapping
pub mod dto;
pub mod error;
pub mod handlers;

use actix_cors::Cors;
use actix_web::App;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use actix_web::Responder;
use actix_web::middleware::Logger;
use actix_web::web;
use mkw_auth::ApiKeySecret;
use mkw_auth::Crypto;
use mkw_auth::IdentityProvider;
use mkw_bulk::SessionStore;
use mkw_core::Config;
use mkw_core::HTTP_TIMEOUT;
use mkw_database::Db;
use std::sync::Arc;

async fn health(db: web::Data<Db>) -> impl Responder {
    let Ok(client) = db.get().await else {
        return HttpResponse::ServiceUnavailable().body("database unavailable");
    };
    match client
        .execute("SELECT 1", &[])
        .await
        .inspect_err(|e| log::error!("health check failed: {}", e))
    {
        Ok(_) => HttpResponse::Ok().body("ok"),
        Err(_) => HttpResponse::ServiceUnavailable().body("database unavailable"),
    }
}

#[rustfmt::skip]
pub async fn run(
    config: Config,
    db: Db,
    identity: Arc<dyn IdentityProvider>,
) -> Result<(), std::io::Error> {
    let store = web::Data::new(SessionStore::new(db.clone()));
    let crypto = web::Data::new(Crypto::new(config.jwt_secret.as_bytes()));
    let api_key = web::Data::new(ApiKeySecret(config.api_key.clone()));
    let identity = web::Data::new(identity);
    let database = web::Data::new(db);
    let origins = config.cors_origins.clone();
    log::info!("starting review api on {}", config.bind_addr);
    HttpServer::new(move || {
        let cors = origins.iter().fold(
            Cors::default().allow_any_method().allow_any_header(),
            |cors, origin| cors.allowed_origin(origin),
        );
        App::new()
            .wrap(Logger::new("%r %s %Ts"))
            .wrap(cors)
            .app_data(store.clone())
            .app_data(crypto.clone())
            .app_data(api_key.clone())
            .app_data(identity.clone())
            .app_data(database.clone())
            .route("/health", web::get().to(health))
            .service(
                web::scope("/auth")
                    .route("/exchange", web::post().to(handlers::auth::exchange))
                    .route("/logout", web::post().to(handlers::auth::logout))
                    .route("/me", web::get().to(handlers::auth::me)),
            )
            .route("/guilds", web::get().to(handlers::guilds::list_guilds))
            .service(
                web::scope("/guilds/{guild}")
                    .route("/players", web::get().to(handlers::guilds::list_players))
                    .route("/players", web::post().to(handlers::guilds::create_player))
                    .route("/players/{name}/status", web::put().to(handlers::guilds::set_status))
                    .route("/players/{name}/nicknames", web::post().to(handlers::guilds::add_nickname))
                    .route("/wars", web::get().to(handlers::wars::list_wars))
                    .route("/wars/{war_id}", web::get().to(handlers::wars::get_war))
                    .route("/stats/overview", web::get().to(handlers::stats::overview))
                    .route("/stats/leaderboard", web::get().to(handlers::stats::leaderboard))
                    .route("/stats/player/{name}", web::get().to(handlers::stats::player)),
            )
            .service(
                web::scope("/bulk/sessions")
                    .route("", web::post().to(handlers::bulk::create_session))
                    .route("/{token}", web::get().to(handlers::bulk::get_session))
                    .route("/{token}/results", web::get().to(handlers::bulk::get_results))
                    .route("/{token}/results", web::post().to(handlers::bulk::append_result))
                    .route("/{token}/results/{result_id}", web::put().to(handlers::bulk::update_result))
                    .route("/{token}/failures", web::post().to(handlers::bulk::append_failure))
                    .route("/{token}/failures/{failure_id}/convert", web::post().to(handlers::bulk::convert_failure))
                    .route("/{token}/confirm", web::post().to(handlers::bulk::confirm_session))
                    .route("/{token}/cancel", web::post().to(handlers::bulk::cancel_session)),
            )
    })
    .client_request_timeout(HTTP_TIMEOUT)
    .workers(6)
    .bind(&config.bind_addr)?
    .run()
    .await
}
