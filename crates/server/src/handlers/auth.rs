use crate::dto::*;
use crate::error::db_unavailable;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use mkw_auth::Auth;
use mkw_auth::Claims;
use mkw_auth::Crypto;
use mkw_auth::IdentityProvider;
use mkw_auth::Session;
use mkw_auth::SessionRepository;
use mkw_core::ID;
use mkw_database::Db;
use std::sync::Arc;

/// OAuth code → verified identity → signed session token.
pub async fn exchange(
    db: web::Data<Db>,
    crypto: web::Data<Crypto>,
    provider: web::Data<Arc<dyn IdentityProvider>>,
    req: web::Json<ExchangeRequest>,
) -> impl Responder {
    let identity = match provider.exchange(&req.code).await {
        Ok(identity) => identity,
        Err(e) => {
            log::warn!("identity exchange failed: {}", e);
            return HttpResponse::Unauthorized().body("could not verify identity");
        }
    };
    let Ok(client) = db.get().await else {
        return db_unavailable();
    };
    let id = ID::<Session>::default();
    let claims = Claims::new(identity.user_id, id, identity.guilds.clone());
    let token = match crypto.encode(&claims) {
        Ok(token) => token,
        Err(e) => {
            log::error!("token encode failed: {}", e);
            return HttpResponse::InternalServerError().body("internal error");
        }
    };
    // The session row stores the hash of the exact token issued; the
    // Auth extractor matches against it on every request.
    let session = Session::new(id, identity.user_id, Crypto::hash(&token), identity.guilds);
    if let Err(e) = client.signin(&session).await {
        log::error!("session signin failed: {}", e);
        return HttpResponse::InternalServerError().body("internal error");
    }
    HttpResponse::Ok().json(ExchangeResponse {
        token,
        user_id: identity.user_id,
    })
}

pub async fn me(auth: Auth) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "user_id": auth.claims().user(),
        "guilds": auth.claims().guilds(),
    }))
}

pub async fn logout(db: web::Data<Db>, auth: Auth) -> impl Responder {
    let Ok(client) = db.get().await else {
        return db_unavailable();
    };
    match client.revoke(auth.claims().session()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({"status": "logged_out"})),
        Err(e) => {
            log::error!("logout failed: {}", e);
            HttpResponse::InternalServerError().body("internal error")
        }
    }
}
