use crate::dto::*;
use crate::error::db_unavailable;
use crate::error::forbidden;
use crate::error::war_error;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use mkw_auth::Auth;
use mkw_core::GuildId;
use mkw_core::WarId;
use mkw_database::Db;
use mkw_database::war;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

pub async fn list_wars(
    db: web::Data<Db>,
    auth: Auth,
    path: web::Path<GuildId>,
    query: web::Query<PageQuery>,
) -> impl Responder {
    let guild = path.into_inner();
    if !auth.claims().can_view(guild) {
        return forbidden();
    }
    let Ok(client) = db.get().await else {
        return db_unavailable();
    };
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    match war::list_wars(&**client, guild, page, limit).await {
        Err(e) => war_error(e),
        Ok((wars, total)) => HttpResponse::Ok().json(serde_json::json!({
            "wars": wars.iter().map(WarView::from).collect::<Vec<_>>(),
            "total": total,
            "page": page,
            "limit": limit,
        })),
    }
}

pub async fn get_war(
    db: web::Data<Db>,
    auth: Auth,
    path: web::Path<(GuildId, WarId)>,
) -> impl Responder {
    let (guild, war_id) = path.into_inner();
    if !auth.claims().can_view(guild) {
        return forbidden();
    }
    let Ok(client) = db.get().await else {
        return db_unavailable();
    };
    match war::get_war(&**client, guild, war_id).await {
        Err(e) => war_error(e),
        Ok(None) => HttpResponse::NotFound().body("no such war"),
        Ok(Some(war)) => HttpResponse::Ok().json(WarView::from(&war)),
    }
}
