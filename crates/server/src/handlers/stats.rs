use crate::dto::*;
use crate::error::db_unavailable;
use crate::error::forbidden;
use crate::error::war_error;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use mkw_auth::Auth;
use mkw_core::GuildId;
use mkw_database::Db;
use mkw_database::stats;

const DEFAULT_LEADERBOARD_SIZE: usize = 25;

pub async fn overview(db: web::Data<Db>, auth: Auth, path: web::Path<GuildId>) -> impl Responder {
    let guild = path.into_inner();
    if !auth.claims().can_view(guild) {
        return forbidden();
    }
    let Ok(client) = db.get().await else {
        return db_unavailable();
    };
    match stats::guild_overview(&**client, guild).await {
        Err(e) => war_error(e),
        Ok(view) => HttpResponse::Ok().json(serde_json::json!({
            "total_wars": view.total_wars,
            "wins": view.wins,
            "losses": view.losses,
            "ties": view.ties,
            "total_players": view.total_players,
            "average_differential": view.average_differential,
        })),
    }
}

pub async fn leaderboard(
    db: web::Data<Db>,
    auth: Auth,
    path: web::Path<GuildId>,
    query: web::Query<LeaderboardQuery>,
) -> impl Responder {
    let guild = path.into_inner();
    if !auth.claims().can_view(guild) {
        return forbidden();
    }
    let key = match query.sort.as_deref() {
        None => stats::SortKey::default(),
        Some(raw) => match raw.parse() {
            Ok(key) => key,
            Err(e) => return HttpResponse::BadRequest().body(e),
        },
    };
    let Ok(client) = db.get().await else {
        return db_unavailable();
    };
    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_SIZE).clamp(1, 200);
    match stats::leaderboard(&**client, guild, key, limit, query.lastxwars).await {
        Err(e) => war_error(e),
        Ok(standings) => HttpResponse::Ok().json(
            standings.iter().map(StandingView::from).collect::<Vec<_>>(),
        ),
    }
}

pub async fn player(
    db: web::Data<Db>,
    auth: Auth,
    path: web::Path<(GuildId, String)>,
    query: web::Query<StatsQuery>,
) -> impl Responder {
    let (guild, name) = path.into_inner();
    if !auth.claims().can_view(guild) {
        return forbidden();
    }
    let Ok(client) = db.get().await else {
        return db_unavailable();
    };
    match stats::player_stats(&**client, guild, &name, query.lastxwars).await {
        Err(e) => war_error(e),
        Ok(None) => HttpResponse::NotFound().body("no wars recorded for that player"),
        Ok(Some((standing, wars))) => HttpResponse::Ok().json(serde_json::json!({
            "standing": StandingView::from(&standing),
            "wars": wars.iter().map(WarView::from).collect::<Vec<_>>(),
        })),
    }
}
