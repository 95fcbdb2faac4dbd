use crate::dto::*;
use crate::error::db_unavailable;
use crate::error::forbidden;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use mkw_auth::Auth;
use mkw_core::GuildId;
use mkw_database::Db;
use mkw_database::GuildRepository;
use mkw_database::RosterRepository;
use mkw_records::MemberStatus;
use mkw_records::Player;

/// Guilds the caller belongs to, with their grants.
pub async fn list_guilds(db: web::Data<Db>, auth: Auth) -> impl Responder {
    let Ok(client) = db.get().await else {
        return db_unavailable();
    };
    let ids = auth.claims().guilds().keys().copied().collect::<Vec<_>>();
    match client.get_guilds(&ids).await {
        Err(e) => {
            log::error!("guild listing failed: {}", e);
            HttpResponse::InternalServerError().body("internal error")
        }
        Ok(guilds) => HttpResponse::Ok().json(
            guilds
                .iter()
                .map(|g| {
                    let grant = auth.claims().guilds().get(&g.guild_id());
                    serde_json::json!({
                        "guild_id": g.guild_id(),
                        "guild_name": g.name(),
                        "teams": g.teams(),
                        "is_admin": grant.is_some_and(|x| x.is_admin),
                        "can_manage": grant.is_some_and(|x| x.can_manage),
                    })
                })
                .collect::<Vec<_>>(),
        ),
    }
}

pub async fn list_players(
    db: web::Data<Db>,
    auth: Auth,
    path: web::Path<GuildId>,
    query: web::Query<PlayersQuery>,
) -> impl Responder {
    let guild = path.into_inner();
    if !auth.claims().can_view(guild) {
        return forbidden();
    }
    let Ok(client) = db.get().await else {
        return db_unavailable();
    };
    match client.list_players(guild, query.include_inactive).await {
        Err(e) => {
            log::error!("player listing failed: {}", e);
            HttpResponse::InternalServerError().body("internal error")
        }
        Ok(players) => HttpResponse::Ok().json(serde_json::json!({
            "players": players.iter().map(PlayerView::from).collect::<Vec<_>>(),
            "total": players.len(),
        })),
    }
}

pub async fn create_player(
    db: web::Data<Db>,
    auth: Auth,
    path: web::Path<GuildId>,
    req: web::Json<CreatePlayerRequest>,
) -> impl Responder {
    let guild = path.into_inner();
    if !auth.claims().can_manage(guild) {
        return forbidden();
    }
    let name = req.name.trim();
    if name.is_empty() || name.len() > 64 {
        return HttpResponse::BadRequest().body("player name must be 1-64 characters");
    }
    let status = match req.member_status.as_deref() {
        None => MemberStatus::Member,
        Some(raw) => match raw.parse() {
            Ok(status) => status,
            Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
        },
    };
    let Ok(client) = db.get().await else {
        return db_unavailable();
    };
    let player = Player::new(guild, name.to_string(), status);
    match client.create_player(&player).await {
        Ok(true) => HttpResponse::Ok().json(PlayerView::from(&player)),
        Ok(false) => HttpResponse::BadRequest().body("player name already exists"),
        Err(e) => {
            log::error!("player create failed: {}", e);
            HttpResponse::InternalServerError().body("internal error")
        }
    }
}

pub async fn set_status(
    db: web::Data<Db>,
    auth: Auth,
    path: web::Path<(GuildId, String)>,
    req: web::Json<SetStatusRequest>,
) -> impl Responder {
    let (guild, name) = path.into_inner();
    if !auth.claims().can_manage(guild) {
        return forbidden();
    }
    let status: MemberStatus = match req.member_status.parse() {
        Ok(status) => status,
        Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
    };
    let Ok(client) = db.get().await else {
        return db_unavailable();
    };
    match client.set_status(guild, &name, status).await {
        Ok(true) => HttpResponse::Ok().json(serde_json::json!({"status": "ok"})),
        Ok(false) => HttpResponse::NotFound().body("no such player"),
        Err(e) => {
            log::error!("status update failed: {}", e);
            HttpResponse::InternalServerError().body("internal error")
        }
    }
}

pub async fn add_nickname(
    db: web::Data<Db>,
    auth: Auth,
    path: web::Path<(GuildId, String)>,
    req: web::Json<AddNicknameRequest>,
) -> impl Responder {
    let (guild, name) = path.into_inner();
    if !auth.claims().can_manage(guild) {
        return forbidden();
    }
    let nickname = req.nickname.trim();
    if nickname.is_empty() || nickname.len() > 64 {
        return HttpResponse::BadRequest().body("nickname must be 1-64 characters");
    }
    let Ok(client) = db.get().await else {
        return db_unavailable();
    };
    // Nicknames resolve guild-wide, so uniqueness is checked against
    // every roster name and alias, not just this player's.
    match client.alias_owner(guild, nickname).await {
        Ok(Some(owner)) if !owner.eq_ignore_ascii_case(&name) => {
            return HttpResponse::BadRequest()
                .body(format!("nickname already resolves to {}", owner));
        }
        Ok(_) => {}
        Err(e) => {
            log::error!("nickname lookup failed: {}", e);
            return HttpResponse::InternalServerError().body("internal error");
        }
    }
    let mut player = match client.get_player(guild, &name).await {
        Ok(Some(player)) => player,
        Ok(None) => return HttpResponse::NotFound().body("no such player"),
        Err(e) => {
            log::error!("player lookup failed: {}", e);
            return HttpResponse::InternalServerError().body("internal error");
        }
    };
    if let Err(e) = player.add_nickname(nickname.to_string()) {
        return HttpResponse::BadRequest().body(e.to_string());
    }
    match client
        .set_nicknames(guild, player.name(), player.nicknames())
        .await
    {
        Ok(_) => HttpResponse::Ok().json(PlayerView::from(&player)),
        Err(e) => {
            log::error!("nickname write failed: {}", e);
            HttpResponse::InternalServerError().body("internal error")
        }
    }
}
