use crate::dto::*;
use crate::error::db_unavailable;
use crate::error::forbidden;
use crate::error::session_error;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::web;
use mkw_auth::ApiKey;
use mkw_auth::Caller;
use mkw_bulk::NewFailure;
use mkw_bulk::NewResult;
use mkw_bulk::SessionStore;
use mkw_core::CONFIRM_TIMEOUT;
use mkw_core::DEFAULT_RACE_COUNT;
use mkw_core::GuildId;
use mkw_database::Db;
use mkw_database::RosterRepository;
use mkw_records::DetectedPlayer;
use mkw_records::ReviewStatus;

/// Idempotency header for session creation.
const NONCE_HEADER: &str = "X-Creation-Nonce";

pub async fn create_session(
    store: web::Data<SessionStore>,
    _key: ApiKey,
    http: HttpRequest,
    req: web::Json<CreateSessionRequest>,
) -> impl Responder {
    if req.total_images < 0 {
        return HttpResponse::BadRequest().body("total_images must be non-negative");
    }
    let nonce = http
        .headers()
        .get(NONCE_HEADER)
        .and_then(|h| h.to_str().ok());
    match store
        .create_session(req.guild_id, req.created_by_user_id, req.total_images, nonce)
        .await
    {
        Err(e) => session_error(e),
        Ok(session_token) => HttpResponse::Ok().json(CreateSessionResponse { session_token }),
    }
}

pub async fn append_result(
    store: web::Data<SessionStore>,
    _key: ApiKey,
    path: web::Path<String>,
    req: web::Json<AppendResultRequest>,
) -> impl Responder {
    let token = path.into_inner();
    let req = req.into_inner();
    let new = NewResult {
        image_filename: req.image_filename,
        image_url: req.image_url,
        detected_players: req.detected_players,
        race_count: req.race_count.unwrap_or(DEFAULT_RACE_COUNT),
        message_timestamp: req.message_timestamp.map(from_unix),
    };
    match store.append_result(&token, new).await {
        Err(e) => session_error(e),
        Ok(result_id) => HttpResponse::Ok().json(serde_json::json!({"result_id": result_id})),
    }
}

pub async fn append_failure(
    store: web::Data<SessionStore>,
    _key: ApiKey,
    path: web::Path<String>,
    req: web::Json<AppendFailureRequest>,
) -> impl Responder {
    let token = path.into_inner();
    let req = req.into_inner();
    let new = NewFailure {
        image_filename: req.image_filename,
        image_url: req.image_url,
        error_message: req.error_message,
        message_timestamp: req.message_timestamp.map(from_unix),
        message_id: req.discord_message_id,
    };
    match store.append_failure(&token, new).await {
        Err(e) => session_error(e),
        Ok(failure_id) => HttpResponse::Ok().json(serde_json::json!({"failure_id": failure_id})),
    }
}

/// Membership gate shared by the review endpoints: the caller must
/// belong to the session's guild (the API key is trusted everywhere).
async fn guarded_session(
    store: &SessionStore,
    caller: &Caller,
    token: &str,
) -> Result<mkw_records::BulkSession, HttpResponse> {
    let session = store.session_head(token).await.map_err(session_error)?;
    match caller.can_view(session.guild_id) {
        true => Ok(session),
        false => Err(forbidden()),
    }
}

pub async fn get_session(
    store: web::Data<SessionStore>,
    caller: Caller,
    path: web::Path<String>,
) -> impl Responder {
    let token = path.into_inner();
    match guarded_session(&store, &caller, &token).await {
        Err(response) => response,
        Ok(session) => HttpResponse::Ok().json(SessionView::from(&session)),
    }
}

pub async fn get_results(
    store: web::Data<SessionStore>,
    caller: Caller,
    path: web::Path<String>,
) -> impl Responder {
    let token = path.into_inner();
    if let Err(response) = guarded_session(&store, &caller, &token).await {
        return response;
    }
    match store.get_session(&token).await {
        Err(e) => session_error(e),
        Ok((session, results, failures)) => HttpResponse::Ok().json(serde_json::json!({
            "session": SessionView::from(&session),
            "results": results.iter().map(ResultView::from).collect::<Vec<_>>(),
            "failures": failures.iter().map(FailureView::from).collect::<Vec<_>>(),
            "total": results.len() + failures.len(),
        })),
    }
}

/// Resolve reviewer-entered player lines against the guild roster so
/// corrections carry canonical names and membership flags.
async fn resolve_entries(
    db: &Db,
    guild: GuildId,
    entries: Vec<PlayerEntry>,
) -> Result<Vec<DetectedPlayer>, HttpResponse> {
    let client = db.get().await.map_err(|_| db_unavailable())?;
    let players = client.roster(guild).await.map_err(|e| {
        log::error!("roster load failed: {}", e);
        HttpResponse::InternalServerError().body("internal error")
    })?;
    let roster = mkw_resolver::Roster::snapshot(&players);
    Ok(entries
        .into_iter()
        .map(|entry| {
            let resolved = mkw_resolver::resolve(&roster, &entry.name);
            DetectedPlayer {
                raw_name: entry.raw_name.unwrap_or_else(|| entry.name.clone()),
                name: resolved.name,
                score: entry.score,
                is_roster_member: resolved.is_roster_member,
                races_played: entry.races_played.unwrap_or(DEFAULT_RACE_COUNT),
            }
        })
        .collect())
}

pub async fn update_result(
    store: web::Data<SessionStore>,
    db: web::Data<Db>,
    caller: Caller,
    path: web::Path<(String, i64)>,
    req: web::Json<UpdateResultRequest>,
) -> impl Responder {
    let (token, result_id) = path.into_inner();
    let session = match guarded_session(&store, &caller, &token).await {
        Err(response) => return response,
        Ok(session) => session,
    };
    let req = req.into_inner();
    let status: ReviewStatus = match req.review_status.parse() {
        Ok(status) => status,
        Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
    };
    let corrected = match req.corrected_players {
        None => None,
        Some(entries) => match resolve_entries(&db, session.guild_id, entries).await {
            Err(response) => return response,
            Ok(players) => Some(players),
        },
    };
    match store
        .update_result(&token, result_id, status, corrected)
        .await
    {
        Err(e) => session_error(e),
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({"status": "ok"})),
    }
}

pub async fn convert_failure(
    store: web::Data<SessionStore>,
    db: web::Data<Db>,
    caller: Caller,
    path: web::Path<(String, i64)>,
    req: web::Json<ConvertFailureRequest>,
) -> impl Responder {
    let (token, failure_id) = path.into_inner();
    let session = match guarded_session(&store, &caller, &token).await {
        Err(response) => return response,
        Ok(session) => session,
    };
    let req = req.into_inner();
    if req.players.is_empty() {
        return HttpResponse::BadRequest().body("at least one player is required");
    }
    let initial = match req.review_status.as_deref() {
        None => ReviewStatus::Pending,
        Some(raw) => match raw.parse() {
            Ok(status) => status,
            Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
        },
    };
    let players = match resolve_entries(&db, session.guild_id, req.players).await {
        Err(response) => return response,
        Ok(players) => players,
    };
    match store
        .convert_failure(&token, failure_id, players, initial)
        .await
    {
        Err(e) => session_error(e),
        Ok(result_id) => HttpResponse::Ok().json(serde_json::json!({"result_id": result_id})),
    }
}

pub async fn confirm_session(
    store: web::Data<SessionStore>,
    caller: Caller,
    path: web::Path<String>,
) -> impl Responder {
    let token = path.into_inner();
    if let Err(response) = guarded_session(&store, &caller, &token).await {
        return response;
    }
    match tokio::time::timeout(CONFIRM_TIMEOUT, store.confirm_session(&token)).await {
        Err(_) => {
            log::error!("confirm exceeded its budget; transaction aborted");
            HttpResponse::InternalServerError().body("confirm timed out, retry")
        }
        Ok(Err(e)) => session_error(e),
        Ok(Ok(confirmation)) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "wars_created": confirmation.wars_created,
            "war_ids": confirmation.war_ids,
        })),
    }
}

pub async fn cancel_session(
    store: web::Data<SessionStore>,
    caller: Caller,
    path: web::Path<String>,
) -> impl Responder {
    let token = path.into_inner();
    // Cancel must stay allowed on expired sessions, so the readable gate
    // of the shared guard does not apply; membership is checked against
    // the raw row inside the store path instead.
    let session = match store.get_raw_head(&token).await {
        Err(e) => return session_error(e),
        Ok(session) => session,
    };
    if !caller.can_view(session.guild_id) {
        return forbidden();
    }
    match store.cancel_session(&token).await {
        Err(e) => session_error(e),
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({"status": "ok"})),
    }
}
