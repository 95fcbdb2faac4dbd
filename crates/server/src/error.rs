//! Store-error to HTTP-status mapping (§ status table of the API).
use actix_web::HttpResponse;
use mkw_bulk::SessionError;
use mkw_database::war::WarStoreError;

pub fn session_error(e: SessionError) -> HttpResponse {
    match e {
        SessionError::NotFound => HttpResponse::NotFound().body("session not found"),
        SessionError::ResultNotFound(_) | SessionError::FailureNotFound(_) => {
            HttpResponse::NotFound().body(e.to_string())
        }
        SessionError::NotOpen(_) => HttpResponse::Conflict().body(e.to_string()),
        SessionError::Expired => HttpResponse::Gone().body("session expired"),
        SessionError::EmptyPlayers(_) | SessionError::Invalid(_) => {
            HttpResponse::BadRequest().body(e.to_string())
        }
        SessionError::Corrupt(_) => {
            log::error!("session store corruption: {}", e);
            HttpResponse::InternalServerError().body("internal error")
        }
        SessionError::Storage(_) | SessionError::Pool(_) => {
            log::error!("session store failure: {}", e);
            HttpResponse::InternalServerError().body("internal error")
        }
    }
}

pub fn war_error(e: WarStoreError) -> HttpResponse {
    match e {
        WarStoreError::UnknownPlayer(_) | WarStoreError::Invalid(_) => {
            HttpResponse::BadRequest().body(e.to_string())
        }
        WarStoreError::NotFound(_) => HttpResponse::NotFound().body(e.to_string()),
        WarStoreError::Storage(_) => {
            log::error!("war store failure: {}", e);
            HttpResponse::InternalServerError().body("internal error")
        }
    }
}

pub fn forbidden() -> HttpResponse {
    HttpResponse::Forbidden().body("insufficient guild permission")
}

pub fn db_unavailable() -> HttpResponse {
    HttpResponse::InternalServerError().body("database unavailable")
}
