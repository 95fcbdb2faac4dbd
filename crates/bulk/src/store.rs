use super::SessionError;
use super::session_token;
use mkw_core::FailureId;
use mkw_core::GuildId;
use mkw_core::MessageId;
use mkw_core::RETRY_ATTEMPTS;
use mkw_core::RETRY_BACKOFF;
use mkw_core::Races;
use mkw_core::ResultId;
use mkw_core::SESSION_TTL;
use mkw_core::UserId;
use mkw_core::WarId;
use mkw_database::BULK_FAILURES;
use mkw_database::BULK_RESULTS;
use mkw_database::BULK_SESSIONS;
use mkw_database::Db;
use mkw_database::RosterRepository;
use mkw_database::war;
use mkw_records::BulkFailure;
use mkw_records::BulkResult;
use mkw_records::BulkSession;
use mkw_records::DetectedPlayer;
use mkw_records::MemberStatus;
use mkw_records::Player;
use mkw_records::ReviewStatus;
use mkw_records::SessionStatus;
use mkw_records::War;
use mkw_records::WarPlayer;
use std::str::FromStr;
use std::time::SystemTime;
use deadpool_postgres::GenericClient;
use tokio_postgres::IsolationLevel;
use tokio_postgres::Row;

/// Input for a new result row.
#[derive(Debug, Clone)]
pub struct NewResult {
    pub image_filename: String,
    pub image_url: Option<String>,
    pub detected_players: Vec<DetectedPlayer>,
    pub race_count: Races,
    pub message_timestamp: Option<SystemTime>,
}

/// Input for a new failure row.
#[derive(Debug, Clone)]
pub struct NewFailure {
    pub image_filename: String,
    pub image_url: Option<String>,
    pub error_message: String,
    pub message_timestamp: Option<SystemTime>,
    pub message_id: Option<MessageId>,
}

/// One deferred write from the bot's completion batcher.
#[derive(Debug, Clone)]
pub enum BatchItem {
    Result(NewResult),
    Failure(NewFailure),
}

/// Outcome of a confirmed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub wars_created: usize,
    pub war_ids: Vec<WarId>,
}

/// All bulk session operations over the shared pool.
#[derive(Clone)]
pub struct SessionStore {
    db: Db,
}

impl SessionStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create an `open` session with a 24 h TTL and return its token.
    ///
    /// With a `creation_nonce`, repeated calls for the same
    /// `(guild, user, nonce)` return the original token instead of a new
    /// session.
    pub async fn create_session(
        &self,
        guild: GuildId,
        created_by: UserId,
        total_images: i32,
        nonce: Option<&str>,
    ) -> Result<String, SessionError> {
        let client = self.db.get().await?;
        if let Some(nonce) = nonce {
            if let Some(row) = client
                .query_opt(
                    const_format::concatcp!(
                        "SELECT session_token FROM ",
                        BULK_SESSIONS,
                        " WHERE guild_id = $1 AND created_by = $2 AND creation_nonce = $3"
                    ),
                    &[&guild, &created_by, &nonce],
                )
                .await?
            {
                return Ok(row.get(0));
            }
        }
        let token = session_token();
        let now = SystemTime::now();
        let inserted = client
            .query_opt(
                const_format::concatcp!(
                    "INSERT INTO ",
                    BULK_SESSIONS,
                    " (session_token, guild_id, created_by, status, total_images,
                       creation_nonce, created_at, expires_at)
                     VALUES ($1, $2, $3, 'open', $4, $5, $6, $7)
                     ON CONFLICT (guild_id, created_by, creation_nonce)
                       WHERE creation_nonce IS NOT NULL
                       DO NOTHING
                     RETURNING session_token"
                ),
                &[
                    &token,
                    &guild,
                    &created_by,
                    &total_images,
                    &nonce,
                    &now,
                    &(now + SESSION_TTL),
                ],
            )
            .await?;
        match inserted {
            Some(row) => {
                log::info!("opened bulk session for guild {} ({} images)", guild, total_images);
                Ok(row.get(0))
            }
            // Nonce raced with a concurrent create; hand back the winner.
            None => {
                let nonce = nonce.expect("conflict only possible with a nonce");
                let row = client
                    .query_one(
                        const_format::concatcp!(
                            "SELECT session_token FROM ",
                            BULK_SESSIONS,
                            " WHERE guild_id = $1 AND created_by = $2 AND creation_nonce = $3"
                        ),
                        &[&guild, &created_by, &nonce],
                    )
                    .await?;
                Ok(row.get(0))
            }
        }
    }

    pub async fn append_result(
        &self,
        token: &str,
        new: NewResult,
    ) -> Result<ResultId, SessionError> {
        let client = self.db.get().await?;
        let session = load_session(&client, token).await?;
        gate_writable(&session)?;
        insert_result(&client, &session, &new, ReviewStatus::Pending).await
    }

    pub async fn append_failure(
        &self,
        token: &str,
        new: NewFailure,
    ) -> Result<FailureId, SessionError> {
        let client = self.db.get().await?;
        let session = load_session(&client, token).await?;
        gate_writable(&session)?;
        insert_failure(&client, &session, &new).await
    }

    /// Apply a batch of completions in one transaction (bot path).
    pub async fn append_batch(
        &self,
        token: &str,
        items: Vec<BatchItem>,
    ) -> Result<(), SessionError> {
        if items.is_empty() {
            return Ok(());
        }
        let mut client = self.db.get().await?;
        let txn = client.build_transaction().start().await?;
        let session = load_session(&txn, token).await?;
        gate_writable(&session)?;
        for item in items {
            match item {
                BatchItem::Result(new) => {
                    insert_result(&txn, &session, &new, ReviewStatus::Pending).await?;
                }
                BatchItem::Failure(new) => {
                    insert_failure(&txn, &session, &new).await?;
                }
            }
        }
        txn.commit().await?;
        Ok(())
    }

    /// Session row without the expiry gate; cancel stays legal on
    /// expired sessions and still needs the guild for authorization.
    pub async fn get_raw_head(&self, token: &str) -> Result<BulkSession, SessionError> {
        let client = self.db.get().await?;
        load_session(&client, token).await
    }

    /// Session metadata only.
    pub async fn session_head(&self, token: &str) -> Result<BulkSession, SessionError> {
        let client = self.db.get().await?;
        let session = load_session(&client, token).await?;
        gate_readable(&session)?;
        Ok(session)
    }

    /// Full review view: session, results in append order, failures.
    pub async fn get_session(
        &self,
        token: &str,
    ) -> Result<(BulkSession, Vec<BulkResult>, Vec<BulkFailure>), SessionError> {
        let client = self.db.get().await?;
        let session = load_session(&client, token).await?;
        gate_readable(&session)?;
        let results = client
            .query(
                const_format::concatcp!(
                    "SELECT ",
                    RESULT_COLUMNS,
                    " FROM ",
                    BULK_RESULTS,
                    " WHERE session_token = $1 ORDER BY result_id"
                ),
                &[&token],
            )
            .await?
            .iter()
            .map(result_from)
            .collect::<Result<Vec<_>, _>>()?;
        let failures = client
            .query(
                const_format::concatcp!(
                    "SELECT ",
                    FAILURE_COLUMNS,
                    " FROM ",
                    BULK_FAILURES,
                    " WHERE session_token = $1 ORDER BY failure_id"
                ),
                &[&token],
            )
            .await?
            .iter()
            .map(failure_from)
            .collect::<Vec<_>>();
        Ok((session, results, failures))
    }

    /// Set a result's review status, optionally replacing corrections.
    ///
    /// Any status transition is allowed while the session is open,
    /// including back to `pending`. Absent corrections leave previously
    /// stored corrections in place.
    pub async fn update_result(
        &self,
        token: &str,
        result_id: ResultId,
        status: ReviewStatus,
        corrected: Option<Vec<DetectedPlayer>>,
    ) -> Result<(), SessionError> {
        let client = self.db.get().await?;
        let session = load_session(&client, token).await?;
        gate_writable(&session)?;
        let updated = match corrected {
            Some(players) => {
                let players =
                    serde_json::to_value(&players).expect("detected players serialize");
                client
                    .execute(
                        const_format::concatcp!(
                            "UPDATE ",
                            BULK_RESULTS,
                            " SET review_status = $3, corrected_players = $4
                             WHERE session_token = $1 AND result_id = $2"
                        ),
                        &[&token, &result_id, &status.as_str(), &players],
                    )
                    .await?
            }
            None => {
                client
                    .execute(
                        const_format::concatcp!(
                            "UPDATE ",
                            BULK_RESULTS,
                            " SET review_status = $3
                             WHERE session_token = $1 AND result_id = $2"
                        ),
                        &[&token, &result_id, &status.as_str()],
                    )
                    .await?
            }
        };
        match updated {
            0 => Err(SessionError::ResultNotFound(result_id)),
            _ => Ok(()),
        }
    }

    /// Replace a failure with a manually entered result, atomically.
    pub async fn convert_failure(
        &self,
        token: &str,
        failure_id: FailureId,
        players: Vec<DetectedPlayer>,
        initial: ReviewStatus,
    ) -> Result<ResultId, SessionError> {
        let mut client = self.db.get().await?;
        let txn = client.build_transaction().start().await?;
        let session = load_session(&txn, token).await?;
        gate_writable(&session)?;
        let removed = txn
            .query_opt(
                const_format::concatcp!(
                    "DELETE FROM ",
                    BULK_FAILURES,
                    " WHERE session_token = $1 AND failure_id = $2
                     RETURNING image_filename, image_url, message_timestamp"
                ),
                &[&token, &failure_id],
            )
            .await?
            .ok_or(SessionError::FailureNotFound(failure_id))?;
        let new = NewResult {
            image_filename: removed.get(0),
            image_url: removed.get(1),
            detected_players: players,
            race_count: mkw_core::DEFAULT_RACE_COUNT,
            message_timestamp: removed.get(2),
        };
        let result_id = insert_result(&txn, &session, &new, initial).await?;
        txn.commit().await?;
        log::info!("converted failure {} into result {}", failure_id, result_id);
        Ok(result_id)
    }

    /// Materialize every approved result into a war, atomically.
    ///
    /// Runs in one REPEATABLE READ transaction with the session row
    /// locked; retried on serialization conflicts (idempotent under the
    /// open-state check).
    pub async fn confirm_session(&self, token: &str) -> Result<Confirmation, SessionError> {
        let mut delay = RETRY_BACKOFF;
        for attempt in 1.. {
            match self.try_confirm(token).await {
                Err(e) if attempt < RETRY_ATTEMPTS && e.retryable() => {
                    log::warn!("confirm retry {} for bulk session: {}", attempt, e);
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                other => return other,
            }
        }
        unreachable!("retry loop always returns")
    }

    async fn try_confirm(&self, token: &str) -> Result<Confirmation, SessionError> {
        let mut client = self.db.get().await?;
        let txn = client
            .build_transaction()
            .isolation_level(IsolationLevel::RepeatableRead)
            .start()
            .await?;
        let session = load_session_locked(&txn, token).await?;
        gate_writable(&session)?;
        let mut roster = mkw_resolver::Roster::snapshot(&txn.roster(session.guild_id).await?);
        let approved = txn
            .query(
                const_format::concatcp!(
                    "SELECT ",
                    RESULT_COLUMNS,
                    " FROM ",
                    BULK_RESULTS,
                    " WHERE session_token = $1 AND review_status = 'approved'
                     ORDER BY result_id"
                ),
                &[&token],
            )
            .await?
            .iter()
            .map(result_from)
            .collect::<Result<Vec<_>, _>>()?;
        let now = SystemTime::now();
        let mut war_ids = Vec::with_capacity(approved.len());
        for result in approved.iter() {
            let players = result.effective_players();
            if players.is_empty() {
                return Err(SessionError::EmptyPlayers(result.id));
            }
            let mut lines = Vec::with_capacity(players.len());
            for entry in players {
                let resolved = mkw_resolver::resolve(&roster, &entry.name);
                // Safety net: clients are expected to pre-stage roster
                // additions; anyone still unknown joins as a fresh Member.
                if !resolved.is_roster_member {
                    let recruit =
                        Player::new(session.guild_id, resolved.name.clone(), MemberStatus::Member);
                    txn.create_player(&recruit).await?;
                    roster.admit(resolved.name.clone());
                    log::info!("auto-created roster entry {} during confirm", resolved.name);
                }
                lines.push(WarPlayer::new(resolved.name, entry.score, entry.races_played));
            }
            let war = War::new(
                0,
                session.guild_id,
                result.race_count,
                result.message_timestamp.unwrap_or(now),
                lines,
            )?;
            war_ids.push(war::persist_war(&txn, &war).await?);
        }
        txn.execute(
            const_format::concatcp!(
                "UPDATE ",
                BULK_SESSIONS,
                " SET status = 'confirmed' WHERE session_token = $1"
            ),
            &[&token],
        )
        .await?;
        txn.commit().await?;
        log::info!(
            "confirmed bulk session: {} wars from {} approved results",
            war_ids.len(),
            approved.len()
        );
        Ok(Confirmation {
            wars_created: war_ids.len(),
            war_ids,
        })
    }

    /// Cancel an open session. Idempotent against already-terminal
    /// cancelled/expired sessions; confirmed history stays untouchable.
    pub async fn cancel_session(&self, token: &str) -> Result<(), SessionError> {
        let client = self.db.get().await?;
        let session = load_session(&client, token).await?;
        match session.status {
            SessionStatus::Open => {
                client
                    .execute(
                        const_format::concatcp!(
                            "UPDATE ",
                            BULK_SESSIONS,
                            " SET status = 'cancelled' WHERE session_token = $1"
                        ),
                        &[&token],
                    )
                    .await?;
                log::info!("cancelled bulk session for guild {}", session.guild_id);
                Ok(())
            }
            SessionStatus::Cancelled | SessionStatus::Expired => Ok(()),
            SessionStatus::Confirmed => Err(SessionError::NotOpen(SessionStatus::Confirmed)),
        }
    }

    /// Expire overdue open sessions; returns how many were swept.
    pub async fn sweep_expired(&self) -> Result<u64, SessionError> {
        let client = self.db.get().await?;
        let swept = client
            .execute(
                const_format::concatcp!(
                    "UPDATE ",
                    BULK_SESSIONS,
                    " SET status = 'expired' WHERE status = 'open' AND expires_at < now()"
                ),
                &[],
            )
            .await?;
        if swept > 0 {
            log::info!("swept {} expired bulk sessions", swept);
        }
        Ok(swept)
    }
}

const SESSION_COLUMNS: &str =
    "session_token, guild_id, created_by, status, total_images, created_at, expires_at";
const RESULT_COLUMNS: &str = "result_id, session_token, image_filename, image_url, \
     detected_players, corrected_players, review_status, race_count, message_timestamp";
const FAILURE_COLUMNS: &str = "failure_id, session_token, image_filename, image_url, \
     error_message, message_timestamp, discord_message_id";

async fn load_session<C: GenericClient>(
    client: &C,
    token: &str,
) -> Result<BulkSession, SessionError> {
    client
        .query_opt(
            const_format::concatcp!(
                "SELECT ",
                SESSION_COLUMNS,
                " FROM ",
                BULK_SESSIONS,
                " WHERE session_token = $1"
            ),
            &[&token],
        )
        .await?
        .ok_or(SessionError::NotFound)
        .and_then(|row| session_from(&row))
}

async fn load_session_locked(
    txn: &tokio_postgres::Transaction<'_>,
    token: &str,
) -> Result<BulkSession, SessionError> {
    txn.query_opt(
        const_format::concatcp!(
            "SELECT ",
            SESSION_COLUMNS,
            " FROM ",
            BULK_SESSIONS,
            " WHERE session_token = $1 FOR UPDATE"
        ),
        &[&token],
    )
    .await?
    .ok_or(SessionError::NotFound)
    .and_then(|row| session_from(&row))
}

/// Review mutations require open and unexpired.
fn gate_writable(session: &BulkSession) -> Result<(), SessionError> {
    match session.status {
        SessionStatus::Open if session.expired(SystemTime::now()) => Err(SessionError::Expired),
        SessionStatus::Open => Ok(()),
        SessionStatus::Expired => Err(SessionError::Expired),
        status => Err(SessionError::NotOpen(status)),
    }
}

/// Reads are allowed on terminal confirmed/cancelled history, but an
/// expired session is gone from the review surface.
fn gate_readable(session: &BulkSession) -> Result<(), SessionError> {
    match session.status {
        SessionStatus::Open if session.expired(SystemTime::now()) => Err(SessionError::Expired),
        SessionStatus::Expired => Err(SessionError::Expired),
        _ => Ok(()),
    }
}

async fn insert_result<C: GenericClient>(
    client: &C,
    session: &BulkSession,
    new: &NewResult,
    status: ReviewStatus,
) -> Result<ResultId, SessionError> {
    let detected = serde_json::to_value(&new.detected_players).expect("detected players serialize");
    let row = client
        .query_one(
            const_format::concatcp!(
                "INSERT INTO ",
                BULK_RESULTS,
                " (session_token, guild_id, image_filename, image_url, detected_players,
                   review_status, race_count, message_timestamp)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 RETURNING result_id"
            ),
            &[
                &session.token,
                &session.guild_id,
                &new.image_filename,
                &new.image_url,
                &detected,
                &status.as_str(),
                &new.race_count,
                &new.message_timestamp,
            ],
        )
        .await?;
    Ok(row.get(0))
}

async fn insert_failure<C: GenericClient>(
    client: &C,
    session: &BulkSession,
    new: &NewFailure,
) -> Result<FailureId, SessionError> {
    let row = client
        .query_one(
            const_format::concatcp!(
                "INSERT INTO ",
                BULK_FAILURES,
                " (session_token, guild_id, image_filename, image_url, error_message,
                   message_timestamp, discord_message_id)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING failure_id"
            ),
            &[
                &session.token,
                &session.guild_id,
                &new.image_filename,
                &new.image_url,
                &new.error_message,
                &new.message_timestamp,
                &new.message_id,
            ],
        )
        .await?;
    Ok(row.get(0))
}

fn session_from(row: &Row) -> Result<BulkSession, SessionError> {
    Ok(BulkSession {
        token: row.get(0),
        guild_id: row.get(1),
        created_by: row.get(2),
        status: SessionStatus::from_str(row.get(3))
            .map_err(|e| SessionError::Corrupt(e.to_string()))?,
        total_images: row.get(4),
        created_at: row.get(5),
        expires_at: row.get(6),
    })
}

fn result_from(row: &Row) -> Result<BulkResult, SessionError> {
    let detected: serde_json::Value = row.get(4);
    let corrected: Option<serde_json::Value> = row.get(5);
    Ok(BulkResult {
        id: row.get(0),
        session_token: row.get(1),
        image_filename: row.get(2),
        image_url: row.get(3),
        detected_players: serde_json::from_value(detected)
            .map_err(|e| SessionError::Corrupt(format!("detected players: {}", e)))?,
        corrected_players: corrected
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| SessionError::Corrupt(format!("corrected players: {}", e)))?,
        review_status: ReviewStatus::from_str(row.get(6))
            .map_err(|e| SessionError::Corrupt(e.to_string()))?,
        race_count: row.get(7),
        message_timestamp: row.get(8),
    })
}

fn failure_from(row: &Row) -> BulkFailure {
    BulkFailure {
        id: row.get(0),
        session_token: row.get(1),
        image_filename: row.get(2),
        image_url: row.get(3),
        error_message: row.get(4),
        message_timestamp: row.get(5),
        message_id: row.get(6),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use std::time::UNIX_EPOCH;

    fn session(status: SessionStatus, expired: bool) -> BulkSession {
        let now = SystemTime::now();
        BulkSession {
            token: "t".to_string(),
            guild_id: 1,
            created_by: 2,
            status,
            total_images: 1,
            created_at: UNIX_EPOCH,
            expires_at: match expired {
                true => now - Duration::from_secs(60),
                false => now + Duration::from_secs(3600),
            },
        }
    }

    #[test]
    fn writes_gate_on_open_and_unexpired() {
        assert!(gate_writable(&session(SessionStatus::Open, false)).is_ok());
        assert!(matches!(
            gate_writable(&session(SessionStatus::Open, true)),
            Err(SessionError::Expired)
        ));
        assert!(matches!(
            gate_writable(&session(SessionStatus::Expired, true)),
            Err(SessionError::Expired)
        ));
        assert!(matches!(
            gate_writable(&session(SessionStatus::Confirmed, false)),
            Err(SessionError::NotOpen(SessionStatus::Confirmed))
        ));
    }

    #[test]
    fn reads_allow_terminal_history_but_not_expired() {
        assert!(gate_readable(&session(SessionStatus::Open, false)).is_ok());
        assert!(gate_readable(&session(SessionStatus::Confirmed, true)).is_ok());
        assert!(gate_readable(&session(SessionStatus::Cancelled, false)).is_ok());
        assert!(matches!(
            gate_readable(&session(SessionStatus::Expired, true)),
            Err(SessionError::Expired)
        ));
        // Past the TTL but not yet swept: reads already refuse.
        assert!(matches!(
            gate_readable(&session(SessionStatus::Open, true)),
            Err(SessionError::Expired)
        ));
    }
}
