//! Wire shapes for the review API.
use mkw_core::GuildId;
use mkw_core::MessageId;
use mkw_core::Races;
use mkw_core::Score;
use mkw_core::UserId;
use mkw_core::WarId;
use mkw_records::BulkFailure;
use mkw_records::BulkResult;
use mkw_records::BulkSession;
use mkw_records::DetectedPlayer;
use mkw_records::Player;
use mkw_records::War;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

pub fn unix(when: SystemTime) -> i64 {
    when.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn from_unix(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

#[derive(Deserialize)]
pub struct ExchangeRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct ExchangeResponse {
    pub token: String,
    pub user_id: UserId,
}

#[derive(Serialize)]
pub struct PlayerView {
    pub name: String,
    pub nicknames: Vec<String>,
    pub team: String,
    pub member_status: String,
    pub is_active: bool,
    pub total_score: i64,
    pub total_races: i64,
    pub war_count: f64,
    pub average_score: f64,
    pub last_war_date: Option<i64>,
}

impl From<&Player> for PlayerView {
    fn from(p: &Player) -> Self {
        Self {
            name: p.name().to_string(),
            nicknames: p.nicknames().to_vec(),
            team: p.team().to_string(),
            member_status: p.status().to_string(),
            is_active: p.active(),
            total_score: p.total_score(),
            total_races: p.total_races(),
            war_count: p.war_count(),
            average_score: p.average_score(),
            last_war_date: p.last_war().map(unix),
        }
    }
}

#[derive(Deserialize)]
pub struct CreatePlayerRequest {
    pub name: String,
    #[serde(default)]
    pub member_status: Option<String>,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub member_status: String,
}

#[derive(Deserialize)]
pub struct AddNicknameRequest {
    pub nickname: String,
}

#[derive(Serialize)]
pub struct WarView {
    pub war_id: WarId,
    pub race_count: Races,
    pub occurred_at: i64,
    pub team_score: i64,
    pub team_differential: i64,
    pub outcome: String,
    pub players: Vec<WarLineView>,
}

#[derive(Serialize)]
pub struct WarLineView {
    pub name: String,
    pub score: Score,
    pub races_played: Races,
}

impl From<&War> for WarView {
    fn from(w: &War) -> Self {
        Self {
            war_id: w.id(),
            race_count: w.race_count(),
            occurred_at: unix(w.occurred_at()),
            team_score: w.team_score(),
            team_differential: w.differential(),
            outcome: w.outcome().to_string(),
            players: w
                .players()
                .iter()
                .map(|p| WarLineView {
                    name: p.name.clone(),
                    score: p.score,
                    races_played: p.races_played,
                })
                .collect(),
        }
    }
}

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct PlayersQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub lastxwars: Option<usize>,
}

#[derive(Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub lastxwars: Option<usize>,
}

#[derive(Serialize)]
pub struct StandingView {
    pub name: String,
    pub total_score: i64,
    pub total_races: i64,
    pub war_count: f64,
    pub average_score: f64,
    pub total_team_differential: i64,
    pub wars_played: usize,
    pub last_war_date: Option<i64>,
}

impl From<&mkw_database::stats::Standing> for StandingView {
    fn from(s: &mkw_database::stats::Standing) -> Self {
        Self {
            name: s.name.clone(),
            total_score: s.total_score,
            total_races: s.total_races,
            war_count: s.war_count(),
            average_score: s.average_score(),
            total_team_differential: s.total_team_differential,
            wars_played: s.wars_played,
            last_war_date: s.last_war.map(unix),
        }
    }
}

/// Player entry accepted from reviewers; resolution fills in the rest.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerEntry {
    pub name: String,
    pub score: Score,
    #[serde(default)]
    pub races_played: Option<Races>,
    #[serde(default)]
    pub raw_name: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub guild_id: GuildId,
    pub created_by_user_id: UserId,
    pub total_images: i32,
}

#[derive(Serialize)]
pub struct CreateSessionResponse {
    pub session_token: String,
}

#[derive(Deserialize)]
pub struct AppendResultRequest {
    pub image_filename: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub detected_players: Vec<DetectedPlayer>,
    #[serde(default)]
    pub race_count: Option<Races>,
    #[serde(default)]
    pub message_timestamp: Option<i64>,
}

#[derive(Deserialize)]
pub struct AppendFailureRequest {
    pub image_filename: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub error_message: String,
    #[serde(default)]
    pub message_timestamp: Option<i64>,
    #[serde(default)]
    pub discord_message_id: Option<MessageId>,
}

#[derive(Deserialize)]
pub struct UpdateResultRequest {
    pub review_status: String,
    #[serde(default)]
    pub corrected_players: Option<Vec<PlayerEntry>>,
}

#[derive(Deserialize)]
pub struct ConvertFailureRequest {
    pub players: Vec<PlayerEntry>,
    #[serde(default)]
    pub review_status: Option<String>,
}

#[derive(Serialize)]
pub struct SessionView {
    pub session_token: String,
    pub guild_id: GuildId,
    pub created_by: UserId,
    pub status: String,
    pub total_images: i32,
    pub created_at: i64,
    pub expires_at: i64,
}

impl From<&BulkSession> for SessionView {
    fn from(s: &BulkSession) -> Self {
        Self {
            session_token: s.token.clone(),
            guild_id: s.guild_id,
            created_by: s.created_by,
            status: s.status.to_string(),
            total_images: s.total_images,
            created_at: unix(s.created_at),
            expires_at: unix(s.expires_at),
        }
    }
}

#[derive(Serialize)]
pub struct ResultView {
    pub result_id: i64,
    pub image_filename: String,
    pub image_url: Option<String>,
    pub detected_players: Vec<DetectedPlayer>,
    pub corrected_players: Option<Vec<DetectedPlayer>>,
    pub review_status: String,
    pub race_count: Races,
    pub message_timestamp: Option<i64>,
}

impl From<&BulkResult> for ResultView {
    fn from(r: &BulkResult) -> Self {
        Self {
            result_id: r.id,
            image_filename: r.image_filename.clone(),
            image_url: r.image_url.clone(),
            detected_players: r.detected_players.clone(),
            corrected_players: r.corrected_players.clone(),
            review_status: r.review_status.to_string(),
            race_count: r.race_count,
            message_timestamp: r.message_timestamp.map(unix),
        }
    }
}

#[derive(Serialize)]
pub struct FailureView {
    pub failure_id: i64,
    pub image_filename: String,
    pub image_url: Option<String>,
    pub error_message: String,
    pub message_timestamp: Option<i64>,
}

impl From<&BulkFailure> for FailureView {
    fn from(f: &BulkFailure) -> Self {
        Self {
            failure_id: f.id,
            image_filename: f.image_filename.clone(),
            image_url: f.image_url.clone(),
            error_message: f.error_message.clone(),
            message_timestamp: f.message_timestamp.map(unix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_round_trip() {
        let t = from_unix(1_700_000_000);
        assert_eq!(unix(t), 1_700_000_000);
    }

    #[test]
    fn negative_timestamps_clamp() {
        assert_eq!(unix(from_unix(-5)), 0);
    }
}
