use super::ReviewStatus;
use super::SessionStatus;
use mkw_core::FailureId;
use mkw_core::GuildId;
use mkw_core::MessageId;
use mkw_core::Races;
use mkw_core::ResultId;
use mkw_core::Score;
use mkw_core::UserId;
use std::time::SystemTime;

/// One OCR-extracted player line awaiting review.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DetectedPlayer {
    /// Resolved canonical name (or the raw token when unresolved).
    pub name: String,
    pub score: Score,
    /// The token as OCR read it, before resolution.
    pub raw_name: String,
    pub is_roster_member: bool,
    pub races_played: Races,
}

impl DetectedPlayer {
    pub fn new(name: String, score: Score, raw_name: String, is_roster_member: bool, races_played: Races) -> Self {
        Self {
            name,
            score,
            raw_name,
            is_roster_member,
            races_played,
        }
    }
}

/// A pending review batch of OCR outputs.
#[derive(Debug, Clone)]
pub struct BulkSession {
    pub token: String,
    pub guild_id: GuildId,
    pub created_by: UserId,
    pub status: SessionStatus,
    pub total_images: i32,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

impl BulkSession {
    pub fn expired(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }
    /// Review mutations are allowed only on open, unexpired sessions.
    pub fn writable(&self, now: SystemTime) -> bool {
        matches!(self.status, SessionStatus::Open) && !self.expired(now)
    }
}

/// Per-image OCR output within a session.
#[derive(Debug, Clone)]
pub struct BulkResult {
    pub id: ResultId,
    pub session_token: String,
    pub image_filename: String,
    pub image_url: Option<String>,
    pub detected_players: Vec<DetectedPlayer>,
    pub corrected_players: Option<Vec<DetectedPlayer>>,
    pub review_status: ReviewStatus,
    pub race_count: Races,
    pub message_timestamp: Option<SystemTime>,
}

impl BulkResult {
    /// Corrections supersede the detected set when confirming.
    pub fn effective_players(&self) -> &[DetectedPlayer] {
        match &self.corrected_players {
            Some(corrected) => corrected,
            None => &self.detected_players,
        }
    }
}

/// Per-image OCR failure, convertible to a result during review.
#[derive(Debug, Clone)]
pub struct BulkFailure {
    pub id: FailureId,
    pub session_token: String,
    pub image_filename: String,
    pub image_url: Option<String>,
    pub error_message: String,
    pub message_timestamp: Option<SystemTime>,
    pub message_id: Option<MessageId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use std::time::UNIX_EPOCH;

    fn session(status: SessionStatus) -> BulkSession {
        BulkSession {
            token: "t".to_string(),
            guild_id: 1,
            created_by: 2,
            status,
            total_images: 3,
            created_at: UNIX_EPOCH,
            expires_at: UNIX_EPOCH + Duration::from_secs(24 * 3600),
        }
    }

    #[test]
    fn writable_only_while_open_and_unexpired() {
        let s = session(SessionStatus::Open);
        assert!(s.writable(UNIX_EPOCH + Duration::from_secs(60)));
        assert!(!s.writable(UNIX_EPOCH + Duration::from_secs(24 * 3600 + 60)));
        assert!(!session(SessionStatus::Confirmed).writable(UNIX_EPOCH));
        assert!(!session(SessionStatus::Cancelled).writable(UNIX_EPOCH));
    }

    #[test]
    fn corrections_supersede_detected() {
        let detected = vec![DetectedPlayer::new(
            "Alpha".to_string(),
            90,
            "Alpha".to_string(),
            true,
            12,
        )];
        let corrected = vec![DetectedPlayer::new(
            "Beta".to_string(),
            80,
            "Beta".to_string(),
            true,
            12,
        )];
        let mut result = BulkResult {
            id: 1,
            session_token: "t".to_string(),
            image_filename: "war.png".to_string(),
            image_url: None,
            detected_players: detected.clone(),
            corrected_players: None,
            review_status: ReviewStatus::Pending,
            race_count: 12,
            message_timestamp: None,
        };
        assert_eq!(result.effective_players(), detected.as_slice());
        result.corrected_players = Some(corrected.clone());
        assert_eq!(result.effective_players(), corrected.as_slice());
    }

    #[test]
    fn detected_player_wire_shape() {
        let p = DetectedPlayer::new("Willow".to_string(), 85, "Wi11ow".to_string(), true, 12);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["name"], "Willow");
        assert_eq!(json["raw_name"], "Wi11ow");
        assert_eq!(json["is_roster_member"], true);
        let back: DetectedPlayer = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }
}
