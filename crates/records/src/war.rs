use super::RecordError;
use mkw_core::BREAKEVEN_PER_RACE;
use mkw_core::GuildId;
use mkw_core::MAX_RACE_COUNT;
use mkw_core::MAX_SCORE;
use mkw_core::MIN_RACE_COUNT;
use mkw_core::Races;
use mkw_core::Score;
use mkw_core::WarId;
use std::time::SystemTime;

/// One player's line within a war.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WarPlayer {
    pub name: String,
    pub score: Score,
    pub races_played: Races,
}

impl WarPlayer {
    pub fn new(name: String, score: Score, races_played: Races) -> Self {
        Self {
            name,
            score,
            races_played,
        }
    }
}

/// Result of a war relative to the breakeven differential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Won,
    Lost,
    Tied,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Won => f.write_str("won"),
            Self::Lost => f.write_str("lost"),
            Self::Tied => f.write_str("tied"),
        }
    }
}

/// One race session: the atomic unit persisted after review.
#[derive(Debug, Clone)]
pub struct War {
    id: WarId,
    guild_id: GuildId,
    race_count: Races,
    occurred_at: SystemTime,
    players: Vec<WarPlayer>,
}

impl War {
    /// Build and validate a war. Rejects out-of-range race counts and
    /// scores, empty player lists, duplicate names, and lines claiming
    /// more races than the war has.
    pub fn new(
        id: WarId,
        guild_id: GuildId,
        race_count: Races,
        occurred_at: SystemTime,
        players: Vec<WarPlayer>,
    ) -> Result<Self, RecordError> {
        if !(MIN_RACE_COUNT..=MAX_RACE_COUNT).contains(&race_count) {
            return Err(RecordError::InvalidRaceCount(race_count));
        }
        if players.is_empty() {
            return Err(RecordError::EmptyWar);
        }
        for (i, p) in players.iter().enumerate() {
            if !(0..=MAX_SCORE).contains(&p.score) {
                return Err(RecordError::ScoreOutOfRange(p.score));
            }
            if p.races_played > race_count {
                return Err(RecordError::RacesExceedCount(p.races_played, race_count));
            }
            if players[..i].iter().any(|q| q.name.eq_ignore_ascii_case(&p.name)) {
                return Err(RecordError::DuplicatePlayer(p.name.clone()));
            }
        }
        Ok(Self {
            id,
            guild_id,
            race_count,
            occurred_at,
            players,
        })
    }

    pub fn id(&self) -> WarId {
        self.id
    }
    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }
    pub fn race_count(&self) -> Races {
        self.race_count
    }
    pub fn occurred_at(&self) -> SystemTime {
        self.occurred_at
    }
    pub fn players(&self) -> &[WarPlayer] {
        &self.players
    }
    pub fn with_id(mut self, id: WarId) -> Self {
        self.id = id;
        self
    }
    /// Add a line after the fact (appendplayertowar). Same validation as
    /// construction.
    pub fn push_player(&mut self, player: WarPlayer) -> Result<(), RecordError> {
        if !(0..=MAX_SCORE).contains(&player.score) {
            return Err(RecordError::ScoreOutOfRange(player.score));
        }
        if player.races_played > self.race_count {
            return Err(RecordError::RacesExceedCount(
                player.races_played,
                self.race_count,
            ));
        }
        if self.players.iter().any(|q| q.name.eq_ignore_ascii_case(&player.name)) {
            return Err(RecordError::DuplicatePlayer(player.name));
        }
        self.players.push(player);
        Ok(())
    }

    /// Sum of all player scores.
    pub fn team_score(&self) -> i64 {
        self.players.iter().map(|p| p.score as i64).sum()
    }
    /// `team_score − 41 · race_count · player_count`.
    pub fn differential(&self) -> i64 {
        self.team_score()
            - BREAKEVEN_PER_RACE as i64 * self.race_count as i64 * self.players.len() as i64
    }
    pub fn outcome(&self) -> Outcome {
        match self.differential() {
            d if d > 0 => Outcome::Won,
            d if d < 0 => Outcome::Lost,
            _ => Outcome::Tied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn line(name: &str, score: Score) -> WarPlayer {
        WarPlayer::new(name.to_string(), score, 12)
    }

    #[test]
    fn differential_matches_breakeven_formula() {
        let war = War::new(
            0,
            1,
            12,
            UNIX_EPOCH,
            vec![line("Alpha", 95), line("Beta", 80), line("Gamma", 70)],
        )
        .unwrap();
        assert_eq!(war.team_score(), 245);
        assert_eq!(war.differential(), 245 - 41 * 12 * 3);
        assert_eq!(war.differential(), -1231);
        assert_eq!(war.outcome(), Outcome::Lost);
    }

    #[test]
    fn exact_breakeven_is_a_tie() {
        let war = War::new(0, 1, 12, UNIX_EPOCH, vec![line("Alpha", 41 * 12)]).unwrap();
        assert_eq!(war.differential(), 0);
        assert_eq!(war.outcome(), Outcome::Tied);
    }

    #[test]
    fn race_count_bounds() {
        assert!(War::new(0, 1, 1, UNIX_EPOCH, vec![WarPlayer::new("A".into(), 9, 1)]).is_ok());
        assert!(War::new(0, 1, 24, UNIX_EPOCH, vec![WarPlayer::new("A".into(), 9, 24)]).is_ok());
        assert!(matches!(
            War::new(0, 1, 0, UNIX_EPOCH, vec![line("A", 9)]),
            Err(RecordError::InvalidRaceCount(0))
        ));
        assert!(matches!(
            War::new(0, 1, 25, UNIX_EPOCH, vec![line("A", 9)]),
            Err(RecordError::InvalidRaceCount(25))
        ));
    }

    #[test]
    fn empty_war_rejected() {
        assert!(matches!(
            War::new(0, 1, 12, UNIX_EPOCH, vec![]),
            Err(RecordError::EmptyWar)
        ));
    }

    #[test]
    fn races_played_bounded_by_race_count() {
        let over = WarPlayer::new("A".to_string(), 50, 13);
        assert!(matches!(
            War::new(0, 1, 12, UNIX_EPOCH, vec![over]),
            Err(RecordError::RacesExceedCount(13, 12))
        ));
    }

    #[test]
    fn duplicate_names_rejected_case_insensitively() {
        assert!(matches!(
            War::new(0, 1, 12, UNIX_EPOCH, vec![line("Alpha", 90), line("alpha", 80)]),
            Err(RecordError::DuplicatePlayer(_))
        ));
    }

    #[test]
    fn score_bounds() {
        assert!(War::new(0, 1, 12, UNIX_EPOCH, vec![line("A", 999)]).is_ok());
        assert!(War::new(0, 1, 12, UNIX_EPOCH, vec![line("A", 1000)]).is_err());
        assert!(War::new(0, 1, 12, UNIX_EPOCH, vec![line("A", -1)]).is_err());
    }

    #[test]
    fn push_player_validates() {
        let mut war = War::new(0, 1, 12, UNIX_EPOCH, vec![line("Alpha", 90)]).unwrap();
        war.push_player(line("Beta", 80)).unwrap();
        assert!(war.push_player(line("ALPHA", 70)).is_err());
        assert_eq!(war.players().len(), 2);
    }
}
