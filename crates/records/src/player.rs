use super::MemberStatus;
use super::RecordError;
use super::UNASSIGNED;
use mkw_core::GuildId;
use mkw_core::Races;
use mkw_core::Score;
use std::time::SystemTime;

/// Roster member with derived war aggregates.
///
/// `war_count` is tracked as integer hundredths so that crediting a war
/// and then debiting the same war restores every aggregate exactly.
#[derive(Debug, Clone)]
pub struct Player {
    guild_id: GuildId,
    name: String,
    nicknames: Vec<String>,
    team: String,
    status: MemberStatus,
    active: bool,
    total_score: i64,
    total_races: i64,
    centiwars: i64,
    last_war: Option<SystemTime>,
}

impl Player {
    pub fn new(guild_id: GuildId, name: String, status: MemberStatus) -> Self {
        Self {
            guild_id,
            name,
            nicknames: Vec::new(),
            team: UNASSIGNED.to_string(),
            status,
            active: !matches!(status, MemberStatus::Kicked),
            total_score: 0,
            total_races: 0,
            centiwars: 0,
            last_war: None,
        }
    }
    /// Rebuild from persisted columns. `war_count` arrives as the stored
    /// decimal and is snapped back to hundredths.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        guild_id: GuildId,
        name: String,
        nicknames: Vec<String>,
        team: String,
        status: MemberStatus,
        active: bool,
        total_score: i64,
        total_races: i64,
        war_count: f64,
        last_war: Option<SystemTime>,
    ) -> Self {
        Self {
            guild_id,
            name,
            nicknames,
            team,
            status,
            active,
            total_score,
            total_races,
            centiwars: (war_count * 100.0).round() as i64,
            last_war,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn nicknames(&self) -> &[String] {
        &self.nicknames
    }
    pub fn team(&self) -> &str {
        &self.team
    }
    pub fn status(&self) -> MemberStatus {
        self.status
    }
    pub fn active(&self) -> bool {
        self.active
    }
    pub fn total_score(&self) -> i64 {
        self.total_score
    }
    pub fn total_races(&self) -> i64 {
        self.total_races
    }
    /// Fractional war participation, two fractional digits.
    pub fn war_count(&self) -> f64 {
        self.centiwars as f64 / 100.0
    }
    /// Mean score per (fractional) war; 0 when the player has no wars.
    pub fn average_score(&self) -> f64 {
        match self.centiwars {
            0 => 0.0,
            _ => self.total_score as f64 / self.war_count(),
        }
    }
    pub fn last_war(&self) -> Option<SystemTime> {
        self.last_war
    }

    /// Apply one war's contribution to the aggregates.
    pub fn credit(&mut self, score: Score, races: Races, race_count: Races, when: SystemTime) {
        self.total_score += score as i64;
        self.total_races += races as i64;
        self.centiwars += centiwars(races, race_count);
        self.last_war = Some(self.last_war.map_or(when, |prev| prev.max(when)));
    }
    /// Reverse one war's contribution. `last_war` is left untouched; the
    /// caller recomputes it from the remaining war rows.
    pub fn debit(&mut self, score: Score, races: Races, race_count: Races) {
        self.total_score -= score as i64;
        self.total_races -= races as i64;
        self.centiwars -= centiwars(races, race_count);
    }
    pub fn set_last_war(&mut self, when: Option<SystemTime>) {
        self.last_war = when;
    }

    pub fn set_status(&mut self, status: MemberStatus) {
        self.status = status;
        if matches!(status, MemberStatus::Kicked) {
            self.active = false;
        }
    }
    /// Explicit roster removal keeps the row for history but hides it.
    pub fn deactivate(&mut self) {
        self.active = false;
    }
    pub fn assign_team(&mut self, team: String) {
        self.team = team;
    }
    pub fn unassign_team(&mut self) {
        self.team = UNASSIGNED.to_string();
    }

    /// True if `alias` equals the canonical name or any nickname,
    /// case-insensitively.
    pub fn answers_to(&self, alias: &str) -> bool {
        self.name.eq_ignore_ascii_case(alias)
            || self.nicknames.iter().any(|n| n.eq_ignore_ascii_case(alias))
    }
    pub fn add_nickname(&mut self, nickname: String) -> Result<(), RecordError> {
        if self.answers_to(&nickname) {
            return Err(RecordError::DuplicateNickname(nickname));
        }
        self.nicknames.push(nickname);
        Ok(())
    }
    pub fn remove_nickname(&mut self, nickname: &str) -> bool {
        match self
            .nicknames
            .iter()
            .position(|n| n.eq_ignore_ascii_case(nickname))
        {
            Some(i) => {
                self.nicknames.remove(i);
                true
            }
            None => false,
        }
    }
}

/// Hundredths of a war credited for playing `races` of `race_count`.
fn centiwars(races: Races, race_count: Races) -> i64 {
    (races as f64 * 100.0 / race_count as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use std::time::UNIX_EPOCH;

    #[test]
    fn full_participation_counts_one_war() {
        let mut p = Player::new(1, "Alpha".to_string(), MemberStatus::Member);
        p.credit(95, 12, 12, UNIX_EPOCH);
        assert_eq!(p.war_count(), 1.0);
        assert_eq!(p.average_score(), 95.0);
        assert_eq!(p.total_races(), 12);
    }

    #[test]
    fn partial_participation_is_fractional() {
        let mut p = Player::new(1, "Beta".to_string(), MemberStatus::Member);
        p.credit(40, 6, 12, UNIX_EPOCH);
        assert_eq!(p.war_count(), 0.5);
        assert_eq!(p.average_score(), 80.0);
    }

    #[test]
    fn credit_then_debit_restores_exactly() {
        let mut p = Player::new(1, "Gamma".to_string(), MemberStatus::Member);
        for i in 0..5 {
            p.credit(100, 12, 12, UNIX_EPOCH + Duration::from_secs(i));
        }
        let (score, races, wars) = (p.total_score(), p.total_races(), p.war_count());
        p.credit(87, 7, 13, UNIX_EPOCH + Duration::from_secs(9));
        p.debit(87, 7, 13);
        assert_eq!(p.total_score(), score);
        assert_eq!(p.total_races(), races);
        assert_eq!(p.war_count(), wars);
    }

    #[test]
    fn remove_war_reverts_stats() {
        let mut p = Player::new(1, "Alpha".to_string(), MemberStatus::Member);
        for i in 0..5 {
            p.credit(100, 12, 12, UNIX_EPOCH + Duration::from_secs(i));
        }
        assert_eq!(p.total_score(), 500);
        assert_eq!(p.total_races(), 60);
        assert_eq!(p.war_count(), 5.0);
        p.debit(100, 12, 12);
        assert_eq!(p.total_score(), 400);
        assert_eq!(p.total_races(), 48);
        assert_eq!(p.war_count(), 4.0);
        assert_eq!(p.average_score(), 100.0);
    }

    #[test]
    fn average_is_zero_without_wars() {
        let p = Player::new(1, "Idle".to_string(), MemberStatus::Trial);
        assert_eq!(p.average_score(), 0.0);
    }

    #[test]
    fn last_war_keeps_maximum() {
        let mut p = Player::new(1, "Alpha".to_string(), MemberStatus::Member);
        let late = UNIX_EPOCH + Duration::from_secs(100);
        let early = UNIX_EPOCH + Duration::from_secs(50);
        p.credit(90, 12, 12, late);
        p.credit(90, 12, 12, early);
        assert_eq!(p.last_war(), Some(late));
    }

    #[test]
    fn kicked_becomes_inactive() {
        let mut p = Player::new(1, "Alpha".to_string(), MemberStatus::Member);
        assert!(p.active());
        p.set_status(MemberStatus::Kicked);
        assert!(!p.active());
    }

    #[test]
    fn nickname_uniqueness_within_player() {
        let mut p = Player::new(1, "Willow".to_string(), MemberStatus::Member);
        p.add_nickname("Wi11ow".to_string()).unwrap();
        assert!(p.add_nickname("wi11ow".to_string()).is_err());
        assert!(p.add_nickname("Willow".to_string()).is_err());
        assert!(p.answers_to("WI11OW"));
        assert!(p.remove_nickname("wi11ow"));
        assert!(!p.answers_to("Wi11ow"));
    }

    #[test]
    fn restore_snaps_war_count_to_hundredths() {
        let p = Player::restore(
            1,
            "Alpha".to_string(),
            vec![],
            UNASSIGNED.to_string(),
            MemberStatus::Member,
            true,
            500,
            60,
            4.999999999,
            None,
        );
        assert_eq!(p.war_count(), 5.0);
    }
}
