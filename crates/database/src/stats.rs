//! Leaderboards and per-player standings.
//!
//! Standings are folded from war rows rather than read from the persisted
//! aggregates, so a `lastxwars` cut can be recomputed per request without
//! touching storage, and the persisted aggregates stay verifiable against
//! the same fold.
use super::war;
use super::war::WarStoreError;
use mkw_core::GuildId;
use mkw_records::War;
use std::collections::HashMap;
use std::time::SystemTime;
use tokio_postgres::GenericClient;

/// Leaderboard orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    AverageScore,
    TotalScore,
    WarCount,
    TotalTeamDifferential,
}

impl Default for SortKey {
    fn default() -> Self {
        Self::AverageScore
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "average_score" => Ok(Self::AverageScore),
            "total_score" => Ok(Self::TotalScore),
            "war_count" => Ok(Self::WarCount),
            "total_team_differential" => Ok(Self::TotalTeamDifferential),
            other => Err(format!("unknown sort key {}", other)),
        }
    }
}

/// One player's aggregate line, folded from war rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub name: String,
    pub total_score: i64,
    pub total_races: i64,
    centiwars: i64,
    pub total_team_differential: i64,
    pub last_war: Option<SystemTime>,
    pub wars_played: usize,
}

impl Standing {
    fn new(name: String) -> Self {
        Self {
            name,
            total_score: 0,
            total_races: 0,
            centiwars: 0,
            total_team_differential: 0,
            last_war: None,
            wars_played: 0,
        }
    }
    pub fn war_count(&self) -> f64 {
        self.centiwars as f64 / 100.0
    }
    pub fn average_score(&self) -> f64 {
        match self.centiwars {
            0 => 0.0,
            _ => self.total_score as f64 / self.war_count(),
        }
    }
}

/// Fold standings from wars. `wars` must be ordered newest first; with
/// `lastx = Some(n)` only each player's `n` most recent wars contribute.
pub fn standings(wars: &[War], lastx: Option<usize>) -> Vec<Standing> {
    let mut taken: HashMap<&str, usize> = HashMap::new();
    let mut folded: HashMap<&str, Standing> = HashMap::new();
    for war in wars {
        for line in war.players() {
            let seen = taken.entry(line.name.as_str()).or_insert(0);
            if lastx.is_some_and(|n| *seen >= n) {
                continue;
            }
            *seen += 1;
            let standing = folded
                .entry(line.name.as_str())
                .or_insert_with(|| Standing::new(line.name.clone()));
            standing.total_score += line.score as i64;
            standing.total_races += line.races_played as i64;
            standing.centiwars +=
                (line.races_played as f64 * 100.0 / war.race_count() as f64).round() as i64;
            standing.total_team_differential += war.differential();
            standing.wars_played += 1;
            standing.last_war = Some(
                standing
                    .last_war
                    .map_or(war.occurred_at(), |prev| prev.max(war.occurred_at())),
            );
        }
    }
    let mut all = folded.into_values().collect::<Vec<_>>();
    all.sort_by(|a, b| a.name.cmp(&b.name));
    all
}

/// Order standings by `key`, best first, names breaking ties.
pub fn rank(standings: &mut [Standing], key: SortKey) {
    standings.sort_by(|a, b| {
        let ordering = match key {
            SortKey::AverageScore => b.average_score().total_cmp(&a.average_score()),
            SortKey::TotalScore => b.total_score.cmp(&a.total_score),
            SortKey::WarCount => b.centiwars.cmp(&a.centiwars),
            SortKey::TotalTeamDifferential => {
                b.total_team_differential.cmp(&a.total_team_differential)
            }
        };
        ordering.then_with(|| a.name.cmp(&b.name))
    });
}

/// Guild-wide aggregate view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overview {
    pub total_wars: usize,
    pub wins: usize,
    pub losses: usize,
    pub ties: usize,
    pub total_players: usize,
    pub average_differential: f64,
}

pub fn overview(wars: &[War]) -> Overview {
    use mkw_records::Outcome;
    let outcomes = wars.iter().map(War::outcome).collect::<Vec<_>>();
    let mut names = wars
        .iter()
        .flat_map(|w| w.players().iter().map(|p| p.name.as_str()))
        .collect::<Vec<_>>();
    names.sort_unstable();
    names.dedup();
    Overview {
        total_wars: wars.len(),
        wins: outcomes.iter().filter(|o| matches!(o, Outcome::Won)).count(),
        losses: outcomes.iter().filter(|o| matches!(o, Outcome::Lost)).count(),
        ties: outcomes.iter().filter(|o| matches!(o, Outcome::Tied)).count(),
        total_players: names.len(),
        average_differential: match wars.len() {
            0 => 0.0,
            n => wars.iter().map(War::differential).sum::<i64>() as f64 / n as f64,
        },
    }
}

/// Ranked leaderboard for a guild.
pub async fn leaderboard<C: GenericClient>(
    client: &C,
    guild: GuildId,
    key: SortKey,
    limit: usize,
    lastx: Option<usize>,
) -> Result<Vec<Standing>, WarStoreError> {
    let wars = war::all_wars(client, guild).await?;
    let mut all = standings(&wars, lastx);
    rank(&mut all, key);
    all.truncate(limit);
    Ok(all)
}

/// One player's standing, with their recent wars.
pub async fn player_stats<C: GenericClient>(
    client: &C,
    guild: GuildId,
    name: &str,
    lastx: Option<usize>,
) -> Result<Option<(Standing, Vec<War>)>, WarStoreError> {
    let wars = war::all_wars(client, guild).await?;
    let standing = standings(&wars, lastx)
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(name));
    let Some(standing) = standing else {
        return Ok(None);
    };
    let mine = wars
        .into_iter()
        .filter(|w| w.players().iter().any(|p| p.name.eq_ignore_ascii_case(name)))
        .collect::<Vec<_>>();
    Ok(Some((standing, mine)))
}

/// Guild overview straight from storage.
pub async fn guild_overview<C: GenericClient>(
    client: &C,
    guild: GuildId,
) -> Result<Overview, WarStoreError> {
    Ok(overview(&war::all_wars(client, guild).await?))
}

/// Verify the persisted aggregates of one player against the war fold.
/// Used by integrity checks; tolerance covers the two-digit rounding.
pub fn reconciles(persisted: &mkw_records::Player, folded: &Standing) -> bool {
    persisted.total_score() == folded.total_score
        && persisted.total_races() == folded.total_races
        && (persisted.war_count() - folded.war_count()).abs() < 0.01
        && (persisted.average_score() - folded.average_score()).abs() < 0.01
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkw_records::WarPlayer;
    use std::time::Duration;
    use std::time::UNIX_EPOCH;

    fn war(id: i64, secs: u64, lines: &[(&str, i32, i32)]) -> War {
        War::new(
            id,
            1,
            12,
            UNIX_EPOCH + Duration::from_secs(secs),
            lines
                .iter()
                .map(|(n, s, r)| WarPlayer::new(n.to_string(), *s, *r))
                .collect(),
        )
        .unwrap()
    }

    // Newest first, matching all_wars ordering.
    fn fixture() -> Vec<War> {
        vec![
            war(3, 300, &[("Alpha", 110, 12), ("Beta", 60, 12)]),
            war(2, 200, &[("Alpha", 90, 12), ("Gamma", 70, 6)]),
            war(1, 100, &[("Alpha", 100, 12), ("Beta", 80, 12)]),
        ]
    }

    #[test]
    fn fold_accumulates_per_player() {
        let all = standings(&fixture(), None);
        let alpha = all.iter().find(|s| s.name == "Alpha").unwrap();
        assert_eq!(alpha.total_score, 300);
        assert_eq!(alpha.total_races, 36);
        assert_eq!(alpha.war_count(), 3.0);
        assert_eq!(alpha.average_score(), 100.0);
        assert_eq!(alpha.last_war, Some(UNIX_EPOCH + Duration::from_secs(300)));
        let gamma = all.iter().find(|s| s.name == "Gamma").unwrap();
        assert_eq!(gamma.war_count(), 0.5);
        assert_eq!(gamma.average_score(), 140.0);
    }

    #[test]
    fn lastx_cuts_per_player_not_globally() {
        let all = standings(&fixture(), Some(1));
        let alpha = all.iter().find(|s| s.name == "Alpha").unwrap();
        assert_eq!(alpha.total_score, 110);
        assert_eq!(alpha.wars_played, 1);
        // Gamma's only war is their most recent even though it is not the
        // guild's most recent.
        let gamma = all.iter().find(|s| s.name == "Gamma").unwrap();
        assert_eq!(gamma.wars_played, 1);
    }

    #[test]
    fn rank_orders_descending_with_name_ties() {
        let mut all = standings(&fixture(), None);
        rank(&mut all, SortKey::TotalScore);
        assert_eq!(all[0].name, "Alpha");
        rank(&mut all, SortKey::AverageScore);
        assert_eq!(all[0].name, "Gamma");
    }

    #[test]
    fn differential_sums_team_wars() {
        let all = standings(&fixture(), None);
        let alpha = all.iter().find(|s| s.name == "Alpha").unwrap();
        let expected: i64 = fixture().iter().map(|w| w.differential()).sum();
        assert_eq!(alpha.total_team_differential, expected);
    }

    #[test]
    fn overview_counts_outcomes() {
        let wars = vec![
            war(1, 100, &[("Alpha", 999, 12)]),
            war(2, 200, &[("Alpha", 0, 12)]),
            war(3, 300, &[("Alpha", 41 * 12, 12)]),
        ];
        let view = overview(&wars);
        assert_eq!(view.total_wars, 3);
        assert_eq!(view.wins, 1);
        assert_eq!(view.losses, 1);
        assert_eq!(view.ties, 1);
        assert_eq!(view.total_players, 1);
    }

    #[test]
    fn empty_guild_overview_is_zeroed() {
        let view = overview(&[]);
        assert_eq!(view.total_wars, 0);
        assert_eq!(view.average_differential, 0.0);
    }

    #[test]
    fn sort_keys_parse() {
        assert_eq!("average_score".parse::<SortKey>().unwrap(), SortKey::AverageScore);
        assert_eq!(
            "Total_Team_Differential".parse::<SortKey>().unwrap(),
            SortKey::TotalTeamDifferential
        );
        assert!("elo".parse::<SortKey>().is_err());
    }

    #[test]
    fn fold_matches_player_credit_path() {
        use mkw_records::MemberStatus;
        use mkw_records::Player;
        let wars = fixture();
        let mut persisted = Player::new(1, "Alpha".to_string(), MemberStatus::Member);
        for w in wars.iter().rev() {
            let line = w.players().iter().find(|p| p.name == "Alpha").unwrap();
            persisted.credit(line.score, line.races_played, w.race_count(), w.occurred_at());
        }
        let folded = standings(&wars, None);
        let alpha = folded.iter().find(|s| s.name == "Alpha").unwrap();
        assert!(reconciles(&persisted, alpha));
    }
}
