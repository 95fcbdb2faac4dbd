use mkw_core::Races;
use mkw_core::Score;

/// Validation failures raised while constructing or mutating records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    InvalidRaceCount(Races),
    EmptyWar,
    ScoreOutOfRange(Score),
    RacesExceedCount(Races, Races),
    DuplicatePlayer(String),
    DuplicateNickname(String),
    DuplicateTeam(String),
    UnknownTeam(String),
    UnknownStatus(String),
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRaceCount(n) => write!(f, "race count {} outside 1..24", n),
            Self::EmptyWar => write!(f, "a war must have at least one player"),
            Self::ScoreOutOfRange(s) => write!(f, "score {} outside 0..999", s),
            Self::RacesExceedCount(r, n) => {
                write!(f, "races played {} exceeds war race count {}", r, n)
            }
            Self::DuplicatePlayer(name) => write!(f, "player {} listed twice", name),
            Self::DuplicateNickname(nick) => write!(f, "nickname {} already taken", nick),
            Self::DuplicateTeam(team) => write!(f, "team {} already exists", team),
            Self::UnknownTeam(team) => write!(f, "no team named {}", team),
            Self::UnknownStatus(s) => write!(f, "unrecognized status {}", s),
        }
    }
}

impl std::error::Error for RecordError {}
