use serde::Deserialize;
use serde::Serialize;

/// Roster membership standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Member,
    Trial,
    Ally,
    Kicked,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Trial => "trial",
            Self::Ally => "ally",
            Self::Kicked => "kicked",
        }
    }
}

impl std::fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemberStatus {
    type Err = super::RecordError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "trial" => Ok(Self::Trial),
            "ally" => Ok(Self::Ally),
            "kicked" => Ok(Self::Kicked),
            other => Err(super::RecordError::UnknownStatus(other.to_string())),
        }
    }
}

/// Lifecycle of a bulk review session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Confirmed,
    Cancelled,
    Expired,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
    /// Terminal states never transition again.
    pub fn terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = super::RecordError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            other => Err(super::RecordError::UnknownStatus(other.to_string())),
        }
    }
}

/// Reviewer verdict on one bulk result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = super::RecordError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(super::RecordError::UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for s in ["member", "trial", "ally", "kicked"] {
            assert_eq!(s.parse::<MemberStatus>().unwrap().as_str(), s);
        }
        for s in ["open", "confirmed", "cancelled", "expired"] {
            assert_eq!(s.parse::<SessionStatus>().unwrap().as_str(), s);
        }
        for s in ["pending", "approved", "rejected"] {
            assert_eq!(s.parse::<ReviewStatus>().unwrap().as_str(), s);
        }
    }

    #[test]
    fn parsing_is_case_insensitive() {
        assert_eq!("Member".parse::<MemberStatus>().unwrap(), MemberStatus::Member);
        assert_eq!("OPEN".parse::<SessionStatus>().unwrap(), SessionStatus::Open);
    }

    #[test]
    fn unknown_status_rejected() {
        assert!("banned".parse::<MemberStatus>().is_err());
    }

    #[test]
    fn only_open_is_not_terminal() {
        assert!(!SessionStatus::Open.terminal());
        assert!(SessionStatus::Confirmed.terminal());
        assert!(SessionStatus::Cancelled.terminal());
        assert!(SessionStatus::Expired.terminal());
    }
}
