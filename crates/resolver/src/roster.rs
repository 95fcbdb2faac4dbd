use mkw_records::Player;

/// One resolvable identity: a canonical name plus its aliases.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    name: String,
    nicknames: Vec<String>,
}

impl RosterEntry {
    pub fn new(name: String, nicknames: Vec<String>) -> Self {
        Self { name, nicknames }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn nicknames(&self) -> &[String] {
        &self.nicknames
    }
}

/// Immutable roster snapshot taken at the start of a resolution pass.
///
/// Inactive players stay resolvable: an OCR line naming a kicked player
/// should still link to their history rather than create a stranger.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn snapshot(players: &[Player]) -> Self {
        Self {
            entries: players
                .iter()
                .map(|p| RosterEntry::new(p.name().to_string(), p.nicknames().to_vec()))
                .collect(),
        }
    }
    pub fn from_entries(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name().eq_ignore_ascii_case(name))
    }
    /// Register a name created mid-pass (confirm-time auto-creation) so
    /// later lines in the same batch resolve to it.
    pub fn admit(&mut self, name: String) {
        if !self.contains(&name) {
            self.entries.push(RosterEntry::new(name, Vec::new()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admit_is_idempotent() {
        let mut roster = Roster::default();
        roster.admit("Alpha".to_string());
        roster.admit("alpha".to_string());
        assert_eq!(roster.entries().len(), 1);
        assert!(roster.contains("ALPHA"));
    }
}
