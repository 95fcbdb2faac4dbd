use super::RecordError;
use mkw_core::ChannelId;
use mkw_core::GuildId;

/// Team assignment for players with no team.
pub const UNASSIGNED: &str = "Unassigned";

/// Tenant configuration: one row per chat-platform guild.
#[derive(Debug, Clone)]
pub struct Guild {
    guild_id: GuildId,
    name: String,
    ocr_channel: Option<ChannelId>,
    teams: Vec<String>,
    active: bool,
}

impl Guild {
    pub fn new(guild_id: GuildId, name: String) -> Self {
        Self {
            guild_id,
            name,
            ocr_channel: None,
            teams: Vec::new(),
            active: true,
        }
    }
    /// Rebuild from persisted columns.
    pub fn restore(
        guild_id: GuildId,
        name: String,
        ocr_channel: Option<ChannelId>,
        teams: Vec<String>,
        active: bool,
    ) -> Self {
        Self {
            guild_id,
            name,
            ocr_channel,
            teams,
            active,
        }
    }
    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn ocr_channel(&self) -> Option<ChannelId> {
        self.ocr_channel
    }
    pub fn teams(&self) -> &[String] {
        &self.teams
    }
    pub fn active(&self) -> bool {
        self.active
    }
    pub fn set_channel(&mut self, channel: ChannelId) {
        self.ocr_channel = Some(channel);
    }
    pub fn has_team(&self, team: &str) -> bool {
        team == UNASSIGNED || self.teams.iter().any(|t| t.eq_ignore_ascii_case(team))
    }
    pub fn add_team(&mut self, team: String) -> Result<(), RecordError> {
        if self.has_team(&team) {
            return Err(RecordError::DuplicateTeam(team));
        }
        self.teams.push(team);
        Ok(())
    }
    pub fn remove_team(&mut self, team: &str) -> Result<(), RecordError> {
        match self.teams.iter().position(|t| t.eq_ignore_ascii_case(team)) {
            Some(i) => {
                self.teams.remove(i);
                Ok(())
            }
            None => Err(RecordError::UnknownTeam(team.to_string())),
        }
    }
    pub fn rename_team(&mut self, old: &str, new: String) -> Result<(), RecordError> {
        if self.has_team(&new) {
            return Err(RecordError::DuplicateTeam(new));
        }
        match self.teams.iter().position(|t| t.eq_ignore_ascii_case(old)) {
            Some(i) => {
                self.teams[i] = new;
                Ok(())
            }
            None => Err(RecordError::UnknownTeam(old.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_management() {
        let mut guild = Guild::new(1, "G".to_string());
        guild.add_team("Alpha Squad".to_string()).unwrap();
        assert!(guild.has_team("alpha squad"));
        assert!(guild.add_team("ALPHA SQUAD".to_string()).is_err());
        guild.rename_team("Alpha Squad", "Bravo".to_string()).unwrap();
        assert!(guild.has_team("Bravo"));
        assert!(!guild.has_team("Alpha Squad"));
        guild.remove_team("bravo").unwrap();
        assert!(guild.teams().is_empty());
        assert!(guild.remove_team("Bravo").is_err());
    }

    #[test]
    fn unassigned_always_exists() {
        let guild = Guild::new(1, "G".to_string());
        assert!(guild.has_team(UNASSIGNED));
    }
}
