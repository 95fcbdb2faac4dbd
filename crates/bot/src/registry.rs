use super::Context;
use super::Invocation;
use std::pin::Pin;
use std::sync::Arc;

/// Failures from command handlers. Validation is shown to the user
/// verbatim; everything else logs and degrades to a generic message.
#[derive(Debug)]
pub enum CommandError {
    Validation(String),
    Storage(String),
    Gateway(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(m) => write!(f, "{}", m),
            Self::Storage(m) => write!(f, "storage failure: {}", m),
            Self::Gateway(m) => write!(f, "gateway failure: {}", m),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<mkw_records::RecordError> for CommandError {
    fn from(e: mkw_records::RecordError) -> Self {
        Self::Validation(e.to_string())
    }
}
impl From<super::parse::ParseError> for CommandError {
    fn from(e: super::parse::ParseError) -> Self {
        Self::Validation(e.to_string())
    }
}
impl From<mkw_database::war::WarStoreError> for CommandError {
    fn from(e: mkw_database::war::WarStoreError) -> Self {
        use mkw_database::war::WarStoreError::*;
        match e {
            UnknownPlayer(_) | Invalid(_) | NotFound(_) => Self::Validation(e.to_string()),
            Storage(pg) => Self::Storage(pg.to_string()),
        }
    }
}
impl From<mkw_database::PgErr> for CommandError {
    fn from(e: mkw_database::PgErr) -> Self {
        Self::Storage(e.to_string())
    }
}
impl From<mkw_database::PoolErr> for CommandError {
    fn from(e: mkw_database::PoolErr) -> Self {
        Self::Storage(e.to_string())
    }
}
impl From<super::GatewayError> for CommandError {
    fn from(e: super::GatewayError) -> Self {
        Self::Gateway(e.to_string())
    }
}
impl From<super::ApiError> for CommandError {
    fn from(e: super::ApiError) -> Self {
        Self::Gateway(e.to_string())
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<String, CommandError>> + Send>>;
/// Plain function pointer so the registry stays a static table.
pub type Handler = fn(Arc<Context>, Invocation) -> HandlerFuture;

/// One registered slash command.
pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
    pub handler: Handler,
}

/// Explicit command table populated at startup.
pub struct Registry {
    commands: Vec<Command>,
}

impl Registry {
    /// The full production command surface.
    pub fn standard() -> Self {
        use super::commands::*;
        let commands = vec![
            Command { name: "setup", usage: "setup <teamname> <p1,p2,...> <channel>", summary: "first-time guild setup", handler: misc::setup },
            Command { name: "setchannel", usage: "setchannel <channel>", summary: "set the OCR results channel", handler: misc::setchannel },
            Command { name: "addwar", usage: "addwar <Name:Score,...> [races]", summary: "record a war manually", handler: wars::addwar },
            Command { name: "appendplayertowar", usage: "appendplayertowar <war_id> <Name:Score,...>", summary: "add players to an existing war", handler: wars::appendplayertowar },
            Command { name: "removewar", usage: "removewar <war_id>", summary: "remove a war and revert its stats", handler: wars::removewar },
            Command { name: "showallwars", usage: "showallwars [limit]", summary: "list recent wars", handler: wars::showallwars },
            Command { name: "addplayer", usage: "addplayer <name> [status]", summary: "add a roster member", handler: roster::addplayer },
            Command { name: "removeplayer", usage: "removeplayer <name>", summary: "remove a player from the active roster", handler: roster::removeplayer },
            Command { name: "setmemberstatus", usage: "setmemberstatus <name> <status>", summary: "change a player's member status", handler: roster::setmemberstatus },
            Command { name: "addteam", usage: "addteam <name>", summary: "create a team", handler: teams::addteam },
            Command { name: "removeteam", usage: "removeteam <name>", summary: "delete a team, unassigning its players", handler: teams::removeteam },
            Command { name: "renameteam", usage: "renameteam <old> <new>", summary: "rename a team", handler: teams::renameteam },
            Command { name: "assignplayers", usage: "assignplayers <p1,p2,...> <team>", summary: "assign players to a team", handler: teams::assignplayers },
            Command { name: "unassignplayerfromteam", usage: "unassignplayerfromteam <name>", summary: "move a player to Unassigned", handler: teams::unassignplayer },
            Command { name: "showallteams", usage: "showallteams", summary: "list teams and headcounts", handler: teams::showallteams },
            Command { name: "showspecificteamroster", usage: "showspecificteamroster <team>", summary: "list one team's roster", handler: teams::showteamroster },
            Command { name: "roster", usage: "roster", summary: "list active roster members", handler: roster::roster },
            Command { name: "showtrials", usage: "showtrials", summary: "list trial members", handler: roster::showtrials },
            Command { name: "showkicked", usage: "showkicked", summary: "list kicked members", handler: roster::showkicked },
            Command { name: "addnickname", usage: "addnickname <name> <nickname>", summary: "register an OCR alias", handler: roster::addnickname },
            Command { name: "removenickname", usage: "removenickname <name> <nickname>", summary: "drop an alias", handler: roster::removenickname },
            Command { name: "nicknamesfor", usage: "nicknamesfor <name>", summary: "show a player's aliases", handler: roster::nicknamesfor },
            Command { name: "stats", usage: "stats [player] [lastxwars=N] [sortby=KEY]", summary: "leaderboard or one player's stats", handler: misc::stats },
            Command { name: "scanimage", usage: "scanimage", summary: "scan the latest image in this channel", handler: scan::scanimage },
            Command { name: "bulkscanimage", usage: "bulkscanimage", summary: "scan recent images into a review session", handler: scan::bulkscanimage },
            Command { name: "debugocr", usage: "debugocr <image_url>", summary: "show raw OCR output for an image", handler: scan::debugocr },
            Command { name: "checkpermissions", usage: "checkpermissions [channel]", summary: "verify bot permissions in a channel", handler: misc::checkpermissions },
            Command { name: "help", usage: "help", summary: "list commands", handler: misc::help },
        ];
        Self { commands }
    }

    pub fn find(&self, name: &str) -> Option<&Command> {
        self.commands
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Render the command table for `help`.
    pub fn help_text(&self) -> String {
        let mut lines = vec!["Available commands:".to_string()];
        for c in self.commands.iter() {
            lines.push(format!("/{:<24} {}", c.usage, c.summary));
        }
        lines.join("\n")
    }

    /// Run one invocation and produce the user-visible reply.
    pub async fn dispatch(&self, ctx: Arc<Context>, inv: Invocation) -> String {
        let Some(command) = self.find(&inv.name) else {
            return format!("unknown command /{}; try /help", inv.name);
        };
        log::debug!("[guild {}] /{} {}", inv.guild, inv.name, inv.args);
        match (command.handler)(ctx, inv).await {
            Ok(reply) => reply,
            Err(CommandError::Validation(message)) => message,
            Err(e) => {
                log::error!("command failed: {}", e);
                "something went wrong, try again later".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = Registry::standard();
        assert!(registry.find("AddWar").is_some());
        assert!(registry.find("nosuch").is_none());
    }

    #[test]
    fn command_names_are_unique() {
        let registry = Registry::standard();
        let mut names = registry
            .commands()
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn help_lists_every_command() {
        let registry = Registry::standard();
        let help = registry.help_text();
        for c in registry.commands() {
            assert!(help.contains(c.name), "help missing {}", c.name);
        }
    }
}
