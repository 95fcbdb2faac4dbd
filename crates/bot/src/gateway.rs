use mkw_core::ChannelId;
use mkw_core::GuildId;
use mkw_core::MessageId;
use mkw_core::UserId;
use std::time::SystemTime;

/// A posted image, referenced by URL; bytes are fetched on demand.
#[derive(Debug, Clone)]
pub struct ImageRef {
    pub filename: String,
    pub url: String,
    pub message_id: MessageId,
    pub timestamp: Option<SystemTime>,
}

/// What the bot may do in a channel.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct ChannelPermissions {
    pub read_history: bool,
    pub read_attachments: bool,
    pub send_messages: bool,
}

/// Inbound events from the chat platform.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// An image attachment appeared in some channel.
    Image {
        guild: GuildId,
        channel: ChannelId,
        user: UserId,
        image: ImageRef,
    },
    /// A slash command was invoked.
    Command(Invocation),
    /// The user acted on an interactive confirmation.
    Approval {
        guild: GuildId,
        channel: ChannelId,
        user: UserId,
        key: MessageId,
        approved: bool,
    },
}

/// One slash-command invocation with its raw argument tail.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub user: UserId,
    pub name: String,
    pub args: String,
}

impl Invocation {
    /// Whitespace-separated argument tokens.
    pub fn tokens(&self) -> Vec<&str> {
        self.args.split_whitespace().collect()
    }
}

/// Failures talking to the chat platform.
#[derive(Debug)]
pub enum GatewayError {
    Closed,
    Protocol(String),
    Transport(String),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "chat gateway closed"),
            Self::Protocol(s) => write!(f, "chat gateway protocol error: {}", s),
            Self::Transport(s) => write!(f, "chat gateway transport error: {}", s),
        }
    }
}

impl std::error::Error for GatewayError {}

/// The chat platform client, behind a seam. The worker only ever needs
/// these four capabilities; everything else the platform offers stays on
/// the other side of the bridge.
#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send(&self, channel: ChannelId, text: &str) -> Result<(), GatewayError>;
    /// Most recent image attachments in a channel, newest last.
    async fn recent_images(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<ImageRef>, GatewayError>;
    async fn download(&self, url: &str) -> Result<Vec<u8>, GatewayError>;
    async fn permissions(&self, channel: ChannelId) -> Result<ChannelPermissions, GatewayError>;
}
