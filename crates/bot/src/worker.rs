use super::ApiClient;
use super::ChatEvent;
use super::ChatGateway;
use super::Registry;
use super::scan;
use mkw_bulk::SessionStore;
use mkw_core::ChannelId;
use mkw_core::GuildId;
use mkw_core::MessageId;
use mkw_core::Races;
use mkw_database::Db;
use mkw_database::GuildRepository;
use mkw_database::RosterRepository;
use mkw_records::DetectedPlayer;
use mkw_resolver::Roster;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use tokio::sync::mpsc::UnboundedReceiver;

/// A single-image scan awaiting interactive approval, keyed by the
/// originating message.
#[derive(Debug, Clone)]
pub struct PendingScan {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub detected: Vec<DetectedPlayer>,
    pub race_count: Races,
    pub occurred_at: SystemTime,
}

/// Dependencies injected at the worker entry point.
pub struct Context {
    pub db: Db,
    pub engine: Arc<mkw_ocr::Engine>,
    pub gateway: Arc<dyn ChatGateway>,
    pub api: ApiClient,
    pub store: SessionStore,
    pub public_web_url: String,
    pub pending: Mutex<HashMap<MessageId, PendingScan>>,
}

impl Context {
    /// Fresh roster snapshot for a resolution pass.
    pub async fn roster(&self, guild: GuildId) -> Result<Roster, super::CommandError> {
        let client = self.db.get().await?;
        Ok(Roster::snapshot(&client.roster(guild).await?))
    }

    /// The configured OCR channel for a guild, if the guild is set up.
    pub async fn ocr_channel(&self, guild: GuildId) -> Option<ChannelId> {
        let client = self.db.get().await.ok()?;
        client
            .get_guild(guild)
            .await
            .ok()
            .flatten()
            .and_then(|g| g.ocr_channel())
    }
}

/// The bot's event loop. Each event is handled on its own task so a
/// long OCR run never blocks command handling; tasks are tracked so
/// shutdown can drain them (and flush their write batches) before exit.
pub struct Worker {
    ctx: Arc<Context>,
    registry: Arc<Registry>,
}

impl Worker {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            ctx,
            registry: Arc::new(Registry::standard()),
        }
    }

    pub async fn run(self, mut events: UnboundedReceiver<ChatEvent>) {
        log::info!("bot worker started");
        let mut tasks = tokio::task::JoinSet::new();
        let mut heartbeat = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) if !mkw_core::interrupted() => {
                        let ctx = self.ctx.clone();
                        let registry = self.registry.clone();
                        tasks.spawn(async move {
                            handle(ctx, registry, event).await;
                        });
                    }
                    _ => break,
                },
                Some(_) = tasks.join_next() => {}
                _ = heartbeat.tick() => {
                    if mkw_core::interrupted() {
                        break;
                    }
                }
            }
        }
        log::info!("bot worker draining {} in-flight tasks", tasks.len());
        while tasks.join_next().await.is_some() {}
        log::info!("bot worker stopped");
    }
}

async fn handle(ctx: Arc<Context>, registry: Arc<Registry>, event: ChatEvent) {
    match event {
        ChatEvent::Command(inv) => {
            let channel = inv.channel;
            let reply = registry.dispatch(ctx.clone(), inv).await;
            deliver(&ctx, channel, &reply).await;
        }
        ChatEvent::Image {
            guild,
            channel,
            user,
            image,
        } => {
            // Auto-scan fires only in the configured results channel.
            if ctx.ocr_channel(guild).await != Some(channel) {
                return;
            }
            let reply = match scan::single_scan(&ctx, guild, channel, user, image).await {
                Ok(reply) => reply,
                Err(super::CommandError::Validation(message)) => message,
                Err(e) => {
                    log::error!("auto-scan failed: {}", e);
                    "couldn't read this image, try again or enter manually".to_string()
                }
            };
            deliver(&ctx, channel, &reply).await;
        }
        ChatEvent::Approval {
            guild,
            channel,
            key,
            approved,
            ..
        } => {
            let reply = match scan::approve(&ctx, guild, key, approved).await {
                Ok(reply) => reply,
                Err(super::CommandError::Validation(message)) => message,
                Err(e) => {
                    log::error!("approval handling failed: {}", e);
                    "something went wrong, try again later".to_string()
                }
            };
            deliver(&ctx, channel, &reply).await;
        }
    }
}

async fn deliver(ctx: &Context, channel: ChannelId, text: &str) {
    if let Err(e) = ctx.gateway.send(channel, text).await {
        log::error!("reply delivery failed: {}", e);
    }
}
