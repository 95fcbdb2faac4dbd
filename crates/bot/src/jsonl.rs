//! JSON-lines bridge to the chat platform client.
//!
//! The actual platform client runs as a separate process and speaks a
//! line protocol over this process's stdio: inbound lines are either
//! `{"type":"event",...}` (commands, images, approvals) or
//! `{"type":"reply","data":...}` (answers to outbound requests).
//! Outbound requests carry an `op` and are answered strictly in order;
//! one request is outstanding at a time.
use super::ChannelPermissions;
use super::ChatEvent;
use super::ChatGateway;
use super::GatewayError;
use super::ImageRef;
use super::Invocation;
use base64::Engine as _;
use serde_json::Value;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::sync::mpsc;

/// How long the bridge may take to answer one request.
const BRIDGE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct JsonlGateway {
    out: Mutex<tokio::io::Stdout>,
    /// Reply stream, guarded so calls serialize and answers pair up.
    replies: Mutex<mpsc::UnboundedReceiver<Value>>,
}

impl JsonlGateway {
    /// Spawn the stdin reader and return the gateway plus the event
    /// stream for the worker.
    pub fn start() -> (Arc<Self>, mpsc::UnboundedReceiver<ChatEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let Ok(value) = serde_json::from_str::<Value>(&line) else {
                    log::warn!("unparseable bridge line");
                    continue;
                };
                match value.get("type").and_then(Value::as_str) {
                    Some("reply") => {
                        let _ = reply_tx.send(value.get("data").cloned().unwrap_or(Value::Null));
                    }
                    _ => match parse_event(&value) {
                        Some(event) => {
                            let _ = event_tx.send(event);
                        }
                        None => log::warn!("unrecognized bridge event"),
                    },
                }
            }
            log::info!("bridge stdin closed");
        });
        let gateway = Arc::new(Self {
            out: Mutex::new(tokio::io::stdout()),
            replies: Mutex::new(reply_rx),
        });
        (gateway, event_rx)
    }

    async fn call(&self, request: Value) -> Result<Value, GatewayError> {
        let mut replies = self.replies.lock().await;
        {
            let mut out = self.out.lock().await;
            let mut line = request.to_string();
            line.push('\n');
            out.write_all(line.as_bytes())
                .await
                .map_err(|e| GatewayError::Transport(e.to_string()))?;
            out.flush()
                .await
                .map_err(|e| GatewayError::Transport(e.to_string()))?;
        }
        match tokio::time::timeout(BRIDGE_TIMEOUT, replies.recv()).await {
            Err(_) => Err(GatewayError::Protocol("bridge reply timed out".to_string())),
            Ok(None) => Err(GatewayError::Closed),
            Ok(Some(data)) => Ok(data),
        }
    }
}

fn parse_event(v: &Value) -> Option<ChatEvent> {
    let guild = v.get("guild")?.as_i64()?;
    let channel = v.get("channel")?.as_i64()?;
    let user = v.get("user")?.as_i64()?;
    match v.get("type")?.as_str()? {
        "command" => Some(ChatEvent::Command(Invocation {
            guild,
            channel,
            user,
            name: v.get("name")?.as_str()?.to_string(),
            args: v
                .get("args")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
        })),
        "image" => Some(ChatEvent::Image {
            guild,
            channel,
            user,
            image: parse_image(v)?,
        }),
        "approval" => Some(ChatEvent::Approval {
            guild,
            channel,
            user,
            key: v.get("key")?.as_i64()?,
            approved: v.get("approved")?.as_bool()?,
        }),
        _ => None,
    }
}

fn parse_image(v: &Value) -> Option<ImageRef> {
    Some(ImageRef {
        filename: v.get("filename")?.as_str()?.to_string(),
        url: v.get("url")?.as_str()?.to_string(),
        message_id: v.get("message_id")?.as_i64()?,
        timestamp: v
            .get("timestamp")
            .and_then(Value::as_i64)
            .map(|secs| std::time::UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)),
    })
}

#[async_trait::async_trait]
impl ChatGateway for JsonlGateway {
    async fn send(&self, channel: mkw_core::ChannelId, text: &str) -> Result<(), GatewayError> {
        self.call(json!({"op": "send", "channel": channel, "text": text}))
            .await
            .map(|_| ())
    }

    async fn recent_images(
        &self,
        channel: mkw_core::ChannelId,
        limit: usize,
    ) -> Result<Vec<ImageRef>, GatewayError> {
        let data = self
            .call(json!({"op": "recent_images", "channel": channel, "limit": limit}))
            .await?;
        data.get("images")
            .and_then(Value::as_array)
            .map(|images| images.iter().filter_map(parse_image).collect())
            .ok_or_else(|| GatewayError::Protocol("missing images array".to_string()))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, GatewayError> {
        let data = self.call(json!({"op": "download", "url": url})).await?;
        let encoded = data
            .get("base64")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Protocol("missing image data".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| GatewayError::Protocol(format!("bad image encoding: {}", e)))
    }

    async fn permissions(
        &self,
        channel: mkw_core::ChannelId,
    ) -> Result<ChannelPermissions, GatewayError> {
        let data = self
            .call(json!({"op": "permissions", "channel": channel}))
            .await?;
        serde_json::from_value(data)
            .map_err(|e| GatewayError::Protocol(format!("bad permissions shape: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_events_parse() {
        let v: Value = serde_json::from_str(
            r#"{"type":"command","guild":1,"channel":2,"user":3,"name":"roster","args":""}"#,
        )
        .unwrap();
        match parse_event(&v) {
            Some(ChatEvent::Command(inv)) => {
                assert_eq!(inv.guild, 1);
                assert_eq!(inv.name, "roster");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn image_events_parse() {
        let v: Value = serde_json::from_str(
            r#"{"type":"image","guild":1,"channel":2,"user":3,
                "filename":"war.png","url":"https://cdn/x.png",
                "message_id":99,"timestamp":1700000000}"#,
        )
        .unwrap();
        match parse_event(&v) {
            Some(ChatEvent::Image { image, .. }) => {
                assert_eq!(image.filename, "war.png");
                assert_eq!(image.message_id, 99);
                assert!(image.timestamp.is_some());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn junk_is_rejected() {
        let v: Value = serde_json::from_str(r#"{"type":"dance","guild":1}"#).unwrap();
        assert!(parse_event(&v).is_none());
    }
}
