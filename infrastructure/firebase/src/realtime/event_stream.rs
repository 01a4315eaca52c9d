use serde::Deserialize;
use serde_json::Value;

/// One `text/event-stream` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental decoder for `text/event-stream` bodies. Chunks may split
/// lines (or UTF-8 sequences) anywhere; only complete lines are decoded.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: String,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut raw: Vec<u8> = self.buffer.drain(..=end).collect();
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            let line = String::from_utf8_lossy(&raw).into_owned();

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line.as_str(), ""),
            };
            match field {
                "event" => self.event = value.to_string(),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }

        events
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.event.is_empty() && self.data.is_empty() {
            return None;
        }
        let event = std::mem::take(&mut self.event);
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: if event.is_empty() {
                "message".to_string()
            } else {
                event
            },
            data,
        })
    }
}

/// Realtime Database streaming events.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Put { path: String, data: Value },
    Patch { path: String, data: Value },
    KeepAlive,
    Cancel,
    AuthRevoked,
    Other(String),
}

#[derive(Deserialize)]
struct PathData {
    path: String,
    data: Value,
}

impl FeedEvent {
    pub fn parse(event: &SseEvent) -> Result<Self, serde_json::Error> {
        Ok(match event.event.as_str() {
            "put" => {
                let body: PathData = serde_json::from_str(&event.data)?;
                FeedEvent::Put {
                    path: body.path,
                    data: body.data,
                }
            }
            "patch" => {
                let body: PathData = serde_json::from_str(&event.data)?;
                FeedEvent::Patch {
                    path: body.path,
                    data: body.data,
                }
            }
            "keep-alive" => FeedEvent::KeepAlive,
            "cancel" => FeedEvent::Cancel,
            "auth_revoked" => FeedEvent::AuthRevoked,
            other => FeedEvent::Other(other.to_string()),
        })
    }
}
