//! Server-Sent Events framing

use hyper::body::Bytes;

pub const ENDPOINT_EVENT: &str = "endpoint";
pub const MESSAGE_EVENT: &str = "message";

/// One SSE event; multi-line data is split into several `data:` fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

impl SseEvent {
    pub fn new(event: &str, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.to_string()),
            data: data.into(),
        }
    }

    /// First frame of every stream: where to POST messages
    pub fn endpoint(url: impl Into<String>) -> Self {
        Self::new(ENDPOINT_EVENT, url)
    }

    pub fn message(payload: impl Into<String>) -> Self {
        Self::new(MESSAGE_EVENT, payload)
    }

    pub fn encode(&self) -> Bytes {
        let mut out = String::with_capacity(self.data.len() + 32);
        if let Some(event) = &self.event {
            out.push_str("event: ");
            out.push_str(event);
            out.push('\n');
        }
        for line in self.data.split('\n') {
            out.push_str("data: ");
            out.push_str(line.trim_end_matches('\r'));
            out.push('\n');
        }
        out.push('\n');
        Bytes::from(out)
    }
}

/// Comment frame used as keep-alive; ignored by SSE clients
pub fn keep_alive() -> Bytes {
    Bytes::from_static(b": ping\n\n")
}

/// Split a buffer into complete events, returning them with the unconsumed tail
pub fn decode_events(buf: &str) -> (Vec<SseEvent>, String) {
    let normalized = buf.replace("\r\n", "\n");
    let mut events = Vec::new();
    let mut rest = normalized.as_str();

    while let Some(end) = rest.find("\n\n") {
        let block = &rest[..end];
        rest = &rest[end + 2..];

        let mut event = None;
        let mut data: Vec<&str> = Vec::new();
        for line in block.split('\n') {
            if line.starts_with(':') {
                continue;
            }
            if let Some(value) = line.strip_prefix("event:") {
                event = Some(value.trim_start().to_string());
            } else if let Some(value) = line.strip_prefix("data:") {
                data.push(value.strip_prefix(' ').unwrap_or(value));
            }
        }

        if event.is_some() || !data.is_empty() {
            events.push(SseEvent {
                event,
                data: data.join("\n"),
            });
        }
    }

    (events, rest.to_string())
}
