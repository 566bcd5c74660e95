/// Push-stream frames for live listeners
use crate::models::CompletionEvent;
use bytes::Bytes;

/// Frames written to a listener's server-sent event stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// A thumbnail is ready; the data line carries its URL
    Completion(CompletionEvent),

    /// Keep-alive comment, ignored by EventSource clients
    Ping { timestamp: i64 },
}

impl StreamMessage {
    pub fn completion(event: CompletionEvent) -> Self {
        StreamMessage::Completion(event)
    }

    pub fn ping() -> Self {
        StreamMessage::Ping {
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Encode as one SSE frame (terminated by a blank line)
    pub fn to_sse_frame(&self) -> Bytes {
        match self {
            StreamMessage::Completion(event) => {
                let mut frame = String::with_capacity(event.url.len() + 8);
                // A data field cannot span lines; split on any embedded newline.
                for line in event.url.split('\n') {
                    frame.push_str("data: ");
                    frame.push_str(line.trim_end_matches('\r'));
                    frame.push('\n');
                }
                frame.push('\n');
                Bytes::from(frame)
            }
            StreamMessage::Ping { timestamp } => Bytes::from(format!(": ping {}\n\n", timestamp)),
        }
    }
}
