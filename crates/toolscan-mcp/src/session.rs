//! Session negotiation: discovering the messages endpoint.
//!
//! An SSE MCP server announces where clients must POST their requests in one
//! of the first events on the stream, e.g. `/messages?sessionId=42`.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tokio::sync::oneshot;

/// Text that marks a message as carrying session information.
pub const SESSION_MARKER: &str = "session";

fn endpoint_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/(messages\S+)").expect("endpoint pattern is valid"))
}

/// Extract the messages endpoint path from a session message.
///
/// Returns the path without its leading `/`, or `None` if the message does not
/// contain one.
pub fn parse_messages_endpoint(message: &str) -> Option<String> {
    endpoint_pattern()
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Records the endpoint announced by the server and signals the waiting fetch.
///
/// The first endpoint discovered wins. Later session messages never replace
/// it, even if they carry a different path.
#[derive(Debug)]
pub struct SessionNegotiator {
    endpoint: Arc<OnceLock<String>>,
    notify: Option<oneshot::Sender<String>>,
}

impl SessionNegotiator {
    /// Create a negotiator writing into `endpoint`, plus the receiver that
    /// resolves once the endpoint is known.
    pub fn new(endpoint: Arc<OnceLock<String>>) -> (Self, oneshot::Receiver<String>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                endpoint,
                notify: Some(tx),
            },
            rx,
        )
    }

    /// Look at a session message. Returns the endpoint if this message is the
    /// one that established it.
    pub fn observe(&mut self, message: &str) -> Option<&str> {
        let Some(found) = parse_messages_endpoint(message) else {
            tracing::debug!("session message without messages endpoint");
            return None;
        };

        if let Some(current) = self.endpoint.get() {
            if *current != found {
                tracing::debug!(
                    current = %current,
                    ignored = %found,
                    "messages endpoint already set"
                );
            }
            return None;
        }

        let endpoint = self.endpoint.get_or_init(|| found).clone();
        tracing::info!(endpoint = %endpoint, "found messages endpoint");

        if let Some(tx) = self.notify.take() {
            // The fetch may have given up already; the endpoint stays recorded.
            let _ = tx.send(endpoint);
        }

        self.endpoint()
    }

    /// The discovered endpoint, if any.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.get().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint() {
        assert_eq!(
            parse_messages_endpoint("/messages?sessionId=42"),
            Some("messages?sessionId=42".to_string())
        );
        assert_eq!(
            parse_messages_endpoint("event endpoint session http://host:8080/messages/?session_id=ab-cd trailing"),
            Some("messages/?session_id=ab-cd".to_string())
        );
    }

    #[test]
    fn test_parse_endpoint_absent() {
        assert_eq!(parse_messages_endpoint("session started"), None);
        // "messages" alone is not enough, the segment must continue
        assert_eq!(parse_messages_endpoint("session /messages"), None);
        assert_eq!(parse_messages_endpoint(""), None);
    }

    #[tokio::test]
    async fn test_negotiator_signals_once() {
        let endpoint = Arc::new(OnceLock::new());
        let (mut negotiator, rx) = SessionNegotiator::new(endpoint.clone());

        assert_eq!(negotiator.observe("session pending"), None);
        assert_eq!(negotiator.endpoint(), None);

        assert_eq!(
            negotiator.observe("/messages?sessionId=1"),
            Some("messages?sessionId=1")
        );
        assert_eq!(rx.await.unwrap(), "messages?sessionId=1");
        assert_eq!(endpoint.get().map(String::as_str), Some("messages?sessionId=1"));
    }

    #[test]
    fn test_first_endpoint_wins() {
        let endpoint = Arc::new(OnceLock::new());
        let (mut negotiator, _rx) = SessionNegotiator::new(endpoint.clone());

        negotiator.observe("/messages?sessionId=1");
        assert_eq!(negotiator.observe("/messages?sessionId=2"), None);
        assert_eq!(negotiator.observe("/messages?sessionId=1"), None);
        assert_eq!(negotiator.endpoint(), Some("messages?sessionId=1"));
    }

    #[test]
    fn test_observe_after_receiver_dropped() {
        let endpoint = Arc::new(OnceLock::new());
        let (mut negotiator, rx) = SessionNegotiator::new(endpoint);
        drop(rx);

        assert_eq!(
            negotiator.observe("/messages?sessionId=9"),
            Some("messages?sessionId=9")
        );
    }
}
