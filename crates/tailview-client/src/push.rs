use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use tailview_types::{PushEvent, PushMessage};

/// Reconnect delays for the push channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
        }
    }

    /// Delay after `current`: doubled, capped at `max`
    pub fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}

/// Turn one text frame into an event; unknown or malformed frames yield `None`
pub fn decode_push_message(text: &str) -> Option<PushEvent> {
    match serde_json::from_str::<PushMessage>(text) {
        Ok(PushMessage::Connected) => Some(PushEvent::Connected),
        Ok(PushMessage::Log(record)) => Some(PushEvent::Entry(record)),
        Err(error) => {
            warn!(%error, "ignoring undecodable push message");
            None
        }
    }
}

/// Owns the background task holding the push channel open
///
/// Every event is tagged with the subscription id it was started with, so
/// the consumer can drop events from a connection it has since replaced.
pub struct PushStreamManager {
    /// Cancellation token for stopping the connection task
    cancel: CancellationToken,

    /// Active connection task, if any
    task: Option<tokio::task::JoinHandle<()>>,

    /// Subscription the running task reports under
    subscription: Option<u64>,
}

impl PushStreamManager {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            task: None,
            subscription: None,
        }
    }

    /// Connect to `url`, replacing any existing connection
    pub fn start(
        &mut self,
        subscription: u64,
        url: Url,
        backoff: Backoff,
        event_tx: mpsc::UnboundedSender<(u64, PushEvent)>,
    ) {
        self.stop();
        info!(subscription, %url, "starting push channel");

        let cancel = self.cancel.clone();
        self.subscription = Some(subscription);
        self.task = Some(tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = connection_loop(subscription, url, backoff, event_tx) => {}
            }
            debug!(subscription, "push channel task finished");
        }));
    }

    /// Close the connection and stop reconnecting
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let Some(subscription) = self.subscription.take() {
            info!(subscription, "push channel stopped");
        }
        // Create a fresh cancellation token for the next connection
        self.cancel = CancellationToken::new();
    }

    pub fn subscription(&self) -> Option<u64> {
        self.subscription
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Default for PushStreamManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PushStreamManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Keep the channel open until the receiver goes away
///
/// A dropped connection is reported and retried; reconnecting resumes live
/// ingestion from that moment, nothing is replayed.
async fn connection_loop(
    subscription: u64,
    url: Url,
    backoff: Backoff,
    event_tx: mpsc::UnboundedSender<(u64, PushEvent)>,
) {
    let send = |event: PushEvent| event_tx.send((subscription, event)).is_ok();
    let mut delay = backoff.initial;

    loop {
        if !send(PushEvent::Connecting) {
            return;
        }

        let mut ws = match connect_async(url.as_str()).await {
            Ok((ws, _)) => ws,
            Err(error) => {
                warn!(subscription, %error, retry_in = ?delay, "push channel connect failed");
                if !send(PushEvent::Disconnected) {
                    return;
                }
                tokio::time::sleep(delay).await;
                delay = backoff.next(delay);
                continue;
            }
        };
        delay = backoff.initial;
        debug!(subscription, "push channel socket open");

        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    if let Some(event) = decode_push_message(&text) {
                        if !send(event) {
                            let _ = ws.close(None).await;
                            return;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    warn!(subscription, %error, "push channel read failed");
                    break;
                }
            }
        }

        let _ = ws.close(None).await;
        if !send(PushEvent::Disconnected) {
            return;
        }
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(3));
        let mut delay = backoff.initial;
        let mut seen = Vec::new();
        for _ in 0..5 {
            delay = backoff.next(delay);
            seen.push(delay.as_millis());
        }
        assert_eq!(seen, vec![1000, 2000, 3000, 3000, 3000]);
    }

    #[test]
    fn test_backoff_max_never_below_initial() {
        let backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(backoff.next(backoff.initial), Duration::from_secs(5));
    }

    #[test]
    fn test_decode_connected_and_log() {
        assert_eq!(decode_push_message(r#"{"type":"connected"}"#), Some(PushEvent::Connected));

        match decode_push_message(r#"{"type":"log","data":{"level":"INFO","message":"hi"}}"#) {
            Some(PushEvent::Entry(record)) => assert_eq!(record.message.as_deref(), Some("hi")),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_log_with_string_epoch() {
        let frame = r#"{"type":"log","data":{"level":"WARN","message":"late","ts":"1705312800000"}}"#;
        match decode_push_message(frame) {
            Some(PushEvent::Entry(record)) => {
                assert_eq!(record.message.as_deref(), Some("late"));
                assert_eq!(record.epoch_ms, Some(1_705_312_800_000));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_ignores_unknown_frames() {
        assert_eq!(decode_push_message(r#"{"type":"heartbeat"}"#), None);
        assert_eq!(decode_push_message("not json"), None);
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let mut manager = PushStreamManager::new();
        manager.stop();
        assert!(!manager.is_running());
        assert_eq!(manager.subscription(), None);
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_connecting_then_disconnected() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut manager = PushStreamManager::new();
        let url = Url::parse("ws://127.0.0.1:9/ws").unwrap();
        manager.start(7, url, Backoff::new(Duration::from_secs(60), Duration::from_secs(60)), tx);

        assert_eq!(rx.recv().await, Some((7, PushEvent::Connecting)));
        assert_eq!(rx.recv().await, Some((7, PushEvent::Disconnected)));
        manager.stop();
        assert_eq!(manager.subscription(), None);
    }
}
