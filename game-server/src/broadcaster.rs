use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::Stream;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use game_types::{GameCode, GameError, GameSnapshot, PlayerId, StreamEvent};

const CHANNEL_CAPACITY: usize = 64;
const SUBSCRIBER_BUFFER: usize = 32;

/// Read side the per-subscription poll loop goes through.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Current snapshot of a game, or `None` if it no longer exists.
    /// Implementations may advance `waiting -> playing` on the way.
    async fn poll_snapshot(&self, game_id: &str) -> Result<Option<GameSnapshot>, GameError>;
}

/// Per-game fan-out of snapshots to open subscriptions.
///
/// Mutations publish straight into the game's channel; every subscription
/// also re-reads the game on its own poll ticker, so a missed or lagged
/// push is caught up on the next tick.
pub struct Broadcaster {
    channels: DashMap<GameCode, broadcast::Sender<GameSnapshot>>,
    poll_interval: Duration,
    keepalive_interval: Duration,
}

impl Broadcaster {
    pub fn new(poll_interval: Duration, keepalive_interval: Duration) -> Self {
        Self {
            channels: DashMap::new(),
            poll_interval,
            keepalive_interval,
        }
    }

    /// Publishes to whoever is subscribed to the snapshot's game.
    pub fn publish(&self, snapshot: GameSnapshot) {
        if let Some(sender) = self.channels.get(&snapshot.game_id) {
            // Nobody listening is fine
            let _ = sender.send(snapshot);
        }
    }

    pub fn subscribe(
        &self,
        source: Arc<dyn SnapshotSource>,
        game_id: &str,
        player_id: &str,
    ) -> Subscription {
        let updates = self
            .channels
            .entry(game_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();
        let (events, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);

        let driver = SubscriptionDriver {
            source,
            game_id: game_id.to_string(),
            player_id: player_id.to_string(),
            updates: Some(updates),
            events,
            last_revision: None,
        };
        let task = tokio::spawn(driver.run(self.poll_interval, self.keepalive_interval));

        debug!("Player {} subscribed to game {}", player_id, game_id);
        Subscription {
            events: receiver,
            task,
        }
    }

    pub fn subscriber_count(&self, game_id: &str) -> usize {
        self.channels
            .get(game_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Drops channels nobody is subscribed to any more.
    pub fn remove_idle_channels(&self) -> usize {
        let before = self.channels.len();
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
        before - self.channels.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Live event stream for one client. Dropping it stops the poll and
/// keepalive timers behind it.
pub struct Subscription {
    events: mpsc::Receiver<StreamEvent>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Stream for Subscription {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

enum Wakeup {
    Pushed(Result<GameSnapshot, broadcast::error::RecvError>),
    Poll,
    Keepalive,
}

struct SubscriptionDriver {
    source: Arc<dyn SnapshotSource>,
    game_id: GameCode,
    player_id: PlayerId,
    updates: Option<broadcast::Receiver<GameSnapshot>>,
    events: mpsc::Sender<StreamEvent>,
    last_revision: Option<u64>,
}

impl SubscriptionDriver {
    async fn run(mut self, poll_interval: Duration, keepalive_interval: Duration) {
        let mut poll = tokio::time::interval(poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut keepalive =
            tokio::time::interval_at(Instant::now() + keepalive_interval, keepalive_interval);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if self.events.send(StreamEvent::Connected).await.is_err() {
            return;
        }

        loop {
            let wakeup = tokio::select! {
                pushed = next_push(&mut self.updates) => Wakeup::Pushed(pushed),
                _ = poll.tick() => Wakeup::Poll,
                _ = keepalive.tick() => Wakeup::Keepalive,
            };

            let delivered = match wakeup {
                Wakeup::Pushed(Ok(snapshot)) => self.emit(snapshot).await,
                Wakeup::Pushed(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    debug!(
                        "Subscriber {} on game {} lagged by {} snapshots",
                        self.player_id, self.game_id, skipped
                    );
                    self.poll_and_emit().await
                }
                Wakeup::Pushed(Err(broadcast::error::RecvError::Closed)) => {
                    // Polling alone keeps the stream going
                    self.updates = None;
                    true
                }
                Wakeup::Poll => self.poll_and_emit().await,
                Wakeup::Keepalive => self.events.send(StreamEvent::Keepalive).await.is_ok(),
            };

            if !delivered {
                debug!(
                    "Subscriber {} on game {} went away",
                    self.player_id, self.game_id
                );
                break;
            }
        }
    }

    async fn poll_and_emit(&mut self) -> bool {
        match self.source.poll_snapshot(&self.game_id).await {
            Ok(Some(snapshot)) => self.emit(snapshot).await,
            Ok(None) => true,
            Err(e) => {
                warn!("Polling game {} failed: {}", self.game_id, e);
                true
            }
        }
    }

    /// Sends a snapshot unless the subscriber already has this revision
    /// or a newer one. Returns false once the receiving side is gone.
    async fn emit(&mut self, snapshot: GameSnapshot) -> bool {
        if self
            .last_revision
            .is_some_and(|seen| snapshot.revision <= seen)
        {
            return true;
        }
        self.last_revision = Some(snapshot.revision);
        self.events
            .send(StreamEvent::GameUpdate(snapshot))
            .await
            .is_ok()
    }
}

async fn next_push(
    updates: &mut Option<broadcast::Receiver<GameSnapshot>>,
) -> Result<GameSnapshot, broadcast::error::RecvError> {
    match updates {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use game_types::{Color, GamePhase, BOARD_CELLS};

    fn snapshot(revision: u64) -> GameSnapshot {
        GameSnapshot {
            game_id: "34567".to_string(),
            phase: GamePhase::Playing,
            grid: vec![None; BOARD_CELLS],
            turn: 0,
            current_player: Color::from("red"),
            turn_order: vec![Color::from("red"), Color::from("green")],
            players: Vec::new(),
            winner: None,
            revision,
            timestamp: 0,
        }
    }

    /// Source whose revision only changes when a test says so.
    struct FixedSource {
        revision: Mutex<Option<u64>>,
        polls: AtomicUsize,
        fail: bool,
    }

    impl FixedSource {
        fn new(revision: Option<u64>) -> Arc<Self> {
            Arc::new(Self {
                revision: Mutex::new(revision),
                polls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                revision: Mutex::new(None),
                polls: AtomicUsize::new(0),
                fail: true,
            })
        }

        fn set_revision(&self, revision: u64) {
            *self.revision.lock().unwrap() = Some(revision);
        }
    }

    #[async_trait]
    impl SnapshotSource for FixedSource {
        async fn poll_snapshot(&self, _game_id: &str) -> Result<Option<GameSnapshot>, GameError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GameError::Store {
                    message: "unavailable".to_string(),
                });
            }
            let revision = *self.revision.lock().unwrap();
            Ok(revision.map(snapshot))
        }
    }

    async fn next(subscription: &mut Subscription) -> StreamEvent {
        tokio::time::timeout(Duration::from_secs(2), subscription.next_event())
            .await
            .expect("timed out waiting for event")
            .expect("subscription closed")
    }

    fn revision_of(event: StreamEvent) -> u64 {
        match event {
            StreamEvent::GameUpdate(snapshot) => snapshot.revision,
            other => panic!("expected game update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connected_then_initial_snapshot() {
        let broadcaster = Broadcaster::new(Duration::from_millis(20), Duration::from_secs(60));
        let mut subscription = broadcaster.subscribe(FixedSource::new(Some(3)), "34567", "p1");

        assert_eq!(next(&mut subscription).await, StreamEvent::Connected);
        assert_eq!(revision_of(next(&mut subscription).await), 3);
    }

    #[tokio::test]
    async fn test_unchanged_polls_are_not_repeated() {
        let broadcaster = Broadcaster::new(Duration::from_millis(10), Duration::from_secs(60));
        let source = FixedSource::new(Some(1));
        let mut subscription = broadcaster.subscribe(source.clone(), "34567", "p1");

        next(&mut subscription).await;
        assert_eq!(revision_of(next(&mut subscription).await), 1);

        // Several polls at the same revision produce nothing
        let quiet = tokio::time::timeout(Duration::from_millis(100), subscription.next_event()).await;
        assert!(quiet.is_err());
        assert!(source.polls.load(Ordering::SeqCst) > 2);

        source.set_revision(2);
        assert_eq!(revision_of(next(&mut subscription).await), 2);
    }

    #[tokio::test]
    async fn test_published_snapshots_arrive_in_order() {
        let broadcaster = Broadcaster::new(Duration::from_secs(60), Duration::from_secs(60));
        let mut subscription = broadcaster.subscribe(FixedSource::new(None), "34567", "p1");
        next(&mut subscription).await;

        for revision in 1..=3 {
            broadcaster.publish(snapshot(revision));
        }
        // A stale push is dropped
        broadcaster.publish(snapshot(2));
        broadcaster.publish(snapshot(4));

        let revisions = vec![
            revision_of(next(&mut subscription).await),
            revision_of(next(&mut subscription).await),
            revision_of(next(&mut subscription).await),
            revision_of(next(&mut subscription).await),
        ];
        assert_eq!(revisions, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_keepalive_is_sent() {
        let broadcaster = Broadcaster::new(Duration::from_secs(60), Duration::from_millis(30));
        let mut subscription = broadcaster.subscribe(FixedSource::new(None), "34567", "p1");

        assert_eq!(next(&mut subscription).await, StreamEvent::Connected);
        assert_eq!(next(&mut subscription).await, StreamEvent::Keepalive);
    }

    #[tokio::test]
    async fn test_poll_errors_do_not_end_the_stream() {
        let broadcaster = Broadcaster::new(Duration::from_millis(10), Duration::from_millis(50));
        let source = FixedSource::failing();
        let mut subscription = broadcaster.subscribe(source.clone(), "34567", "p1");

        assert_eq!(next(&mut subscription).await, StreamEvent::Connected);
        assert_eq!(next(&mut subscription).await, StreamEvent::Keepalive);
        assert!(source.polls.load(Ordering::SeqCst) > 1);
        assert!(subscription.is_active());
    }

    #[tokio::test]
    async fn test_drop_stops_polling() {
        let broadcaster = Broadcaster::new(Duration::from_millis(10), Duration::from_secs(60));
        let source = FixedSource::new(Some(1));
        let mut subscription = broadcaster.subscribe(source.clone(), "34567", "p1");
        next(&mut subscription).await;
        assert_eq!(broadcaster.subscriber_count("34567"), 1);

        drop(subscription);
        tokio::time::sleep(Duration::from_millis(30)).await;
        let polls = source.polls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(source.polls.load(Ordering::SeqCst), polls);
        assert_eq!(broadcaster.subscriber_count("34567"), 0);
        assert_eq!(broadcaster.remove_idle_channels(), 1);
        assert_eq!(broadcaster.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_games_are_isolated() {
        let broadcaster = Broadcaster::new(Duration::from_secs(60), Duration::from_secs(60));
        let mut first = broadcaster.subscribe(FixedSource::new(None), "34567", "p1");
        let mut second = broadcaster.subscribe(FixedSource::new(None), "88888", "p2");
        next(&mut first).await;
        next(&mut second).await;

        broadcaster.publish(snapshot(5));

        assert_eq!(revision_of(next(&mut first).await), 5);
        let quiet = tokio::time::timeout(Duration::from_millis(50), second.next_event()).await;
        assert!(quiet.is_err());
    }
}
