//! Head-of-queue delivery with fixed-delay retry.

use crate::{Combination, CombinationQueue, Transport};
use kiosk_storage::KeyValueStorage;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, Notify};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Delivery state of the publisher.
///
/// The states describe the single delivery pipeline: at most one attempt is
/// outstanding at any time, never a pool of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherState {
    /// No delivery in flight; the queue may or may not be empty.
    Idle,
    /// One delivery attempt outstanding for the current head.
    Sending,
    /// A failed attempt is waiting out the retry delay.
    Waiting,
}

/// Configuration for publisher delivery behavior.
///
/// # Fields
///
/// - `retry_delay`: fixed wait after a failed attempt (default: 3000 ms)
/// - `retry_on_failure`: `true` resends the same head until it succeeds
///   (kiosk client); `false` skips a failed head and moves on (bulk loader)
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Fixed delay before retrying a failed delivery.
    pub retry_delay: Duration,
    /// Whether a failed delivery is retried or skipped.
    pub retry_on_failure: bool,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(3000),
            retry_on_failure: true,
        }
    }
}

/// Delivery counters, cumulative since the publisher was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    /// Combinations confirmed delivered.
    pub delivered: u64,
    /// Combinations dropped by the skip-on-failure policy.
    pub skipped: u64,
}

struct StatsInner {
    delivered: AtomicU64,
    skipped: AtomicU64,
}

/// Publisher: drains the durable combination queue through a [`Transport`].
///
/// Deliveries are strictly sequential and in enqueue order. On success the
/// head is removed and the next head is attempted immediately; on failure the
/// same head is resent after the fixed delay (or skipped, in bulk-loader
/// mode). The retry path never drops, reorders or mutates a record, and there
/// is no attempt ceiling: delivery of a stuck head is retried indefinitely
/// until the server accepts it.
///
/// # Lifecycle
///
/// 1. Create with [`Publisher::new`] - loads the persisted queue
/// 2. Call [`Publisher::start`] to spawn the delivery loop
/// 3. Enqueue submissions with [`Publisher::add`]
pub struct Publisher {
    config: PublisherConfig,
    transport: Arc<dyn Transport>,
    /// Shared with the delivery task; the task is the only remover.
    queue: Arc<Mutex<CombinationQueue>>,
    /// Wakes the delivery task when the queue goes non-empty.
    notify: Arc<Notify>,
    state: Arc<watch::Sender<PublisherState>>,
    stats: Arc<StatsInner>,
    started: AtomicBool,
}

impl Publisher {
    /// Create a publisher over the given storage and transport.
    ///
    /// The persisted queue is loaded here (a missing or corrupt slot loads
    /// as empty), so combinations added before [`start`](Self::start) land on
    /// the durable tail behind any submissions left over from a previous run.
    pub fn new(
        config: PublisherConfig,
        storage: Arc<dyn KeyValueStorage>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let queue = CombinationQueue::load(storage);
        if !queue.is_empty() {
            info!(pending = queue.len(), "Resuming with pending combinations");
        }

        let (state, _) = watch::channel(PublisherState::Idle);

        Self {
            config,
            transport,
            queue: Arc::new(Mutex::new(queue)),
            notify: Arc::new(Notify::new()),
            state: Arc::new(state),
            stats: Arc::new(StatsInner {
                delivered: AtomicU64::new(0),
                skipped: AtomicU64::new(0),
            }),
            started: AtomicBool::new(false),
        }
    }

    /// Spawn the background delivery loop.
    ///
    /// Combinations persisted by a previous run are delivered immediately;
    /// with nothing pending the loop parks until the first [`add`](Self::add).
    ///
    /// # Panics
    ///
    /// Panics if called more than once.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            panic!("Publisher already started");
        }

        let config = self.config.clone();
        let transport = self.transport.clone();
        let queue = self.queue.clone();
        let notify = self.notify.clone();
        let state = self.state.clone();
        let stats = self.stats.clone();

        tokio::spawn(run_delivery_loop(
            config, transport, queue, notify, state, stats,
        ));
    }

    /// Enqueue a combination for delivery.
    ///
    /// The record is appended to the durable tail before this returns. An
    /// in-flight attempt or a pending retry delay is unaffected; the new
    /// record waits its turn behind the current head.
    pub async fn add(&self, combination: Combination) {
        {
            let mut queue = self.queue.lock().await;
            queue.append(combination);
            debug!(pending = queue.len(), "Enqueued combination");
        }
        self.notify.notify_one();
    }

    /// Number of combinations awaiting delivery.
    pub async fn pending_count(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Current delivery state.
    pub fn state(&self) -> PublisherState {
        *self.state.borrow()
    }

    /// Watch delivery state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<PublisherState> {
        self.state.subscribe()
    }

    /// Snapshot of the delivery counters.
    pub fn stats(&self) -> PublisherStats {
        PublisherStats {
            delivered: self.stats.delivered.load(Ordering::Relaxed),
            skipped: self.stats.skipped.load(Ordering::Relaxed),
        }
    }
}

/// The single consumer of the queue: all sends originate here, so at most
/// one delivery attempt is ever outstanding.
async fn run_delivery_loop(
    config: PublisherConfig,
    transport: Arc<dyn Transport>,
    queue: Arc<Mutex<CombinationQueue>>,
    notify: Arc<Notify>,
    state: Arc<watch::Sender<PublisherState>>,
    stats: Arc<StatsInner>,
) {
    loop {
        // Clone the head out so the lock is not held across the send; `add`
        // may append to the tail while the attempt is in flight.
        let head = { queue.lock().await.peek_first().cloned() };

        let Some(combination) = head else {
            state.send_replace(PublisherState::Idle);
            notify.notified().await;
            continue;
        };

        state.send_replace(PublisherState::Sending);
        match transport.send(&combination).await {
            Ok(()) => {
                let pending = {
                    let mut queue = queue.lock().await;
                    queue
                        .remove_first()
                        .expect("delivered head vanished from the queue");
                    queue.len()
                };
                stats.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(pending, "Combination delivered");
                // Fall through: the next head is attempted immediately.
            }
            Err(err) if config.retry_on_failure => {
                warn!(
                    error = %err,
                    retry_delay_ms = config.retry_delay.as_millis() as u64,
                    "Delivery failed, will retry the same combination"
                );
                state.send_replace(PublisherState::Waiting);
                sleep(config.retry_delay).await;
            }
            Err(err) => {
                warn!(error = %err, "Delivery failed, skipping combination");
                queue
                    .lock()
                    .await
                    .remove_first()
                    .expect("failed head vanished from the queue");
                stats.skipped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TransportError, TransportResult, QUEUE_STORAGE_KEY};
    use async_trait::async_trait;
    use kiosk_storage::MemoryStorage;
    use reqwest::StatusCode;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    /// Records every call and plays back a scripted outcome sequence
    /// (exhausted script = success).
    struct FakeTransport {
        calls: StdMutex<Vec<Combination>>,
        outcomes: StdMutex<VecDeque<bool>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeTransport {
        fn always_ok() -> Arc<Self> {
            Self::with_outcomes(&[])
        }

        fn with_outcomes(outcomes: &[bool]) -> Arc<Self> {
            Arc::new(Self {
                calls: StdMutex::new(Vec::new()),
                outcomes: StdMutex::new(outcomes.iter().copied().collect()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> Vec<Combination> {
            self.calls.lock().unwrap().clone()
        }

        fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, combination: &Combination) -> TransportResult<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(combination.clone());

            // Suspend mid-call so concurrent adds get a chance to interleave.
            sleep(Duration::from_millis(5)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let ok = self.outcomes.lock().unwrap().pop_front().unwrap_or(true);
            if ok {
                Ok(())
            } else {
                Err(TransportError::Rejected(StatusCode::INTERNAL_SERVER_ERROR))
            }
        }
    }

    fn combination(user_id: &str) -> Combination {
        Combination::new(["a", "b", "c"], user_id, 5, "great").unwrap()
    }

    fn publisher(transport: Arc<FakeTransport>) -> Publisher {
        Publisher::new(
            PublisherConfig::default(),
            Arc::new(MemoryStorage::new()),
            transport,
        )
    }

    async fn wait_until_idle(publisher: &Publisher) {
        let mut state = publisher.subscribe_state();
        loop {
            if publisher.pending_count().await == 0
                && *state.borrow_and_update() == PublisherState::Idle
            {
                return;
            }
            state.changed().await.expect("publisher state channel closed");
        }
    }

    async fn wait_for_state(publisher: &Publisher, target: PublisherState) {
        let mut state = publisher.subscribe_state();
        loop {
            if *state.borrow_and_update() == target {
                return;
            }
            state.changed().await.expect("publisher state channel closed");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_in_enqueue_order() {
        let transport = FakeTransport::always_ok();
        let publisher = publisher(transport.clone());
        publisher.start();

        for user_id in ["u1", "u2", "u3", "u4", "u5"] {
            publisher.add(combination(user_id)).await;
        }
        wait_until_idle(&publisher).await;

        let observed: Vec<String> = transport.calls().into_iter().map(|c| c.user_id).collect();
        assert_eq!(observed, ["u1", "u2", "u3", "u4", "u5"]);
        assert_eq!(publisher.stats().delivered, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_same_head_until_success() {
        // Two failures, then the server accepts it.
        let transport = FakeTransport::with_outcomes(&[false, false, true]);
        let publisher = publisher(transport.clone());
        publisher.add(combination("u1")).await;
        publisher.start();

        wait_until_idle(&publisher).await;

        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        // Every attempt carried the identical payload
        assert!(calls.iter().all(|c| *c == combination("u1")));
        assert_eq!(publisher.pending_count().await, 0);
        assert_eq!(
            publisher.stats(),
            PublisherStats {
                delivered: 1,
                skipped: 0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn state_walks_idle_sending_waiting_sending_idle() {
        let transport = FakeTransport::with_outcomes(&[false, true]);
        let publisher = publisher(transport.clone());

        assert_eq!(publisher.state(), PublisherState::Idle);

        // Enqueue before starting so the first observed transition is the send.
        publisher.add(combination("u1")).await;
        let mut rx = publisher.subscribe_state();
        publisher.start();

        let mut seen = Vec::new();
        loop {
            rx.changed().await.unwrap();
            let state = *rx.borrow_and_update();
            seen.push(state);
            if state == PublisherState::Idle {
                break;
            }
        }

        assert_eq!(
            seen,
            [
                PublisherState::Sending,
                PublisherState::Waiting,
                PublisherState::Sending,
                PublisherState::Idle,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn never_more_than_one_send_in_flight() {
        let transport = FakeTransport::always_ok();
        let publisher = publisher(transport.clone());
        publisher.add(combination("u1")).await;
        publisher.start();

        // Keep feeding records while deliveries are in flight.
        for user_id in ["u2", "u3", "u4", "u5", "u6"] {
            publisher.add(combination(user_id)).await;
        }
        wait_until_idle(&publisher).await;

        assert_eq!(transport.calls().len(), 6);
        assert_eq!(transport.max_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn add_during_retry_wait_does_not_preempt_the_head() {
        let transport = FakeTransport::with_outcomes(&[false, true, true]);
        let publisher = publisher(transport.clone());
        publisher.add(combination("u1")).await;
        publisher.start();

        wait_for_state(&publisher, PublisherState::Waiting).await;
        publisher.add(combination("u2")).await;
        wait_until_idle(&publisher).await;

        // The failed head was retried before the newcomer was touched.
        let observed: Vec<String> = transport.calls().into_iter().map(|c| c.user_id).collect();
        assert_eq!(observed, ["u1", "u1", "u2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_start_makes_no_transport_calls() {
        let transport = FakeTransport::always_ok();
        let publisher = publisher(transport.clone());
        publisher.start();

        sleep(Duration::from_secs(1)).await;

        assert!(transport.calls().is_empty());
        assert_eq!(publisher.pending_count().await, 0);
        assert_eq!(publisher.state(), PublisherState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn resumes_persisted_queue_on_start() {
        let storage = Arc::new(MemoryStorage::new());

        // A previous run left two submissions behind.
        {
            let mut queue = CombinationQueue::load(storage.clone());
            queue.append(combination("u1"));
            queue.append(combination("u2"));
        }

        let transport = FakeTransport::always_ok();
        let publisher = Publisher::new(
            PublisherConfig::default(),
            storage,
            transport.clone(),
        );
        assert_eq!(publisher.pending_count().await, 2);
        publisher.start();
        wait_until_idle(&publisher).await;

        let observed: Vec<String> = transport.calls().into_iter().map(|c| c.user_id).collect();
        assert_eq!(observed, ["u1", "u2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn add_before_start_is_durable() {
        let storage = Arc::new(MemoryStorage::new());
        let transport = FakeTransport::always_ok();
        let publisher = Publisher::new(
            PublisherConfig::default(),
            storage.clone(),
            transport.clone(),
        );

        publisher.add(combination("u1")).await;

        // Durable before any delivery happened
        let raw = storage.get(QUEUE_STORAGE_KEY).unwrap().unwrap();
        let persisted: Vec<Combination> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted, vec![combination("u1")]);
        assert!(transport.calls().is_empty());

        publisher.start();
        wait_until_idle(&publisher).await;
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_policy_advances_past_a_failing_record() {
        let transport = FakeTransport::with_outcomes(&[true, false, true]);
        let publisher = Publisher::new(
            PublisherConfig {
                retry_on_failure: false,
                ..PublisherConfig::default()
            },
            Arc::new(MemoryStorage::new()),
            transport.clone(),
        );
        publisher.start();

        for user_id in ["u1", "u2", "u3"] {
            publisher.add(combination(user_id)).await;
        }
        wait_until_idle(&publisher).await;

        // Exactly one attempt per record: u2 failed and was not retried.
        let observed: Vec<String> = transport.calls().into_iter().map(|c| c.user_id).collect();
        assert_eq!(observed, ["u1", "u2", "u3"]);
        assert_eq!(
            publisher.stats(),
            PublisherStats {
                delivered: 2,
                skipped: 1
            }
        );
    }

    #[tokio::test(start_paused = true)]
    #[should_panic(expected = "Publisher already started")]
    async fn start_twice_panics() {
        let publisher = publisher(FakeTransport::always_ok());
        publisher.start();
        publisher.start();
    }

    #[test]
    fn config_default_matches_observed_kiosk_behavior() {
        let config = PublisherConfig::default();
        assert_eq!(config.retry_delay, Duration::from_millis(3000));
        assert!(config.retry_on_failure);
    }
}
