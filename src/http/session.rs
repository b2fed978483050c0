//! Session table for the HTTP transport
//!
//! Each session owns its protocol state and an outbox. Notifications for a
//! session go straight to its event stream when one is open and wait in a
//! bounded queue otherwise. The queue drops its oldest entry when full.

use {
    crate::{
        error::{McpError, McpResult},
        framework::notification::NotificationSink,
        limits::ResourceLimits,
        logging::{log_notification_dropped, log_session_closed, log_session_created},
        peer::PeerState,
    },
    dashmap::{mapref::entry::Entry, DashMap},
    rand::{distr::Alphanumeric, Rng},
    serde_json::Value,
    std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex, Weak,
        },
        time::{Duration, Instant},
    },
    tokio::{sync::mpsc, task::JoinHandle},
    tracing::debug,
};

pub(crate) fn generate_session_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[derive(Default)]
struct Outbox {
    pending: VecDeque<Value>,
    stream: Option<mpsc::UnboundedSender<Value>>,
}

impl Outbox {
    fn stream_open(&self) -> bool {
        self.stream.as_ref().is_some_and(|sender| !sender.is_closed())
    }
}

pub struct Session {
    id: String,
    peer: PeerState,
    outbox: Mutex<Outbox>,
    last_seen: Mutex<Instant>,
    queue_capacity: usize,
}

impl Session {
    fn new(id: String, queue_capacity: usize) -> Self {
        Self {
            peer: PeerState::new(Some(id.clone())),
            id,
            outbox: Mutex::new(Outbox::default()),
            last_seen: Mutex::new(Instant::now()),
            queue_capacity,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn peer(&self) -> &PeerState {
        &self.peer
    }

    pub fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .elapsed()
    }

    pub fn has_open_stream(&self) -> bool {
        self.outbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .stream_open()
    }

    pub fn pending_count(&self) -> usize {
        self.outbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pending
            .len()
    }

    /// Queue or deliver one notification, preserving emission order.
    pub fn push(&self, envelope: Value) {
        let mut outbox = self.outbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut stream_closed = false;
        let envelope = match &outbox.stream {
            Some(stream) => match stream.send(envelope) {
                Ok(()) => return,
                Err(returned) => {
                    stream_closed = true;
                    returned.0
                }
            },
            None => envelope,
        };
        if stream_closed {
            debug!(session_id = %self.id, "Event stream closed, queueing");
            outbox.stream = None;
        }
        if self.queue_capacity == 0 {
            log_notification_dropped(&self.id, self.queue_capacity);
            return;
        }
        if outbox.pending.len() >= self.queue_capacity {
            outbox.pending.pop_front();
            log_notification_dropped(&self.id, self.queue_capacity);
        }
        outbox.pending.push_back(envelope);
    }

    /// Open the session's event stream, flushing anything queued first.
    ///
    /// Only one stream may be open at a time.
    pub fn open_stream(&self) -> McpResult<mpsc::UnboundedReceiver<Value>> {
        let mut outbox = self.outbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if outbox.stream_open() {
            return Err(McpError::StreamAlreadyOpen(self.id.clone()));
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        for envelope in outbox.pending.drain(..) {
            // The receiver is alive in this scope, so sending cannot fail
            let _ = sender.send(envelope);
        }
        outbox.stream = Some(sender);
        self.touch();
        Ok(receiver)
    }
}

/// All live sessions, keyed by id
pub struct SessionTable {
    sessions: DashMap<String, Arc<Session>>,
    // Slots reserved before insertion, so concurrent creates respect the cap
    live: AtomicUsize,
    limits: ResourceLimits,
}

impl SessionTable {
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            sessions: DashMap::new(),
            live: AtomicUsize::new(0),
            limits,
        }
    }

    fn reserve_slot(&self) -> McpResult<()> {
        let max = self.limits.max_sessions.unwrap_or(usize::MAX);
        self.live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                (live < max).then_some(live + 1)
            })
            .map(|_| ())
            .map_err(|_| McpError::TooManySessions(max))
    }

    fn release_slots(&self, count: usize) {
        if count > 0 {
            self.live.fetch_sub(count, Ordering::AcqRel);
        }
    }

    pub fn create(&self) -> McpResult<Arc<Session>> {
        self.reserve_slot()?;
        loop {
            let id = generate_session_id();
            if let Entry::Vacant(slot) = self.sessions.entry(id.clone()) {
                let session = Arc::new(Session::new(id.clone(), self.limits.notification_queue_capacity));
                slot.insert(session.clone());
                log_session_created(&id);
                return Ok(session);
            }
        }
    }

    /// Look up a session and mark it active
    pub fn get(&self, id: &str) -> McpResult<Arc<Session>> {
        let session = self
            .sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| McpError::UnknownSession(id.to_string()))?;
        session.touch();
        Ok(session)
    }

    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            self.release_slots(1);
            log_session_closed(id, "client_disconnect");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle longer than `timeout`. Sessions with an open
    /// stream are kept. Returns how many were removed.
    pub fn reap_idle(&self, timeout: Duration) -> usize {
        let mut reaped = 0;
        self.sessions.retain(|id, session| {
            let keep = session.has_open_stream() || session.idle_for() < timeout;
            if !keep {
                reaped += 1;
                log_session_closed(id, "idle_timeout");
            }
            keep
        });
        self.release_slots(reaped);
        reaped
    }

    /// Periodically reap idle sessions until the table is dropped.
    pub fn spawn_reaper(self: &Arc<Self>, timeout: Duration) -> JoinHandle<()> {
        let table: Weak<Self> = Arc::downgrade(self);
        let period = (timeout / 2).max(Duration::from_millis(100));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(table) = table.upgrade() else {
                    break;
                };
                let reaped = table.reap_idle(timeout);
                if reaped > 0 {
                    debug!(reaped, "Reaped idle sessions");
                }
            }
        })
    }
}

impl NotificationSink for SessionTable {
    fn deliver(&self, target: Option<&str>, envelope: Value) {
        match target {
            Some(id) => match self.sessions.get(id) {
                Some(session) => session.push(envelope),
                None => debug!(session_id = %id, "Notification for unknown session dropped"),
            },
            None => {
                for session in self.sessions.iter() {
                    if session.has_open_stream() {
                        session.push(envelope.clone());
                    }
                }
            }
        }
    }
}
