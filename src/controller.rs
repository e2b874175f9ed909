//! Turn-taking for one chat screen.
//!
//! The controller owns the [`Session`] and a single worker task. Each
//! accepted user turn is queued with the instant its reply is due; the worker
//! sleeps until then, appends the bot turn and publishes a new revision on a
//! `watch` channel that the view listens to. Replies therefore come back in
//! submission order even when turns overlap, and aborting the worker is
//! enough to guarantee nothing lands in a discarded conversation.

use crate::config::ChatConfig;
use crate::session::{PendingReply, Session, SessionSnapshot};
use crate::types::EncodedImage;
use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

type ReplyRng = Box<dyn RngCore + Send>;

struct QueuedReply {
    pending: PendingReply,
    due: Instant,
}

/// State shared with the worker task.
struct Shared {
    session: Mutex<Session>,
    revision: watch::Sender<u64>,
}

impl Shared {
    /// Runs `f` under the lock. A new revision is published only when `f`
    /// returns `Some`, i.e. when it changed the session.
    fn update<T>(&self, f: impl FnOnce(&mut Session) -> Option<T>) -> Option<T> {
        let result = {
            let mut session = self.session.lock().expect("chat session poisoned");
            f(&mut session)
        };
        if result.is_some() {
            self.revision.send_modify(|rev| *rev += 1);
        }
        result
    }

    fn read<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        let session = self.session.lock().expect("chat session poisoned");
        f(&session)
    }
}

struct Inner {
    shared: Arc<Shared>,
    queue: Mutex<Option<mpsc::UnboundedSender<QueuedReply>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    reply_delay: Duration,
}

impl Inner {
    fn shutdown(&self) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.take();
        }
        if let Ok(mut worker) = self.worker.lock()
            && let Some(handle) = worker.take()
        {
            handle.abort();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Cheap to clone; every clone drives the same conversation. The worker is
/// aborted by [`SessionController::close`] or when the last clone drops.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl PartialEq for SessionController {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl SessionController {
    /// Must be called from within a tokio runtime.
    pub fn new(config: &ChatConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: &ChatConfig, rng: impl RngCore + Send + 'static) -> Self {
        let (revision, _) = watch::channel(0u64);
        let shared = Arc::new(Shared {
            session: Mutex::new(Session::new()),
            revision,
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(reply_worker(shared.clone(), rx, Box::new(rng)));

        Self {
            inner: Arc::new(Inner {
                shared,
                queue: Mutex::new(Some(tx)),
                worker: Mutex::new(Some(worker)),
                reply_delay: config.reply_delay,
            }),
        }
    }

    /// Appends the user turn now and schedules the reply. Returns `false` when
    /// nothing was sent (blank input, or the session is closed).
    pub fn submit_user_turn(&self, text: &str, image: Option<EncodedImage>) -> bool {
        let Some(pending) = self.inner.shared.update(|s| s.submit_user_turn(text, image)) else {
            return false;
        };
        tracing::debug!(turn = %pending.trigger, has_image = pending.has_image, "user turn accepted");

        let queued = QueuedReply {
            pending,
            due: Instant::now() + self.inner.reply_delay,
        };
        let sent = self
            .inner
            .queue
            .lock()
            .expect("reply queue poisoned")
            .as_ref()
            .map(|tx| tx.send(queued).is_ok())
            .unwrap_or(false);
        if !sent {
            tracing::warn!("reply worker is gone; closing chat session");
            self.close();
        }
        sent
    }

    pub fn open_camera(&self) {
        self.inner
            .shared
            .update(|s| s.set_camera_open(true).then_some(()));
    }

    pub fn close_camera(&self) {
        self.inner
            .shared
            .update(|s| s.set_camera_open(false).then_some(()));
    }

    /// A confirmed photo: hide the camera and send it as an uncaptioned turn.
    pub fn handle_capture(&self, image: EncodedImage) -> bool {
        self.close_camera();
        self.submit_user_turn("", Some(image))
    }

    /// Cancels any reply still pending and rejects further turns.
    pub fn close(&self) {
        self.inner.shutdown();
        let closed_now = self
            .inner
            .shared
            .update(|s| (!s.is_closed()).then(|| s.close()));
        if closed_now.is_some() {
            tracing::info!("chat session closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shared.read(Session::is_closed)
    }

    pub fn is_typing(&self) -> bool {
        self.inner.shared.read(Session::is_typing)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.shared.read(Session::snapshot)
    }

    /// Revision counter bumped on every change to the conversation. Calls
    /// that change nothing (blank turns, repeated closes) publish nothing.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.shared.revision.subscribe()
    }
}

async fn reply_worker(
    shared: Arc<Shared>,
    mut queue: mpsc::UnboundedReceiver<QueuedReply>,
    mut rng: ReplyRng,
) {
    while let Some(QueuedReply { pending, due }) = queue.recv().await {
        tokio::time::sleep_until(due).await;
        let trigger = pending.trigger;
        let delivered = shared.update(|s| s.deliver_reply(pending, &mut rng).map(|_| ()));
        if delivered.is_some() {
            tracing::debug!(turn = %trigger, "bot reply delivered");
        }
    }
}
