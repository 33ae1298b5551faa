//! In-memory pipes with a high-water mark.
//!
//! A pipe is created with [channel] and consists of a [Writer] (implementing [Pipe], to be
//! attached to a [Balancer](crate::Balancer)) and a [Reader] (handed to whoever consumes the
//! messages). Frames written to the [Writer] become visible to the [Reader] only once flushed.
//!
//! The number of complete messages written but not yet read is bounded by
//! [Config::high_water_mark]. Once the [Writer] reports that it is full, the [Reader] emits
//! [Event::Activated] as soon as the backlog drains to the low-water mark. Dropping the
//! [Reader] emits [Event::Terminated]. Both events are delivered over the channel provided to
//! [channel] so that the owner of the [Balancer](crate::Balancer) can apply them in order.

use crate::{Frame, Pipe};
use futures::{channel::mpsc, StreamExt};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Configuration for a pipe.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Maximum number of complete messages that can be written but not yet read.
    ///
    /// A value of `0` disables the limit.
    pub high_water_mark: usize,
}

impl Config {
    /// Backlog at (or below) which a full writer is reported writable again.
    pub fn low_water_mark(&self) -> usize {
        self.high_water_mark.div_ceil(2)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            high_water_mark: 1_000,
        }
    }
}

/// Readiness changes emitted by a pipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// The writer was full and can accept messages again.
    Activated(u64),
    /// The reader was dropped.
    Terminated(u64),
}

/// State shared between both ends of a pipe.
struct Shared {
    written: u64,
    read: u64,
    blocked: bool,
    closed: bool,
}

impl Shared {
    fn outstanding(&self) -> u64 {
        self.written - self.read
    }
}

/// Create a new pipe.
pub fn channel<F: Frame>(
    id: u64,
    cfg: &Config,
    events: mpsc::UnboundedSender<Event>,
) -> (Writer<F>, Reader<F>) {
    let (sender, receiver) = mpsc::unbounded();
    let shared = Arc::new(Mutex::new(Shared {
        written: 0,
        read: 0,
        blocked: false,
        closed: false,
    }));
    (
        Writer {
            id,
            high_water_mark: cfg.high_water_mark as u64,
            more: false,
            pending: Vec::new(),
            sender,
            shared: shared.clone(),
        },
        Reader {
            id,
            low_water_mark: cfg.low_water_mark() as u64,
            receiver,
            shared,
            events,
        },
    )
}

/// Writing end of a pipe.
pub struct Writer<F> {
    id: u64,
    high_water_mark: u64,

    more: bool,
    pending: Vec<F>,
    sender: mpsc::UnboundedSender<F>,

    shared: Arc<Mutex<Shared>>,
}

impl<F> Writer<F> {
    fn writable(&self, shared: &mut Shared) -> bool {
        if shared.closed {
            return false;
        }
        if self.high_water_mark > 0 && shared.outstanding() >= self.high_water_mark {
            if !shared.blocked {
                trace!(id = self.id, outstanding = shared.outstanding(), "pipe full");
            }
            shared.blocked = true;
            return false;
        }
        true
    }
}

impl<F: Frame + Clone> Pipe for Writer<F> {
    type Id = u64;
    type Frame = F;

    fn id(&self) -> u64 {
        self.id
    }

    fn write(&mut self, frame: &mut F) -> bool {
        let more = frame.more();
        let closed = {
            let mut shared = self.shared.lock().unwrap();

            // Continuation frames are always accepted
            if !self.more && !self.writable(&mut shared) {
                return false;
            }
            if !more {
                shared.written += 1;
            }
            shared.closed
        };
        self.more = more;

        // Nobody will read the rest of the message
        if closed {
            return true;
        }
        self.pending.push(frame.clone());
        true
    }

    fn flush(&mut self) {
        for frame in self.pending.drain(..) {
            if self.sender.unbounded_send(frame).is_err() {
                break;
            }
        }
    }

    fn check_write(&self) -> bool {
        let mut shared = self.shared.lock().unwrap();
        self.writable(&mut shared)
    }
}

/// Reading end of a pipe.
pub struct Reader<F> {
    id: u64,
    low_water_mark: u64,

    receiver: mpsc::UnboundedReceiver<F>,
    shared: Arc<Mutex<Shared>>,
    events: mpsc::UnboundedSender<Event>,
}

impl<F: Frame> Reader<F> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next flushed frame.
    ///
    /// Returns `None` once the writer has been dropped and all flushed frames were read.
    pub async fn recv(&mut self) -> Option<F> {
        let frame = self.receiver.next().await?;
        self.consumed(&frame);
        Some(frame)
    }

    /// Return the next flushed frame, if one is available.
    pub fn try_recv(&mut self) -> Option<F> {
        let frame = self.receiver.try_recv().ok()?;
        self.consumed(&frame);
        Some(frame)
    }

    fn consumed(&mut self, frame: &F) {
        if frame.more() {
            return;
        }
        let activated = {
            let mut shared = self.shared.lock().unwrap();
            shared.read += 1;
            if shared.blocked && shared.outstanding() <= self.low_water_mark {
                shared.blocked = false;
                true
            } else {
                false
            }
        };
        if activated {
            trace!(id = self.id, "pipe writable");
            let _ = self.events.unbounded_send(Event::Activated(self.id));
        }
    }
}

impl<F> Drop for Reader<F> {
    fn drop(&mut self) {
        self.shared.lock().unwrap().closed = true;
        debug!(id = self.id, "pipe reader closed");
        let _ = self.events.unbounded_send(Event::Terminated(self.id));
    }
}
