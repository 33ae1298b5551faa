//! Mock implementations for testing.
//!
//! [Pipe] records every frame it accepts and exposes a [Control] handle that can inject faults
//! after the pipe has been handed to a [Balancer](crate::Balancer). [Fragile] is a frame whose
//! release and reset can be made to fail.

use crate::{Frame, FrameError, Part};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct State {
    writable: bool,
    failures: usize,
    more: bool,
    pending: Vec<Part>,
    delivered: Vec<Part>,
    flushes: usize,
}

/// A pipe that never blocks unless told to.
#[derive(Debug)]
pub struct Pipe {
    id: u64,
    state: Arc<Mutex<State>>,
}

/// Handle to observe and manipulate a [Pipe].
#[derive(Clone, Debug)]
pub struct Control {
    id: u64,
    state: Arc<Mutex<State>>,
}

/// Create a writable mock pipe with the given id.
pub fn pipe(id: u64) -> (Pipe, Control) {
    let state = Arc::new(Mutex::new(State {
        writable: true,
        failures: 0,
        more: false,
        pending: Vec::new(),
        delivered: Vec::new(),
        flushes: 0,
    }));
    (
        Pipe {
            id,
            state: state.clone(),
        },
        Control { id, state },
    )
}

impl crate::Pipe for Pipe {
    type Id = u64;
    type Frame = Part;

    fn id(&self) -> u64 {
        self.id
    }

    fn write(&mut self, frame: &mut Part) -> bool {
        let mut state = self.state.lock().unwrap();

        // Injected failures apply to any frame (including continuations)
        if state.failures > 0 {
            state.failures -= 1;
            return false;
        }

        // Only the first frame of a message may be rejected
        if !state.more && !state.writable {
            return false;
        }
        state.more = frame.more();
        state.pending.push(frame.clone());
        true
    }

    fn flush(&mut self) {
        let mut state = self.state.lock().unwrap();
        let pending = std::mem::take(&mut state.pending);
        state.delivered.extend(pending);
        state.flushes += 1;
    }

    fn check_write(&self) -> bool {
        self.state.lock().unwrap().writable
    }
}

impl Control {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Set whether the pipe accepts new messages.
    pub fn set_writable(&self, writable: bool) {
        self.state.lock().unwrap().writable = writable;
    }

    /// Reject the next `n` writes, regardless of whether they start a message.
    pub fn fail_writes(&self, n: usize) {
        self.state.lock().unwrap().failures = n;
    }

    /// Frames that have been written but not yet flushed.
    pub fn pending(&self) -> Vec<Part> {
        self.state.lock().unwrap().pending.clone()
    }

    /// Frames that have been flushed downstream.
    pub fn delivered(&self) -> Vec<Part> {
        self.state.lock().unwrap().delivered.clone()
    }

    /// Payloads of all frames accepted so far (delivered first, then pending).
    pub fn received(&self) -> Vec<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state
            .delivered
            .iter()
            .chain(state.pending.iter())
            .map(|part| part.payload().to_vec())
            .collect()
    }

    /// Number of times the pipe was flushed.
    pub fn flushes(&self) -> usize {
        self.state.lock().unwrap().flushes
    }
}

/// A frame that fails to release or reset on demand.
///
/// Each injected error is returned once, then the operation succeeds again.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fragile {
    pub tag: u32,
    pub more: bool,
    pub close: Option<FrameError>,
    pub init: Option<FrameError>,
}

impl Fragile {
    pub fn new(tag: u32, more: bool) -> Self {
        Self {
            tag,
            more,
            ..Default::default()
        }
    }
}

impl Frame for Fragile {
    fn more(&self) -> bool {
        self.more
    }

    fn close(&mut self) -> Result<(), FrameError> {
        match self.close.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn init(&mut self) -> Result<(), FrameError> {
        if let Some(err) = self.init.take() {
            return Err(err);
        }
        self.tag = 0;
        self.more = false;
        Ok(())
    }
}
