use crate::{Error, Frame, Pipe};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Round-robin distribution of outgoing messages across a set of [Pipe]s.
///
/// Pipes are stored in a single vector partitioned in place: `pipes[..active]` are believed to
/// be writable and `pipes[active..]` are blocked (or waiting to be confirmed writable). Moving a
/// pipe between the two partitions is a swap with the element at the boundary, so every
/// operation except [Balancer::send] and [Balancer::has_out] (which may park several pipes) is
/// O(1).
///
/// The `current` cursor always points into the active partition (when it is non-empty) and
/// identifies the pipe that receives the next frame. It only advances once a message is
/// complete, so all frames of a multipart message reach the same pipe.
pub struct Balancer<P: Pipe> {
    pipes: Vec<P>,
    positions: HashMap<P::Id, usize>,

    active: usize,
    current: usize,

    /// The last frame sent declared that more frames of the same message follow.
    more: bool,

    /// The pipe carrying the in-flight message terminated, so the rest of it is discarded.
    dropping: bool,
}

impl<P: Pipe> Default for Balancer<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Pipe> Balancer<P> {
    /// Create a balancer with no pipes.
    pub fn new() -> Self {
        Self {
            pipes: Vec::new(),
            positions: HashMap::new(),
            active: 0,
            current: 0,
            more: false,
            dropping: false,
        }
    }

    /// Add a pipe and immediately treat it as writable.
    ///
    /// # Panics
    ///
    /// Panics if a pipe with the same id is already attached.
    pub fn attach(&mut self, pipe: P) {
        let id = pipe.id();
        let index = self.pipes.len();
        if self.positions.insert(id.clone(), index).is_some() {
            panic!("duplicate pipe attached: {id:?}");
        }
        self.pipes.push(pipe);
        self.activated(&id);
    }

    /// Move a blocked pipe back into the active partition.
    ///
    /// Called by the owner when a pipe that previously refused a message reports that it can
    /// accept writes again.
    ///
    /// # Panics
    ///
    /// Panics if the pipe is not attached or is already active.
    pub fn activated(&mut self, id: &P::Id) {
        let index = self.index(id);
        assert!(index >= self.active, "pipe already active: {id:?}");
        self.swap(index, self.active);
        self.active += 1;
        trace!(?id, active = self.active, "pipe activated");
    }

    /// Remove a pipe permanently and return it to the owner.
    ///
    /// If the pipe was carrying a multipart message, the remaining frames of that message are
    /// discarded by subsequent calls to [Balancer::send].
    ///
    /// # Panics
    ///
    /// Panics if the pipe is not attached.
    pub fn terminated(&mut self, id: &P::Id) -> P {
        let mut index = self.index(id);

        // The in-flight message lost its destination
        if index == self.current && self.more {
            self.dropping = true;
            debug!(?id, "pipe terminated mid-message");
        }

        // Shrink the active partition (moving the pipe to its boundary)
        if index < self.active {
            self.active -= 1;
            self.swap(index, self.active);

            // If the cursor pointed at the boundary pipe, that pipe now occupies the vacated slot
            // (unless it was the terminated pipe itself, in which case we wrap around).
            if self.current == self.active {
                self.current = if index == self.active { 0 } else { index };
            }
            index = self.active;
        }

        // Fill the vacated slot with the last (inactive) pipe
        self.positions.remove(id);
        let pipe = self.pipes.swap_remove(index);
        if let Some(moved) = self.pipes.get(index) {
            self.positions.insert(moved.id(), index);
        }
        debug!(?id, active = self.active, total = self.pipes.len(), "pipe terminated");
        pipe
    }

    /// Send one frame of a message.
    ///
    /// Returns the id of the pipe that accepted the frame, or `None` if the frame was discarded
    /// because the pipe carrying its message terminated. On success, the frame is reset to an
    /// empty frame (the pipe holds the contents).
    ///
    /// If no pipe can accept the frame, returns [Error::WouldBlock] and leaves the frame
    /// untouched so that it can be sent again later.
    ///
    /// # Panics
    ///
    /// Panics if a pipe rejects a frame after accepting an earlier frame of the same message.
    pub fn send(&mut self, frame: &mut P::Frame) -> Result<Option<P::Id>, Error> {
        // Drop the frame if required (switching back to routing at the end of the message)
        if self.dropping {
            self.more = frame.more();
            self.dropping = self.more;
            frame.close()?;
            frame.init()?;
            trace!(more = self.more, "dropped frame");
            return Ok(None);
        }

        while self.active > 0 {
            if self.pipes[self.current].write(frame) {
                break;
            }
            assert!(
                !self.more,
                "pipe rejected continuation frame: {:?}",
                self.pipes[self.current].id()
            );
            self.deactivate_current();
        }

        // If there are no pipes, we cannot send the frame
        if self.active == 0 {
            return Err(Error::WouldBlock);
        }

        // If this is the final frame of the message, flush it downstream and advance
        // to the next pipe
        let pipe = &mut self.pipes[self.current];
        let id = pipe.id();
        self.more = frame.more();
        if !self.more {
            pipe.flush();
            self.current = (self.current + 1) % self.active;
            trace!(?id, next = self.current, "message complete");
        }

        // Detach the frame from its contents
        frame.init()?;
        Ok(Some(id))
    }

    /// Returns true if the next frame can be sent without blocking.
    ///
    /// Pipes found to be full are moved to the blocked partition along the way.
    pub fn has_out(&mut self) -> bool {
        // Once part of a message was written, the rest is always accepted
        if self.more {
            return true;
        }

        while self.active > 0 {
            if self.pipes[self.current].check_write() {
                return true;
            }
            self.deactivate_current();
        }
        false
    }

    /// Returns the number of attached pipes.
    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    /// Returns true if no pipes are attached.
    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    /// Returns the number of pipes believed to be writable.
    pub fn active(&self) -> usize {
        self.active
    }

    /// Returns true if the pipe is attached.
    pub fn contains(&self, id: &P::Id) -> bool {
        self.positions.contains_key(id)
    }

    /// Returns true if the pipe is attached and believed to be writable.
    pub fn is_active(&self, id: &P::Id) -> bool {
        self.positions
            .get(id)
            .is_some_and(|index| *index < self.active)
    }

    /// Returns true if a multipart message is partially sent.
    pub fn in_message(&self) -> bool {
        self.more
    }

    /// Returns true if the remaining frames of the current message are being discarded.
    pub fn is_dropping(&self) -> bool {
        self.dropping
    }

    /// Returns the attached pipe with the given id.
    pub fn get(&self, id: &P::Id) -> Option<&P> {
        self.positions.get(id).map(|index| &self.pipes[*index])
    }

    /// Iterate over all attached pipes (active pipes first).
    pub fn iter(&self) -> impl Iterator<Item = &P> {
        self.pipes.iter()
    }

    fn index(&self, id: &P::Id) -> usize {
        match self.positions.get(id) {
            Some(index) => *index,
            None => panic!("unknown pipe: {id:?}"),
        }
    }

    /// Move the pipe at the cursor to the blocked partition.
    fn deactivate_current(&mut self) {
        self.active -= 1;
        self.swap(self.current, self.active);
        debug!(
            id = ?self.pipes[self.active].id(),
            active = self.active,
            "pipe deactivated"
        );
        if self.current == self.active {
            self.current = 0;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.pipes.swap(a, b);
        self.positions.insert(self.pipes[a].id(), a);
        self.positions.insert(self.pipes[b].id(), b);
    }
}
