//! A [Frame] backed by reference-counted [Bytes].

use crate::{Frame, FrameError};
use bytes::Bytes;

/// One part of a (possibly multipart) message.
///
/// Cloning a [Part] only increments the reference count of its payload, so a pipe can keep its
/// own copy while the sender resets the original with [Frame::init].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Part {
    payload: Bytes,
    more: bool,
}

impl Part {
    /// Create a new part. `more` indicates that further parts of the same message follow.
    pub fn new(payload: impl Into<Bytes>, more: bool) -> Self {
        Self {
            payload: payload.into(),
            more,
        }
    }

    /// Create the final (or only) part of a message.
    pub fn last(payload: impl Into<Bytes>) -> Self {
        Self::new(payload, false)
    }

    /// Create a part that is followed by more parts of the same message.
    pub fn partial(payload: impl Into<Bytes>) -> Self {
        Self::new(payload, true)
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl Frame for Part {
    fn more(&self) -> bool {
        self.more
    }

    fn close(&mut self) -> Result<(), FrameError> {
        self.payload = Bytes::new();
        Ok(())
    }

    fn init(&mut self) -> Result<(), FrameError> {
        self.payload = Bytes::new();
        self.more = false;
        Ok(())
    }
}
