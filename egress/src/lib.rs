//! Balance outgoing messages across a set of pipes without splitting multipart messages.
//!
//! A socket endpoint is often connected to several peers at once. Each peer is reached through
//! a [Pipe] that accepts whole frames, buffers them, and pushes them downstream on
//! [Pipe::flush]. The [Balancer] sits in front of those pipes and decides which one carries the
//! next outgoing message:
//!
//! - Messages are distributed round-robin across the pipes believed to be writable.
//! - A multipart message (a run of frames where all but the last report [Frame::more]) is
//!   always written to a single pipe. Rotation only happens between messages.
//! - A pipe that rejects the first frame of a message is parked until its owner reports it
//!   writable again (see [Balancer::activated]).
//! - If the pipe carrying an in-flight multipart message terminates, the remaining frames of
//!   that message are discarded and routing resumes with the next message.
//!
//! # Calling Discipline
//!
//! The [Balancer] is not synchronized. Every operation takes `&mut self` and runs to completion
//! without blocking, so it must be driven by the single task that owns the socket. Events
//! produced elsewhere (a peer going away, a pipe draining below its high-water mark) are
//! delivered to that task as messages and applied in order. The [socket] module provides an
//! actor that does exactly this for the in-memory pipes of the [pipe] module.
//!
//! # Status
//!
//! `commonware-egress` is **ALPHA** software and is not yet recommended for production use.
//! Developers should expect breaking changes and occasional instability.

#![doc(
    html_logo_url = "https://commonware.xyz/imgs/rustdoc_logo.svg",
    html_favicon_url = "https://commonware.xyz/favicon.ico"
)]

use std::{fmt::Debug, hash::Hash};
use thiserror::Error;

mod balancer;
pub use balancer::Balancer;
pub mod mocks;
pub mod part;
pub use part::Part;
pub mod pipe;
pub mod socket;

/// Errors that can occur when releasing or resetting a [Frame].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame buffer corrupted")]
    Corrupted,
    #[error("frame buffer exhausted")]
    Exhausted,
}

/// Errors that can occur when sending a [Frame] through a [Balancer].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No pipe is currently able to accept the frame. The frame is left untouched.
    #[error("would block: no writable pipe")]
    WouldBlock,
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

/// One unit of an outgoing message.
pub trait Frame {
    /// Returns true if more frames of the same message follow this one.
    fn more(&self) -> bool;

    /// Release the contents of the frame.
    fn close(&mut self) -> Result<(), FrameError>;

    /// Reset the frame to an empty, final frame (detaching it from any buffer it referenced).
    fn init(&mut self) -> Result<(), FrameError>;
}

/// An outbound delivery endpoint to a single peer.
///
/// # Continuation Frames
///
/// Once a pipe has accepted the first frame of a message, it must accept every remaining frame
/// of that message (even if it has since become full or its peer has gone away). The
/// [Balancer] treats a rejected continuation frame as a broken contract and panics.
pub trait Pipe {
    /// Identifier used by the owner to refer to the pipe.
    type Id: Clone + Debug + Eq + Hash;

    /// Frame type carried by the pipe.
    type Frame: Frame;

    /// Returns the identifier of the pipe.
    fn id(&self) -> Self::Id;

    /// Attempt to write a frame without blocking.
    ///
    /// Returns true if the frame was accepted (in which case the pipe holds its own reference to
    /// the contents), false if the pipe cannot take another message right now.
    fn write(&mut self, frame: &mut Self::Frame) -> bool;

    /// Push any accepted frames downstream.
    fn flush(&mut self);

    /// Returns true if the pipe can accept another message.
    fn check_write(&self) -> bool;
}
