//! Drive a [Balancer](crate::Balancer) from a single actor.
//!
//! The [Actor] owns the [Balancer](crate::Balancer) and a set of in-memory pipes (see
//! [pipe](crate::pipe)). Callers interact with it through a cloneable [Mailbox]:
//!
//! - [Mailbox::connect] creates a pipe, attaches its writing end, and returns its
//!   [Reader](crate::pipe::Reader).
//! - [Mailbox::send] sends one frame of a message, returning the pipe that carried it.
//! - [Mailbox::has_out] reports whether the next frame can be sent without blocking.
//! - [Mailbox::detach] removes a pipe.
//!
//! Pipes report readiness changes (drained below their low-water mark, reader dropped) to the
//! actor, which applies them between requests. No request ever waits for a pipe: if none is
//! writable, [Mailbox::send] hands the frame back in [Error::WouldBlock].

use crate::{pipe, FrameError};
use thiserror::Error;

mod actor;
pub use actor::Actor;
mod ingress;
pub use ingress::{Mailbox, Message};
mod metrics;

/// Configuration for the socket [Actor].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Maximum number of requests buffered in the [Mailbox].
    pub mailbox_size: usize,

    /// Configuration used for every pipe created by [Mailbox::connect].
    pub pipe: pipe::Config,
}

/// Outcome of a successful [Mailbox::send].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The frame was accepted by the pipe with the given id.
    Sent(u64),
    /// The frame was discarded because the pipe carrying its message terminated.
    Dropped,
}

/// Errors that can occur when interacting with the socket [Actor].
#[derive(Error, Debug)]
pub enum Error<F> {
    /// No pipe could accept the frame, which is returned untouched.
    #[error("would block")]
    WouldBlock(F),
    #[error("frame error: {0}")]
    Frame(FrameError),
    #[error("socket closed")]
    Closed,
}
