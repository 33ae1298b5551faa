use super::{Delivery, Error};
use crate::pipe::Reader;
use futures::{
    channel::{mpsc, oneshot},
    SinkExt,
};

/// Messages that can be sent to the socket [Actor](super::Actor).
pub enum Message<F> {
    /// Create a new pipe and attach its writing end.
    Connect {
        responder: oneshot::Sender<Reader<F>>,
    },

    /// Detach a pipe, closing its writing end.
    Detach {
        id: u64,
        responder: oneshot::Sender<bool>,
    },

    /// Send one frame of a message.
    Send {
        frame: F,
        responder: oneshot::Sender<Result<Delivery, Error<F>>>,
    },

    /// Check whether a frame can be sent without blocking.
    HasOut { responder: oneshot::Sender<bool> },
}

/// Handle used to interact with the socket [Actor](super::Actor).
pub struct Mailbox<F> {
    sender: mpsc::Sender<Message<F>>,
}

impl<F> Clone for Mailbox<F> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<F> Mailbox<F> {
    pub(super) fn new(sender: mpsc::Sender<Message<F>>) -> Self {
        Self { sender }
    }

    /// Create a new pipe and return its reading end.
    ///
    /// Dropping the returned [Reader] terminates the pipe.
    pub async fn connect(&mut self) -> Result<Reader<F>, Error<F>> {
        let (responder, receiver) = oneshot::channel();
        self.sender
            .send(Message::Connect { responder })
            .await
            .map_err(|_| Error::Closed)?;
        receiver.await.map_err(|_| Error::Closed)
    }

    /// Detach the pipe with the given id.
    ///
    /// Returns false if the pipe was not attached. Frames already flushed to the pipe can still
    /// be read from its [Reader].
    pub async fn detach(&mut self, id: u64) -> Result<bool, Error<F>> {
        let (responder, receiver) = oneshot::channel();
        self.sender
            .send(Message::Detach { id, responder })
            .await
            .map_err(|_| Error::Closed)?;
        receiver.await.map_err(|_| Error::Closed)
    }

    /// Send one frame of a message.
    ///
    /// If no pipe is writable, the frame is returned in [Error::WouldBlock].
    pub async fn send(&mut self, frame: F) -> Result<Delivery, Error<F>> {
        let (responder, receiver) = oneshot::channel();
        self.sender
            .send(Message::Send { frame, responder })
            .await
            .map_err(|_| Error::Closed)?;
        receiver.await.map_err(|_| Error::Closed)?
    }

    /// Returns true if the next frame can be sent without blocking.
    pub async fn has_out(&mut self) -> Result<bool, Error<F>> {
        let (responder, receiver) = oneshot::channel();
        self.sender
            .send(Message::HasOut { responder })
            .await
            .map_err(|_| Error::Closed)?;
        receiver.await.map_err(|_| Error::Closed)
    }
}
