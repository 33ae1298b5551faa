use super::{
    ingress::{Mailbox, Message},
    metrics::Metrics,
    Config, Delivery, Error,
};
use crate::{
    pipe::{self, Event, Writer},
    Balancer, Frame,
};
use commonware_macros::select;
use commonware_runtime::{Handle, Metrics as RuntimeMetrics, Spawner};
use futures::{channel::mpsc, StreamExt};
use tracing::{debug, info, warn};

/// Input received by the [Actor] on one of its channels.
enum Input<F> {
    Event(Option<Event>),
    Message(Option<Message<F>>),
}

/// Owner of a [Balancer] over in-memory pipes.
///
/// All calls into the [Balancer] are made from the actor's task: requests arrive through the
/// [Mailbox] and readiness changes arrive as [Event]s from the pipes themselves.
pub struct Actor<E: Spawner + RuntimeMetrics, F: Frame + Clone + Send + 'static> {
    context: E,

    pipe: pipe::Config,
    next_id: u64,
    balancer: Balancer<Writer<F>>,

    mailbox: mpsc::Receiver<Message<F>>,
    events: mpsc::UnboundedReceiver<Event>,
    events_sender: mpsc::UnboundedSender<Event>,

    metrics: Metrics,
}

impl<E: Spawner + RuntimeMetrics, F: Frame + Clone + Send + 'static> Actor<E, F> {
    pub fn new(context: E, cfg: Config) -> (Self, Mailbox<F>) {
        let metrics = Metrics::init(context.clone());
        let (sender, mailbox) = mpsc::channel(cfg.mailbox_size);
        let (events_sender, events) = mpsc::unbounded();
        (
            Self {
                context,
                pipe: cfg.pipe,
                next_id: 0,
                balancer: Balancer::new(),
                mailbox,
                events,
                events_sender,
                metrics,
            },
            Mailbox::new(sender),
        )
    }

    pub fn start(mut self) -> Handle<()> {
        self.context.spawn_ref()(self.run())
    }

    async fn run(mut self) {
        info!("socket started");
        loop {
            // Pipe events are applied before any request that arrived at the same time
            let input = select! {
                event = self.events.next() => {
                    Input::Event(event)
                },
                message = self.mailbox.next() => {
                    Input::Message(message)
                },
            };
            match input {
                Input::Event(Some(event)) => self.handle_event(event),
                Input::Event(None) => unreachable!("event sender is held by the actor"),
                Input::Message(Some(message)) => self.handle_message(message),
                Input::Message(None) => break,
            }
            self.update_gauges();
        }
        info!(pipes = self.balancer.len(), "socket shutdown");
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Activated(id) => {
                if !self.balancer.contains(&id) || self.balancer.is_active(&id) {
                    return;
                }
                self.balancer.activated(&id);
                debug!(id, "pipe reactivated");
            }
            Event::Terminated(id) => {
                // The pipe may have already been detached
                if !self.balancer.contains(&id) {
                    return;
                }
                self.balancer.terminated(&id);
                debug!(id, "pipe closed by reader");
            }
        }
    }

    fn handle_message(&mut self, message: Message<F>) {
        match message {
            Message::Connect { responder } => {
                let id = self.next_id;
                self.next_id += 1;
                let (writer, reader) =
                    pipe::channel(id, &self.pipe, self.events_sender.clone());
                self.balancer.attach(writer);
                debug!(id, "pipe attached");

                // If the requester went away, dropping the reader terminates the pipe
                let _ = responder.send(reader);
            }
            Message::Detach { id, responder } => {
                let detached = self.balancer.contains(&id);
                if detached {
                    drop(self.balancer.terminated(&id));
                    debug!(id, "pipe detached");
                }
                let _ = responder.send(detached);
            }
            Message::Send {
                mut frame,
                responder,
            } => {
                let result = match self.balancer.send(&mut frame) {
                    Ok(Some(id)) => {
                        self.metrics.frames_sent.inc();
                        Ok(Delivery::Sent(id))
                    }
                    Ok(None) => {
                        self.metrics.frames_dropped.inc();
                        Ok(Delivery::Dropped)
                    }
                    Err(crate::Error::WouldBlock) => {
                        self.metrics.would_block.inc();
                        Err(Error::WouldBlock(frame))
                    }
                    Err(crate::Error::Frame(err)) => {
                        warn!(?err, "failed to reset frame");
                        Err(Error::Frame(err))
                    }
                };
                let _ = responder.send(result);
            }
            Message::HasOut { responder } => {
                let _ = responder.send(self.balancer.has_out());
            }
        }
    }

    fn update_gauges(&self) {
        self.metrics.pipes.set(self.balancer.len() as i64);
        self.metrics.active_pipes.set(self.balancer.active() as i64);
    }
}
