//! A minimal actor runtime.
//!
//! An actor owns a state value and a mailbox. Messages are handled one at a
//! time on a dedicated task, so the state never needs a lock. Long-running
//! work is spawned elsewhere and reports back by sending another message.

use std::error::Error;
use std::fmt::{self, Debug, Display};

use tokio::sync::mpsc;
use tracing::Instrument;

/// Returned when sending to an actor whose task has already ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActorDeadError;

impl Display for ActorDeadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the actor has stopped")
    }
}

impl Error for ActorDeadError {}

/// A message that an actor with state `S` can handle.
pub trait Message<S>: Send + Debug + 'static {
    /// Handles the message with mutable access to the actor's state.
    fn handle(self: Box<Self>, state: &mut S, handle: &Actor<S>);
}

type Mailbox<S> = mpsc::UnboundedSender<Box<dyn Message<S>>>;

/// Handle to an actor.
///
/// The actor keeps running while any handle is alive. Tasks spawned on
/// behalf of the actor should hold a clone, so their results can still be
/// delivered after the owner drops its own handle.
pub struct Actor<S> {
    mailbox: Mailbox<S>,
}

impl<S: Send + 'static> Actor<S> {
    /// Spawns a new actor with the given initial state.
    pub fn spawn(state: S, label: &'static str) -> Self {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let weak_tx = msg_tx.downgrade();
        tokio::spawn(
            run_actor(weak_tx, state, msg_rx)
                .instrument(trace_span!("actor", label = label)),
        );
        Self { mailbox: msg_tx }
    }

    /// Sends a message to the actor.
    #[inline]
    pub fn send<M: Message<S>>(&self, msg: M) -> Result<(), ActorDeadError> {
        self.mailbox.send(Box::new(msg)).map_err(|_| ActorDeadError)
    }
}

impl<S> Clone for Actor<S> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            mailbox: self.mailbox.clone(),
        }
    }
}

async fn run_actor<S: Send + 'static>(
    weak_tx: mpsc::WeakUnboundedSender<Box<dyn Message<S>>>,
    mut state: S,
    mut msg_rx: mpsc::UnboundedReceiver<Box<dyn Message<S>>>,
) {
    debug!("started");
    while let Some(msg) = msg_rx.recv().await {
        trace!("received message: {msg:?}");
        // Buffered messages may outlive every handle.
        let Some(mailbox) = weak_tx.upgrade() else {
            warn!("all handles have been dropped, discard the message");
            break;
        };
        let handle = Actor { mailbox };
        msg.handle(&mut state, &handle);
    }
    debug!("will terminate");
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;

    #[derive(Default)]
    struct Counter {
        value: u32,
    }

    #[derive(Debug)]
    struct Add(u32);

    impl Message<Counter> for Add {
        fn handle(self: Box<Self>, state: &mut Counter, _: &Actor<Counter>) {
            state.value += self.0;
        }
    }

    #[derive(Debug)]
    struct AddLater(u32);

    impl Message<Counter> for AddLater {
        fn handle(self: Box<Self>, _: &mut Counter, handle: &Actor<Counter>) {
            let handle = handle.clone();
            tokio::spawn(async move {
                handle.send(Add(self.0)).ok();
            });
        }
    }

    #[derive(Debug)]
    struct Get(oneshot::Sender<u32>);

    impl Message<Counter> for Get {
        fn handle(self: Box<Self>, state: &mut Counter, _: &Actor<Counter>) {
            self.0.send(state.value).ok();
        }
    }

    #[tokio::test]
    async fn test_send_message() {
        let actor = Actor::spawn(Counter::default(), "counter");
        actor.send(Add(40)).unwrap();
        actor.send(Add(2)).unwrap();

        let (tx, rx) = oneshot::channel();
        actor.send(Get(tx)).unwrap();
        assert_eq!(rx.await.unwrap(), 42);
    }

    #[test]
    fn test_dead_error_display() {
        assert_eq!(ActorDeadError.to_string(), "the actor has stopped");
    }

    #[tokio::test]
    async fn test_message_from_spawned_task() {
        let actor = Actor::spawn(Counter::default(), "counter");
        actor.send(AddLater(7)).unwrap();
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let (tx, rx) = oneshot::channel();
        actor.send(Get(tx)).unwrap();
        assert_eq!(rx.await.unwrap(), 7);
    }
}
