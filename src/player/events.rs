use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use log::{debug, warn};

use crate::player::value::Avm1Value;
use crate::player::DisplayObjectId;
use crate::swf::avm1::ActionRecord;

/// Work submitted to the script engine from other threads. Everything
/// here executes on the single consumer thread, in submission order.
pub enum PlayerEvent {
    RunActions {
        clip: DisplayObjectId,
        actions: Arc<Vec<ActionRecord>>,
    },
    Goto {
        clip: DisplayObjectId,
        target: Avm1Value,
        play: bool,
    },
    Play(DisplayObjectId),
    Stop(DisplayObjectId),
}

#[derive(Clone)]
pub struct EventSender {
    tx: Sender<PlayerEvent>,
}

impl EventSender {
    pub fn send(&self, event: PlayerEvent) {
        if self.tx.send(event).is_err() {
            warn!("Event dropped, player is gone");
        }
    }
}

/// Single-consumer FIFO feeding the script engine. The first drain pins
/// the consumer thread; draining from anywhere else is a bug and is
/// refused.
pub struct EventQueue {
    tx: Sender<PlayerEvent>,
    rx: Receiver<PlayerEvent>,
    script_thread: Option<ThreadId>,
}

impl EventQueue {
    pub fn new() -> EventQueue {
        let (tx, rx) = channel();
        EventQueue {
            tx,
            rx,
            script_thread: None,
        }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    pub fn is_script_thread(&self) -> bool {
        match self.script_thread {
            Some(id) => id == thread::current().id(),
            None => true,
        }
    }

    /// Takes everything queued so far without blocking.
    pub fn drain(&mut self) -> Vec<PlayerEvent> {
        let current = thread::current().id();
        match self.script_thread {
            None => self.script_thread = Some(current),
            Some(owner) if owner != current => {
                warn!("Event drain refused off the script thread");
                return Vec::new();
            }
            Some(_) => {}
        }
        let mut out = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            out.push(event);
        }
        if !out.is_empty() {
            debug!("Drained {} queued events", out.len());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = EventQueue::new();
        let sender = queue.sender();
        sender.send(PlayerEvent::Play(1));
        sender.send(PlayerEvent::Stop(2));
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], PlayerEvent::Play(1)));
        assert!(matches!(drained[1], PlayerEvent::Stop(2)));
    }

    #[test]
    fn test_drain_pins_consumer_thread() {
        let mut queue = EventQueue::new();
        queue.drain();
        assert!(queue.is_script_thread());
        let sender = queue.sender();
        let handle = thread::spawn(move || {
            sender.send(PlayerEvent::Play(1));
        });
        handle.join().unwrap();
        assert_eq!(queue.drain().len(), 1);
    }

    #[test]
    fn test_drain_refused_off_thread() {
        let mut queue = EventQueue::new();
        queue.drain(); // pin here
        queue.sender().send(PlayerEvent::Play(1));
        let queue = std::sync::Mutex::new(queue);
        let refused = thread::scope(|scope| {
            scope
                .spawn(|| {
                    let mut queue = queue.lock().unwrap();
                    queue.drain().is_empty()
                })
                .join()
                .unwrap()
        });
        assert!(refused);
        assert_eq!(queue.into_inner().unwrap().drain().len(), 1);
    }
}
