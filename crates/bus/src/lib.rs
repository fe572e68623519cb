//! Event bus: a typed topic registry decoupling producers from consumers.
//!
//! Each topic merges any number of producer streams and broadcasts every
//! event to every live subscriber. Publishing under a name that already
//! exists folds the new producer into the running merge instead of
//! replacing it.
//!
//! # Invariants
//! - Delivery happens only inside [`EventBus::pump`]; nothing is delivered
//!   re-entrantly while a producer is emitting.
//! - Within one topic, events from one producer keep their emission order.
//! - Dropping a [`Subscription`] unsubscribes it; the bus prunes it the
//!   next time its topic delivers an event.

use std::any::Any;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};

/// Errors from bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("topic `{topic}` carries {registered}, not {requested}")]
    TopicTypeMismatch {
        topic: &'static str,
        registered: &'static str,
        requested: &'static str,
    },
    #[error("topic `{0}` is no longer pumped by any bus")]
    Closed(&'static str),
}

/// Name and payload type of a topic.
pub struct Topic<T> {
    name: &'static str,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Topic<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _payload: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Topic<T> {}

impl<T> std::fmt::Debug for Topic<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Topic({})", self.name)
    }
}

/// Sending half handed to a producer. Cheap to clone.
#[derive(Debug)]
pub struct Publisher<T> {
    topic: &'static str,
    sender: Sender<T>,
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic,
            sender: self.sender.clone(),
        }
    }
}

impl<T> Publisher<T> {
    /// Queue an event for the next pump.
    pub fn emit(&self, event: T) -> Result<(), BusError> {
        self.sender
            .send(event)
            .map_err(|_| BusError::Closed(self.topic))
    }

    pub fn topic(&self) -> &'static str {
        self.topic
    }
}

/// Receiving half owned by a consumer. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription<T> {
    topic: &'static str,
    receiver: Receiver<T>,
}

impl<T> Subscription<T> {
    /// Next delivered event, if any.
    pub fn try_next(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Take every event delivered so far, in delivery order.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        self.receiver.try_iter()
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    pub fn topic(&self) -> &'static str {
        self.topic
    }

    /// Explicit unsubscribe; equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

/// Type-erased view of a topic's channel so the registry can pump every
/// topic without knowing its payload type.
trait ErasedChannel {
    fn pump(&mut self) -> usize;
    fn payload_type(&self) -> &'static str;
    fn subscriber_count(&self) -> usize;
    fn producer_count(&self) -> usize;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct Channel<T> {
    producers: Vec<Receiver<T>>,
    subscribers: Vec<Sender<T>>,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            producers: Vec::new(),
            subscribers: Vec::new(),
        }
    }
}

impl<T: Clone + 'static> ErasedChannel for Channel<T> {
    fn pump(&mut self) -> usize {
        let mut batch = Vec::new();
        // Drain every producer; forget the ones whose senders are all gone.
        self.producers.retain(|producer| loop {
            match producer.try_recv() {
                Ok(event) => batch.push(event),
                Err(TryRecvError::Empty) => break true,
                Err(TryRecvError::Disconnected) => break false,
            }
        });

        for event in &batch {
            self.subscribers
                .retain(|subscriber| subscriber.send(event.clone()).is_ok());
        }
        batch.len()
    }

    fn payload_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn producer_count(&self) -> usize {
        self.producers.len()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Registry from topic name to its merged channel.
#[derive(Default)]
pub struct EventBus {
    topics: BTreeMap<&'static str, Box<dyn ErasedChannel>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.topics.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold another producer stream into the topic's merge.
    pub fn publish<T: Clone + 'static>(
        &mut self,
        topic: Topic<T>,
        producer: Receiver<T>,
    ) -> Result<(), BusError> {
        self.channel_mut(topic)?.producers.push(producer);
        tracing::trace!(topic = topic.name(), "producer merged");
        Ok(())
    }

    /// Create a fresh producer for the topic and merge it.
    pub fn publisher<T: Clone + 'static>(
        &mut self,
        topic: Topic<T>,
    ) -> Result<Publisher<T>, BusError> {
        let (sender, receiver) = unbounded();
        self.publish(topic, receiver)?;
        Ok(Publisher {
            topic: topic.name(),
            sender,
        })
    }

    /// Receive every event pumped through the topic from now on.
    pub fn subscribe<T: Clone + 'static>(
        &mut self,
        topic: Topic<T>,
    ) -> Result<Subscription<T>, BusError> {
        let (sender, receiver) = unbounded();
        self.channel_mut(topic)?.subscribers.push(sender);
        Ok(Subscription {
            topic: topic.name(),
            receiver,
        })
    }

    /// Move every queued event to the subscribers of its topic.
    /// Returns the number of events moved.
    pub fn pump(&mut self) -> usize {
        let mut moved = 0;
        for (name, channel) in self.topics.iter_mut() {
            let n = channel.pump();
            if n > 0 {
                tracing::trace!(topic = *name, events = n, "pumped");
            }
            moved += n;
        }
        moved
    }

    pub fn subscriber_count(&self, name: &str) -> usize {
        self.topics.get(name).map_or(0, |c| c.subscriber_count())
    }

    pub fn producer_count(&self, name: &str) -> usize {
        self.topics.get(name).map_or(0, |c| c.producer_count())
    }

    pub fn topic_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.topics.keys().copied()
    }

    fn channel_mut<T: Clone + 'static>(
        &mut self,
        topic: Topic<T>,
    ) -> Result<&mut Channel<T>, BusError> {
        let channel = self
            .topics
            .entry(topic.name())
            .or_insert_with(|| Box::new(Channel::<T>::default()));
        let registered = channel.payload_type();
        channel
            .as_any_mut()
            .downcast_mut::<Channel<T>>()
            .ok_or(BusError::TopicTypeMismatch {
                topic: topic.name(),
                registered,
                requested: std::any::type_name::<T>(),
            })
    }
}
