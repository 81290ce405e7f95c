//! The pub/sub collaborator seam.
//!
//! A [`Transport`] hands out one [`Subscription`] at a time: an ordered,
//! bounded stream of raw payloads for a single topic.

mod channel;
mod mqtt;

use std::future::Future;

use anyhow::Result;
use tokio::sync::mpsc;

pub use channel::{ChannelPublisher, ChannelTransport};
pub use mqtt::MqttTransport;

pub type Payload = Vec<u8>;

pub trait Transport: Send + 'static {
    /// Starts delivery for `topic`. Errors here are transport failures and
    /// are surfaced to the operator as-is.
    fn subscribe(&mut self, topic: &str) -> impl Future<Output = Result<Subscription>> + Send;

    /// Stops delivery. Calling it without an active subscription is a no-op.
    fn unsubscribe(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Payloads for one topic, in arrival order.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    receiver: mpsc::Receiver<Payload>,
}

impl Subscription {
    pub fn new(topic: impl Into<String>, receiver: mpsc::Receiver<Payload>) -> Self {
        Self {
            topic: topic.into(),
            receiver,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next payload, or `None` once the transport has ended the stream.
    pub async fn next(&mut self) -> Option<Payload> {
        self.receiver.recv().await
    }
}
