use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use log::info;
use tokio::sync::mpsc;

use super::{Payload, Subscription, Transport};

type Slot = Arc<Mutex<Option<mpsc::Sender<Payload>>>>;

/// In-process transport. Payloads published while nobody is subscribed are
/// dropped, the way a broker drops QoS 0 messages with no subscriber.
pub struct ChannelTransport {
    slot: Slot,
    capacity: usize,
    topic: Option<String>,
    refusal: Option<String>,
}

/// Producer half of a [`ChannelTransport`].
#[derive(Clone)]
pub struct ChannelPublisher {
    slot: Slot,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> (Self, ChannelPublisher) {
        let slot: Slot = Arc::new(Mutex::new(None));
        let transport = Self {
            slot: Arc::clone(&slot),
            capacity: capacity.max(1),
            topic: None,
            refusal: None,
        };
        (transport, ChannelPublisher { slot })
    }

    /// A transport whose every subscribe attempt fails with `reason`.
    pub fn refusing(reason: impl Into<String>) -> Self {
        let (mut transport, _) = Self::new(1);
        transport.refusal = Some(reason.into());
        transport
    }

    pub fn is_subscribed(&self) -> bool {
        lock(&self.slot).is_some()
    }
}

impl Transport for ChannelTransport {
    async fn subscribe(&mut self, topic: &str) -> Result<Subscription> {
        if let Some(reason) = &self.refusal {
            bail!("subscribe to {topic} refused: {reason}");
        }
        if self.topic.is_some() {
            bail!("already subscribed to {}", self.topic.as_deref().unwrap_or_default());
        }

        let (tx, rx) = mpsc::channel(self.capacity);
        *lock(&self.slot) = Some(tx);
        self.topic = Some(topic.to_string());
        info!("Subscribed to in-process topic {topic}");
        Ok(Subscription::new(topic, rx))
    }

    async fn unsubscribe(&mut self) -> Result<()> {
        lock(&self.slot).take();
        if let Some(topic) = self.topic.take() {
            info!("Unsubscribed from in-process topic {topic}");
        }
        Ok(())
    }
}

impl ChannelPublisher {
    /// Delivers `payload` to the current subscriber. Returns `false` when
    /// there is none.
    pub async fn publish(&self, payload: impl Into<Payload>) -> Result<bool> {
        let Some(sender) = lock(&self.slot).clone() else {
            return Ok(false);
        };
        match sender.send(payload.into()).await {
            Ok(()) => Ok(true),
            Err(_) => Err(anyhow!("subscriber went away mid-publish")),
        }
    }

    /// Ends the stream for the current subscriber.
    pub fn close(&self) {
        lock(&self.slot).take();
    }
}

fn lock(slot: &Slot) -> std::sync::MutexGuard<'_, Option<mpsc::Sender<Payload>>> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_order_while_subscribed() {
        let (mut transport, publisher) = ChannelTransport::new(8);
        assert!(!publisher.publish("dropped").await.unwrap());

        let mut subscription = transport.subscribe("sensors/distance").await.unwrap();
        assert_eq!(subscription.topic(), "sensors/distance");
        assert!(publisher.publish("1,2").await.unwrap());
        assert!(publisher.publish("3,4").await.unwrap());

        assert_eq!(subscription.next().await.as_deref(), Some(&b"1,2"[..]));
        assert_eq!(subscription.next().await.as_deref(), Some(&b"3,4"[..]));

        transport.unsubscribe().await.unwrap();
        assert!(!transport.is_subscribed());
        assert_eq!(subscription.next().await, None);
    }

    #[tokio::test]
    async fn close_ends_the_stream() {
        let (mut transport, publisher) = ChannelTransport::new(1);
        let mut subscription = transport.subscribe("t").await.unwrap();
        publisher.close();
        assert_eq!(subscription.next().await, None);
    }

    #[tokio::test]
    async fn refusing_transport_fails_subscribe() {
        let mut transport = ChannelTransport::refusing("broker unreachable");
        let err = transport.subscribe("t").await.unwrap_err();
        assert!(err.to_string().contains("broker unreachable"));
    }
}
