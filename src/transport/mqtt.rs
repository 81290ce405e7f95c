use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::{sync::mpsc, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::settings::BrokerSettings;

use super::{Payload, Subscription, Transport};

const REQUEST_CAPACITY: usize = 10;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// MQTT client over rumqttc. Reconnects are left to rumqttc's event loop;
/// the subscription is re-issued after every reconnect.
pub struct MqttTransport {
    settings: BrokerSettings,
    link: Option<MqttLink>,
}

struct MqttLink {
    client: AsyncClient,
    topic: String,
    cancel_token: CancellationToken,
    pump: JoinHandle<()>,
}

impl MqttTransport {
    pub fn new(settings: BrokerSettings) -> Self {
        Self {
            settings,
            link: None,
        }
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            self.settings.client_id.clone(),
            self.settings.host.clone(),
            self.settings.port,
        );
        options.set_keep_alive(Duration::from_secs(self.settings.keep_alive_secs));
        options
    }
}

impl Transport for MqttTransport {
    async fn subscribe(&mut self, topic: &str) -> Result<Subscription> {
        if let Some(link) = &self.link {
            bail!("already subscribed to {}", link.topic);
        }

        let broker = format!("{}:{}", self.settings.host, self.settings.port);
        info!("Connecting to MQTT broker at {broker}");

        let (client, mut eventloop) = AsyncClient::new(self.options(), REQUEST_CAPACITY);
        let connect_timeout = Duration::from_secs(self.settings.connect_timeout_secs);
        match time::timeout(connect_timeout, wait_for_connack(&mut eventloop)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err.context(format!("failed to connect to {broker}"))),
            Err(_) => bail!(
                "timed out after {}s connecting to {broker}",
                self.settings.connect_timeout_secs
            ),
        }

        client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .with_context(|| format!("failed to subscribe to {topic}"))?;

        let (tx, rx) = mpsc::channel(self.settings.channel_capacity);
        let cancel_token = CancellationToken::new();
        let pump = tokio::spawn(pump_events(
            eventloop,
            client.clone(),
            topic.to_string(),
            tx,
            cancel_token.clone(),
        ));

        info!("Subscribed to {topic} on {broker}");
        self.link = Some(MqttLink {
            client,
            topic: topic.to_string(),
            cancel_token,
            pump,
        });
        Ok(Subscription::new(topic, rx))
    }

    async fn unsubscribe(&mut self) -> Result<()> {
        let Some(mut link) = self.link.take() else {
            return Ok(());
        };

        if let Err(err) = link.client.unsubscribe(link.topic.clone()).await {
            warn!("MQTT unsubscribe from {} failed: {err}", link.topic);
        }
        if let Err(err) = link.client.disconnect().await {
            warn!("MQTT disconnect failed: {err}");
        }

        // Let the event loop flush UNSUBSCRIBE/DISCONNECT, then force it down.
        if time::timeout(DISCONNECT_GRACE, &mut link.pump).await.is_err() {
            link.cancel_token.cancel();
            if let Err(err) = link.pump.await {
                warn!("MQTT event loop task failed to join: {err}");
            }
        }

        info!("Unsubscribed from {}", link.topic);
        Ok(())
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        if let Some(link) = &self.link {
            link.cancel_token.cancel();
        }
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<()> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
            Ok(_) => {}
            Err(err) => return Err(anyhow!(err)),
        }
    }
}

async fn pump_events(
    mut eventloop: EventLoop,
    client: AsyncClient,
    topic: String,
    tx: mpsc::Sender<Payload>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if publish.topic != topic {
                        continue;
                    }
                    if tx.send(publish.payload.to_vec()).await.is_err() {
                        debug!("dropping payload on {topic}: ingestion has stopped");
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    // Clean sessions lose their subscriptions across reconnects.
                    info!("Reconnected to MQTT broker; resubscribing to {topic}");
                    if let Err(err) = client.try_subscribe(topic.clone(), QoS::AtMostOnce) {
                        warn!("failed to resubscribe to {topic}: {err}");
                    }
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(_) => {}
                Err(err) => {
                    warn!("MQTT connection error: {err}; retrying in {}s", RECONNECT_DELAY.as_secs());
                    time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
    debug!("MQTT event loop for {topic} stopped");
}
