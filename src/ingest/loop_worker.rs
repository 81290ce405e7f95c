use anyhow::Result;
use log::info;
use tokio_util::sync::CancellationToken;

use crate::transport::Subscription;

use super::controller::{IngestionController, MessageOutcome};

/// Delivers payloads to `controller` one at a time until cancelled or until
/// the transport ends the stream.
///
/// Returns the controller so the caller can close the log once delivery has
/// provably stopped. A storage failure ends the loop with that error.
pub async fn ingestion_loop(
    mut controller: IngestionController,
    mut subscription: Subscription,
    cancel_token: CancellationToken,
) -> Result<IngestionController> {
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                info!("ingestion loop shutting down");
                break;
            }
            payload = subscription.next() => {
                let Some(payload) = payload else {
                    info!("transport closed the {} stream", subscription.topic());
                    break;
                };
                if let MessageOutcome::StorageFailed(err) = controller.on_message(&payload) {
                    return Err(err.context("session log write failed; aborting session"));
                }
            }
        }
    }

    Ok(controller)
}
