//! The consumer loop.
//!
//! Deliveries are handled concurrently up to a fixed limit. Each one is
//! acknowledged only after its handler returned a result that should not
//! be retried; anything else is dropped unacknowledged and the broker
//! redelivers it after the ack wait.

use std::future::Future;

use futures::{Stream, StreamExt};
use games_catalog::application::projection::{Disposition, apply_message, disposition};
use games_catalog::application::read_store::GameReadStore;
use games_core::error::DomainError;
use games_core::message::InboundDelivery;
use tracing::{debug, error, instrument, warn};

/// Handles one delivery and settles it. Returns what was done with it.
#[instrument(
    skip_all,
    fields(
        subject = %delivery.message().subject,
        correlation_id = %delivery.message().correlation_id,
        attempt = delivery.delivery_attempt(),
    )
)]
pub async fn process_delivery<D: InboundDelivery>(
    delivery: &D,
    read_store: &dyn GameReadStore,
) -> Disposition {
    let result = apply_message(delivery.message(), read_store).await;
    let decision = disposition(&result);
    match (&result, decision) {
        (Ok(outcome), _) => debug!(?outcome, "message handled"),
        (Err(e), Disposition::Complete) => {
            warn!(error = %e, "message cannot be decoded; acknowledging without retry");
        }
        (Err(e), Disposition::Redeliver) => {
            error!(error = %e, "message handling failed; leaving it for redelivery");
        }
    }

    if decision == Disposition::Complete
        && let Err(e) = delivery.complete().await
    {
        // The broker will redeliver; handlers are idempotent.
        warn!(error = %e, "acknowledgement failed");
    }
    decision
}

/// Drains `deliveries` until it ends or `shutdown` resolves.
pub async fn run<S, D>(
    deliveries: S,
    read_store: &dyn GameReadStore,
    max_concurrency: usize,
    shutdown: impl Future<Output = ()>,
) where
    S: Stream<Item = Result<D, DomainError>>,
    D: InboundDelivery,
{
    deliveries
        .take_until(shutdown)
        .for_each_concurrent(max_concurrency.max(1), |item| async move {
            match item {
                Ok(delivery) => {
                    process_delivery(&delivery, read_store).await;
                }
                Err(e) => warn!(error = %e, "receive failed"),
            }
        })
        .await;
}
