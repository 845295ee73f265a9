// Leave / Advance Use Case
//
// Serving a customer and removing a customer are the same mutation.

use super::MutationOutcome;
use crate::domain::id::is_well_formed_id;
use crate::error::{AppError, Result};
use crate::port::QueueTransaction;
use tracing::debug;

/// Remove a customer from a provider's queue
///
/// Absent customers are a no-op (unchanged list, no error). A removed walk-in
/// loses its customer record in the same transaction.
pub async fn execute(
    tx: &mut dyn QueueTransaction,
    provider_id: &str,
    customer_id: &str,
) -> Result<MutationOutcome> {
    tx.load_provider(provider_id)
        .await?
        .ok_or_else(|| AppError::provider_not_found(provider_id))?;

    if !is_well_formed_id(customer_id) || !tx.remove_occupant(provider_id, customer_id).await? {
        debug!(provider_id = %provider_id, customer_id = %customer_id, "Leave for absent customer");
        return MutationOutcome::read_back(tx, provider_id, false).await;
    }

    let walk_in = tx
        .find_customer(customer_id)
        .await?
        .is_some_and(|c| c.is_walk_in());
    if walk_in {
        tx.delete_customer(customer_id).await?;
        debug!(customer_id = %customer_id, "Walk-in identity torn down");
    }

    tx.bump_revision(provider_id).await?;

    MutationOutcome::read_back(tx, provider_id, true).await
}
