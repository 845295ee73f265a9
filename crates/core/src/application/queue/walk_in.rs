// Walk-in Admission Use Case

use super::MutationOutcome;
use crate::domain::Customer;
use crate::error::{AppError, Result};
use crate::port::{IdProvider, QueueTransaction, TimeProvider};

/// Synthesize a walk-in customer and append it to the queue
///
/// The customer insert and the queue append share one transaction: if the
/// append fails the caller rolls back and the customer record never exists.
pub async fn execute(
    tx: &mut dyn QueueTransaction,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    provider_id: &str,
) -> Result<(Customer, MutationOutcome)> {
    let provider = tx
        .load_provider(provider_id)
        .await?
        .ok_or_else(|| AppError::provider_not_found(provider_id))?;

    provider.ensure_admitting()?;

    tx.prune_invalid_entries(provider_id).await?;

    let now = time_provider.now_millis();
    let customer = Customer::walk_in(id_provider.generate_id(), now);

    tx.insert_customer(&customer).await?;
    tx.append_occupant(provider_id, &customer.id, now).await?;
    tx.bump_revision(provider_id).await?;

    let outcome = MutationOutcome::read_back(tx, provider_id, true).await?;
    Ok((customer, outcome))
}
