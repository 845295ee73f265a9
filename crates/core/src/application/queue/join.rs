// Join Use Case

use super::MutationOutcome;
use crate::domain::DomainError;
use crate::error::{AppError, Result};
use crate::port::{QueueTransaction, TimeProvider};
use tracing::debug;

/// Admit a registered customer at the tail of a provider's queue
///
/// Checks run in this order: provider exists, provider open, customer exists,
/// customer not queued anywhere. The membership check and the append run in
/// the same transaction.
pub async fn execute(
    tx: &mut dyn QueueTransaction,
    time_provider: &dyn TimeProvider,
    provider_id: &str,
    customer_id: &str,
) -> Result<MutationOutcome> {
    let provider = tx
        .load_provider(provider_id)
        .await?
        .ok_or_else(|| AppError::provider_not_found(provider_id))?;

    provider.ensure_admitting()?;

    tx.find_customer(customer_id)
        .await?
        .ok_or_else(|| AppError::customer_not_found(customer_id))?;

    if let Some(membership) = tx.find_membership(customer_id).await? {
        let err = if membership.provider_id == provider_id {
            DomainError::AlreadyQueuedHere {
                customer_id: customer_id.to_string(),
                provider_id: provider_id.to_string(),
            }
        } else {
            DomainError::AlreadyQueuedElsewhere {
                customer_id: customer_id.to_string(),
                provider_id: membership.provider_id,
                provider_name: membership.provider_name,
            }
        };
        return Err(err.into());
    }

    let pruned = tx.prune_invalid_entries(provider_id).await?;
    if pruned > 0 {
        debug!(provider_id = %provider_id, pruned, "Pruned invalid queue entries");
    }

    tx.append_occupant(provider_id, customer_id, time_provider.now_millis())
        .await?;
    tx.bump_revision(provider_id).await?;

    MutationOutcome::read_back(tx, provider_id, true).await
}
