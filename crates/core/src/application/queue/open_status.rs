// Open/Closed Toggle Use Case

use super::MutationOutcome;
use crate::error::{AppError, Result};
use crate::port::QueueTransaction;

/// Set the admission flag. Occupants stay queued (on hold) while closed.
pub async fn execute(
    tx: &mut dyn QueueTransaction,
    provider_id: &str,
    is_open: bool,
) -> Result<MutationOutcome> {
    let provider = tx
        .load_provider(provider_id)
        .await?
        .ok_or_else(|| AppError::provider_not_found(provider_id))?;

    if provider.is_open == is_open {
        return MutationOutcome::read_back(tx, provider_id, false).await;
    }

    tx.set_open(provider_id, is_open).await?;
    tx.bump_revision(provider_id).await?;

    MutationOutcome::read_back(tx, provider_id, true).await
}
