// Queue Domain Model
//
// A provider's queue is an ordered list of customer references.
// Insertion order is service order: position 1 is served next.

use crate::domain::customer::{Customer, CustomerId, CustomerKind};
use crate::domain::id::is_well_formed_id;
use crate::domain::provider::ProviderId;
use serde::{Deserialize, Serialize};

/// One raw queue entry as stored: a reference plus whatever it resolved to.
///
/// `customer` is `None` when the reference points at a customer record that
/// no longer exists.
#[derive(Debug, Clone)]
pub struct OccupantRecord {
    pub customer_id: String,
    pub joined_at: i64,
    pub customer: Option<Customer>,
}

/// A resolved queue occupant (display data only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub customer_id: CustomerId,
    pub display_name: String,
    pub contact_email: String,
    pub kind: CustomerKind,
    pub position: usize, // 1-based
    pub joined_at: i64,
}

/// Drop entries that cannot be trusted and number the rest.
///
/// Malformed identifiers, dangling references, and repeated references (only
/// the first occurrence keeps its slot) are filtered out silently. Records must
/// already be in queue order.
pub fn sanitize_occupants(records: Vec<OccupantRecord>) -> Vec<Occupant> {
    let mut seen = std::collections::HashSet::new();
    let mut occupants = Vec::with_capacity(records.len());

    for record in records {
        if !is_well_formed_id(&record.customer_id) {
            tracing::debug!(customer_id = %record.customer_id, "Pruned malformed queue entry");
            continue;
        }
        let Some(customer) = record.customer else {
            tracing::debug!(customer_id = %record.customer_id, "Pruned dangling queue entry");
            continue;
        };
        if customer.id != record.customer_id || !seen.insert(record.customer_id.clone()) {
            continue;
        }

        occupants.push(Occupant {
            position: occupants.len() + 1,
            customer_id: record.customer_id,
            display_name: customer.display_name,
            contact_email: customer.contact_email,
            kind: customer.kind,
            joined_at: record.joined_at,
        });
    }

    occupants
}

/// Full, consistent view of one provider's queue at a given revision.
///
/// This is both the mutation result and the broadcast payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub provider_id: ProviderId,
    pub revision: u64,
    pub is_open: bool,
    pub queue: Vec<Occupant>,
}

impl QueueSnapshot {
    pub fn position_of(&self, customer_id: &str) -> Option<usize> {
        self.queue
            .iter()
            .find(|o| o.customer_id == customer_id)
            .map(|o| o.position)
    }

    pub fn customer_ids(&self) -> Vec<&str> {
        self.queue.iter().map(|o| o.customer_id.as_str()).collect()
    }
}

/// Where a customer currently holds a slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub provider_id: ProviderId,
    pub provider_name: String,
    pub position: usize,
}
