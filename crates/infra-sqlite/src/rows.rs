// Row types and reads shared by the store and its transactions

use crate::error::map_sqlx_error;
use salonq_core::domain::{
    sanitize_occupants, Customer, CustomerKind, Membership, OccupantRecord, Provider,
    ProviderProfile, QueueSnapshot,
};
use salonq_core::error::Result;
use sqlx::SqliteConnection;
use tracing::warn;

pub(crate) const PROVIDER_COLUMNS: &str =
    "id, name, address, phone, opening_hour, is_open, revision, created_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProviderRow {
    id: String,
    name: String,
    address: String,
    phone: Option<String>,
    opening_hour: Option<String>,
    is_open: i64, // SQLite boolean as integer
    revision: i64,
    created_at: i64,
}

impl ProviderRow {
    pub(crate) fn into_provider(self) -> Provider {
        Provider {
            id: self.id,
            profile: ProviderProfile {
                name: self.name,
                address: self.address,
                phone: self.phone,
                opening_hour: self.opening_hour,
            },
            is_open: self.is_open != 0,
            revision: self.revision.max(0) as u64,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CustomerRow {
    id: String,
    display_name: String,
    contact_email: String,
    kind: String,
    created_at: i64,
}

impl CustomerRow {
    pub(crate) fn into_customer(self) -> Customer {
        let kind = self.kind.parse().unwrap_or_else(|_| {
            warn!(customer_id = %self.id, kind = %self.kind, "Unknown customer kind");
            CustomerKind::Registered
        });
        Customer {
            id: self.id,
            display_name: self.display_name,
            contact_email: self.contact_email,
            kind,
            created_at: self.created_at,
        }
    }
}

/// Queue entry joined with its (possibly missing) customer
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EntryRow {
    pub(crate) seq: i64,
    pub(crate) customer_id: String,
    joined_at: i64,
    resolved_id: Option<String>,
    display_name: Option<String>,
    contact_email: Option<String>,
    kind: Option<String>,
    customer_created_at: Option<i64>,
}

impl EntryRow {
    pub(crate) fn is_resolved(&self) -> bool {
        self.resolved_id.is_some()
    }

    fn into_record(self) -> OccupantRecord {
        let customer = match (
            self.resolved_id,
            self.display_name,
            self.contact_email,
            self.kind,
            self.customer_created_at,
        ) {
            (Some(id), Some(display_name), Some(contact_email), Some(kind), Some(created_at)) => {
                Some(
                    CustomerRow {
                        id,
                        display_name,
                        contact_email,
                        kind,
                        created_at,
                    }
                    .into_customer(),
                )
            }
            _ => None,
        };
        OccupantRecord {
            customer_id: self.customer_id,
            joined_at: self.joined_at,
            customer,
        }
    }
}

pub(crate) async fn fetch_provider(
    conn: &mut SqliteConnection,
    provider_id: &str,
) -> Result<Option<Provider>> {
    let row: Option<ProviderRow> = sqlx::query_as(&format!(
        "SELECT {} FROM providers WHERE id = ?",
        PROVIDER_COLUMNS
    ))
    .bind(provider_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    Ok(row.map(ProviderRow::into_provider))
}

pub(crate) async fn fetch_customer(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> Result<Option<Customer>> {
    let row: Option<CustomerRow> = sqlx::query_as(
        "SELECT id, display_name, contact_email, kind, created_at FROM customers WHERE id = ?",
    )
    .bind(customer_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    Ok(row.map(CustomerRow::into_customer))
}

/// Raw entries of one provider in queue order, dangling ones included
pub(crate) async fn fetch_entries(
    conn: &mut SqliteConnection,
    provider_id: &str,
) -> Result<Vec<EntryRow>> {
    sqlx::query_as(
        r#"
        SELECT e.seq, e.customer_id, e.joined_at,
               c.id AS resolved_id, c.display_name, c.contact_email, c.kind,
               c.created_at AS customer_created_at
        FROM queue_entries e
        LEFT JOIN customers c ON c.id = e.customer_id
        WHERE e.provider_id = ?
        ORDER BY e.seq
        "#,
    )
    .bind(provider_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx_error)
}

/// Provider flags and sanitized occupants
///
/// Callers run this inside one transaction so both reads see the same state.
pub(crate) async fn fetch_snapshot(
    conn: &mut SqliteConnection,
    provider_id: &str,
) -> Result<Option<QueueSnapshot>> {
    let Some(provider) = fetch_provider(conn, provider_id).await? else {
        return Ok(None);
    };
    let records = fetch_entries(conn, provider_id)
        .await?
        .into_iter()
        .map(EntryRow::into_record)
        .collect();

    Ok(Some(QueueSnapshot {
        provider_id: provider.id,
        revision: provider.revision,
        is_open: provider.is_open,
        queue: sanitize_occupants(records),
    }))
}

pub(crate) async fn fetch_membership(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> Result<Option<Membership>> {
    let provider_id: Option<String> =
        sqlx::query_scalar("SELECT provider_id FROM queue_entries WHERE customer_id = ?")
            .bind(customer_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

    let Some(provider_id) = provider_id else {
        return Ok(None);
    };
    let Some(provider) = fetch_provider(conn, &provider_id).await? else {
        return Ok(None);
    };
    let Some(snapshot) = fetch_snapshot(conn, &provider_id).await? else {
        return Ok(None);
    };

    // A dangling or malformed entry is not a membership
    Ok(snapshot.position_of(customer_id).map(|position| Membership {
        provider_id: provider.id,
        provider_name: provider.profile.name,
        position,
    }))
}
