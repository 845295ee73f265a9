// Provider (salon) Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::queue::Occupant;
use serde::{Deserialize, Serialize};

/// Provider ID (UUID v4 in production)
pub type ProviderId = String;

const MAX_NAME_LEN: usize = 120;
const MAX_ADDRESS_LEN: usize = 240;

/// Descriptive provider fields (owned by the provider, not by the queue engine)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub opening_hour: Option<String>,
}

impl ProviderProfile {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "provider name cannot be empty".to_string(),
            ));
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(DomainError::ValidationError(format!(
                "provider name too long (max {} chars)",
                MAX_NAME_LEN
            )));
        }
        if self.address.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "provider address cannot be empty".to_string(),
            ));
        }
        if self.address.len() > MAX_ADDRESS_LEN {
            return Err(DomainError::ValidationError(format!(
                "provider address too long (max {} chars)",
                MAX_ADDRESS_LEN
            )));
        }
        Ok(())
    }
}

/// Partial profile update; `None` keeps the current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub opening_hour: Option<String>,
}

impl ProviderPatch {
    /// Blank strings count as "not provided"
    pub fn apply(self, profile: &mut ProviderProfile) {
        fn keep(v: Option<String>) -> Option<String> {
            v.filter(|s| !s.trim().is_empty())
        }

        if let Some(name) = keep(self.name) {
            profile.name = name;
        }
        if let Some(address) = keep(self.address) {
            profile.address = address;
        }
        if let Some(phone) = keep(self.phone) {
            profile.phone = Some(phone);
        }
        if let Some(opening_hour) = keep(self.opening_hour) {
            profile.opening_hour = Some(opening_hour);
        }
    }
}

/// Provider Entity
///
/// The occupant list itself lives in the store as ordered references and is
/// read through `QueueSnapshot`; `revision` counts committed changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    #[serde(flatten)]
    pub profile: ProviderProfile,
    pub is_open: bool,
    pub revision: u64,
    pub created_at: i64, // epoch ms
}

impl Provider {
    /// Create a new provider. Providers open by default.
    pub fn new(id: impl Into<String>, created_at: i64, profile: ProviderProfile) -> Self {
        Self {
            id: id.into(),
            profile,
            is_open: true,
            revision: 0,
            created_at,
        }
    }

    /// Admission gate shared by Join and AdmitWalkIn
    pub fn ensure_admitting(&self) -> Result<()> {
        if self.is_open {
            Ok(())
        } else {
            Err(DomainError::ProviderClosed {
                provider_id: self.id.clone(),
            })
        }
    }
}

/// Provider with its resolved queue (what list/get return)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderView {
    #[serde(flatten)]
    pub provider: Provider,
    pub queue: Vec<Occupant>,
}
