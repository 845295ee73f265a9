// Customer Domain Model

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Customer ID (UUID v4 in production)
pub type CustomerId = String;

/// Display name given to every synthesized walk-in
pub const WALK_IN_DISPLAY_NAME: &str = "Walk-in";

/// Domain used for synthetic walk-in contact addresses (never deliverable)
pub const WALK_IN_EMAIL_DOMAIN: &str = "walk-in.invalid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerKind {
    Registered,
    WalkIn,
}

impl std::fmt::Display for CustomerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CustomerKind::Registered => write!(f, "REGISTERED"),
            CustomerKind::WalkIn => write!(f, "WALK_IN"),
        }
    }
}

impl std::str::FromStr for CustomerKind {
    type Err = crate::domain::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGISTERED" => Ok(CustomerKind::Registered),
            "WALK_IN" => Ok(CustomerKind::WalkIn),
            other => Err(crate::domain::DomainError::ValidationError(format!(
                "unknown customer kind: {}",
                other
            ))),
        }
    }
}

/// Customer Entity
///
/// Walk-ins exist only while they hold a queue slot: they are created on
/// admission and deleted when removed from the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub display_name: String,
    pub contact_email: String,
    pub kind: CustomerKind,
    pub created_at: i64, // epoch ms
}

impl Customer {
    /// Create a registered customer (identity owned by the auth collaborator)
    pub fn registered(
        id: impl Into<String>,
        created_at: i64,
        display_name: impl Into<String>,
        contact_email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            contact_email: contact_email.into(),
            kind: CustomerKind::Registered,
            created_at,
        }
    }

    /// Synthesize a walk-in with a fresh, unique contact identity
    ///
    /// The address is `walkin_<random>_<created_at>@walk-in.invalid`.
    pub fn walk_in(id: impl Into<String>, created_at: i64) -> Self {
        let tag: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect::<String>()
            .to_ascii_lowercase();

        Self {
            id: id.into(),
            display_name: WALK_IN_DISPLAY_NAME.to_string(),
            contact_email: format!("walkin_{}_{}@{}", tag, created_at, WALK_IN_EMAIL_DOMAIN),
            kind: CustomerKind::WalkIn,
            created_at,
        }
    }

    pub fn is_walk_in(&self) -> bool {
        self.kind == CustomerKind::WalkIn
    }
}
