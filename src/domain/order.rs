use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

/// An e-commerce order awaiting card payment.
///
/// The `link` uuid is what payment pages address the order by, so the
/// numeric id never leaks into URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Assigned by the repository on insert.
    pub id: i64,
    pub client_first_name: String,
    pub client_last_name: String,
    pub client_email: String,
    pub total_cents: Cents,
    pub is_paid: bool,
    pub link: Uuid,
    pub date_of_order: DateTime<Utc>,
    pub date_of_payment: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(
        client_first_name: impl Into<String>,
        client_last_name: impl Into<String>,
        client_email: impl Into<String>,
        total_cents: Cents,
    ) -> Self {
        Self {
            id: 0,
            client_first_name: client_first_name.into(),
            client_last_name: client_last_name.into(),
            client_email: client_email.into(),
            total_cents,
            is_paid: false,
            link: Uuid::new_v4(),
            date_of_order: Utc::now(),
            date_of_payment: None,
        }
    }

    /// Stamp the order as paid now.
    pub fn mark_paid(&mut self, paid_at: DateTime<Utc>) {
        self.is_paid = true;
        self.date_of_payment = Some(paid_at);
    }

    pub fn client_name(&self) -> String {
        format!("{} {}", self.client_first_name, self.client_last_name)
    }
}
