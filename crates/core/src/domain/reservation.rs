use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque platform identity of the member who made a booking.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One occupied table. Never mutated in place; cancel + re-reserve is
/// the only way to change a booking's fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub requester_id: UserId,
    pub username: String,
    pub participant_names: String,
    pub activity_name: String,
    pub table_number: u32,
    pub created_at: DateTime<Utc>,
}
