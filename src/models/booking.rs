use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::catalog::{ServiceId, StaffId};

pub type BookingId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub service_id: ServiceId,
    pub staff_id: StaffId,
    #[serde(with = "scheduled_at")]
    pub scheduled_at: NaiveDateTime,
    pub status: BookingStatus,
    #[serde(default)]
    pub notes: String,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }

    /// Builds the stored record from a validated draft.
    pub fn from_draft(id: BookingId, draft: &BookingDraft, status: BookingStatus) -> Self {
        Self {
            id,
            customer_name: draft.customer_name.trim().to_string(),
            customer_email: draft.customer_email.trim().to_string(),
            customer_phone: draft.customer_phone.trim().to_string(),
            service_id: draft.service_id,
            staff_id: draft.staff_id,
            scheduled_at: draft.scheduled_at,
            status,
            notes: draft.notes.clone(),
        }
    }
}

/// A booking payload that has not been committed yet.
///
/// `status` is kept as the raw string so an unrecognised value surfaces as a
/// field error instead of a deserialisation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
    pub service_id: ServiceId,
    pub staff_id: StaffId,
    #[serde(with = "scheduled_at")]
    pub scheduled_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub search: Option<String>,
}

impl BookingFilter {
    pub fn status(status: BookingStatus) -> Self {
        Self {
            status: Some(status),
            search: None,
        }
    }

    pub fn search(text: impl Into<String>) -> Self {
        Self {
            status: None,
            search: Some(text.into()),
        }
    }
}

/// Serde adapter for `scheduledAt`: emitted as `YYYY-MM-DDTHH:MM`, accepted
/// with or without seconds.
pub mod scheduled_at {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";
    const INPUT_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

    pub fn parse(s: &str) -> Option<NaiveDateTime> {
        INPUT_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
    }

    pub fn format(dt: &NaiveDateTime) -> String {
        dt.format(OUTPUT_FORMAT).to_string()
    }

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date-time: {raw}")))
    }
}
