//! Lift ticket record types
//!
//! One record per purchase event. Optional sub-records (address, emergency
//! contact) are either fully populated or entirely absent, never partially
//! null; `Option` on the whole struct enforces that shape at parse time.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single lift ticket purchase event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftTicket {
    /// Unique transaction id (UUID)
    pub txid: String,
    /// RFID tag id, fixed-width hex string
    pub rfid: String,
    /// Resort name, member of a closed set supplied to the generator
    pub resort: String,
    /// Purchase timestamp, UTC
    #[serde(with = "utc_timestamp")]
    pub purchase_time: DateTime<Utc>,
    /// Last day the ticket is valid
    pub expiration_time: NaiveDate,
    /// Ticket duration in days
    pub days: i32,
    /// Holder name
    pub name: String,
    /// Mailing address, present or entirely absent
    #[serde(default)]
    pub address: Option<Address>,
    /// Contact phone
    #[serde(default)]
    pub phone: Option<String>,
    /// Contact email
    #[serde(default)]
    pub email: Option<String>,
    /// Emergency contact, present or entirely absent
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContact>,
}

/// Structured mailing address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street_address: String,
    pub city: String,
    /// Two-letter state/region code
    pub state: String,
    pub postalcode: String,
}

/// Emergency contact sub-record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
}

/// Serde helpers for ISO-8601 UTC timestamps.
///
/// Upstream producers emit timestamps with or without an explicit offset;
/// naive timestamps are taken as UTC.
mod utc_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
