use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Superseded,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Superseded => "superseded",
        }
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "superseded" => Ok(BookingStatus::Superseded),
            other => Err(format!("unknown booking status '{}'", other)),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub business_id: String,
    pub service_id: String,
    pub service_name: String,
    #[sqlx(rename = "booking_date")]
    pub date: NaiveDate,
    #[sqlx(rename = "booking_time")]
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    pub external_calendar_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct NewBookingParams {
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub business_id: String,
    pub service_id: String,
    pub service_name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: i32,
    pub start_at: DateTime<Utc>,
}

impl Booking {
    /// A fresh pending booking that expires after `ttl` unless confirmed.
    pub fn pending(params: NewBookingParams, now: DateTime<Utc>, ttl: Duration) -> Self {
        let end_at = params.start_at + Duration::minutes(params.duration_minutes as i64);

        Self {
            id: Uuid::new_v4().to_string(),
            customer_id: params.customer_id,
            customer_name: params.customer_name,
            business_id: params.business_id,
            service_id: params.service_id,
            service_name: params.service_name,
            date: params.date,
            time: params.time,
            duration_minutes: params.duration_minutes,
            start_at: params.start_at,
            end_at,
            status: BookingStatus::Pending,
            external_calendar_ref: None,
            created_at: now,
            confirmed_at: None,
            cancelled_at: None,
            expires_at: Some(now + ttl),
        }
    }
}
