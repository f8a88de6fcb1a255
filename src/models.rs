use std::fmt;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::schema::{bookings, products, profiles};

/// Off-chain booking status. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Result<Self, Error> {
        match value {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(Error::Store(format!("unknown booking status `{other}`"))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status with its transition evidence attached, so a confirmed booking
/// without a payment signature is unrepresentable outside the raw row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingState {
    Pending,
    Confirmed {
        payment_signature: String,
    },
    Completed {
        payment_signature: String,
        completion_signature: Option<String>,
    },
    Cancelled {
        signature: Option<String>,
        reason: Option<String>,
    },
}

/// One row of the `bookings` table. Field order matches the `table!`
/// declaration; diesel maps columns positionally.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = bookings)]
pub struct Booking {
    pub id: Uuid,
    pub product_id: i64,
    pub renter_id: Uuid,
    pub owner_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_price: i64,
    pub status: String,
    pub payment_intent_id: Option<String>,
    pub completion_signature: Option<String>,
    pub cancellation_signature: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn status(&self) -> Result<BookingStatus, Error> {
        BookingStatus::parse(&self.status)
    }

    /// Lifts the row into the tagged union, rejecting rows whose columns
    /// contradict their status.
    pub fn state(&self) -> Result<BookingState, Error> {
        let state = match self.status()? {
            BookingStatus::Pending => BookingState::Pending,
            BookingStatus::Confirmed => BookingState::Confirmed {
                payment_signature: self.payment_signature()?,
            },
            BookingStatus::Completed => BookingState::Completed {
                payment_signature: self.payment_signature()?,
                completion_signature: self.completion_signature.clone(),
            },
            BookingStatus::Cancelled => BookingState::Cancelled {
                signature: self.cancellation_signature.clone(),
                reason: self.cancellation_reason.clone(),
            },
        };
        Ok(state)
    }

    fn payment_signature(&self) -> Result<String, Error> {
        self.payment_intent_id.clone().ok_or_else(|| {
            Error::Store(format!(
                "booking {} is `{}` but has no payment signature",
                self.id, self.status
            ))
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bookings)]
pub struct NewBooking {
    pub id: Uuid,
    pub product_id: i64,
    pub renter_id: Uuid,
    pub owner_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_price: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = products)]
pub struct Product {
    pub id: i64,
    pub owner_id: Uuid,
    pub title: String,
    pub price_per_day: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub solana_address: Option<String>,
}
