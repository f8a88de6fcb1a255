use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db;
use crate::error::Error;
use crate::models::{Booking, BookingStatus, NewBooking, Product, Profile};

/// Statuses that reserve a date range.
pub const ACTIVE_STATUSES: [&str; 2] = ["pending", "confirmed"];

/// Relational-store boundary for the booking coordinators. Only the three
/// `mark_*` operations ever write `status`.
pub trait BookingStore: Send + Sync {
    fn product(&self, product_id: i64) -> Result<Option<Product>, Error>;
    fn profile(&self, profile_id: Uuid) -> Result<Option<Profile>, Error>;
    fn booking(&self, booking_id: Uuid) -> Result<Option<Booking>, Error>;

    /// Inserts a `pending` booking. The store enforces the no-overlap
    /// invariant transactionally and reports violations as `DateConflict`.
    fn insert_booking(&self, new: NewBooking) -> Result<Booking, Error>;

    /// Active bookings whose `[start_date, end_date)` window intersects the
    /// given half-open range.
    fn overlapping_active(
        &self,
        product_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, Error>;

    fn mark_confirmed(
        &self,
        booking_id: Uuid,
        signature: &str,
        at: DateTime<Utc>,
    ) -> Result<Booking, Error>;

    fn mark_completed(
        &self,
        booking_id: Uuid,
        signature: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Booking, Error>;

    fn mark_cancelled(
        &self,
        booking_id: Uuid,
        signature: Option<&str>,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Booking, Error>;
}

/// Diesel-backed store. Connections are established per call, as the rest
/// of the service holds no pooled state.
pub struct PgStore {
    database_url: String,
}

impl PgStore {
    pub fn new(database_url: String) -> Self {
        Self { database_url }
    }

    fn conn(&self) -> Result<PgConnection, Error> {
        db::establish_connection(&self.database_url)
    }
}

fn store_err(e: diesel::result::Error) -> Error {
    Error::Store(e.to_string())
}

fn booking_or_not_found(e: diesel::result::Error) -> Error {
    match e {
        diesel::result::Error::NotFound => Error::BookingNotFound,
        other => store_err(other),
    }
}

impl BookingStore for PgStore {
    fn product(&self, product: i64) -> Result<Option<Product>, Error> {
        use crate::schema::products::dsl::*;
        let conn = &mut self.conn()?;
        products
            .find(product)
            .first::<Product>(conn)
            .optional()
            .map_err(store_err)
    }

    fn profile(&self, profile: Uuid) -> Result<Option<Profile>, Error> {
        use crate::schema::profiles::dsl::*;
        let conn = &mut self.conn()?;
        profiles
            .find(profile)
            .first::<Profile>(conn)
            .optional()
            .map_err(store_err)
    }

    fn booking(&self, booking: Uuid) -> Result<Option<Booking>, Error> {
        use crate::schema::bookings::dsl::*;
        let conn = &mut self.conn()?;
        bookings
            .find(booking)
            .first::<Booking>(conn)
            .optional()
            .map_err(store_err)
    }

    fn insert_booking(&self, new: NewBooking) -> Result<Booking, Error> {
        use crate::schema::bookings;
        let conn = &mut self.conn()?;
        diesel::insert_into(bookings::table)
            .values(&new)
            .get_result::<Booking>(conn)
            .map_err(|e| match &e {
                // `bookings_no_overlap` is the exclusion constraint guarding
                // concurrent inserts; the application-level check is only the
                // fast path.
                diesel::result::Error::DatabaseError(_, info)
                    if info.constraint_name() == Some("bookings_no_overlap") =>
                {
                    Error::DateConflict
                }
                _ => store_err(e),
            })
    }

    fn overlapping_active(
        &self,
        product: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, Error> {
        use crate::schema::bookings::dsl::*;
        let conn = &mut self.conn()?;
        bookings
            .filter(product_id.eq(product))
            .filter(status.eq_any(ACTIVE_STATUSES))
            .filter(start_date.lt(end))
            .filter(end_date.gt(start))
            .load::<Booking>(conn)
            .map_err(store_err)
    }

    fn mark_confirmed(
        &self,
        booking: Uuid,
        signature: &str,
        at: DateTime<Utc>,
    ) -> Result<Booking, Error> {
        use crate::schema::bookings::dsl::*;
        let conn = &mut self.conn()?;
        diesel::update(bookings.find(booking))
            .set((
                status.eq(BookingStatus::Confirmed.as_str()),
                payment_intent_id.eq(signature),
                confirmed_at.eq(at),
            ))
            .get_result::<Booking>(conn)
            .map_err(booking_or_not_found)
    }

    fn mark_completed(
        &self,
        booking: Uuid,
        signature: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Booking, Error> {
        use crate::schema::bookings::dsl::*;
        let conn = &mut self.conn()?;
        diesel::update(bookings.find(booking))
            .set((
                status.eq(BookingStatus::Completed.as_str()),
                completion_signature.eq(signature),
                completed_at.eq(at),
            ))
            .get_result::<Booking>(conn)
            .map_err(booking_or_not_found)
    }

    fn mark_cancelled(
        &self,
        booking: Uuid,
        signature: Option<&str>,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Booking, Error> {
        use crate::schema::bookings::dsl::*;
        let conn = &mut self.conn()?;
        diesel::update(bookings.find(booking))
            .set((
                status.eq(BookingStatus::Cancelled.as_str()),
                cancellation_signature.eq(signature),
                cancellation_reason.eq(reason),
                cancelled_at.eq(at),
            ))
            .get_result::<Booking>(conn)
            .map_err(booking_or_not_found)
    }
}

/// In-memory store mirroring the Postgres semantics, including the
/// overlap constraint, for coordinator tests.
#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Inner {
        products: HashMap<i64, Product>,
        profiles: HashMap<Uuid, Profile>,
        bookings: HashMap<Uuid, Booking>,
    }

    #[derive(Default)]
    pub struct MemoryStore {
        inner: Mutex<Inner>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_product(self, product: Product) -> Self {
            self.inner
                .lock()
                .unwrap()
                .products
                .insert(product.id, product);
            self
        }

        pub fn with_profile(self, profile: Profile) -> Self {
            self.inner
                .lock()
                .unwrap()
                .profiles
                .insert(profile.id, profile);
            self
        }
    }

    fn overlaps(existing: &Booking, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        existing.start_date < end && start < existing.end_date
    }

    fn is_active(b: &Booking) -> bool {
        ACTIVE_STATUSES.contains(&b.status.as_str())
    }

    impl BookingStore for MemoryStore {
        fn product(&self, product_id: i64) -> Result<Option<Product>, Error> {
            Ok(self.inner.lock().unwrap().products.get(&product_id).cloned())
        }

        fn profile(&self, profile_id: Uuid) -> Result<Option<Profile>, Error> {
            Ok(self.inner.lock().unwrap().profiles.get(&profile_id).cloned())
        }

        fn booking(&self, booking_id: Uuid) -> Result<Option<Booking>, Error> {
            Ok(self.inner.lock().unwrap().bookings.get(&booking_id).cloned())
        }

        fn insert_booking(&self, new: NewBooking) -> Result<Booking, Error> {
            let mut inner = self.inner.lock().unwrap();
            let conflict = inner.bookings.values().any(|b| {
                b.product_id == new.product_id
                    && is_active(b)
                    && overlaps(b, new.start_date, new.end_date)
            });
            if conflict {
                return Err(Error::DateConflict);
            }
            let booking = Booking {
                id: new.id,
                product_id: new.product_id,
                renter_id: new.renter_id,
                owner_id: new.owner_id,
                start_date: new.start_date,
                end_date: new.end_date,
                total_price: new.total_price,
                status: new.status,
                payment_intent_id: None,
                completion_signature: None,
                cancellation_signature: None,
                cancellation_reason: None,
                created_at: new.created_at,
                confirmed_at: None,
                completed_at: None,
                cancelled_at: None,
            };
            inner.bookings.insert(booking.id, booking.clone());
            Ok(booking)
        }

        fn overlapping_active(
            &self,
            product_id: i64,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<Booking>, Error> {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .bookings
                .values()
                .filter(|b| b.product_id == product_id && is_active(b) && overlaps(b, start, end))
                .cloned()
                .collect())
        }

        fn mark_confirmed(
            &self,
            booking_id: Uuid,
            signature: &str,
            at: DateTime<Utc>,
        ) -> Result<Booking, Error> {
            let mut inner = self.inner.lock().unwrap();
            let booking = inner
                .bookings
                .get_mut(&booking_id)
                .ok_or(Error::BookingNotFound)?;
            booking.status = BookingStatus::Confirmed.as_str().to_string();
            booking.payment_intent_id = Some(signature.to_string());
            booking.confirmed_at = Some(at);
            Ok(booking.clone())
        }

        fn mark_completed(
            &self,
            booking_id: Uuid,
            signature: Option<&str>,
            at: DateTime<Utc>,
        ) -> Result<Booking, Error> {
            let mut inner = self.inner.lock().unwrap();
            let booking = inner
                .bookings
                .get_mut(&booking_id)
                .ok_or(Error::BookingNotFound)?;
            booking.status = BookingStatus::Completed.as_str().to_string();
            booking.completion_signature = signature.map(str::to_string);
            booking.completed_at = Some(at);
            Ok(booking.clone())
        }

        fn mark_cancelled(
            &self,
            booking_id: Uuid,
            signature: Option<&str>,
            reason: Option<&str>,
            at: DateTime<Utc>,
        ) -> Result<Booking, Error> {
            let mut inner = self.inner.lock().unwrap();
            let booking = inner
                .bookings
                .get_mut(&booking_id)
                .ok_or(Error::BookingNotFound)?;
            booking.status = BookingStatus::Cancelled.as_str().to_string();
            booking.cancellation_signature = signature.map(str::to_string);
            booking.cancellation_reason = reason.map(str::to_string);
            booking.cancelled_at = Some(at);
            Ok(booking.clone())
        }
    }
}
