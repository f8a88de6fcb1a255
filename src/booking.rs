//! Booking lifecycle coordinator.
//!
//! State machine over `Booking.status`: `pending → confirmed → completed`,
//! with cancellation branches handled by `crate::cancellation`. The
//! off-chain `pending` record is always written before any instruction is
//! built, and status never advances ahead of on-chain confirmation.

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use uuid::Uuid;

use crate::error::Error;
use crate::models::{Booking, BookingState, BookingStatus, NewBooking};
use crate::solana::instructions::minor_to_usdc;
use crate::solana::provider::ChainRpc;
use crate::store::BookingStore;

/// A validated rental request. The renter is identified by the (out of
/// scope) auth layer; wallets are looked up from profiles.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub product_id: i64,
    pub renter_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// USDC minor units.
    pub total_price: i64,
}

/// Raw parameters the wallet-holding client needs to build the on-chain
/// create/pay instructions for this booking.
#[derive(Debug, Clone, Serialize)]
pub struct InstructionData {
    pub booking_id: Uuid,
    pub product_id: u64,
    pub owner_wallet: String,
    /// USDC minor units.
    pub total_amount: u64,
    /// Unix seconds.
    pub rental_start: i64,
    pub rental_end: i64,
}

pub struct BookingCoordinator<'a> {
    store: &'a dyn BookingStore,
    chain: &'a dyn ChainRpc,
}

impl<'a> BookingCoordinator<'a> {
    pub fn new(store: &'a dyn BookingStore, chain: &'a dyn ChainRpc) -> Self {
        Self { store, chain }
    }

    /// Reserves the date range off-chain and returns the instruction
    /// parameters. No on-chain state exists yet; an abandoned `pending`
    /// booking is expected to be reaped externally (soft 10-minute window,
    /// enforced at the UI layer, not here).
    pub fn create_booking(
        &self,
        request: &BookingRequest,
    ) -> Result<(Booking, InstructionData), Error> {
        if request.start_date >= request.end_date {
            return Err(Error::Validation(
                "start_date must be before end_date".into(),
            ));
        }
        if request.total_price <= 0 {
            return Err(Error::Validation("total_price must be positive".into()));
        }
        let chain_product_id = u64::try_from(request.product_id)
            .ok()
            .filter(|id| *id != 0)
            .ok_or_else(|| Error::InvalidParameters("product id must be positive".into()))?;

        let product = self
            .store
            .product(request.product_id)?
            .ok_or(Error::ProductNotFound)?;
        let owner_wallet = self
            .store
            .profile(product.owner_id)?
            .and_then(|p| p.solana_address)
            .ok_or(Error::OwnerWalletNotConfigured)?;
        self.store
            .profile(request.renter_id)?
            .and_then(|p| p.solana_address)
            .ok_or(Error::RenterWalletNotConfigured)?;

        // Fast-path rejection; the store's exclusion constraint is the
        // actual guarantee under concurrency.
        if !self
            .store
            .overlapping_active(request.product_id, request.start_date, request.end_date)?
            .is_empty()
        {
            return Err(Error::DateConflict);
        }

        let booking = self.store.insert_booking(NewBooking {
            id: Uuid::new_v4(),
            product_id: request.product_id,
            renter_id: request.renter_id,
            owner_id: product.owner_id,
            start_date: request.start_date,
            end_date: request.end_date,
            total_price: request.total_price,
            status: BookingStatus::Pending.as_str().to_string(),
            created_at: Utc::now(),
        })?;

        let instruction_data = InstructionData {
            booking_id: booking.id,
            product_id: chain_product_id,
            owner_wallet,
            total_amount: booking.total_price as u64,
            rental_start: booking.start_date.timestamp(),
            rental_end: booking.end_date.timestamp(),
        };

        info!(
            "booking {} created for product {} ({} to {}, {} USDC)",
            booking.id,
            booking.product_id,
            booking.start_date,
            booking.end_date,
            minor_to_usdc(booking.total_price as u64)
        );
        Ok((booking, instruction_data))
    }

    /// Records a confirmed payment. Idempotent for the signature that
    /// performed the transition; the update happens only after the chain
    /// reports the signature confirmed.
    pub fn confirm_payment(&self, booking_id: Uuid, signature: &str) -> Result<Booking, Error> {
        let booking = self.store.booking(booking_id)?.ok_or(Error::BookingNotFound)?;
        match booking.state()? {
            BookingState::Pending => {
                if !self.chain.confirm_transaction(signature)? {
                    return Err(Error::Unconfirmed(signature.to_string()));
                }
                let updated = self.store.mark_confirmed(booking_id, signature, Utc::now())?;
                info!("booking {} confirmed with payment {}", booking_id, signature);
                Ok(updated)
            }
            BookingState::Confirmed { payment_signature } if payment_signature == signature => {
                // replayed confirmation, nothing to do
                Ok(booking)
            }
            _ => Err(self.wrong_state(&booking, "pending")?),
        }
    }

    /// Records a completed rental after the completion instruction has
    /// confirmed on chain (funds released from escrow).
    pub fn complete_booking(&self, booking_id: Uuid, signature: &str) -> Result<Booking, Error> {
        let booking = self.store.booking(booking_id)?.ok_or(Error::BookingNotFound)?;
        match booking.state()? {
            BookingState::Confirmed { .. } => {
                if !self.chain.confirm_transaction(signature)? {
                    return Err(Error::Unconfirmed(signature.to_string()));
                }
                let updated =
                    self.store
                        .mark_completed(booking_id, Some(signature), Utc::now())?;
                info!("booking {} completed with {}", booking_id, signature);
                Ok(updated)
            }
            _ => Err(self.wrong_state(&booking, "confirmed")?),
        }
    }

    fn wrong_state(&self, booking: &Booking, expected: &'static str) -> Result<Error, Error> {
        Ok(Error::InvalidState {
            expected,
            actual: booking.status()?.as_str(),
        })
    }
}
