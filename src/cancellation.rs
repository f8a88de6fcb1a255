//! Cancellation coordinator: maps (booking status, actor role) to the one
//! applicable cancel instruction, and reconciles the off-chain record only
//! after the chain has confirmed the result.

use chrono::Utc;
use log::info;
use serde::Deserialize;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;
use crate::models::{Booking, BookingStatus};
use crate::solana::instructions::RentalProgram;
use crate::solana::provider::{connected_key, ChainRpc, WalletProvider};
use crate::store::BookingStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelRole {
    Renter,
    Owner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelPath {
    /// No funds moved yet; closes the on-chain transaction.
    RenterCreated,
    /// Escrow refunded to the renter at the renter's request.
    RenterPaid,
    /// Escrow refunded to the renter at the owner's request.
    Owner,
}

/// Exactly one instruction variant fits each (role, status) pair; every
/// other combination is rejected.
pub fn select_cancel_path(status: BookingStatus, role: CancelRole) -> Result<CancelPath, Error> {
    match (role, status) {
        (CancelRole::Renter, BookingStatus::Pending) => Ok(CancelPath::RenterCreated),
        (CancelRole::Renter, BookingStatus::Confirmed) => Ok(CancelPath::RenterPaid),
        (CancelRole::Owner, BookingStatus::Confirmed) => Ok(CancelPath::Owner),
        _ => Err(Error::CannotCancelInCurrentState),
    }
}

pub struct CancellationCoordinator<'a> {
    store: &'a dyn BookingStore,
    chain: &'a dyn ChainRpc,
    program: &'a RentalProgram,
}

impl<'a> CancellationCoordinator<'a> {
    pub fn new(
        store: &'a dyn BookingStore,
        chain: &'a dyn ChainRpc,
        program: &'a RentalProgram,
    ) -> Self {
        Self {
            store,
            chain,
            program,
        }
    }

    /// Builds the cancel instruction for the connected wallet. Nothing is
    /// signed or submitted here, and the off-chain record is untouched.
    pub fn plan(
        &self,
        booking: &Booking,
        role: CancelRole,
        wallet: &dyn WalletProvider,
    ) -> Result<Instruction, Error> {
        self.plan_for_key(booking, role, &connected_key(wallet)?)
    }

    /// Same as [`plan`](Self::plan) for a caller that already holds the
    /// signer's public key, such as the HTTP layer serving a remote wallet.
    pub fn plan_for_key(
        &self,
        booking: &Booking,
        role: CancelRole,
        signer: &Pubkey,
    ) -> Result<Instruction, Error> {
        let path = select_cancel_path(booking.status()?, role)?;
        let product_id = u64::try_from(booking.product_id)
            .map_err(|_| Error::InvalidParameters("product id must be positive".into()))?;
        match path {
            CancelPath::RenterCreated => self.program.cancel_as_renter_created(signer, product_id),
            CancelPath::RenterPaid => self.program.cancel_as_renter_paid(signer, product_id),
            CancelPath::Owner => {
                let renter = self.renter_wallet(booking)?;
                self.program.cancel_as_owner(signer, product_id, &renter)
            }
        }
    }

    /// Marks the booking cancelled after the on-chain instruction has
    /// confirmed. A `pending` booking that never reached the chain may be
    /// cancelled without a signature; a `confirmed` one never is.
    pub fn finalize(
        &self,
        booking_id: Uuid,
        role: CancelRole,
        signature: Option<&str>,
        reason: Option<&str>,
    ) -> Result<Booking, Error> {
        let booking = self.store.booking(booking_id)?.ok_or(Error::BookingNotFound)?;
        let status = booking.status()?;
        select_cancel_path(status, role)?;

        match signature {
            Some(signature) => {
                if !self.chain.confirm_transaction(signature)? {
                    return Err(Error::Unconfirmed(signature.to_string()));
                }
            }
            None if status == BookingStatus::Pending => {
                // nothing on chain to wait for
            }
            None => {
                return Err(Error::Validation(
                    "transaction signature is required to cancel a confirmed booking".into(),
                ));
            }
        }

        let updated = self
            .store
            .mark_cancelled(booking_id, signature, reason, Utc::now())?;
        info!("booking {} cancelled by {:?}", booking_id, role);
        Ok(updated)
    }

    fn renter_wallet(&self, booking: &Booking) -> Result<Pubkey, Error> {
        let address = self
            .store
            .profile(booking.renter_id)?
            .and_then(|p| p.solana_address)
            .ok_or(Error::RenterWalletNotConfigured)?;
        Pubkey::from_str(&address)
            .map_err(|e| Error::Store(format!("renter wallet is not a valid pubkey: {e}")))
    }
}
