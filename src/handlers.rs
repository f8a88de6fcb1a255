//! HTTP surface over the booking and cancellation coordinators.
//!
//! Handlers stay thin: decode the request, run the coordinator, encode the
//! result. All policy lives in `booking` and `cancellation`.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use uuid::Uuid;

use crate::booking::{BookingCoordinator, BookingRequest};
use crate::cancellation::{CancelRole, CancellationCoordinator};
use crate::error::Error;
use crate::solana::instructions::RentalProgram;
use crate::solana::provider::ChainRpc;
use crate::store::BookingStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BookingStore>,
    pub chain: Arc<dyn ChainRpc>,
    pub program: RentalProgram,
}

impl AppState {
    fn bookings(&self) -> BookingCoordinator<'_> {
        BookingCoordinator::new(self.store.as_ref(), self.chain.as_ref())
    }

    fn cancellations(&self) -> CancellationCoordinator<'_> {
        CancellationCoordinator::new(self.store.as_ref(), self.chain.as_ref(), &self.program)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/bookings/create", post(create_booking))
        .route("/bookings/:id", get(get_booking).delete(delete_booking))
        .route("/bookings/:id/confirm-payment", post(confirm_payment))
        .route("/bookings/:id/complete", post(complete_booking))
        .route("/bookings/:id/cancel", post(cancel_booking))
        .route("/bookings/:id/cancel-instruction", get(cancel_instruction))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateBookingBody {
    product_id: i64,
    renter_id: Uuid,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    /// USDC minor units.
    total_price: i64,
    renter_wallet_address: String,
}

#[derive(Debug, Deserialize)]
struct SignatureBody {
    transaction_signature: String,
}

#[derive(Debug, Deserialize)]
struct CancelBody {
    /// Absent only for `pending` bookings that never reached the chain.
    transaction_signature: Option<String>,
    role: CancelRole,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CancelInstructionQuery {
    role: CancelRole,
    /// The signer's wallet address.
    wallet: String,
}

#[derive(Debug, Serialize)]
struct AccountMetaDto {
    pubkey: String,
    is_signer: bool,
    is_writable: bool,
}

/// Wire form of an unsigned instruction, data in base58.
#[derive(Debug, Serialize)]
struct InstructionDto {
    program_id: String,
    accounts: Vec<AccountMetaDto>,
    data: String,
}

impl From<Instruction> for InstructionDto {
    fn from(ix: Instruction) -> Self {
        Self {
            program_id: ix.program_id.to_string(),
            accounts: ix
                .accounts
                .iter()
                .map(|meta| AccountMetaDto {
                    pubkey: meta.pubkey.to_string(),
                    is_signer: meta.is_signer,
                    is_writable: meta.is_writable,
                })
                .collect(),
            data: bs58::encode(&ix.data).into_string(),
        }
    }
}

async fn create_booking(
    State(state): State<AppState>,
    Json(body): Json<CreateBookingBody>,
) -> Result<impl IntoResponse, Error> {
    if body.renter_wallet_address.trim().is_empty() {
        return Err(Error::Validation(
            "renter_wallet_address must not be empty".into(),
        ));
    }

    let (booking, instruction_data) = state.bookings().create_booking(&BookingRequest {
        product_id: body.product_id,
        renter_id: body.renter_id,
        start_date: body.start_date,
        end_date: body.end_date,
        total_price: body.total_price,
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "booking": booking,
            "instruction_data": instruction_data,
        })),
    ))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let booking = state.store.booking(id)?.ok_or(Error::BookingNotFound)?;
    Ok(Json(booking))
}

async fn confirm_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SignatureBody>,
) -> Result<impl IntoResponse, Error> {
    let booking = state
        .bookings()
        .confirm_payment(id, &body.transaction_signature)?;
    Ok(Json(booking))
}

async fn complete_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SignatureBody>,
) -> Result<impl IntoResponse, Error> {
    let booking = state
        .bookings()
        .complete_booking(id, &body.transaction_signature)?;
    Ok(Json(booking))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CancelBody>,
) -> Result<impl IntoResponse, Error> {
    let booking = state.cancellations().finalize(
        id,
        body.role,
        body.transaction_signature.as_deref(),
        body.reason.as_deref(),
    )?;
    Ok(Json(booking))
}

/// Off-chain-only cancel shortcut for `pending` bookings that never reached
/// the chain.
async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let booking = state
        .cancellations()
        .finalize(id, CancelRole::Renter, None, None)?;
    Ok(Json(booking))
}

/// Serves the ready-to-sign cancel instruction for a remote wallet.
async fn cancel_instruction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CancelInstructionQuery>,
) -> Result<impl IntoResponse, Error> {
    let signer = Pubkey::from_str(&query.wallet)
        .map_err(|e| Error::Validation(format!("invalid wallet address: {e}")))?;
    let booking = state.store.booking(id)?.ok_or(Error::BookingNotFound)?;
    let instruction = state
        .cancellations()
        .plan_for_key(&booking, query.role, &signer)?;
    Ok(Json(InstructionDto::from(instruction)))
}

#[cfg(test)]
mod tests {
    use solana_sdk::instruction::AccountMeta;

    use super::*;

    #[test]
    fn cancel_body_decodes_lowercase_roles() {
        let body: CancelBody = serde_json::from_str(
            r#"{"transaction_signature": "sig123", "role": "renter", "reason": "plans changed"}"#,
        )
        .unwrap();
        assert_eq!(body.role, CancelRole::Renter);
        assert_eq!(body.transaction_signature.as_deref(), Some("sig123"));

        let owner: CancelBody = serde_json::from_str(r#"{"role": "owner"}"#).unwrap();
        assert_eq!(owner.role, CancelRole::Owner);
        assert!(owner.transaction_signature.is_none());
        assert!(owner.reason.is_none());

        assert!(serde_json::from_str::<CancelBody>(r#"{"role": "admin"}"#).is_err());
    }

    #[test]
    fn instruction_dto_encodes_data_as_base58() {
        let program_id = Pubkey::new_unique();
        let signer = Pubkey::new_unique();
        let ix = Instruction {
            program_id,
            accounts: vec![
                AccountMeta::new(Pubkey::new_unique(), false),
                AccountMeta::new_readonly(signer, true),
            ],
            data: vec![1, 2, 3],
        };

        let dto = InstructionDto::from(ix);
        assert_eq!(dto.program_id, program_id.to_string());
        assert_eq!(dto.accounts.len(), 2);
        assert!(dto.accounts[1].is_signer);
        assert!(!dto.accounts[1].is_writable);
        assert_eq!(bs58::decode(&dto.data).into_vec().unwrap(), vec![1, 2, 3]);
    }
}
