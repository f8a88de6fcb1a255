use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Error taxonomy for the booking coordination core.
///
/// Validation and conflict errors are surfaced immediately with a specific
/// message and are never retried here. Chain errors may be retried by the
/// caller with backoff; replaying an instruction blindly is not safe, so no
/// automatic retry happens inside the coordinators.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("invalid instruction parameters: {0}")]
    InvalidParameters(String),

    #[error("product not found")]
    ProductNotFound,
    #[error("booking not found")]
    BookingNotFound,

    #[error("product is not available for the selected dates")]
    DateConflict,
    #[error("booking is in `{actual}` status, expected `{expected}`")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("booking cannot be cancelled in its current state")]
    CannotCancelInCurrentState,

    #[error("wallet not connected")]
    WalletNotConnected,
    /// The user dismissed the signature prompt. Reported as an outcome,
    /// not logged as a fault.
    #[error("signature request rejected by user")]
    SignatureRejected,
    #[error("product owner Solana address not configured")]
    OwnerWalletNotConfigured,
    #[error("renter Solana address not configured")]
    RenterWalletNotConfigured,

    #[error("chain error: {0}")]
    Chain(String),
    #[error("transaction {0} is not confirmed on chain")]
    Unconfirmed(String),

    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::InvalidParameters(_)
            | Error::WalletNotConnected
            | Error::SignatureRejected
            | Error::OwnerWalletNotConfigured
            | Error::RenterWalletNotConfigured => StatusCode::BAD_REQUEST,
            Error::ProductNotFound | Error::BookingNotFound => StatusCode::NOT_FOUND,
            Error::DateConflict
            | Error::InvalidState { .. }
            | Error::CannotCancelInCurrentState => StatusCode::CONFLICT,
            Error::Chain(_) | Error::Unconfirmed(_) => StatusCode::BAD_GATEWAY,
            Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("internal error: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
