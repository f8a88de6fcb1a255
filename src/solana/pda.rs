//! Program-derived addresses for the rental program.
//!
//! Seed strings and byte layout are part of the wire contract with the
//! deployed program; changing them orphans existing on-chain state.

use solana_sdk::pubkey::Pubkey;

pub const RENTAL_TRANSACTION_SEED: &[u8] = b"rental_transaction";
pub const GLOBAL_STATE_SEED: &[u8] = b"global_state";
pub const ESCROW_SEED: &[u8] = b"escrow";

/// Escrow-holding rental transaction account, keyed by product and renter.
pub fn find_rental_transaction(
    product_id: u64,
    renter: &Pubkey,
    program_id: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            RENTAL_TRANSACTION_SEED,
            &product_id.to_le_bytes(),
            renter.as_ref(),
        ],
        program_id,
    )
}

/// Singleton platform configuration account.
pub fn find_global_state(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[GLOBAL_STATE_SEED], program_id)
}

/// USDC token account owned by the rental transaction PDA.
pub fn find_escrow_token(rental_transaction: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[ESCROW_SEED, rental_transaction.as_ref()], program_id)
}
