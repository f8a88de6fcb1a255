//! Unsigned instruction builders for every rental lifecycle transition.
//!
//! Builders take already-validated domain parameters plus the acting
//! party's public key and return an `Instruction`; signing and submission
//! belong to the wallet-holding caller. Account orderings mirror the
//! program's `Accounts` contexts exactly.

use anchor_lang::prelude::borsh;
use anchor_lang::AnchorSerialize;
use sha2::{Digest, Sha256};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;
use spl_associated_token_account::get_associated_token_address;

use super::pda;
use crate::error::Error;

/// The on-chain program caps `booking_id` at 64 bytes.
pub const MAX_BOOKING_ID_LEN: usize = 64;
/// Dispute resolution reasons are capped at 256 bytes.
pub const MAX_REASON_LEN: usize = 256;
/// Percentage arguments are basis points out of 10_000.
pub const BPS_DENOMINATOR: u16 = 10_000;
/// USDC uses 6 decimal places.
pub const USDC_DECIMALS_FACTOR: u64 = 1_000_000;

pub fn minor_to_usdc(minor: u64) -> f64 {
    minor as f64 / USDC_DECIMALS_FACTOR as f64
}

/// Anchor's global instruction discriminator: `sha256("global:<name>")[..8]`.
fn discriminator(name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("global:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

fn encode<T: AnchorSerialize>(name: &str, args: &T) -> Result<Vec<u8>, Error> {
    let mut data = discriminator(name).to_vec();
    let body = args
        .try_to_vec()
        .map_err(|e| Error::InvalidParameters(e.to_string()))?;
    data.extend(body);
    Ok(data)
}

// Argument structs, exact Borsh match to the program.

#[derive(AnchorSerialize)]
struct CreateRentalTransactionArgs {
    product_id: u64,
    owner_wallet: Pubkey,
    total_amount: u64,
    rental_start: i64,
    rental_end: i64,
    booking_id: String,
}

#[derive(AnchorSerialize)]
struct PayRentalArgs {
    amount: u64,
}

#[derive(AnchorSerialize)]
struct AdminInterveneArgs {
    owner_percentage: u16,
    renter_refund_percentage: u16,
    reason: String,
}

#[derive(AnchorSerialize)]
struct NoArgs {}

/// Static description of the deployed rental program: its id plus the
/// platform-level accounts every flow touches.
#[derive(Debug, Clone)]
pub struct RentalProgram {
    pub program_id: Pubkey,
    pub usdc_mint: Pubkey,
    pub platform_admin: Pubkey,
}

impl RentalProgram {
    pub fn new(
        program_id: Pubkey,
        usdc_mint: Pubkey,
        platform_admin: Pubkey,
    ) -> Result<Self, Error> {
        for (name, key) in [
            ("program id", &program_id),
            ("USDC mint", &usdc_mint),
            ("platform admin", &platform_admin),
        ] {
            if *key == Pubkey::default() {
                return Err(Error::InvalidParameters(format!("{name} is unset")));
            }
        }
        Ok(Self {
            program_id,
            usdc_mint,
            platform_admin,
        })
    }

    fn check_product_id(&self, product_id: u64) -> Result<(), Error> {
        if product_id == 0 {
            return Err(Error::InvalidParameters(
                "product id must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    fn rental_accounts(&self, product_id: u64, renter: &Pubkey) -> (Pubkey, Pubkey) {
        let (rental_tx, _) = pda::find_rental_transaction(product_id, renter, &self.program_id);
        let (escrow, _) = pda::find_escrow_token(&rental_tx, &self.program_id);
        (rental_tx, escrow)
    }

    /// Initializes the rental transaction in `Created` state. Renter signs
    /// and pays for the account.
    #[allow(clippy::too_many_arguments)]
    pub fn create_rental_transaction(
        &self,
        renter: &Pubkey,
        product_id: u64,
        owner_wallet: &Pubkey,
        total_amount: u64,
        rental_start: i64,
        rental_end: i64,
        booking_id: &str,
    ) -> Result<Instruction, Error> {
        self.check_product_id(product_id)?;
        if total_amount == 0 {
            return Err(Error::InvalidParameters("amount must be non-zero".into()));
        }
        if rental_end <= rental_start {
            return Err(Error::InvalidParameters(
                "rental period must end after it starts".into(),
            ));
        }
        if booking_id.is_empty() || booking_id.len() > MAX_BOOKING_ID_LEN {
            return Err(Error::InvalidParameters(format!(
                "booking id must be 1..={MAX_BOOKING_ID_LEN} bytes"
            )));
        }

        let (rental_tx, _) = pda::find_rental_transaction(product_id, renter, &self.program_id);
        let args = CreateRentalTransactionArgs {
            product_id,
            owner_wallet: *owner_wallet,
            total_amount,
            rental_start,
            rental_end,
            booking_id: booking_id.to_string(),
        };

        Ok(Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(rental_tx, false),
                AccountMeta::new(*renter, true),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            data: encode("create_rental_transaction", &args)?,
        })
    }

    /// Moves `amount` USDC from the renter into escrow; transaction must be
    /// in `Created` state on chain.
    pub fn pay_rental(
        &self,
        renter: &Pubkey,
        product_id: u64,
        amount: u64,
    ) -> Result<Instruction, Error> {
        self.check_product_id(product_id)?;
        if amount == 0 {
            return Err(Error::InvalidParameters("amount must be non-zero".into()));
        }

        let (rental_tx, escrow) = self.rental_accounts(product_id, renter);
        let renter_token = get_associated_token_address(renter, &self.usdc_mint);

        Ok(Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(rental_tx, false),
                AccountMeta::new(escrow, false),
                AccountMeta::new(renter_token, false),
                AccountMeta::new_readonly(self.usdc_mint, false),
                AccountMeta::new(*renter, true),
                AccountMeta::new_readonly(spl_token::id(), false),
                AccountMeta::new_readonly(spl_associated_token_account::id(), false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            data: encode("pay_rental", &PayRentalArgs { amount })?,
        })
    }

    /// Releases escrow to the owner minus the platform fee. Either party
    /// (or the admin) may sign.
    pub fn complete_rental(
        &self,
        signer: &Pubkey,
        product_id: u64,
        renter: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Instruction, Error> {
        self.check_product_id(product_id)?;
        let (rental_tx, escrow) = self.rental_accounts(product_id, renter);
        let (global_state, _) = pda::find_global_state(&self.program_id);
        let owner_token = get_associated_token_address(owner, &self.usdc_mint);
        let admin_token = get_associated_token_address(&self.platform_admin, &self.usdc_mint);

        Ok(Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(rental_tx, false),
                AccountMeta::new(escrow, false),
                AccountMeta::new(owner_token, false),
                AccountMeta::new(admin_token, false),
                AccountMeta::new_readonly(global_state, false),
                AccountMeta::new_readonly(self.usdc_mint, false),
                AccountMeta::new_readonly(*signer, true),
                AccountMeta::new_readonly(spl_token::id(), false),
            ],
            data: encode("complete_rental", &NoArgs {})?,
        })
    }

    /// Closes a transaction that never received funds. Renter only.
    pub fn cancel_as_renter_created(
        &self,
        renter: &Pubkey,
        product_id: u64,
    ) -> Result<Instruction, Error> {
        self.check_product_id(product_id)?;
        let (rental_tx, _) = pda::find_rental_transaction(product_id, renter, &self.program_id);

        Ok(Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(rental_tx, false),
                AccountMeta::new(*renter, true),
            ],
            data: encode("cancel_as_renter_created", &NoArgs {})?,
        })
    }

    /// Refunds escrow to the renter for a paid transaction. Renter only.
    pub fn cancel_as_renter_paid(
        &self,
        renter: &Pubkey,
        product_id: u64,
    ) -> Result<Instruction, Error> {
        self.check_product_id(product_id)?;
        let (rental_tx, escrow) = self.rental_accounts(product_id, renter);
        let (global_state, _) = pda::find_global_state(&self.program_id);
        let renter_token = get_associated_token_address(renter, &self.usdc_mint);
        let admin_token = get_associated_token_address(&self.platform_admin, &self.usdc_mint);

        Ok(Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(rental_tx, false),
                AccountMeta::new(escrow, false),
                AccountMeta::new(renter_token, false),
                AccountMeta::new(admin_token, false),
                AccountMeta::new_readonly(global_state, false),
                AccountMeta::new(*renter, true),
                AccountMeta::new_readonly(self.usdc_mint, false),
                AccountMeta::new_readonly(spl_token::id(), false),
            ],
            data: encode("cancel_as_renter_paid", &NoArgs {})?,
        })
    }

    /// Owner-initiated refund of a paid transaction back to the renter.
    pub fn cancel_as_owner(
        &self,
        owner: &Pubkey,
        product_id: u64,
        renter: &Pubkey,
    ) -> Result<Instruction, Error> {
        self.check_product_id(product_id)?;
        let (rental_tx, escrow) = self.rental_accounts(product_id, renter);
        let renter_token = get_associated_token_address(renter, &self.usdc_mint);

        Ok(Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(rental_tx, false),
                AccountMeta::new(escrow, false),
                AccountMeta::new(renter_token, false),
                AccountMeta::new_readonly(self.usdc_mint, false),
                AccountMeta::new(*owner, true),
                AccountMeta::new_readonly(spl_token::id(), false),
            ],
            data: encode("cancel_as_owner", &NoArgs {})?,
        })
    }

    /// Splits escrow between owner and renter by basis points; the
    /// remainder is the platform fee. Admin only, dispute resolution.
    #[allow(clippy::too_many_arguments)]
    pub fn admin_intervene(
        &self,
        admin: &Pubkey,
        product_id: u64,
        renter: &Pubkey,
        owner: &Pubkey,
        owner_percentage: u16,
        renter_refund_percentage: u16,
        reason: &str,
    ) -> Result<Instruction, Error> {
        self.check_product_id(product_id)?;
        if owner_percentage
            .checked_add(renter_refund_percentage)
            .map_or(true, |total| total > BPS_DENOMINATOR)
        {
            return Err(Error::InvalidParameters(format!(
                "percentages must sum to at most {BPS_DENOMINATOR} basis points"
            )));
        }
        if reason.len() > MAX_REASON_LEN {
            return Err(Error::InvalidParameters(format!(
                "reason must be at most {MAX_REASON_LEN} bytes"
            )));
        }

        let (rental_tx, escrow) = self.rental_accounts(product_id, renter);
        let (global_state, _) = pda::find_global_state(&self.program_id);
        let owner_token = get_associated_token_address(owner, &self.usdc_mint);
        let renter_token = get_associated_token_address(renter, &self.usdc_mint);
        let admin_token = get_associated_token_address(&self.platform_admin, &self.usdc_mint);

        let args = AdminInterveneArgs {
            owner_percentage,
            renter_refund_percentage,
            reason: reason.to_string(),
        };

        Ok(Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(rental_tx, false),
                AccountMeta::new(escrow, false),
                AccountMeta::new(owner_token, false),
                AccountMeta::new(renter_token, false),
                AccountMeta::new(admin_token, false),
                AccountMeta::new_readonly(global_state, false),
                AccountMeta::new_readonly(self.usdc_mint, false),
                AccountMeta::new_readonly(*admin, true),
                AccountMeta::new_readonly(spl_token::id(), false),
            ],
            data: encode("admin_intervene", &args)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> RentalProgram {
        RentalProgram::new(
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_unset_keys() {
        let err = RentalProgram::new(
            Pubkey::default(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)));
    }

    #[test]
    fn create_is_deterministic_and_well_formed() {
        let program = program();
        let renter = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let build = || {
            program
                .create_rental_transaction(&renter, 42, &owner, 50_000, 1_000, 2_000, "booking-1")
                .unwrap()
        };
        let ix = build();
        assert_eq!(ix, build());
        assert_eq!(ix.program_id, program.program_id);
        assert_eq!(ix.accounts.len(), 3);

        let (rental_tx, _) =
            pda::find_rental_transaction(42, &renter, &program.program_id);
        assert_eq!(ix.accounts[0].pubkey, rental_tx);
        assert!(ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[1].pubkey, renter);
        assert!(ix.accounts[1].is_signer);
        assert_eq!(ix.accounts[2].pubkey, system_program::id());

        assert_eq!(&ix.data[..8], &discriminator("create_rental_transaction"));
        assert!(ix.data.len() > 8);
    }

    #[test]
    fn create_validates_parameters() {
        let program = program();
        let renter = Pubkey::new_unique();
        let owner = Pubkey::new_unique();

        let zero_product =
            program.create_rental_transaction(&renter, 0, &owner, 50_000, 1, 2, "b");
        assert!(matches!(zero_product, Err(Error::InvalidParameters(_))));

        let zero_amount = program.create_rental_transaction(&renter, 42, &owner, 0, 1, 2, "b");
        assert!(matches!(zero_amount, Err(Error::InvalidParameters(_))));

        let inverted_period =
            program.create_rental_transaction(&renter, 42, &owner, 50_000, 2, 1, "b");
        assert!(matches!(inverted_period, Err(Error::InvalidParameters(_))));

        let long_id = "x".repeat(MAX_BOOKING_ID_LEN + 1);
        let too_long =
            program.create_rental_transaction(&renter, 42, &owner, 50_000, 1, 2, &long_id);
        assert!(matches!(too_long, Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn pay_routes_funds_through_the_escrow_pda() {
        let program = program();
        let renter = Pubkey::new_unique();
        let ix = program.pay_rental(&renter, 42, 50_000).unwrap();

        let (rental_tx, _) =
            pda::find_rental_transaction(42, &renter, &program.program_id);
        let (escrow, _) = pda::find_escrow_token(&rental_tx, &program.program_id);
        let renter_token = get_associated_token_address(&renter, &program.usdc_mint);

        assert_eq!(ix.accounts.len(), 8);
        assert_eq!(ix.accounts[0].pubkey, rental_tx);
        assert_eq!(ix.accounts[1].pubkey, escrow);
        assert_eq!(ix.accounts[2].pubkey, renter_token);
        assert_eq!(ix.accounts[4].pubkey, renter);
        assert!(ix.accounts[4].is_signer);
        assert_eq!(&ix.data[..8], &discriminator("pay_rental"));
    }

    #[test]
    fn complete_pays_owner_and_platform() {
        let program = program();
        let renter = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let ix = program
            .complete_rental(&owner, 42, &renter, &owner)
            .unwrap();

        let owner_token = get_associated_token_address(&owner, &program.usdc_mint);
        let admin_token =
            get_associated_token_address(&program.platform_admin, &program.usdc_mint);
        assert_eq!(ix.accounts.len(), 8);
        assert_eq!(ix.accounts[2].pubkey, owner_token);
        assert_eq!(ix.accounts[3].pubkey, admin_token);
        assert_eq!(ix.accounts[6].pubkey, owner);
        assert!(ix.accounts[6].is_signer);
        assert!(!ix.accounts[6].is_writable);
        assert_eq!(&ix.data[..8], &discriminator("complete_rental"));
        // no args beyond the discriminator
        assert_eq!(ix.data.len(), 8);
    }

    #[test]
    fn cancel_variants_use_distinct_discriminators() {
        let program = program();
        let renter = Pubkey::new_unique();
        let owner = Pubkey::new_unique();

        let created = program.cancel_as_renter_created(&renter, 42).unwrap();
        let paid = program.cancel_as_renter_paid(&renter, 42).unwrap();
        let by_owner = program.cancel_as_owner(&owner, 42, &renter).unwrap();

        assert_eq!(created.accounts.len(), 2);
        assert_eq!(paid.accounts.len(), 8);
        assert_eq!(by_owner.accounts.len(), 6);

        assert_ne!(created.data, paid.data);
        assert_ne!(paid.data, by_owner.data);
        assert_eq!(
            &created.data[..8],
            &discriminator("cancel_as_renter_created")
        );
        assert_eq!(&paid.data[..8], &discriminator("cancel_as_renter_paid"));
        assert_eq!(&by_owner.data[..8], &discriminator("cancel_as_owner"));
    }

    #[test]
    fn admin_intervene_validates_split() {
        let program = program();
        let admin = Pubkey::new_unique();
        let renter = Pubkey::new_unique();
        let owner = Pubkey::new_unique();

        let over = program.admin_intervene(&admin, 42, &renter, &owner, 6_000, 5_000, "dispute");
        assert!(matches!(over, Err(Error::InvalidParameters(_))));

        let long_reason = "r".repeat(MAX_REASON_LEN + 1);
        let too_long =
            program.admin_intervene(&admin, 42, &renter, &owner, 5_000, 4_000, &long_reason);
        assert!(matches!(too_long, Err(Error::InvalidParameters(_))));

        let ok = program
            .admin_intervene(&admin, 42, &renter, &owner, 5_000, 4_000, "damaged item")
            .unwrap();
        assert_eq!(ok.accounts.len(), 9);
        assert_eq!(ok.accounts[7].pubkey, admin);
        assert!(ok.accounts[7].is_signer);
        assert_eq!(&ok.data[..8], &discriminator("admin_intervene"));
    }

    #[test]
    fn minor_units_convert_to_usdc() {
        assert_eq!(minor_to_usdc(50_000), 0.05);
        assert_eq!(minor_to_usdc(12_500_000), 12.5);
    }
}
