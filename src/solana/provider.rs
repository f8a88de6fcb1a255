//! Wallet and RPC boundaries, injected into the coordinators so they can
//! be driven by mocks in tests instead of module-level singletons.

use std::str::FromStr;

use solana_rpc_client::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::error::Error;

/// The connected wallet: exposes the signer key and prompts the user to
/// sign and submit. The coordinators treat this as an opaque boundary.
pub trait WalletProvider: Send + Sync {
    fn pubkey(&self) -> Option<Pubkey>;

    /// Prompts for a signature and submits to the network. Implementations
    /// surface a dismissed prompt as `Error::SignatureRejected`, which is an
    /// outcome rather than a fault.
    fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, Error>;
}

pub fn connected_key(wallet: &dyn WalletProvider) -> Result<Pubkey, Error> {
    wallet.pubkey().ok_or(Error::WalletNotConnected)
}

/// Read-side chain access used to gate off-chain status updates on
/// on-chain confirmation.
pub trait ChainRpc: Send + Sync {
    /// Whether the given signature has reached the configured commitment.
    fn confirm_transaction(&self, signature: &str) -> Result<bool, Error>;
}

pub struct RpcChain {
    rpc: RpcClient,
}

impl RpcChain {
    pub fn new(rpc_url: &str) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(
                rpc_url.to_string(),
                CommitmentConfig::confirmed(),
            ),
        }
    }
}

impl ChainRpc for RpcChain {
    fn confirm_transaction(&self, signature: &str) -> Result<bool, Error> {
        let signature = Signature::from_str(signature)
            .map_err(|e| Error::Validation(format!("invalid transaction signature: {e}")))?;
        self.rpc
            .confirm_transaction(&signature)
            .map_err(|e| Error::Chain(e.to_string()))
    }
}
