//! Client-side plumbing for the Kairoria rental program: address
//! derivation, unsigned instruction construction, and the wallet/RPC
//! boundary traits. Nothing in here signs or submits anything.

pub mod instructions;
pub mod pda;
pub mod provider;
