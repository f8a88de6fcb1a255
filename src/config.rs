use std::env;
use std::str::FromStr;

use dotenv::dotenv;
use solana_sdk::pubkey::Pubkey;

// Devnet defaults matching the deployed program and platform wallets.
const DEFAULT_PROGRAM_ID: &str = "31f4RcqyuAjnMz6AZZbZ6Tt7VUMjENHc5rSP8MYMc3Qt";
const DEFAULT_USDC_MINT: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";
const DEFAULT_PLATFORM_ADMIN: &str = "3Jcx1Ntm4DBpkg9VRuLPrecU5C2XmdoSeqCDTkg1K91D";
const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub solana_rpc_url: String,
    pub program_id: Pubkey,
    pub usdc_mint: Pubkey,
    pub platform_admin: Pubkey,
    pub port: u16,
}

impl AppConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv().ok(); // Load .env file if present
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            solana_rpc_url: env::var("SOLANA_RPC_URL")
                .unwrap_or_else(|_| DEFAULT_RPC_URL.to_string()),
            program_id: pubkey_var("KAIRORIA_PROGRAM_ID", DEFAULT_PROGRAM_ID)?,
            usdc_mint: pubkey_var("USDC_MINT", DEFAULT_USDC_MINT)?,
            platform_admin: pubkey_var("PLATFORM_ADMIN_WALLET", DEFAULT_PLATFORM_ADMIN)?,
            port: env::var("PORT").unwrap_or_else(|_| "8080".to_string()).parse()?,
        })
    }
}

fn pubkey_var(name: &str, default: &str) -> Result<Pubkey, Box<dyn std::error::Error>> {
    let value = env::var(name).unwrap_or_else(|_| default.to_string());
    Ok(Pubkey::from_str(&value)?)
}
