use std::net::SocketAddr;
use std::sync::Arc;

use diesel::prelude::*;

mod booking;
mod cancellation;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod schema;
mod solana;
mod store;

use handlers::AppState;
use solana::instructions::RentalProgram;
use solana::provider::RpcChain;
use store::PgStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let config = config::AppConfig::load()?;

    // Fail fast if the database is unreachable.
    let mut conn = db::establish_connection(&config.database_url)?;
    let test_query: i32 = diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("1"))
        .get_result(&mut conn)?;
    log::info!("Database test query result: {}", test_query);

    let program = RentalProgram::new(config.program_id, config.usdc_mint, config.platform_admin)?;
    log::info!("Rental program ID: {}", program.program_id);

    let state = AppState {
        store: Arc::new(PgStore::new(config.database_url.clone())),
        chain: Arc::new(RpcChain::new(&config.solana_rpc_url)),
        program,
    };
    let app = handlers::router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    log::info!("Starting server on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;

    Ok(())
}
