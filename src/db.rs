use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::error::Error;

pub fn establish_connection(database_url: &str) -> Result<PgConnection, Error> {
    PgConnection::establish(database_url).map_err(|e| {
        log::error!("failed to establish database connection: {}", e);
        Error::Store(format!("database connection failed: {e}"))
    })
}
