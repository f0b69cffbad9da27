use std::sync::Arc;

use crate::{auth::TokenAuthority, config::AppSettings, repository::SqliteRepository};

#[derive(Debug, Clone)]
pub struct AppState {
    pub repository: SqliteRepository,
    pub authority: TokenAuthority,
}

/// Connect to the database and build the token authority on top of its
/// blocklist table.
pub async fn init_state_with_sqlite(config: &AppSettings) -> Result<AppState, sqlx::Error> {
    let repository = SqliteRepository::connect(&config.database).await?;
    let authority = TokenAuthority::new(&config.jwt, Arc::new(repository.clone()));

    Ok(AppState {
        repository,
        authority,
    })
}
