use sqlx::{Pool, Postgres};

use crate::error::Error;

pub mod collections;
pub mod import;
pub mod ingredients;
pub mod recipes;
pub mod shopping_list;
pub mod subscriptions;
pub mod tags;
pub mod users;

pub use collections::*;
pub use import::*;
pub use ingredients::*;
pub use recipes::*;
pub use shopping_list::*;
pub use subscriptions::*;
pub use tags::*;
pub use users::*;

/// Applies every pending migration from `migrations/`.
pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(sqlx::Error::from)?;

    log::info!("Database migrations applied");
    Ok(())
}
