mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod schema;
    pub mod validation;
}
mod authentication {
    pub mod cryptography;
    pub mod permissions;
    pub mod session;
}
mod config;
mod constants;
pub mod export;

mod cache {
    pub mod cache;
}

pub use actions::*;
pub use authentication::*;
pub use cache::cache::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use error::Error;
