pub mod cli;
pub mod config;
pub mod crud;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod store;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{EtlError, StoreError};
