pub mod cli;
pub mod config;
mod db;
pub mod embed;
pub mod errors;
pub mod index;
pub mod matchdb;
mod metrics;
mod server;
pub mod utils;

pub use config::Opts;
pub use matchdb::{MatchDB, MatchDBBuilder};
