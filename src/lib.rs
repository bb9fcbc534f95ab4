pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod scoring;
pub mod server;
pub mod service;
pub mod sheet;
pub mod store;

pub use error::{Error, Result};
