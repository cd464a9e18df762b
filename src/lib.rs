pub mod catalog;
pub mod cli;
pub mod color;
pub mod config;
pub mod db;
pub mod distance;
pub mod embed;
pub mod error;
pub mod hsl;
pub mod kmeans;
mod metrics;
pub mod radar;
pub mod search;
pub mod server;
pub mod transform;
pub mod utils;

pub use config::Opts;
pub use error::{Result, SearchError};
pub use search::{VectorSearch, VectorSearchBuilder};
