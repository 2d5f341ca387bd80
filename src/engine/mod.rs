pub mod config;
pub mod error;
pub mod filter;
pub mod pipeline;

pub use config::AppConfig;
pub use filter::Filter;
