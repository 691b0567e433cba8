pub mod bridge;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod intent;
pub mod oracle;
pub mod respond;
pub mod session;
pub mod shared;
pub mod validate;
