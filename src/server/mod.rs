//! Server module for Conclave
//!
//! # Module Structure
//!
//! - `config`: Configuration structures for the server and its components
//! - `loader`: Configuration loading from files and environment
//! - `shutdown`: OS signal handling for graceful shutdown
//! - `init`: Server initialization and run loop

pub mod config;
mod init;
mod loader;
mod shutdown;

pub use init::run;
pub use loader::load_config;
pub use shutdown::wait_for_shutdown_signal;
