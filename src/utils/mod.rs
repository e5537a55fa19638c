pub mod error;
pub mod fs;
pub mod logger;
pub mod monitor;
pub mod validation;
