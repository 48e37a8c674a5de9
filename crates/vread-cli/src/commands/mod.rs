pub mod companion;
pub mod config;
pub mod stages;
