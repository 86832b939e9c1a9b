pub mod config;
pub mod generate;
pub mod sanitize;
pub mod serve;
pub mod wait;
