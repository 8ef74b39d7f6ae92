pub mod assess;
pub mod config;
pub mod plan;
pub mod session;
