// Domain layer - Chart models and the pure cycle/window logic
pub mod cycle;
pub mod dashboard;
pub mod error;
pub mod monitor;
pub mod reading;
pub mod window;
