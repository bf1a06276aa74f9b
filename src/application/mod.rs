// Application layer - Use cases over the monitor repository
pub mod chart_service;
pub mod export;
pub mod live_service;
pub mod monitor_repository;
pub mod monitor_service;
