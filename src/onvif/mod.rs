pub mod analytics;
pub mod auth;
pub mod device;
pub mod soap;
pub mod types;
