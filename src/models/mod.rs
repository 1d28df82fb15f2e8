pub mod appointment;
pub mod auth;
pub mod role;
pub mod session;
