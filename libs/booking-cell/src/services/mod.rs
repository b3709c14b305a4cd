pub mod access;
pub mod audit;
pub mod booking;
pub mod intake;
pub mod progress;
pub mod queries;
