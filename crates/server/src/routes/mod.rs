pub mod health;
pub mod otp;
pub mod stats;
