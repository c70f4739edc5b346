pub mod admin;
pub mod common;
pub mod health;
pub mod sse;
pub mod validation;
pub mod ws;
