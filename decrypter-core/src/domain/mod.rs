//! Core domain types
//!
//! These types describe a solving job as the front end sees it. They are
//! produced by the client crate from wire DTOs and consumed by the controller.

pub mod log;
pub mod task;
