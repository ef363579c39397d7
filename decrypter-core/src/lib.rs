//! Decrypter Core
//!
//! Core types shared by the solver client and the console front end.
//!
//! This crate contains:
//! - Domain types: the job handle, its status, progress log and final outcome
//! - DTOs: the wire shapes of the remote solver service

pub mod domain;
pub mod dto;
