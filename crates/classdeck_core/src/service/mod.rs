//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep host and UI layers decoupled from storage details.

pub mod board_service;
