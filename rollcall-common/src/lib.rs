//! # Rollcall Common Library
//!
//! Shared code for the rollcall kiosk services including:
//! - Event types (KioskEvent enum) and the EventBus
//! - Configuration loading and resolution
//! - Common error types
//! - Timestamp and calendar-day utilities

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
