//! HTTP API handlers for rollcall-kiosk

pub mod attendance;
pub mod health;
pub mod keypad;
pub mod roster;
pub mod sse;

pub use attendance::attendance_routes;
pub use health::health_routes;
pub use keypad::keypad_routes;
pub use roster::roster_routes;
pub use sse::event_stream;
