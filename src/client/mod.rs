//! Console-side access to the entity API.
//!
//! - `transport.rs` - `EntityTransport` seam and the in-process transport
//! - `http.rs` - reqwest transport and server error extraction
//! - `notification.rs` - error to user notification
//! - `editor.rs` - form, patch builder and cache wired into one editor

mod editor;
mod http;
mod notification;
mod transport;

pub use editor::{EntityEditor, SaveOutcome};
pub use http::{
    HttpTransport, SEAT_ASSIGNMENTS_PATH, SEAT_PLAN_PATH, error_from_response, error_message,
};
pub use notification::{Notification, NotificationLevel};
pub use transport::{EntityTransport, LocalTransport};
