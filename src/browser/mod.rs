//! Browser session management: launching or attaching to Chrome, capturing
//! snapshots of the active tab and drawing highlight overlays.

pub mod config;
pub mod overlay;
pub mod session;

pub use config::{ConnectionOptions, LaunchOptions};
pub use session::BrowserSession;
