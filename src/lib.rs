pub mod browser;
pub mod core;
pub mod dom;
pub mod errors;
pub mod testing;
pub mod types;
pub mod utils;

pub use browser::{BrowserSession, HttpTransport, Page};
pub use core::{BrowserConfig, Transport};
pub use dom::Document;
pub use errors::{BrowserError, Result};
pub use types::*;
