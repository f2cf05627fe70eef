pub mod dispatch;
pub mod forms;
pub mod http;
pub mod login;
pub mod rate_limit;
pub mod session;

pub use dispatch::Dispatch;
pub use http::HttpTransport;
pub use rate_limit::RateLimiter;
pub use session::{BrowserSession, Page};
