mod blocking;
mod http;
mod traits;

#[cfg(feature = "test-helpers")]
pub mod stub;

pub use blocking::BlockingService;
pub use http::HttpService;
pub use traits::{ServiceError, StaticToken, TodoService, TokenProvider};
