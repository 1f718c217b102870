pub mod cookie_jar;
pub mod http;
pub mod session_client;

pub use cookie_jar::CookieJar;
pub use http::{HttpMethod, PortalRequest, RawPortalResponse};
pub use session_client::SessionClient;
