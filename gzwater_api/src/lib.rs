mod client;
mod endpoints;
mod errors;
mod session;
mod transport;
pub use self::client::{HttpConnector, HttpTransport};
pub use self::endpoints::{Endpoints, DEFAULT_BASE_URL};
pub use self::errors::Error;
pub use self::session::{Session, DEFAULT_REFERER, DEFAULT_USER_AGENT};
pub use self::transport::{Connector, HttpResponse, Transport};
