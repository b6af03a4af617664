//! Per-invocation retrieval state.

use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use gzwater_api::{Endpoints, Session};
use secrecy::{ExposeSecret, SecretString};

/// Subscriber credentials for the portal login.
#[derive(Clone)]
pub struct Credentials {
    pub account_id: String,
    password: SecretString,
}

impl Credentials {
    pub fn new(account_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Body for the login POST. The password only leaves the secret wrapper here.
    pub fn login_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "account": self.account_id,
            "password": self.password.expose_secret(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Per-call timeouts for each kind of request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Primary query and the bill query after login.
    pub primary: Duration,
    /// Alternate queries and the login POST.
    pub alternate: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            primary: Duration::from_secs(15),
            alternate: Duration::from_secs(10),
        }
    }
}

/// Everything one run of the strategy chain needs.
///
/// Built fresh for each pipeline invocation and dropped afterwards.
#[derive(Debug, Clone)]
pub struct RetrievalContext {
    pub credentials: Credentials,
    pub session: Session,
    pub endpoints: Endpoints,
    pub timeouts: Timeouts,
    /// Acquisition date, used when a source gives no bill date.
    pub today: NaiveDate,
}

impl RetrievalContext {
    pub fn new(credentials: Credentials, session: Session, endpoints: Endpoints) -> Self {
        Self {
            credentials,
            session,
            endpoints,
            timeouts: Timeouts::default(),
            today: chrono::Local::now().date_naive(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }
}
