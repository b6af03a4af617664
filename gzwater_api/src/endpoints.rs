//! URL construction for the Guangzhou water supply service portal.

use url::Url;

use crate::Error;

/// Production host of the service portal.
pub const DEFAULT_BASE_URL: &str = "https://service.gzwatersupply.com";

const PRIMARY_PATH: &str = "/api/gsxmcp/rg/um/v1.0/user/bindPage";
const LOGIN_PATH: &str = "/api/login";
const BILL_QUERY_PATH: &str = "/api/bill/query";
const LEGACY_BILL_QUERY_PATH: &str = "/bill/query";
const USER_BILLS_PATH: &str = "/api/user/bills";

/// The set of portal endpoints the acquisition chain talks to.
///
/// All URLs hang off a single base URL so tests can point the whole set
/// at a wiremock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new()
    }
}

impl Endpoints {
    /// Creates the endpoint set for the production portal.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Creates the endpoint set under a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Url::parse(format!("{}{}", &self.base_url, path).as_str()).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::from(e)
        })
    }

    fn url_for_account(&self, path: &str, account_id: &str) -> Result<Url, Error> {
        let mut url = self.url(path)?;
        url.query_pairs_mut().append_pair("account", account_id);
        Ok(url)
    }

    /// The primary bound-account query used with a cached session cookie.
    pub fn primary(&self) -> Result<Url, Error> {
        let mut url = self.url(PRIMARY_PATH)?;
        url.query_pairs_mut()
            .append_pair("meter", "hide")
            .append_pair("pageSize", "10")
            .append_pair("pageNumber", "1");
        Ok(url)
    }

    /// Alternate bill queries, in the order they should be tried.
    pub fn alternates(&self, account_id: &str) -> Result<Vec<Url>, Error> {
        Ok(vec![
            self.url_for_account(BILL_QUERY_PATH, account_id)?,
            self.url(LEGACY_BILL_QUERY_PATH)?,
            self.url_for_account(USER_BILLS_PATH, account_id)?,
        ])
    }

    /// Credential login endpoint.
    pub fn login(&self) -> Result<Url, Error> {
        self.url(LOGIN_PATH)
    }

    /// Bill query issued after a successful login.
    pub fn authenticated_bill(&self) -> Result<Url, Error> {
        self.url(BILL_QUERY_PATH)
    }
}
