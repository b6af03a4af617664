//! Request headers that make up a portal session.

use std::fmt;

/// User agent of the WeChat mini-program the portal is built for.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 18_6_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148 MicroMessenger/8.0.65(0x1800412b) NetType/WIFI Language/zh_CN";

/// Referer the mini-program sends with every request.
pub const DEFAULT_REFERER: &str = "https://servicewechat.com/wx57c5715fd3a99e4a/171/page-frame.html";

/// Header set for requests that reuse an existing portal session.
///
/// The cookie is supplied by the host configuration and is never
/// printed by `Debug`.
#[derive(Clone)]
pub struct Session {
    cookie: Option<String>,
    user_agent: String,
    referer: String,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            cookie: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("cookie", &self.cookie.as_ref().map(|_| "[redacted]"))
            .field("user_agent", &self.user_agent)
            .field("referer", &self.referer)
            .finish()
    }
}

impl Session {
    pub fn new(cookie: Option<String>) -> Self {
        Self {
            cookie: cookie.filter(|c| !c.trim().is_empty()),
            ..Self::default()
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    pub fn has_cookie(&self) -> bool {
        self.cookie.is_some()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Headers attached to every session-bearing request.
    pub fn headers(&self) -> Vec<(&'static str, &str)> {
        let mut headers = vec![
            ("user-agent", self.user_agent.as_str()),
            ("referer", self.referer.as_str()),
            ("content-type", "application/json"),
            ("accept", "*/*"),
        ];
        if let Some(cookie) = &self.cookie {
            headers.push(("cookie", cookie.as_str()));
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_cookie() {
        let session = Session::new(Some("caf_web_session=secret-value".to_string()));
        let printed = format!("{:?}", session);
        assert!(!printed.contains("secret-value"));
        assert!(printed.contains("[redacted]"));
    }

    #[test]
    fn blank_cookie_is_no_cookie() {
        assert!(!Session::new(Some("   ".to_string())).has_cookie());
        assert!(!Session::new(None).has_cookie());
    }

    #[test]
    fn headers_include_cookie_only_when_present() {
        let with = Session::new(Some("a=b".to_string()));
        assert!(with.headers().iter().any(|(k, v)| *k == "cookie" && *v == "a=b"));
        let without = Session::default();
        assert!(!without.headers().iter().any(|(k, _)| *k == "cookie"));
    }
}
