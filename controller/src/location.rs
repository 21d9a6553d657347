use std::fmt;
use url::Url;

/// The page address the panel was loaded from.
///
/// Wraps a parsed absolute URL so the controller can read the protocol,
/// hostname and path the way a browser location exposes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    url: Url,
}

impl PageLocation {
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        Url::parse(raw).map(|url| Self { url })
    }

    pub fn from_url(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Scheme followed by a colon, e.g. `https:`.
    pub fn protocol(&self) -> String {
        format!("{}:", self.url.scheme())
    }

    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }

    pub fn hostname(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Hostname plus an explicit port, if the URL carries one.
    pub fn host(&self) -> String {
        match self.url.port() {
            Some(port) => format!("{}:{port}", self.hostname()),
            None => self.hostname().to_string(),
        }
    }

    pub fn pathname(&self) -> &str {
        self.url.path()
    }

    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Same location with a different path; query and fragment are kept.
    pub fn with_pathname(&self, pathname: &str) -> Self {
        let mut url = self.url.clone();
        url.set_path(pathname);
        Self { url }
    }

    /// Same location with the named query parameters removed.
    pub fn without_params(&self, names: &[&str]) -> Self {
        let kept: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(key, _)| !names.contains(&key.as_ref()))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        let mut url = self.url.clone();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
        Self { url }
    }

    /// Resolve a path against the page origin.
    pub fn join(&self, path: &str) -> Result<Url, url::ParseError> {
        self.url.join(path)
    }
}

impl fmt::Display for PageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}
