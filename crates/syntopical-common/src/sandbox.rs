use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::error::SyntopicalError;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client that only talks to approved hosts.
///
/// The default allowlist covers arXiv, the OpenAI API and local services
/// (Ollama, test servers). Callers pointing at a custom endpoint add its host
/// with [`SandboxClient::allow_url`].
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    pub fn new() -> Result<Self, SyntopicalError> {
        let domains = [
            "arxiv.org",        // PDFs (and any *.arxiv.org mirror)
            "export.arxiv.org", // Atom search API
            "api.openai.com",   // Embeddings / chat
            "localhost",        // Ollama
            "127.0.0.1",
        ];
        let allowlist = domains.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            // Connect only: a large PDF may take minutes to stream.
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("syntopical/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, allowlist })
    }

    /// Allows the host of `url`. Unparseable URLs are ignored; the request
    /// itself will fail later with a clearer error.
    pub fn allow_url(&mut self, url: &str) {
        if let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(String::from)) {
            self.allowlist.insert(host);
        }
    }

    /// Exact host match, or a subdomain of an allowed host.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{allowed}")))
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, SyntopicalError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, SyntopicalError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }

    fn check(&self, url: &str) -> Result<(), SyntopicalError> {
        if self.is_allowed(url) {
            Ok(())
        } else {
            tracing::warn!(url, "Blocked request to host outside the allowlist");
            Err(SyntopicalError::Sandbox(format!(
                "domain not in allowlist for URL {url}"
            )))
        }
    }
}
