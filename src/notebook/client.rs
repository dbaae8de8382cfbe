//! Blocking HTTP client for the notebook pages. One GET per call, cookie sent as a header, no retries.

use crate::notebook::error::FetchError;
use crate::notebook::NotebookSource;
use reqwest::header::{HeaderValue, COOKIE};
use reqwest::Url;
use std::fmt;

/// Notebook landing page. Lists the library and, with `?asin=`, one book's annotations.
pub const DEFAULT_ENDPOINT: &str = "https://read.amazon.com/notebook";

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const MAX_REDIRECTS: usize = 10;

/// Session cookie copied from a signed-in browser. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(cookie: impl Into<String>) -> Self {
        Self(cookie.into().trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn header_value(&self) -> Result<HeaderValue, FetchError> {
        let mut value =
            HeaderValue::from_str(&self.0).map_err(|_| FetchError::InvalidCredential)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Client bound to one notebook endpoint.
#[derive(Debug)]
pub struct NotebookClient {
    inner: reqwest::blocking::Client,
    endpoint: Url,
}

impl NotebookClient {
    pub fn builder() -> NotebookClientBuilder {
        NotebookClientBuilder::default()
    }

    /// Bind a credential to this client for the two page fetches of a run.
    pub fn session<'a>(&'a self, credential: &'a Credential) -> Session<'a> {
        Session {
            client: self,
            credential,
        }
    }

    /// Library page URL; annotation pages add an `asin` query to it.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// URL of the annotation page for one book: `{endpoint}?asin={asin}&contentLimitState=`.
    pub fn annotations_url(&self, asin: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("asin", asin)
            .append_pair("contentLimitState", "");
        url
    }

    /// GET the library page.
    pub fn fetch_library(&self, credential: &Credential) -> Result<String, FetchError> {
        let url = self.endpoint.clone();
        self.fetch(url, credential)
    }

    /// GET the annotation page for the book identified by `asin`.
    pub fn fetch_annotations(
        &self,
        asin: &str,
        credential: &Credential,
    ) -> Result<String, FetchError> {
        self.fetch(self.annotations_url(asin), credential)
    }

    /// Send one GET with the cookie header. Non-success status is an error; the body is returned as text.
    pub fn fetch(&self, url: Url, credential: &Credential) -> Result<String, FetchError> {
        let cookie = credential.header_value()?;
        tracing::debug!("GET {}", url);
        let response = self
            .inner
            .get(url.clone())
            .header(COOKIE, cookie)
            .send()
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                source: e,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        response
            .text()
            .map_err(|e| FetchError::BodyRead { source: e })
    }
}

/// A client plus the cookie it sends. The pipeline reads pages through this.
#[derive(Debug, Clone, Copy)]
pub struct Session<'a> {
    client: &'a NotebookClient,
    credential: &'a Credential,
}

impl NotebookSource for Session<'_> {
    fn library_page(&self) -> Result<String, FetchError> {
        self.client.fetch_library(self.credential)
    }

    fn annotations_page(&self, asin: &str) -> Result<String, FetchError> {
        self.client.fetch_annotations(asin, self.credential)
    }
}

/// Builder for [NotebookClient] with optional endpoint, User-Agent and proxy settings.
#[derive(Debug)]
pub struct NotebookClientBuilder {
    endpoint: String,
    user_agent: Option<String>,
    use_env_proxy: bool,
}

impl Default for NotebookClientBuilder {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: None,
            use_env_proxy: true,
        }
    }
}

impl NotebookClientBuilder {
    /// Override the notebook URL (regional stores, local mirrors).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set a custom User-Agent. If not set, a browser-like default is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Ignore proxy settings from the environment.
    pub fn no_proxy(mut self) -> Self {
        self.use_env_proxy = false;
        self
    }

    pub fn build(self) -> Result<NotebookClient, FetchError> {
        let endpoint = Url::parse(&self.endpoint).map_err(|e| FetchError::InvalidUrl {
            input: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if endpoint.cannot_be_a_base() || endpoint.host_str().is_none() {
            return Err(FetchError::InvalidUrl {
                input: self.endpoint,
                reason: "URL has no host".to_string(),
            });
        }
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));
        if !self.use_env_proxy {
            builder = builder.no_proxy();
        }
        let inner = builder.build().map_err(|e| FetchError::Network {
            url: endpoint.to_string(),
            source: e,
        })?;
        Ok(NotebookClient { inner, endpoint })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Serve exactly one canned response on a local port. The handle yields the raw request.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = stream.read(&mut chunk).expect("read request");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let response = format!(
                "{}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).expect("write response");
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{}/notebook", addr), handle)
    }

    fn client_for(endpoint: &str) -> NotebookClient {
        NotebookClient::builder()
            .endpoint(endpoint)
            .no_proxy()
            .build()
            .expect("build client")
    }

    #[test]
    fn annotations_url_appends_asin_query() {
        let client = client_for("https://read.amazon.com/notebook");
        assert_eq!(
            client.annotations_url("B00TEST123").as_str(),
            "https://read.amazon.com/notebook?asin=B00TEST123&contentLimitState="
        );
    }

    #[test]
    fn annotations_url_encodes_asin() {
        let client = client_for("https://read.amazon.com/notebook");
        let url = client.annotations_url("a b&c");
        assert_eq!(url.query(), Some("asin=a+b%26c&contentLimitState="));
    }

    #[test]
    fn default_endpoint_is_kindle_notebook() {
        let client = NotebookClient::builder().no_proxy().build().expect("build client");
        assert_eq!(client.endpoint().as_str(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn build_rejects_invalid_endpoint() {
        let result = NotebookClient::builder().endpoint("not a url").build();
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("session-id=secret");
        assert_eq!(format!("{:?}", credential), "Credential(<redacted>)");
    }

    #[test]
    fn credential_with_newline_is_rejected() {
        let client = client_for("http://127.0.0.1:9/notebook");
        let credential = Credential::new("a=1\nb=2");
        let result = client.fetch_library(&credential);
        assert!(matches!(result, Err(FetchError::InvalidCredential)));
    }

    #[test]
    fn fetch_library_sends_cookie_and_returns_body() -> Result<(), FetchError> {
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", "<html>library</html>");
        let client = client_for(&endpoint);
        let body = client.fetch_library(&Credential::new("session-id=abc; ubid=xyz"))?;
        assert_eq!(body, "<html>library</html>");
        let request = server.join().expect("stub server thread").to_ascii_lowercase();
        assert!(request.starts_with("get /notebook http/1.1"));
        assert!(request.contains("cookie: session-id=abc; ubid=xyz"));
        Ok(())
    }

    #[test]
    fn fetch_annotations_requests_book_page() -> Result<(), FetchError> {
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", "<html>notes</html>");
        let client = client_for(&endpoint);
        let body = client.fetch_annotations("B00TEST123", &Credential::new("session-id=abc"))?;
        assert_eq!(body, "<html>notes</html>");
        let request = server.join().expect("stub server thread");
        assert!(request.starts_with("GET /notebook?asin=B00TEST123&contentLimitState= HTTP/1.1"));
        Ok(())
    }

    #[test]
    fn session_reads_library_through_client() -> Result<(), FetchError> {
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", "lib");
        let client = client_for(&endpoint);
        let credential = Credential::new("session-id=abc");
        let session = client.session(&credential);
        assert_eq!(session.library_page()?, "lib");
        server.join().expect("stub server thread");
        Ok(())
    }

    #[test]
    fn non_success_status_is_http_status_error() {
        let (endpoint, server) = serve_once("HTTP/1.1 403 Forbidden", "denied");
        let client = client_for(&endpoint);
        let result = client.fetch_library(&Credential::new("session-id=abc"));
        server.join().expect("stub server thread");
        match result {
            Err(FetchError::HttpStatus { status, url }) => {
                assert_eq!(status, 403);
                assert!(url.ends_with("/notebook"));
            }
            other => panic!("expected HttpStatus, got {:?}", other),
        }
    }
}
