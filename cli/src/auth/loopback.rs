//! Loopback redirect listener for the interactive authorization-code flow.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use crate::auth::error::LoginError;

const SUCCESS_PAGE: &str = "<html><body><h2>Authentication complete.</h2>\
    <p>You can close this window and return to the terminal.</p></body></html>";
const FAILURE_PAGE: &str = "<html><body><h2>Authentication failed.</h2>\
    <p>Return to the terminal for details.</p></body></html>";

/// Parameters the identity provider sent back on the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Callback {
    Code { code: String, state: String },
    Error { error: String, description: String },
}

/// One-shot HTTP listener on `localhost` receiving the authorization code.
///
/// Listens on both `127.0.0.1` and `::1` when available, since browsers may
/// resolve `localhost` to either.
pub struct LoopbackListener {
    v4: Option<TcpListener>,
    v6: Option<TcpListener>,
    redirect_uri: String,
}

impl LoopbackListener {
    /// Binds a listener for `redirect`, e.g. `http://localhost`.
    ///
    /// Without an explicit port an ephemeral one is chosen and appended to
    /// the redirect URI.
    pub async fn bind(redirect: &str) -> Result<Self, LoginError> {
        let mut url = Url::parse(redirect)
            .map_err(|e| LoginError::Configuration(format!("Invalid redirect URI '{redirect}': {e}")))?;
        if url.scheme() != "http" {
            return Err(LoginError::Configuration(format!(
                "Redirect URI '{redirect}' must use http on the loopback interface"
            )));
        }

        let (v4, v6, bound) = bind_loopback(url.port().unwrap_or(0)).await?;
        url.set_port(Some(bound))
            .map_err(|()| LoginError::Configuration(format!("Invalid redirect URI '{redirect}'")))?;

        let redirect_uri = url.as_str().trim_end_matches('/').to_string();
        tracing::debug!(%redirect_uri, "listening for login redirect");
        Ok(Self {
            v4,
            v6,
            redirect_uri,
        })
    }

    /// The redirect URI registered with the authorization request.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Waits for the browser to deliver the authorization code.
    ///
    /// Requests without OAuth parameters (favicon and the like) are ignored.
    pub async fn wait_for_code(&self, expected_state: &str) -> Result<String, LoginError> {
        loop {
            let (mut stream, _) = self
                .accept()
                .await
                .map_err(|e| LoginError::Network(format!("login redirect failed: {e}")))?;

            let Some(callback) = read_callback(&mut stream).await else {
                respond(&mut stream, "404 Not Found", "").await;
                continue;
            };

            match callback {
                Callback::Code { code, state } => {
                    if state != expected_state {
                        respond(&mut stream, "400 Bad Request", FAILURE_PAGE).await;
                        return Err(LoginError::Auth(
                            "login redirect carried an unexpected state".to_string(),
                        ));
                    }
                    respond(&mut stream, "200 OK", SUCCESS_PAGE).await;
                    return Ok(code);
                },
                Callback::Error { error, description } => {
                    respond(&mut stream, "200 OK", FAILURE_PAGE).await;
                    return Err(LoginError::Auth(format!("{error}: {description}")));
                },
            }
        }
    }
}

impl LoopbackListener {
    async fn accept(&self) -> std::io::Result<(TcpStream, SocketAddr)> {
        match (&self.v4, &self.v6) {
            (Some(v4), Some(v6)) => tokio::select! {
                result = v4.accept() => result,
                result = v6.accept() => result,
            },
            (Some(listener), None) | (None, Some(listener)) => listener.accept().await,
            (None, None) => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "no loopback listener",
            )),
        }
    }
}

/// Binds `port` on both loopback addresses. Port 0 picks one free port and
/// reuses it for the second address.
async fn bind_loopback(
    port: u16,
) -> Result<(Option<TcpListener>, Option<TcpListener>, u16), LoginError> {
    let unavailable =
        |e: std::io::Error| LoginError::Network(format!("cannot listen for the login redirect: {e}"));

    match TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await {
        Ok(v4) => {
            let bound = v4.local_addr().map_err(unavailable)?.port();
            let v6 = match TcpListener::bind((Ipv6Addr::LOCALHOST, bound)).await {
                Ok(v6) => Some(v6),
                Err(e) => {
                    tracing::debug!("IPv6 loopback unavailable: {e}");
                    None
                },
            };
            Ok((Some(v4), v6, bound))
        },
        Err(v4_err) => {
            tracing::debug!("IPv4 loopback unavailable: {v4_err}");
            let v6 = TcpListener::bind((Ipv6Addr::LOCALHOST, port))
                .await
                .map_err(unavailable)?;
            let bound = v6.local_addr().map_err(unavailable)?.port();
            Ok((None, Some(v6), bound))
        },
    }
}

async fn read_callback(stream: &mut TcpStream) -> Option<Callback> {
    let mut buf = vec![0u8; 8192];
    let n = stream.read(&mut buf).await.ok()?;
    let request = String::from_utf8_lossy(&buf[..n]);
    parse_request_line(request.lines().next()?)
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        tracing::debug!("failed to answer login redirect: {e}");
    }
}

/// Parses `GET /?code=...&state=... HTTP/1.1`.
fn parse_request_line(line: &str) -> Option<Callback> {
    let mut parts = line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = Url::parse(&format!("http://localhost{}", parts.next()?)).ok()?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = None;
    for (key, value) in target.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {},
        }
    }

    if let Some(error) = error {
        return Some(Callback::Error {
            error,
            description: description.unwrap_or_default(),
        });
    }
    Some(Callback::Code {
        code: code?,
        state: state.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_code_and_state() {
        assert_eq!(
            parse_request_line("GET /?code=abc%2F1&state=xyz HTTP/1.1"),
            Some(Callback::Code {
                code: "abc/1".to_string(),
                state: "xyz".to_string(),
            })
        );
    }

    #[test]
    fn parses_provider_error() {
        assert_eq!(
            parse_request_line("GET /?error=access_denied&error_description=user+cancelled HTTP/1.1"),
            Some(Callback::Error {
                error: "access_denied".to_string(),
                description: "user cancelled".to_string(),
            })
        );
    }

    #[test]
    fn ignores_unrelated_requests() {
        assert_eq!(parse_request_line("GET /favicon.ico HTTP/1.1"), None);
        assert_eq!(parse_request_line("POST /?code=a HTTP/1.1"), None);
        assert_eq!(parse_request_line(""), None);
    }

    #[tokio::test]
    async fn bind_picks_an_ephemeral_port() {
        let listener = LoopbackListener::bind("http://localhost").await.unwrap();
        let uri = Url::parse(listener.redirect_uri()).unwrap();
        assert_eq!(uri.host_str(), Some("localhost"));
        assert!(uri.port().is_some_and(|p| p > 0));
    }

    #[tokio::test]
    async fn rejects_non_http_redirects() {
        assert!(matches!(
            LoopbackListener::bind("https://localhost").await,
            Err(LoginError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn delivers_code_from_browser_redirect() {
        let listener = LoopbackListener::bind("http://localhost").await.unwrap();
        let port = Url::parse(listener.redirect_uri()).unwrap().port().unwrap();

        let browser = tokio::spawn(async move {
            let mut favicon = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            favicon
                .write_all(b"GET /favicon.ico HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .await
                .unwrap();
            let mut sink = Vec::new();
            favicon.read_to_end(&mut sink).await.unwrap();

            let mut redirect = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            redirect
                .write_all(b"GET /?code=the-code&state=s1 HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .await
                .unwrap();
            let mut page = String::new();
            redirect.read_to_string(&mut page).await.unwrap();
            page
        });

        let code = listener.wait_for_code("s1").await.unwrap();
        assert_eq!(code, "the-code");
        assert!(browser.await.unwrap().contains("Authentication complete"));
    }

    #[tokio::test]
    async fn mismatched_state_is_rejected() {
        let listener = LoopbackListener::bind("http://localhost").await.unwrap();
        let port = Url::parse(listener.redirect_uri()).unwrap().port().unwrap();

        tokio::spawn(async move {
            let mut redirect = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            redirect
                .write_all(b"GET /?code=c&state=forged HTTP/1.1\r\n\r\n")
                .await
                .unwrap();
        });

        assert!(matches!(
            listener.wait_for_code("expected").await,
            Err(LoginError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn accepts_redirect_over_ipv6_loopback() {
        let listener = LoopbackListener::bind("http://localhost").await.unwrap();
        if listener.v6.is_none() {
            return;
        }
        let port = Url::parse(listener.redirect_uri()).unwrap().port().unwrap();

        tokio::spawn(async move {
            let mut redirect = TcpStream::connect((Ipv6Addr::LOCALHOST, port)).await.unwrap();
            redirect
                .write_all(b"GET /?code=v6-code&state=s6 HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .await
                .unwrap();
            let mut page = String::new();
            redirect.read_to_string(&mut page).await.unwrap();
        });

        assert_eq!(listener.wait_for_code("s6").await.unwrap(), "v6-code");
    }
}
