/// Minimal HTTP listener for the Spotify OAuth redirect
use super::OAuthFlow;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Reply produced for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub reason: &'static str,
    pub location: Option<String>,
    pub body: String,
}

impl HttpReply {
    fn redirect(location: String) -> Self {
        Self {
            status: 307,
            reason: "Temporary Redirect",
            location: Some(location),
            body: String::new(),
        }
    }

    fn text(status: u16, reason: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            reason,
            location: None,
            body: body.into(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, self.reason);
        if let Some(location) = &self.location {
            head.push_str(&format!("Location: {}\r\n", location));
        }
        head.push_str("Content-Type: text/html; charset=utf-8\r\n");
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        head.push_str("Connection: close\r\n\r\n");
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}

const SUCCESS_PAGE: &str = "<!DOCTYPE html>\
<html><head><title>Spotify connected</title></head>\
<body style=\"font-family: Arial, sans-serif; text-align: center; padding: 50px;\">\
<h1>Spotify connected</h1><p>You can close this window and head back to Slack.</p>\
</body></html>";

/// Accept OAuth requests until the listener fails or the task is aborted
pub async fn start_oauth_server(
    listener: TcpListener,
    flow: Arc<OAuthFlow>,
    success_redirect: Option<String>,
) {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("OAuth callback server listening on {}", addr);
    }

    loop {
        match listener.accept().await {
            Ok((socket, _)) => {
                let flow = flow.clone();
                let success_redirect = success_redirect.clone();
                tokio::spawn(handle_oauth_request(socket, flow, success_redirect));
            }
            Err(e) => {
                tracing::error!("Error accepting connection: {}", e);
            }
        }
    }
}

async fn handle_oauth_request(
    socket: TcpStream,
    flow: Arc<OAuthFlow>,
    success_redirect: Option<String>,
) {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let mut request_line = String::new();

    let reply = match reader.read_line(&mut request_line).await {
        Ok(_) => route(&request_line, &flow, success_redirect.as_deref()).await,
        Err(e) => {
            tracing::warn!("Failed to read OAuth request: {}", e);
            return;
        }
    };

    if let Err(e) = send_reply(&mut writer, &reply).await {
        tracing::debug!("Failed to write OAuth reply: {}", e);
    }
}

async fn send_reply<W: AsyncWrite + Unpin>(writer: &mut W, reply: &HttpReply) -> std::io::Result<()> {
    writer.write_all(&reply.to_bytes()).await?;
    writer.flush().await
}

/// Dispatch a request line (`GET /path?query HTTP/1.1`)
pub async fn route(
    request_line: &str,
    flow: &OAuthFlow,
    success_redirect: Option<&str>,
) -> HttpReply {
    let mut parts = request_line.split_whitespace();
    let (Some("GET"), Some(target)) = (parts.next(), parts.next()) else {
        return HttpReply::text(404, "Not Found", "");
    };
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    if path == "/login" {
        return match flow.begin().await {
            Ok(url) => HttpReply::redirect(url),
            Err(e) => {
                tracing::error!("Failed to build authorize URL: {}", e);
                HttpReply::text(500, "Internal Server Error", e.to_string())
            }
        };
    }

    if path != flow.callback_path() {
        return HttpReply::text(404, "Not Found", "");
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        tracing::warn!("Spotify authorization was declined: {}", error);
        return HttpReply::text(
            400,
            "Bad Request",
            "Authentication failed. Please try again.",
        );
    }
    let Some(state) = state else {
        return HttpReply::text(400, "Bad Request", "State parameter is missing");
    };
    let Some(code) = code else {
        return HttpReply::text(400, "Bad Request", "Code parameter is missing");
    };

    match flow.complete(&code, &state).await {
        Ok(()) => {
            tracing::info!("OAuth callback received and token stored");
            match success_redirect {
                Some(location) => HttpReply::redirect(location.to_string()),
                None => HttpReply::text(200, "OK", SUCCESS_PAGE),
            }
        }
        Err(super::AuthError::UnknownState) => {
            HttpReply::text(400, "Bad Request", "Unknown or expired login attempt")
        }
        Err(e) => {
            tracing::error!("Spotify token exchange failed: {}", e);
            HttpReply::text(502, "Bad Gateway", "Token exchange with Spotify failed")
        }
    }
}
