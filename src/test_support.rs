//! Test helpers: a canned-response HTTP listener and in-memory fakes of the
//! playback session and messaging transport.

use crate::models::{DashboardRecord, PlaybackSnapshot, QueueItem};
use crate::providers::{PlaybackSession, SessionError, TransientFailure};
use crate::render::{self, MessageBody};
use crate::transport::{MessagingTransport, TransportError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Unknown",
    }
}

pub fn response_with_headers(status: u16, headers: &[(&str, &str)], body: &str) -> String {
    let mut raw = format!("HTTP/1.1 {} {}\r\n", status, reason(status));
    for (name, value) in headers {
        raw.push_str(&format!("{}: {}\r\n", name, value));
    }
    raw.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    ));
    raw
}

pub fn json_response(status: u16, body: &str) -> String {
    response_with_headers(status, &[("Content-Type", "application/json")], body)
}

pub fn no_content() -> String {
    "HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n".to_string()
}

/// Responses served for one method and path, in order; the last one repeats
pub struct Route {
    method: &'static str,
    path: &'static str,
    responses: VecDeque<String>,
}

impl Route {
    pub fn new(method: &'static str, path: &'static str, responses: Vec<String>) -> Self {
        Self {
            method,
            path,
            responses: responses.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }
}

/// Local HTTP listener answering with canned responses
pub struct CannedServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl CannedServer {
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let routes = Arc::new(Mutex::new(routes));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve_one(socket, routes.clone(), recorded.clone()));
            }
        });

        Self { base_url, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve_one(
    socket: TcpStream,
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await.is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default();
    let path = target.split('?').next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    if length > 0 && reader.read_exact(&mut body).await.is_err() {
        return;
    }

    let response = {
        let mut routes = routes.lock().unwrap();
        routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path)
            .and_then(|r| {
                if r.responses.len() > 1 {
                    r.responses.pop_front()
                } else {
                    r.responses.front().cloned()
                }
            })
            .unwrap_or_else(|| response_with_headers(404, &[], ""))
    };

    requests.lock().unwrap().push(RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let _ = writer.write_all(response.as_bytes()).await;
    let _ = writer.flush().await;
}

pub fn snapshot(title: &str, is_playing: bool) -> PlaybackSnapshot {
    PlaybackSnapshot {
        artist: "Daft Punk".to_string(),
        title: title.to_string(),
        artwork_url: format!("https://i.scdn.co/image/{}", title.to_lowercase()),
        is_playing,
        active_device_id: "desk-speaker".to_string(),
    }
}

/// Scripted answer for [`FakeSession::current_track`]
#[derive(Debug, Clone)]
pub enum Scripted {
    Track(PlaybackSnapshot),
    NoTrack,
    NoDevice,
    RateLimited(Option<&'static str>),
    Failure(u16),
}

impl Scripted {
    fn into_result(self) -> Result<PlaybackSnapshot, SessionError> {
        match self {
            Scripted::Track(snapshot) => Ok(snapshot),
            Scripted::NoTrack => Err(SessionError::NoTrackPlaying),
            Scripted::NoDevice => Err(SessionError::NoActiveDevice),
            Scripted::RateLimited(retry_after) => {
                let mut headers = HeaderMap::new();
                if let Some(value) = retry_after {
                    headers.insert(RETRY_AFTER, HeaderValue::from_static(value));
                }
                Err(http_error(StatusCode::TOO_MANY_REQUESTS, headers))
            }
            Scripted::Failure(status) => Err(http_error(
                StatusCode::from_u16(status).unwrap(),
                HeaderMap::new(),
            )),
        }
    }
}

fn http_error(status: StatusCode, headers: HeaderMap) -> SessionError {
    SessionError::Transient(TransientFailure::Http {
        status,
        headers,
        body: String::new(),
    })
}

/// In-memory playback session
#[derive(Default)]
pub struct FakeSession {
    script: Mutex<VecDeque<Scripted>>,
    track_calls: Mutex<Vec<Instant>>,
    commands: Mutex<Vec<&'static str>>,
    queue: Mutex<Vec<QueueItem>>,
    fail_commands: Mutex<Option<u16>>,
}

impl FakeSession {
    pub fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        })
    }

    /// Answer every later `current_track` call with `answer`
    pub fn answer_with(&self, answer: Scripted) {
        let mut script = self.script.lock().unwrap();
        script.clear();
        script.push_back(answer);
    }

    pub fn set_queue(&self, items: Vec<QueueItem>) {
        *self.queue.lock().unwrap() = items;
    }

    pub fn fail_commands_with(&self, status: u16) {
        *self.fail_commands.lock().unwrap() = Some(status);
    }

    pub fn track_calls(&self) -> Vec<Instant> {
        self.track_calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<&'static str> {
        self.commands.lock().unwrap().clone()
    }

    fn record_command(&self, name: &'static str) -> Result<(), SessionError> {
        self.commands.lock().unwrap().push(name);
        match *self.fail_commands.lock().unwrap() {
            Some(status) => Err(http_error(
                StatusCode::from_u16(status).unwrap(),
                HeaderMap::new(),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PlaybackSession for FakeSession {
    async fn active_device(&self) -> Result<String, SessionError> {
        match self.script.lock().unwrap().front() {
            Some(Scripted::NoDevice) => Err(SessionError::NoActiveDevice),
            _ => Ok("desk-speaker".to_string()),
        }
    }

    async fn current_track(&self) -> Result<PlaybackSnapshot, SessionError> {
        self.track_calls.lock().unwrap().push(Instant::now());
        let answer = {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };
        answer.unwrap_or(Scripted::NoTrack).into_result()
    }

    async fn pause(&self) -> Result<(), SessionError> {
        self.record_command("pause")
    }

    async fn resume(&self) -> Result<(), SessionError> {
        self.record_command("resume")
    }

    async fn skip_next(&self) -> Result<(), SessionError> {
        self.record_command("skip_next")
    }

    async fn skip_previous(&self) -> Result<(), SessionError> {
        self.record_command("skip_previous")
    }

    async fn queue(&self, limit: usize) -> Result<Vec<QueueItem>, SessionError> {
        Ok(self.queue.lock().unwrap().iter().take(limit).cloned().collect())
    }
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub channel: String,
    pub ts: Option<String>,
    pub body: MessageBody,
}

/// In-memory messaging transport recording everything it is asked to send
#[derive(Default)]
pub struct FakeTransport {
    posts: Mutex<Vec<SentMessage>>,
    updates: Mutex<Vec<SentMessage>>,
    next_ts: AtomicUsize,
    failing_updates: AtomicUsize,
    update_delay: Mutex<Option<Duration>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next `count` calls to `update_message`
    pub fn fail_next_updates(&self, count: usize) {
        self.failing_updates.store(count, Ordering::SeqCst);
    }

    /// Make every `update_message` take this long
    pub fn delay_updates(&self, delay: Duration) {
        *self.update_delay.lock().unwrap() = Some(delay);
    }

    pub fn posts(&self) -> Vec<SentMessage> {
        self.posts.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<SentMessage> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingTransport for FakeTransport {
    async fn post_message(&self, channel: &str, body: &MessageBody) -> Result<String, TransportError> {
        let n = self.next_ts.fetch_add(1, Ordering::SeqCst);
        let ts = format!("1700000000.{:06}", n + 1);
        self.posts.lock().unwrap().push(SentMessage {
            channel: channel.to_string(),
            ts: Some(ts.clone()),
            body: body.clone(),
        });
        Ok(ts)
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        body: &MessageBody,
    ) -> Result<(), TransportError> {
        let delay = *self.update_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self.failing_updates.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_updates.store(failing - 1, Ordering::SeqCst);
            return Err(TransportError::Api("message_not_found".to_string()));
        }

        self.updates.lock().unwrap().push(SentMessage {
            channel: channel.to_string(),
            ts: Some(ts.to_string()),
            body: body.clone(),
        });
        Ok(())
    }

    fn render_dashboard(&self, record: &DashboardRecord) -> MessageBody {
        render::dashboard(record)
    }
}
