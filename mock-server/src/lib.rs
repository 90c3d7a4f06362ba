//! Recording HTTP mock server.
//!
//! Responses are scripted ahead of time with `enqueue` and served in FIFO
//! order; every request that arrives is recorded exactly as received and can
//! be taken back out with `take_request`. When the queue is empty the fallback
//! response is served.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::Response,
    Router,
};
use bytes::Bytes;
use tokio::{net::TcpListener, sync::oneshot};
use tracing::{error, info, warn};

/// How long `take_request` waits for a request to arrive.
const TAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// A scripted response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }
}

impl MockResponse {
    /// `200` with no headers and an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn not_found() -> Self {
        Self::new().status(404)
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    fn into_http(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        for (name, value) in self.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
                (Ok(name), Ok(value)) => {
                    response.headers_mut().append(name, value);
                }
                _ => warn!(%name, "skipping invalid scripted header"),
            }
        }
        response
    }
}

/// What the server actually received.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    /// Path plus query, as on the request line.
    pub path: String,
    /// Header names arrive lowercased from the HTTP stack.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Zero-based arrival order.
    pub sequence: usize,
}

impl RecordedRequest {
    /// First value of a header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_size(&self) -> usize {
        self.body.len()
    }
}

/// Shared state behind the router: the response queue and the recorder.
#[derive(Clone)]
pub struct MockState {
    inner: Arc<Inner>,
}

struct Inner {
    queue: Mutex<VecDeque<MockResponse>>,
    fallback: MockResponse,
    recorder: Option<mpsc::Sender<RecordedRequest>>,
    sequence: AtomicUsize,
}

impl MockState {
    /// State that serves `fallback` once the queue is empty and keeps no record.
    pub fn new(fallback: MockResponse) -> Self {
        Self::build(fallback, None)
    }

    /// Like `new`, also returning the receiving end of the request record.
    pub fn recording(fallback: MockResponse) -> (Self, mpsc::Receiver<RecordedRequest>) {
        let (tx, rx) = mpsc::channel();
        (Self::build(fallback, Some(tx)), rx)
    }

    fn build(fallback: MockResponse, recorder: Option<mpsc::Sender<RecordedRequest>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::new()),
                fallback,
                recorder,
                sequence: AtomicUsize::new(0),
            }),
        }
    }

    pub fn enqueue(&self, response: MockResponse) {
        if let Ok(mut queue) = self.inner.queue.lock() {
            queue.push_back(response);
        }
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.inner.sequence.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> MockResponse {
        self.inner
            .queue
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_else(|| self.inner.fallback.clone())
    }

    fn record(&self, request: RecordedRequest) {
        if let Some(recorder) = &self.inner.recorder {
            // Nobody listening is fine: the binary runs without a recorder.
            let _ = recorder.send(request);
        }
    }
}

pub fn app(state: MockState) -> Router {
    Router::new().fallback(dispatch).with_state(state)
}

pub async fn run(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

async fn dispatch(State(state): State<MockState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::BAD_REQUEST;
            return response;
        }
    };

    let recorded = RecordedRequest {
        method: parts.method.to_string(),
        path: parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string()),
        headers: parts
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect(),
        body,
        sequence: state.inner.sequence.fetch_add(1, Ordering::SeqCst),
    };
    info!(
        method = %recorded.method,
        path = %recorded.path,
        body_bytes = recorded.body.len(),
        sequence = recorded.sequence,
        "recorded request"
    );
    state.record(recorded);

    state.next_response().into_http()
}

/// A mock server running on its own thread, bound to a random local port.
///
/// Dropping the handle shuts the server down.
pub struct MockServer {
    addr: SocketAddr,
    state: MockState,
    recorded: Mutex<mpsc::Receiver<RecordedRequest>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockServer {
    pub fn start() -> io::Result<Self> {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = std_listener.local_addr()?;
        std_listener.set_nonblocking(true)?;

        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let listener = {
            let _guard = rt.enter();
            TcpListener::from_std(std_listener)?
        };

        let (state, recorded) = MockState::recording(MockResponse::not_found());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let router = app(state.clone());

        std::thread::spawn(move || {
            let result = rt.block_on(async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
            });
            if let Err(e) = result {
                error!(error = %e, "mock server stopped");
            }
        });

        info!(%addr, "mock server started");
        Ok(Self {
            addr,
            state,
            recorded: Mutex::new(recorded),
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Absolute URL for `path` on this server, e.g. `url("/path?q=1")`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn enqueue(&self, response: MockResponse) {
        self.state.enqueue(response);
    }

    pub fn request_count(&self) -> usize {
        self.state.request_count()
    }

    /// Next recorded request, waiting up to five seconds for one to arrive.
    pub fn take_request(&self) -> Option<RecordedRequest> {
        self.recorded.lock().ok()?.recv_timeout(TAKE_TIMEOUT).ok()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
