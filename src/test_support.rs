//! Canned-response HTTP server for exercising the remote providers.
//!
//! An `axum` router on its own `tokio` runtime thread. Every request, whatever
//! its path, is recorded and answered with the next queued response.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use tokio::sync::oneshot;

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

#[derive(Default)]
struct Shared {
    responses: VecDeque<(u16, String)>,
    seen: Vec<RecordedRequest>,
}

type SharedState = Arc<Mutex<Shared>>;

pub(crate) struct MockServer {
    addr: SocketAddr,
    state: SharedState,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Answer requests with the given `(status, body)` pairs, in order.
    /// Requests beyond the queue get a 500.
    pub(crate) fn respond(responses: Vec<(u16, String)>) -> Self {
        let state: SharedState = Arc::new(Mutex::new(Shared {
            responses: responses.into(),
            seen: Vec::new(),
        }));
        let (addr_tx, addr_rx) = mpsc::channel();
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();

        let router = Router::new().fallback(record_and_reply).with_state(state.clone());
        let handle = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind mock server");
                addr_tx
                    .send(listener.local_addr().expect("mock server address"))
                    .expect("report mock server address");
                axum::serve(listener, router)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .expect("mock server");
            });
        });

        let addr = addr_rx.recv().expect("mock server failed to start");
        Self {
            addr,
            state,
            shutdown,
            handle,
        }
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the server and return every request it received.
    pub(crate) fn finish(self) -> Vec<RecordedRequest> {
        let _ = self.shutdown.send(());
        self.handle.join().expect("mock server thread panicked");
        let mut shared = self.state.lock().expect("mock server state");
        std::mem::take(&mut shared.seen)
    }
}

async fn record_and_reply(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let mut shared = state.lock().expect("mock server state");
    shared.seen.push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    let (status, body) = shared
        .responses
        .pop_front()
        .unwrap_or((500, r#"{"error":"no response queued"}"#.to_string()));
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
}
