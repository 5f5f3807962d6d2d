//! Loopback stand-in for the workflow API, used by tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    pub query: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

struct StubState {
    status: StatusCode,
    body: String,
    hits: AtomicUsize,
    requests: Mutex<Vec<CapturedRequest>>,
}

pub struct WorkflowStub {
    pub base_url: String,
    state: Arc<StubState>,
    handle: ServerHandle,
}

impl WorkflowStub {
    /// Serve `status` and `body` for every run request. Must be called from
    /// within an actix runtime.
    pub fn start(status: u16, body: impl Into<String>) -> Self {
        let state = Arc::new(StubState {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.into(),
            hits: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        });
        let data = web::Data::from(state.clone());

        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .route("/api/v1/run/{agent_id}", web::post().to(run_flow))
        })
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .unwrap();

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_rt::spawn(server);

        Self {
            base_url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CapturedRequest> {
        self.state.requests.lock().unwrap().last().cloned()
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

async fn run_flow(
    state: web::Data<StubState>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().unwrap().push(CapturedRequest {
        path: req.path().to_string(),
        query: req.query_string().to_string(),
        content_type: req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        body: body.to_vec(),
    });

    HttpResponse::build(state.status)
        .content_type("application/json")
        .body(state.body.clone())
}
