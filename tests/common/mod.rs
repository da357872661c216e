//! In-process stand-ins for the blog API and the mock auth API.

#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        mpsc, Arc, Mutex, OnceLock,
    },
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use restprobe_http::{
    Cart, ClientOptions, Credentials, NewCart, NewPost, Observer, Post, RequestRecord,
    RequestTemplate, ResponseRecord,
};
use serde_json::{json, Value as JsonValue};

pub const LOGIN_EMAIL: &str = "eve.holt@reqres.in";
pub const LOGIN_PASSWORD: &str = "cityslicka";
pub const LOGIN_TOKEN: &str = "QpwL5tke4Pnpja7X4";

/// Installs a `tracing` subscriber writing through the test harness.
///
/// `RUST_LOG` selects the level; defaults to `info` so request/response lines show up
/// for failing tests.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .compact()
        .try_init();
}

#[derive(Clone, Default)]
pub struct MockState {
    posts: Arc<Mutex<BTreeMap<u64, Post>>>,
    carts: Arc<Mutex<BTreeMap<u64, Cart>>>,
    next_id: Arc<AtomicU64>,
    /// Requests received on `/health`.
    pub health_hits: Arc<AtomicUsize>,
    /// `/health` answers 503 while this is above zero, decrementing per hit.
    pub health_failures: Arc<AtomicUsize>,
}

impl MockState {
    pub fn seeded() -> Self {
        let state = Self::default();
        state.next_id.store(101, Ordering::SeqCst);
        {
            let mut posts = state.posts.lock().expect("posts mutex must not be poisoned");
            for id in 1..=3 {
                posts.insert(
                    id,
                    Post {
                        id,
                        user_id: 1,
                        title: format!("seed post {id}"),
                        body: "seed body".to_owned(),
                    },
                );
            }
        }
        state
    }

    pub fn failing_health(self, failures: usize) -> Self {
        self.health_failures.store(failures, Ordering::SeqCst);
        self
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

async fn list_posts(State(state): State<MockState>) -> Json<Vec<Post>> {
    let posts = state.posts.lock().expect("posts mutex must not be poisoned");
    Json(posts.values().cloned().collect())
}

async fn create_post(State(state): State<MockState>, body: String) -> impl IntoResponse {
    if body.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "missing body"})));
    }
    let new_post: NewPost = match serde_json::from_str(&body) {
        Ok(post) => post,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": err.to_string()})),
            )
        }
    };

    let post = Post {
        id: state.allocate_id(),
        user_id: new_post.user_id,
        title: new_post.title,
        body: new_post.body,
    };
    state
        .posts
        .lock()
        .expect("posts mutex must not be poisoned")
        .insert(post.id, post.clone());
    (StatusCode::CREATED, Json(json!(post)))
}

async fn get_post(State(state): State<MockState>, Path(id): Path<u64>) -> impl IntoResponse {
    let posts = state.posts.lock().expect("posts mutex must not be poisoned");
    match posts.get(&id) {
        Some(post) => (StatusCode::OK, Json(json!(post))),
        None => (StatusCode::NOT_FOUND, Json(json!({}))),
    }
}

async fn update_post(
    State(state): State<MockState>,
    Path(id): Path<u64>,
    Json(update): Json<NewPost>,
) -> impl IntoResponse {
    let mut posts = state.posts.lock().expect("posts mutex must not be poisoned");
    match posts.get_mut(&id) {
        Some(post) => {
            post.title = update.title;
            post.body = update.body;
            post.user_id = update.user_id;
            (StatusCode::OK, Json(json!(post)))
        }
        None => (StatusCode::NOT_FOUND, Json(json!({}))),
    }
}

async fn delete_post(State(state): State<MockState>, Path(id): Path<u64>) -> impl IntoResponse {
    state
        .posts
        .lock()
        .expect("posts mutex must not be poisoned")
        .remove(&id);
    (StatusCode::OK, Json(json!({})))
}

async fn login(body: String) -> impl IntoResponse {
    let credentials: Credentials = match serde_json::from_str(&body) {
        Ok(credentials) => credentials,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Missing password"})),
            )
        }
    };
    if credentials.email == LOGIN_EMAIL && credentials.password == LOGIN_PASSWORD {
        (StatusCode::OK, Json(json!({"token": LOGIN_TOKEN})))
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "user not found"})),
        )
    }
}

async fn list_users(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let expected = format!("Bearer {LOGIN_TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected);
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "missing or invalid token"})),
        );
    }

    let page: u32 = params
        .get("page")
        .and_then(|page| page.parse().ok())
        .unwrap_or(1);
    (
        StatusCode::OK,
        Json(json!({
            "page": page,
            "per_page": 2,
            "total": 4,
            "total_pages": 2,
            "data": [
                {
                    "id": 1,
                    "email": "george.bluth@reqres.in",
                    "first_name": "George",
                    "last_name": "Bluth"
                },
                {
                    "id": 2,
                    "email": "janet.weaver@reqres.in",
                    "first_name": "Janet",
                    "last_name": "Weaver"
                }
            ]
        })),
    )
}

async fn create_cart(
    State(state): State<MockState>,
    Json(new_cart): Json<NewCart>,
) -> impl IntoResponse {
    let cart = Cart {
        id: state.allocate_id(),
        user_id: new_cart.user_id,
        products: new_cart.products,
    };
    state
        .carts
        .lock()
        .expect("carts mutex must not be poisoned")
        .insert(cart.id, cart.clone());
    (StatusCode::CREATED, Json(json!(cart)))
}

async fn get_cart(State(state): State<MockState>, Path(id): Path<u64>) -> impl IntoResponse {
    let carts = state.carts.lock().expect("carts mutex must not be poisoned");
    match carts.get(&id) {
        Some(cart) => (StatusCode::OK, Json(json!(cart))),
        None => (StatusCode::NOT_FOUND, Json(json!({}))),
    }
}

async fn delete_cart(State(state): State<MockState>, Path(id): Path<u64>) -> StatusCode {
    let removed = state
        .carts
        .lock()
        .expect("carts mutex must not be poisoned")
        .remove(&id);
    if removed.is_some() {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn health(State(state): State<MockState>) -> impl IntoResponse {
    state.health_hits.fetch_add(1, Ordering::SeqCst);
    let failing = state
        .health_failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok();
    if failing {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "starting"})))
    } else {
        (StatusCode::OK, Json(json!({"status": "up"})))
    }
}

/// Echoes the request headers that matter for isolation checks.
async fn echo_headers(headers: HeaderMap) -> Json<JsonValue> {
    let read = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    Json(json!({
        "authorization": read(header::AUTHORIZATION),
        "content_type": read(header::CONTENT_TYPE),
    }))
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/:id", get(get_post).put(update_post).delete(delete_post))
        .route("/api/login", axum::routing::post(login))
        .route("/api/users", get(list_users))
        .route("/carts", axum::routing::post(create_cart))
        .route("/carts/:id", get(get_cart).delete(delete_cart))
        .route("/health", get(health))
        .route("/echo-headers", get(echo_headers))
        .with_state(state)
}

/// Mock server bound to the runtime of the calling test.
pub struct TestServer {
    pub base_url: String,
    pub state: MockState,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub async fn spawn_server(state: MockState) -> TestServer {
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url: format!("http://{address}"),
        state,
        task,
    }
}

/// Mock server and template shared by every test of one test binary.
pub struct Suite {
    pub base_url: String,
    pub template: RequestTemplate,
}

/// Starts the shared mock server on its own runtime thread and builds the
/// suite template on first use.
pub fn suite() -> &'static Suite {
    static SUITE: OnceLock<Suite> = OnceLock::new();
    SUITE.get_or_init(|| {
        init_tracing();

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
                .expect("mock runtime must start");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("must bind suite listener");
                tx.send(listener.local_addr().expect("must have local addr"))
                    .expect("suite initializer must be waiting");
                axum::serve(listener, router(MockState::seeded()))
                    .await
                    .expect("mock server must run");
            });
        });
        let address = rx.recv().expect("mock server must report its address");
        let base_url = format!("http://{address}");

        let template = RequestTemplate::builder(&base_url)
            .options(ClientOptions {
                reuse_connections: false,
                ..ClientOptions::default()
            })
            .build()
            .expect("suite template must initialize");

        Suite { base_url, template }
    })
}

/// Observer that keeps every exchange for later inspection.
#[derive(Default)]
pub struct Recorder {
    pub requests: Mutex<Vec<RequestRecord>>,
    pub responses: Mutex<Vec<ResponseRecord>>,
}

impl Observer for Recorder {
    fn on_request(&self, request: &RequestRecord) {
        self.requests
            .lock()
            .expect("recorder mutex must not be poisoned")
            .push(request.clone());
    }

    fn on_response(&self, response: &ResponseRecord) {
        self.responses
            .lock()
            .expect("recorder mutex must not be poisoned")
            .push(response.clone());
    }
}
