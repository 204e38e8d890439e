#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use buseye::{Credentials, Dashboard, GeoFeed, Provider, Role, TrackingConfig};
use common::fleet;
use http::header::AUTHORIZATION;
use http::{HeaderMap, StatusCode};
use pretty_assertions::assert_eq;
use realtime::{Fix, WatchOptions};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time;
use tracking::{MapConfig, Status};

/// A request as seen by the test backend.
#[derive(Debug, Clone, PartialEq)]
struct Recorded {
    route: &'static str,
    authorization: Option<String>,
    body: Option<Value>,
}

// Canned reply per route, plus every request received.
#[derive(Clone, Default)]
struct Backend {
    responses: Arc<HashMap<&'static str, (StatusCode, Value)>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Backend {
    fn reply(
        &self, route: &'static str, headers: &HeaderMap, body: Option<Value>,
    ) -> (StatusCode, Json<Value>) {
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        self.requests.lock().expect("should lock").push(Recorded { route, authorization, body });

        let (status, body) = self
            .responses
            .get(route)
            .cloned()
            .unwrap_or_else(|| (StatusCode::NOT_FOUND, json!({"message": "no such route"})));
        (status, Json(body))
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("should lock").clone()
    }
}

async fn login(
    State(backend): State<Backend>, headers: HeaderMap, Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    backend.reply("POST /auth/login", &headers, Some(body))
}

async fn buses(State(backend): State<Backend>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    backend.reply("GET /bus", &headers, None)
}

async fn location(
    State(backend): State<Backend>, headers: HeaderMap, Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    backend.reply("PUT /bus/location", &headers, Some(body))
}

// Serves the backend routes on an ephemeral port and returns the API base URL.
async fn serve(responses: Vec<(&'static str, StatusCode, Value)>) -> (String, Backend) {
    let backend = Backend {
        responses: Arc::new(
            responses.into_iter().map(|(route, status, body)| (route, (status, body))).collect(),
        ),
        requests: Arc::default(),
    };

    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/bus", get(buses))
        .route("/api/bus/location", put(location))
        .with_state(backend.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
    let addr = listener.local_addr().expect("should have an address");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("should serve") });

    (format!("http://{addr}/api"), backend)
}

fn credentials() -> Credentials {
    Credentials { email: "driver@buseye.app".to_string(), password: "hunter2".to_string() }
}

fn config() -> TrackingConfig {
    TrackingConfig {
        poll_interval: Duration::from_secs(5),
        watch: WatchOptions { timeout: Duration::ZERO, ..WatchOptions::default() },
        map: MapConfig::default(),
    }
}

// Should sign in and send the session token on later requests.
#[tokio::test]
async fn sign_in_attaches_token() {
    buseye::init_tracing();

    let (url, backend) = serve(vec![
        ("POST /auth/login", StatusCode::OK, json!({"token": "tok-1", "role": "DRIVER"})),
        ("GET /bus", StatusCode::OK, json!([{"id": 7, "busNo": "KA-01", "route": "500D"}])),
    ])
    .await;
    let provider = Provider::with_api_url(url);

    let session = provider.sign_in(&credentials()).await.expect("should sign in");
    assert_eq!(session.role, Role::Driver);
    assert_eq!(provider.role(), Some(Role::Driver));

    let buses = fleet::buses(&provider).await.expect("should fetch");
    assert_eq!(buses[0].id, "7");

    assert_eq!(
        backend.requests(),
        vec![
            Recorded {
                route: "POST /auth/login",
                authorization: None,
                body: Some(json!({"email": "driver@buseye.app", "password": "hunter2"})),
            },
            Recorded {
                route: "GET /bus",
                authorization: Some("Bearer tok-1".to_string()),
                body: None,
            },
        ]
    );
}

// Should surface a rejected sign-in and keep the caller signed out.
#[tokio::test]
async fn sign_in_rejected() {
    let rejected = json!({"message": "Invalid credentials"});
    let (url, backend) =
        serve(vec![("POST /auth/login", StatusCode::UNAUTHORIZED, rejected)]).await;
    let provider = Provider::with_api_url(url);

    let err = provider.sign_in(&credentials()).await.expect_err("should be rejected");
    assert!(err.to_string().contains("Invalid credentials"));
    assert_eq!(provider.session(), None);
    assert_eq!(backend.requests().len(), 1);
}

// Should report a transport failure when nothing is listening.
#[tokio::test]
async fn backend_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
    let addr = listener.local_addr().expect("should have an address");
    drop(listener);

    let provider = Provider::with_api_url(format!("http://{addr}/api"));
    let err = fleet::buses(&provider).await.expect_err("should fail");
    assert_eq!(err.code(), StatusCode::BAD_GATEWAY);
}

// Should open the view matching each role.
#[test]
fn dashboard_routing() {
    let provider = Arc::new(Provider::with_api_url("http://localhost:5000/api"));

    let routes = [(Role::Admin, "/admin"), (Role::Driver, "/driver"), (Role::User, "/user")];
    for (role, path) in routes {
        let dashboard = Dashboard::open(role, Arc::clone(&provider), &config());
        assert_eq!(dashboard.role(), role);
        assert_eq!(dashboard.path(), path);
    }
}

// Should publish fed positions for the selected bus over HTTP.
#[tokio::test]
async fn driver_publishes_over_http() {
    let (url, backend) = serve(vec![
        ("GET /bus", StatusCode::OK, json!([{"id": "b1", "busNo": "KA-01", "route": "500D"}])),
        ("PUT /bus/location", StatusCode::OK, json!({"message": "updated"})),
    ])
    .await;
    let feed = GeoFeed::attached();
    let provider = Arc::new(Provider::with_api_url(url).with_geolocation(feed.clone()));

    let Dashboard::Driver(mut console) = Dashboard::open(Role::Driver, provider, &config()) else {
        panic!("should open the driver console");
    };
    assert_eq!(console.load_buses().await.len(), 1);
    console.select_bus("b1").expect("should select");
    console.toggle().await.expect("should start");

    assert_eq!(feed.subscribers(), 1);
    feed.push(Fix::new(12.9716, 77.5946));

    time::timeout(Duration::from_secs(5), async {
        while backend.requests().len() < 2 {
            time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("should publish the fix");

    let requests = backend.requests();
    assert_eq!(requests[1].route, "PUT /bus/location");
    assert_eq!(
        requests[1].body,
        Some(json!({"busId": "b1", "latitude": 12.9716, "longitude": 77.5946}))
    );
    assert_eq!(console.status(), Status::Broadcasting);

    console.toggle().await.expect("should stop");
    assert_eq!(feed.subscribers(), 0);
}
