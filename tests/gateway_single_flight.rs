use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use reqwest::Url;
use serde_json::json;

use barangay_portal::client::{GatewayError, SessionGateway};

/// Counting upstream that mimics the server contract the gateway relies
/// on: a protected route answering 401 `TOKEN_EXPIRED` until the session
/// holds a fresh access cookie, and a refresh endpoint that mints one.
struct Upstream {
    refresh_calls: AtomicUsize,
    record_calls: AtomicUsize,
    /// Refresh endpoint answers 403 instead of rotating.
    fail_refresh: bool,
    /// The protected route keeps answering 401 even after a refresh.
    always_expired: bool,
}

impl Upstream {
    fn new(fail_refresh: bool, always_expired: bool) -> Arc<Self> {
        Arc::new(Self {
            refresh_calls: AtomicUsize::new(0),
            record_calls: AtomicUsize::new(0),
            fail_refresh,
            always_expired,
        })
    }
}

async fn records(req: HttpRequest, state: web::Data<Arc<Upstream>>) -> HttpResponse {
    state.record_calls.fetch_add(1, Ordering::SeqCst);

    let fresh = req
        .cookie("accessToken")
        .map(|c| c.value() == "fresh-access")
        .unwrap_or(false);

    if fresh && !state.always_expired {
        HttpResponse::Ok().json(json!({ "records": [] }))
    } else {
        HttpResponse::Unauthorized().json(json!({
            "message": "Access token expired",
            "code": "TOKEN_EXPIRED"
        }))
    }
}

async fn refresh(req: HttpRequest, state: web::Data<Arc<Upstream>>) -> HttpResponse {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    // Widen the window so every queued caller observes the wave in flight.
    tokio::time::sleep(Duration::from_millis(50)).await;

    if state.fail_refresh || req.cookie("refreshToken").is_none() {
        return HttpResponse::Forbidden().json(json!({
            "message": "Invalid refresh token",
            "code": "REFRESH_INVALID"
        }));
    }

    HttpResponse::Ok()
        .cookie(
            actix_web::cookie::Cookie::build("accessToken", "fresh-access")
                .path("/")
                .finish(),
        )
        .json(json!({ "message": "Session refreshed" }))
}

async fn teapot() -> HttpResponse {
    HttpResponse::ImATeapot().finish()
}

fn spawn_upstream(state: Arc<Upstream>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let data = web::Data::new(state);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/api/records", web::get().to(records))
            .route("/api/teapot", web::get().to(teapot))
            .route("/api/auth/refresh", web::post().to(refresh))
    })
    .listen(listener)
    .expect("Failed to bind address")
    .run();
    let _ = tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

fn gateway_for(address: &str) -> SessionGateway {
    let gateway = SessionGateway::new(Url::parse(address).unwrap()).unwrap();
    // A session whose access token has gone stale mid-flight.
    gateway.add_cookie("accessToken=stale-access; Path=/");
    gateway.add_cookie("refreshToken=still-good; Path=/");
    gateway
}

#[tokio::test]
async fn five_concurrent_expiries_trigger_exactly_one_refresh() {
    let state = Upstream::new(false, false);
    let address = spawn_upstream(state.clone());
    let gateway = Arc::new(gateway_for(&address));

    let requests = (0..5).map(|_| {
        let gateway = gateway.clone();
        async move { gateway.execute(gateway.get("/api/records")).await }
    });

    let results = futures::future::join_all(requests).await;

    for result in results {
        let response = result.expect("request should recover after refresh");
        assert_eq!(200, response.status().as_u16());
    }

    assert_eq!(1, state.refresh_calls.load(Ordering::SeqCst));
    // 5 original attempts + 5 replays, none before the refresh settled.
    assert_eq!(10, state.record_calls.load(Ordering::SeqCst));
}

#[tokio::test]
async fn refresh_failure_rejects_every_queued_request_and_fires_hook_once() {
    let state = Upstream::new(true, false);
    let address = spawn_upstream(state.clone());

    let hook_firings = Arc::new(AtomicUsize::new(0));
    let hook_counter = hook_firings.clone();
    let gateway = SessionGateway::new(Url::parse(&address).unwrap())
        .unwrap()
        .with_session_expired_hook(move || {
            hook_counter.fetch_add(1, Ordering::SeqCst);
        });
    gateway.add_cookie("accessToken=stale-access; Path=/");
    gateway.add_cookie("refreshToken=revoked; Path=/");
    let gateway = Arc::new(gateway);

    let requests = (0..5).map(|_| {
        let gateway = gateway.clone();
        async move { gateway.execute(gateway.get("/api/records")).await }
    });

    let results = futures::future::join_all(requests).await;

    for result in results {
        match result {
            Err(GatewayError::SessionExpired(_)) => {}
            other => panic!("expected SessionExpired, got {:?}", other.map(|r| r.status())),
        }
    }

    assert_eq!(1, state.refresh_calls.load(Ordering::SeqCst));
    assert_eq!(1, hook_firings.load(Ordering::SeqCst));
}

#[tokio::test]
async fn a_replayed_request_that_fails_again_does_not_refresh_twice() {
    let state = Upstream::new(false, true);
    let address = spawn_upstream(state.clone());
    let gateway = gateway_for(&address);

    let response = gateway
        .execute(gateway.get("/api/records"))
        .await
        .expect("replay outcome passes through as a response");

    // The second 401 propagates; the refresh ran once for the wave.
    assert_eq!(401, response.status().as_u16());
    assert_eq!(1, state.refresh_calls.load(Ordering::SeqCst));
    assert_eq!(2, state.record_calls.load(Ordering::SeqCst));
}

#[tokio::test]
async fn non_401_responses_pass_through_untouched() {
    let state = Upstream::new(false, false);
    let address = spawn_upstream(state.clone());
    let gateway = gateway_for(&address);

    let response = gateway
        .execute(gateway.get("/api/teapot"))
        .await
        .expect("teapot is not an auth failure");

    assert_eq!(418, response.status().as_u16());
    assert_eq!(0, state.refresh_calls.load(Ordering::SeqCst));
}

#[tokio::test]
async fn a_second_wave_can_refresh_after_the_first_settles() {
    let state = Upstream::new(false, false);
    let address = spawn_upstream(state.clone());
    let gateway = gateway_for(&address);

    let first = gateway
        .execute(gateway.get("/api/records"))
        .await
        .expect("first wave should recover");
    assert_eq!(200, first.status().as_u16());
    assert_eq!(1, state.refresh_calls.load(Ordering::SeqCst));

    // The session goes stale again
    gateway.add_cookie("accessToken=stale-access; Path=/");

    let second = gateway
        .execute(gateway.get("/api/records"))
        .await
        .expect("second wave should recover");
    assert_eq!(200, second.status().as_u16());
    assert_eq!(2, state.refresh_calls.load(Ordering::SeqCst));
}
