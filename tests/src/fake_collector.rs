//! In-process stand-in for the data collector's login and stage library
//! endpoints. The first path segment picks a scenario, so one server covers
//! every test: `http://127.0.0.1:61417/<scenario>/login`.

use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server,
};
use lazy_static::lazy_static;
use serde_json::json;
use std::{
    collections::HashMap,
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Mutex, Once,
    },
    thread,
    time::Duration,
};
use tokio::runtime::Runtime;

static START_COLLECTOR: Once = Once::new();
static SESSION_COUNTER: AtomicUsize = AtomicUsize::new(0);

lazy_static! {
    // session id -> scenario it was issued for
    static ref SESSIONS: Mutex<HashMap<String, String>> = Mutex::new(HashMap::new());
}

const PORT: u16 = 61417;

pub fn base_url(scenario: &str) -> String {
    format!("http://127.0.0.1:{}/{}", PORT, scenario)
}

pub fn start_once() {
    START_COLLECTOR.call_once(|| {
        let (ready_tx, ready_rx) = mpsc::channel();

        thread::spawn(move || {
            Runtime::new().unwrap().block_on(async move {
                let addr = SocketAddr::from(([127, 0, 0, 1], PORT));

                let server = Server::bind(&addr).serve(make_service_fn(|_| async {
                    Ok::<_, Infallible>(service_fn(handle_request))
                }));
                ready_tx.send(()).unwrap();

                if let Err(e) = server.await {
                    eprintln!("Fake collector error: {}", e);
                }
            });
        });

        ready_rx.recv().unwrap();
    });
}

async fn handle_request(request: Request<Body>) -> Result<Response<Body>, Infallible> {
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or_default().to_string();
    let cookie = request
        .headers()
        .get("cookie")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    let response = match segments.as_slice() {
        [scenario, "login"] => login(scenario, &query),
        [scenario, "rest", "v1", "definitions"] => {
            if !is_authorized(scenario, &cookie) {
                unauthorized()
            } else {
                definitions(scenario).await
            }
        }
        [scenario, "rest", "v1", "definitions", "stages", _, _, "icon"] => {
            if !is_authorized(scenario, &cookie) {
                unauthorized()
            } else {
                icon(scenario)
            }
        }
        _ => respond(404, "text/plain", "not found"),
    };

    Ok(response)
}

fn login(scenario: &str, query: &str) -> Response<Body> {
    let parameters: Vec<&str> = query.split('&').collect();
    if !parameters.contains(&"j_username=admin") || !parameters.contains(&"j_password=admin") {
        return unauthorized();
    }

    let session_id = format!(
        "{}-{}",
        scenario,
        SESSION_COUNTER.fetch_add(1, Ordering::SeqCst)
    );
    SESSIONS
        .lock()
        .unwrap()
        .insert(session_id.clone(), scenario.to_string());

    Response::builder()
        .status(200)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Set-Cookie", format!("JSESSIONID={}; Path=/; HttpOnly", session_id))
        .body(Body::from("<html><body>logged in</body></html>"))
        .unwrap()
}

/// Accepts only a session issued by a login of the same scenario.
fn is_authorized(scenario: &str, cookie: &str) -> bool {
    let sessions = SESSIONS.lock().unwrap();

    cookie
        .split(';')
        .filter_map(|pair| pair.trim().strip_prefix("JSESSIONID="))
        .any(|session_id| sessions.get(session_id).map(String::as_str) == Some(scenario))
}

async fn definitions(scenario: &str) -> Response<Body> {
    let first_icon = match scenario {
        "svg" => "dev.svg",
        "empty" => {
            let body = json!({"pipeline": [], "stages": [{}]});
            return respond(200, "application/json", body.to_string());
        }
        "slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            "dev.png"
        }
        _ => "dev.png",
    };

    let body = json!({
        "pipeline": [{"name": "pipeline", "configDefinitions": []}],
        "stages": [
            {"library": "basic-lib", "name": "dev-origin", "icon": first_icon},
            {"library": "basic-lib", "name": "trash", "icon": "trash.svg"}
        ],
        "rulesElMetadata": {"elFunctionDefinitions": [], "elConstantDefinitions": []},
        "elCatalog": {"elFunctionDefinitions": [], "elConstantDefinitions": []},
        "runtimeConfigs": []
    });

    respond(200, "application/json", body.to_string())
}

fn icon(scenario: &str) -> Response<Body> {
    match scenario {
        // "mismatch" advertises a png icon but serves an svg
        "svg" | "mismatch" => respond(200, "image/svg+xml", "<svg/>"),
        _ => respond(200, "image/png", &b"\x89PNG\r\n\x1a\n"[..]),
    }
}

fn unauthorized() -> Response<Body> {
    respond(401, "text/plain", "unauthorized")
}

fn respond<B: Into<Body>>(status: u16, content_type: &str, body: B) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("Content-Type", content_type)
        .body(body.into())
        .unwrap()
}
