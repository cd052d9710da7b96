//! Resolution-engine behavior against live (local) HTTP servers.
//!
//! Each test spins an axum fixture on an ephemeral port; nothing leaves
//! the loopback interface.

use std::time::Duration;

use axum::http::header;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use tuner_core::resolver::resolve;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

#[tokio::test]
async fn audio_content_type_returns_url_unchanged() {
    let app = Router::new().route(
        "/live",
        get(|| async { ([(header::CONTENT_TYPE, "audio/mpeg")], "\u{0}\u{1}not text") }),
    );
    let url = format!("{}/live", serve(app).await);

    assert_eq!(resolve(&client(), &url, TIMEOUT).await, url);
}

#[tokio::test]
async fn playlist_body_resolves_to_first_absolute_url() {
    let body = "#comment\n\nhttp://stream.example/a\nhttp://stream.example/b";
    let app = Router::new().route(
        "/playlist",
        get(move || async move { ([(header::CONTENT_TYPE, "text/plain")], body) }),
    );
    let url = format!("{}/playlist", serve(app).await);

    assert_eq!(
        resolve(&client(), &url, TIMEOUT).await,
        "http://stream.example/a"
    );
}

#[tokio::test]
async fn playlist_without_urls_in_budget_falls_back_to_original() {
    // 70 comment lines exceed the 64-line sample budget, so the URL on
    // line 71 must never be reached
    let mut body = String::new();
    for i in 0..70 {
        body.push_str(&format!("#filler {}\n", i));
    }
    body.push_str("http://stream.example/too-late\n");
    let app = Router::new().route(
        "/deep",
        get(move || async move { ([(header::CONTENT_TYPE, "text/plain")], body.clone()) }),
    );
    let url = format!("{}/deep", serve(app).await);

    assert_eq!(resolve(&client(), &url, TIMEOUT).await, url);
}

#[tokio::test]
async fn html_page_falls_back_to_original() {
    let app = Router::new().route(
        "/page",
        get(|| async {
            (
                [(header::CONTENT_TYPE, "text/html")],
                "<html><body>schedule, shows, contact</body></html>",
            )
        }),
    );
    let url = format!("{}/page", serve(app).await);

    assert_eq!(resolve(&client(), &url, TIMEOUT).await, url);
}

#[tokio::test]
async fn connection_refused_returns_original_url() {
    // bind and immediately drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let url = format!("http://{}/stream", addr);

    assert_eq!(resolve(&client(), &url, TIMEOUT).await, url);
}

#[tokio::test]
async fn stream_extension_short_circuits_before_any_request() {
    // unroutable host: only the extension heuristic can answer this fast
    let url = "http://radio.invalid/live.mp3";
    assert_eq!(resolve(&client(), url, TIMEOUT).await, url);
}
