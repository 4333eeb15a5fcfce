//! End-to-end attach-mode tests against an in-process mock DevTools endpoint
//!
//! The mock serves the discovery HTTP surface (`/json/version`, `/json`) and a
//! WebSocket target that answers every command, so a full session lifecycle
//! runs without any real browser.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

use post_scrapper::config::{AttachMode, SessionConfig};
use post_scrapper::session::{Session, SessionState};
use post_scrapper::Error;

/// Start the mock DevTools endpoint; returns its discovery HTTP port
async fn start_mock_devtools() -> u16 {
    let ws_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let ws_port = ws_listener.local_addr().unwrap().port();
    tokio::spawn(run_ws_server(ws_listener));

    let http_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let http_port = http_listener.local_addr().unwrap().port();
    tokio::spawn(run_http_server(http_listener, http_port, ws_port));

    http_port
}

/// Minimal HTTP server for the discovery endpoints
async fn run_http_server(listener: TcpListener, http_port: u16, ws_port: u16) {
    loop {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };

        let mut buf = vec![0u8; 2048];
        let n = stream.read(&mut buf).await.unwrap_or(0);
        let request = String::from_utf8_lossy(&buf[..n]);
        let path = request
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .unwrap_or("/");

        let ws_url = format!("ws://127.0.0.1:{}/devtools/page/TEST", ws_port);
        let body = if path.starts_with("/json/version") {
            serde_json::json!({
                "Browser": "MockChrome/1.0",
                "Protocol-Version": "1.3",
                "webSocketDebuggerUrl": format!("ws://127.0.0.1:{}/devtools/browser/MOCK", http_port),
            })
            .to_string()
        } else if path.starts_with("/json/new") {
            serde_json::json!({
                "id": "NEW",
                "type": "page",
                "url": "about:blank",
                "webSocketDebuggerUrl": ws_url,
            })
            .to_string()
        } else {
            serde_json::json!([{
                "id": "TEST",
                "type": "page",
                "title": "Mock Page",
                "url": "about:blank",
                "webSocketDebuggerUrl": ws_url,
            }])
            .to_string()
        };

        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }
}

/// WebSocket target answering every command
async fn run_ws_server(listener: TcpListener) {
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        tokio::spawn(handle_ws_connection(stream));
    }
}

async fn handle_ws_connection(stream: TcpStream) {
    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (mut sink, mut source) = ws.split();

    while let Some(Ok(message)) = source.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(request) = serde_json::from_str::<serde_json::Value>(&text) else {
            continue;
        };

        let id = request.get("id").and_then(|v| v.as_u64()).unwrap_or(0);
        let method = request.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let expression = request
            .pointer("/params/expression")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let result = match method {
            "Page.navigate" => serde_json::json!({
                "frameId": "F1",
                "loaderId": "L1",
            }),
            "Runtime.evaluate" if expression.contains("document.readyState") => {
                serde_json::json!({ "result": { "type": "string", "value": "complete" } })
            }
            "Runtime.evaluate" if expression.contains("responseStatus") => {
                serde_json::json!({ "result": { "type": "number", "value": 200 } })
            }
            "Runtime.evaluate" if expression.contains("location.href") => {
                serde_json::json!({ "result": { "type": "string", "value": "https://example.test/" } })
            }
            "Runtime.evaluate" => {
                serde_json::json!({ "result": { "type": "undefined" } })
            }
            _ => serde_json::json!({}),
        };

        let reply = serde_json::json!({ "id": id, "result": result }).to_string();
        if sink.send(Message::Text(reply)).await.is_err() {
            return;
        }
    }
}

fn attach_config(port: u16) -> SessionConfig {
    SessionConfig {
        attach_mode: AttachMode::AttachByEndpoint,
        endpoint_port: Some(port),
        connect_timeout_ms: 5000,
        poll_interval_ms: 50,
        ..SessionConfig::default()
    }
}

#[tokio::test]
async fn test_attach_session_lifecycle() {
    let port = start_mock_devtools().await;

    let mut session = Session::enter(attach_config(port)).await.unwrap();
    assert_eq!(session.state(), SessionState::Ready);

    let result = session.open("https://example.test/").await.unwrap();
    assert_eq!(result.status_code, 200);
    assert_eq!(result.url, "https://example.test/");

    session.exit().await;
    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.page().is_err());

    // A second exit is harmless
    session.exit().await;
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_attach_page_survives_multiple_navigations() {
    let port = start_mock_devtools().await;

    let session = Session::enter(attach_config(port)).await.unwrap();
    let page = session.page().unwrap();

    for _ in 0..3 {
        let result = page.goto("https://example.test/").await.unwrap();
        assert_eq!(result.status_code, 200);
    }
    assert!(page.is_active());

    page.close().await.unwrap();
    assert!(!page.is_active());
}

#[tokio::test]
async fn test_attach_spawn_fallback_surfaces_launch_failure() {
    // Nothing listens on the port, so attach falls back to spawning; a bogus
    // executable path makes that deterministic on any machine.
    let free_port = {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        probe.local_addr().unwrap().port()
    };

    let config = SessionConfig {
        chrome_path: Some("/nonexistent/chrome-binary".to_string()),
        ..attach_config(free_port)
    };

    let result = Session::enter(config).await;
    assert!(matches!(result, Err(Error::Launch(_))));
}
