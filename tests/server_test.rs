//! Integration tests for the accel-stream HTTP server

#[cfg(feature = "server")]
mod server_tests {
    use accel_stream::hub::{BroadcastHub, Event, Sample, TapEvent};
    use accel_stream::server::{run, ServerConfig};
    use accel_stream::stats::create_shared_stats;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;
    use std::time::Duration;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    async fn start() -> (SocketAddr, Arc<BroadcastHub>, tokio::sync::oneshot::Sender<()>) {
        let stats = create_shared_stats();
        let hub = Arc::new(BroadcastHub::new(64, stats.clone()));
        let config = ServerConfig::new(LOCALHOST, 0);

        let (addr, shutdown_tx) = run(config, hub.clone(), stats)
            .await
            .expect("Failed to start server");

        // Give server time to start
        tokio::time::sleep(Duration::from_millis(100)).await;
        (addr, hub, shutdown_tx)
    }

    /// Poll until the hub has `count` subscribers.
    async fn wait_for_subscribers(hub: &BroadcastHub, count: usize) {
        for _ in 0..100 {
            if hub.subscriber_count() == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "expected {count} subscribers, found {}",
            hub.subscriber_count()
        );
    }

    /// Read SSE chunks until `count` `data:` payloads have arrived.
    async fn read_messages(response: &mut reqwest::Response, count: usize) -> Vec<serde_json::Value> {
        let mut buffer = String::new();
        let mut messages = Vec::new();

        while messages.len() < count {
            let chunk = tokio::time::timeout(Duration::from_secs(5), response.chunk())
                .await
                .expect("timed out waiting for stream data")
                .expect("stream read failed")
                .expect("stream ended early");
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(end) = buffer.find("\n\n") {
                let frame: String = buffer.drain(..end + 2).collect();
                for line in frame.lines() {
                    if let Some(data) = line.strip_prefix("data:") {
                        messages.push(serde_json::from_str(data.trim()).expect("invalid JSON"));
                    }
                }
            }
        }
        messages
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (addr, _hub, shutdown_tx) = start().await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());

        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["status"], "ok");
        assert!(body["version"].as_str().is_some());

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_latest_returns_last_data_sample() {
        let (addr, hub, shutdown_tx) = start().await;

        hub.broadcast(Event::Data(Sample::new(0.1, 0.2, 0.97, 1_000)));
        hub.broadcast(Event::Tap(TapEvent::new(2)));

        let response = reqwest::Client::new()
            .get(format!("http://{}/latest", addr))
            .header("Origin", "http://example.com")
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );

        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["x"], 0.1);
        assert_eq!(body["z"], 0.97);
        assert_eq!(body["t"], 1_000);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_event_stream_delivers_tagged_messages() {
        let (addr, hub, shutdown_tx) = start().await;

        let mut response = reqwest::Client::new()
            .get(format!("http://{}/events", addr))
            .send()
            .await
            .expect("Failed to open stream");
        assert!(response.status().is_success());
        assert!(response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .starts_with("text/event-stream"));

        wait_for_subscribers(&hub, 1).await;

        hub.broadcast(Event::Data(Sample::new(0.0, 0.0, 1.0, 5)));
        hub.broadcast(Event::Tap(TapEvent::new(1)));
        hub.broadcast(Event::Data(Sample::new(0.5, 0.0, 1.0, 6)));

        let messages = read_messages(&mut response, 3).await;
        assert_eq!(messages[0]["type"], "data");
        assert_eq!(messages[0]["data"]["t"], 5);
        assert_eq!(messages[1]["type"], "tap");
        assert_eq!(messages[1]["data"]["count"], 1);
        assert_eq!(messages[1]["data"]["classification"], "single");
        assert_eq!(messages[2]["data"]["x"], 0.5);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_disconnect_unsubscribes() {
        let (addr, hub, shutdown_tx) = start().await;

        let response = reqwest::Client::new()
            .get(format!("http://{}/events", addr))
            .send()
            .await
            .expect("Failed to open stream");
        wait_for_subscribers(&hub, 1).await;

        drop(response);

        // The server only notices the disconnect when it next writes.
        for _ in 0..50 {
            hub.broadcast(Event::Data(Sample::default()));
            if hub.subscriber_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(hub.subscriber_count(), 0);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_shutdown_closes_open_streams() {
        let (addr, hub, shutdown_tx) = start().await;

        let mut response = reqwest::Client::new()
            .get(format!("http://{}/events", addr))
            .send()
            .await
            .expect("Failed to open stream");
        wait_for_subscribers(&hub, 1).await;

        let _ = shutdown_tx.send(());

        let ended = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match response.chunk().await {
                    Ok(Some(_)) => continue,
                    _ => break,
                }
            }
        })
        .await;
        assert!(ended.is_ok(), "stream did not end after shutdown");
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let (addr, hub, shutdown_tx) = start().await;
        let _sub = hub.subscribe();
        hub.broadcast(Event::Data(Sample::default()));

        let body: serde_json::Value = reqwest::Client::new()
            .get(format!("http://{}/stats", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");

        assert_eq!(body["active_subscribers"], 1);
        assert_eq!(body["subscriber_capacity"], 64);
        assert_eq!(body["deliveries"], 1);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_static_dir_fallback() {
        let dir = std::env::temp_dir().join(format!("accel-stream-static-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("Failed to create static dir");
        std::fs::write(dir.join("index.html"), "<h1>accel</h1>").expect("Failed to write file");

        let stats = create_shared_stats();
        let hub = Arc::new(BroadcastHub::new(64, stats.clone()));
        let config = ServerConfig::new(LOCALHOST, 0).with_static_dir(dir.clone());
        let (addr, shutdown_tx) = run(config, hub, stats)
            .await
            .expect("Failed to start server");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = reqwest::Client::new();
        let page = client
            .get(format!("http://{}/index.html", addr))
            .send()
            .await
            .expect("Failed to send request");
        assert!(page.status().is_success());
        assert_eq!(page.text().await.unwrap(), "<h1>accel</h1>");

        // API routes still win over the fallback.
        let health = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .expect("Failed to send request");
        assert!(health.status().is_success());

        let missing = client
            .get(format!("http://{}/nope.txt", addr))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        let _ = shutdown_tx.send(());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_events_after_shutdown_end_immediately() {
        let (addr, hub, shutdown_tx) = start().await;
        hub.close_all();

        let mut response = reqwest::Client::new()
            .get(format!("http://{}/events", addr))
            .send()
            .await
            .expect("Failed to open stream");

        let ended = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match response.chunk().await {
                    Ok(Some(_)) => continue,
                    _ => break,
                }
            }
        })
        .await;
        assert!(ended.is_ok(), "stream on a closed hub did not end");
        assert_eq!(hub.subscriber_count(), 0);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let (addr, _hub, shutdown_tx) = start().await;

        let response = reqwest::Client::new()
            .request(reqwest::Method::OPTIONS, format!("http://{}/latest", addr))
            .header("Origin", "http://localhost:3000")
            .header("Access-Control-Request-Method", "GET")
            .send()
            .await
            .expect("Failed to send request");

        assert!(
            response.status().is_success() || response.status() == reqwest::StatusCode::NO_CONTENT,
            "CORS preflight failed: {}",
            response.status()
        );

        let _ = shutdown_tx.send(());
    }
}
