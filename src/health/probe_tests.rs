// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `probe.rs`

use super::*;
use serde_json::json;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Level;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn loopback(name: &str) -> Server {
    Server {
        name: name.to_string(),
        ip: Ipv4Addr::LOCALHOST,
    }
}

/// Collects formatted log output written at WARN and above.
#[derive(Clone, Default)]
struct WarnLog(Arc<Mutex<Vec<u8>>>);

impl WarnLog {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        let sink = self.clone();
        tracing_subscriber::fmt()
            .with_max_level(Level::WARN)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish()
    }
}

impl io::Write for WarnLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn health_url(mock: &MockServer) -> Url {
    Url::parse(&format!(
        "http://vhost.test:{}/health",
        mock.address().port()
    ))
    .unwrap()
}

#[test]
fn test_classify_200_without_flag() {
    let result = classify(StatusCode::OK, b"ok");
    assert!(result.healthy);
    assert!(!result.is_primary);
}

#[test]
fn test_classify_200_primary() {
    let result = classify(StatusCode::OK, br#"{"primary": true}"#);
    assert_eq!(
        result,
        ProbeResult {
            healthy: true,
            is_primary: true
        }
    );
}

#[test]
fn test_classify_non_200_is_unhealthy() {
    for status in [
        StatusCode::NO_CONTENT,
        StatusCode::MOVED_PERMANENTLY,
        StatusCode::NOT_FOUND,
        StatusCode::SERVICE_UNAVAILABLE,
    ] {
        // The primary flag is ignored for unhealthy responses
        let result = classify(status, br#"{"primary": true}"#);
        assert_eq!(result, ProbeResult::unhealthy(), "{status} should be unhealthy");
    }
}

#[test]
fn test_primary_flag_truthiness() {
    let truthy = [
        r#"{"primary": true}"#,
        r#"{"primary": 1}"#,
        r#"{"primary": "true"}"#,
        r#"{"primary": "YES"}"#,
        r#"{"isPrimary": true}"#,
        r#"{"is_primary": "1"}"#,
    ];
    for body in truthy {
        assert!(
            classify(StatusCode::OK, body.as_bytes()).is_primary,
            "{body} should be primary"
        );
    }

    let falsy = [
        r#"{"primary": false}"#,
        r#"{"primary": 0}"#,
        r#"{"primary": "no"}"#,
        r#"{"primary": null}"#,
        r#"{"primary": {"nested": true}}"#,
        r#"{"role": "primary"}"#,
        r#"[true]"#,
        "not json",
        "",
    ];
    for body in falsy {
        assert!(
            !classify(StatusCode::OK, body.as_bytes()).is_primary,
            "{body:?} should not be primary"
        );
    }
}

#[test]
fn test_first_present_key_wins() {
    // `primary` takes precedence over the camelCase fallback
    let result = classify(StatusCode::OK, br#"{"primary": false, "isPrimary": true}"#);
    assert!(!result.is_primary);
}

#[tokio::test]
async fn test_probe_presents_virtual_hostname() {
    let mock = MockServer::start().await;
    let port = mock.address().port();
    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header("host", format!("vhost.test:{port}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"primary": false})))
        .expect(1)
        .mount(&mock)
        .await;

    let server = loopback("edge-1");
    let probe = HttpsProbe::new(health_url(&mock), std::slice::from_ref(&server)).unwrap();

    let result = probe.probe(&server).await;
    assert!(result.healthy);
    assert!(!result.is_primary);
}

#[tokio::test]
async fn test_probe_reads_primary_flag() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"primary": true})))
        .mount(&mock)
        .await;

    let server = loopback("edge-1");
    let probe = HttpsProbe::new(health_url(&mock), std::slice::from_ref(&server)).unwrap();

    assert_eq!(
        probe.probe(&server).await,
        ProbeResult {
            healthy: true,
            is_primary: true
        }
    );
}

#[tokio::test]
async fn test_probe_non_200_is_unhealthy() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"primary": true})))
        .mount(&mock)
        .await;

    let server = loopback("edge-1");
    let probe = HttpsProbe::new(health_url(&mock), std::slice::from_ref(&server)).unwrap();

    assert_eq!(probe.probe(&server).await, ProbeResult::unhealthy());
}

#[tokio::test]
async fn test_probe_timeout_is_unhealthy() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock)
        .await;

    let server = loopback("edge-1");
    let probe = HttpsProbe::with_timeout(
        health_url(&mock),
        std::slice::from_ref(&server),
        Duration::from_millis(50),
    )
    .unwrap();

    assert_eq!(probe.probe(&server).await, ProbeResult::unhealthy());
}

#[tokio::test]
async fn test_probe_unknown_server_is_unhealthy() {
    let mock = MockServer::start().await;
    let probe = HttpsProbe::new(health_url(&mock), &[loopback("edge-1")]).unwrap();

    let stranger = Server {
        name: "stranger".into(),
        ip: Ipv4Addr::new(192, 0, 2, 99),
    };
    assert_eq!(probe.probe(&stranger).await, ProbeResult::unhealthy());
}

#[tokio::test(flavor = "current_thread")]
async fn test_failed_probes_logged_at_warn() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock)
        .await;

    let server = loopback("edge-1");
    let refused = HttpsProbe::new(health_url(&mock), std::slice::from_ref(&server)).unwrap();
    let mut slow_url = health_url(&mock);
    slow_url.set_path("/slow");
    let slow = HttpsProbe::with_timeout(
        slow_url,
        std::slice::from_ref(&server),
        Duration::from_millis(50),
    )
    .unwrap();

    let log = WarnLog::default();
    let _guard = tracing::subscriber::set_default(log.subscriber());

    assert_eq!(refused.probe(&server).await, ProbeResult::unhealthy());
    assert_eq!(slow.probe(&server).await, ProbeResult::unhealthy());

    let output = log.contents();
    assert!(output.contains("Health probe returned non-200 status"), "{output}");
    assert!(output.contains("Health probe failed"), "{output}");
    assert!(output.contains("edge-1"), "{output}");
}
