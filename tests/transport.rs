//! Transport behavior of single attempts against fixed URLs.

use std::time::Duration;

use failover_client::error::codes;
use failover_client::{Charset, ClientConfig, HttpClient};

mod common;
use common::{Action, Reply};

fn config() -> ClientConfig {
    common::config_with_group("unused", &[])
}

#[test]
fn bodyless_methods_send_no_entity() {
    let backend = common::start_mock_backend("ok");
    let client = HttpClient::from_config(&config()).unwrap();

    for method in ["GET", "DELETE", "OPTIONS"] {
        let mut req = client.build(method);
        req.set_text("must not be sent");
        req.execute_url(&backend.url("/r")).unwrap();
    }

    for seen in backend.requests() {
        assert!(seen.body.is_empty(), "{}", seen.method);
        assert!(seen.header("content-type").is_none());
        assert!(seen.header("transfer-encoding").is_none());
    }
}

#[test]
fn unknown_method_is_sent_as_post_with_text_body() {
    let backend = common::start_mock_backend("ok");
    let client = HttpClient::from_config(&config()).unwrap();

    let mut req = client.build("frobnicate");
    req.set_header("X-Trace", "t-1").set_text("payload");
    req.execute_url(&backend.url("/submit?x=1")).unwrap();

    let seen = &backend.requests()[0];
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.path, "/submit?x=1");
    assert_eq!(seen.body, b"payload");
    assert_eq!(seen.header("content-type"), Some("text/plain; charset=UTF-8"));
    assert_eq!(seen.header("x-trace"), Some("t-1"));
    assert_eq!(seen.header("host"), Some(backend.addr.to_string().as_str()));
}

#[test]
fn head_response_has_empty_body() {
    let backend = common::start_mock_backend("not for head");
    let client = HttpClient::from_config(&config()).unwrap();

    let res = client.build("head").execute_url(&backend.url("/")).unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.header("content-length"), Some("12"));
    assert!(res.body().is_empty());
}

#[test]
fn kept_alive_connection_is_reused_after_close() {
    let backend = common::start_mock_backend("ok");
    let client = HttpClient::from_config(&config()).unwrap();

    let mut first = client.build("GET");
    first.execute_url(&backend.url("/1")).unwrap();
    assert_eq!(client.leased_connections(), 1);
    first.close();
    first.close();
    assert_eq!(client.leased_connections(), 0);
    assert_eq!(client.idle_connections(), 1);

    let mut second = client.build("GET");
    second.execute_url(&backend.url("/2")).unwrap();
    drop(second);

    let seen = backend.requests();
    assert_eq!(seen[0].header("connection"), Some("keep-alive"));
    assert_eq!(seen[1].connection, seen[0].connection);
    assert_eq!(backend.connections(), 1);
}

#[test]
fn disabled_keep_alive_closes_every_connection() {
    let backend = common::start_mock_backend("ok");
    let mut config = config();
    config.keep_alive.enable = false;
    let client = HttpClient::from_config(&config).unwrap();

    for path in ["/1", "/2"] {
        client.build("GET").execute_url(&backend.url(path)).unwrap();
    }

    assert_eq!(client.idle_connections(), 0);
    let seen = backend.requests();
    assert_eq!(seen[0].header("connection"), Some("close"));
    assert_ne!(seen[0].connection, seen[1].connection);
}

#[test]
fn server_close_prevents_reuse() {
    let backend =
        common::start_programmable_backend(|_| Action::Reply(Reply::ok("bye").closing()));
    let client = HttpClient::from_config(&config()).unwrap();

    client.build("GET").execute_url(&backend.url("/")).unwrap();
    assert_eq!(client.idle_connections(), 0);
}

#[test]
fn dropped_reused_connection_is_no_http_response() {
    let backend = common::start_programmable_backend(|req| {
        if req.path == "/first" {
            Action::Reply(Reply::ok("ok"))
        } else {
            Action::Drop
        }
    });
    let client = HttpClient::from_config(&config()).unwrap();

    client.build("GET").execute_url(&backend.url("/first")).unwrap();
    assert_eq!(client.idle_connections(), 1);

    let err = client
        .build("GET")
        .execute_url(&backend.url("/second"))
        .unwrap_err();
    assert_eq!(err.code(), codes::NO_HTTP_RESPONSE);
}

#[test]
fn fresh_connection_closed_without_response_is_no_http_response() {
    let backend = common::start_programmable_backend(|_| Action::Drop);
    let client = HttpClient::from_config(&config()).unwrap();

    let err = client.build("GET").execute_url(&backend.url("/")).unwrap_err();
    assert_eq!(err.code(), codes::NO_HTTP_RESPONSE);
    assert!(err.is_retryable());
    assert_eq!(backend.connections(), 1);
}

#[test]
fn ipv6_literal_backend_is_reachable() {
    let Some(backend) = common::start_ipv6_mock_backend("v6") else {
        return;
    };
    let client = HttpClient::from_config(&config()).unwrap();

    let res = client.build("GET").execute_url(&backend.url("/six")).unwrap();
    assert_eq!(res.text(), "v6");
    let seen = &backend.requests()[0];
    assert_eq!(seen.path, "/six");
    assert_eq!(seen.header("host"), Some(backend.addr.to_string().as_str()));
}

#[test]
fn idle_connections_count_toward_max_conn() {
    let a = common::start_mock_backend("a");
    let b = common::start_mock_backend("b");
    let mut config = config();
    config.max_conn = 1;
    let client = HttpClient::from_config(&config).unwrap();

    client.build("GET").execute_url(&a.url("/")).unwrap();
    client.build("GET").execute_url(&b.url("/")).unwrap();

    assert_eq!(client.idle_connections() + client.leased_connections(), 1);
    assert_eq!(client.idle_connections(), 1);
}

#[test]
fn silent_backend_is_socket_timeout() {
    let backend = common::start_programmable_backend(|_| Action::Hang(Duration::from_secs(3)));
    let mut config = config();
    config.timeout.socket_ms = Some(150);
    let client = HttpClient::from_config(&config).unwrap();

    let err = client.build("GET").execute_url(&backend.url("/")).unwrap_err();
    assert_eq!(err.code(), codes::SOCKET_TIMEOUT);
    assert_eq!(client.leased_connections(), 0);
}

#[test]
fn refused_connection_is_transient() {
    let client = HttpClient::from_config(&config()).unwrap();
    let url = format!("http://{}/", common::refused_address());

    let err = client.build("GET").execute_url(&url).unwrap_err();
    assert_eq!(err.code(), codes::CONN_REFUSED);
    assert!(err.is_retryable());
}

#[test]
fn full_route_times_out_waiting_for_a_connection() {
    let backend = common::start_mock_backend("ok");
    let mut config = config();
    config.max_conn_per_route = 1;
    config.timeout.request_ms = Some(100);
    let client = HttpClient::from_config(&config).unwrap();

    let mut held = client.build("GET");
    held.execute_url(&backend.url("/")).unwrap();

    let err = client.build("GET").execute_url(&backend.url("/")).unwrap_err();
    assert_eq!(err.code(), codes::CONN_TIMEOUT);

    held.close();
    client.build("GET").execute_url(&backend.url("/")).unwrap();
}

#[test]
fn response_text_uses_declared_charset() {
    let backend = common::start_programmable_backend(|_| {
        Action::Reply(
            Reply::ok(b"caf\xe9".to_vec()).header("Content-Type", "text/plain; charset=iso-8859-1"),
        )
    });
    let client = HttpClient::from_config(&config()).unwrap();

    let res = client.build("GET").execute_url(&backend.url("/")).unwrap();
    assert_eq!(res.encoding(), Charset::Latin1);
    assert_eq!(res.text(), "café");
}

#[test]
fn configured_encoding_applies_to_text_bodies() {
    let backend = common::start_programmable_backend(|req| {
        Action::Reply(Reply::ok(req.body.clone()))
    });
    let mut config = config();
    config.encoding = "us-ascii".into();
    let client = HttpClient::from_config(&config).unwrap();

    let mut req = client.build("POST");
    req.set_text("naïve");
    let res = req.execute_url(&backend.url("/")).unwrap();

    assert_eq!(res.body().as_ref(), b"na?ve");
    assert_eq!(res.encoding(), Charset::Ascii);
    assert_eq!(
        backend.requests()[0].header("content-type"),
        Some("text/plain; charset=US-ASCII")
    );
}
