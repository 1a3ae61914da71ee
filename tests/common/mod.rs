//! A wiremock server standing in for the availability backend.
//!
//! The client under test is blocking, so the mock server's async API is
//! driven from a small runtime owned by the helper.

#![allow(dead_code)]

use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const BOB_REPORT: &str = r#"{"username":"bob","results":[{"platform":"x","valid":true,"available":false,"error":false}]}"#;

pub struct MockBackend {
    server: MockServer,
    runtime: Runtime,
}

impl MockBackend {
    pub fn start() -> Self {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("build test runtime");
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime }
    }

    pub fn port(&self) -> u16 {
        self.server.address().port()
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    /// Answer the next `GET /check?username=<username>` with `response`.
    /// Replies for the same username are served in the order they were added.
    pub fn reply(&self, username: &str, response: ResponseTemplate) {
        self.mount(
            Mock::given(method("GET"))
                .and(path("/check"))
                .and(query_param("username", username))
                .respond_with(response)
                .up_to_n_times(1),
        );
    }

    /// Answer the next lookup of `username` with a 200 JSON `body`.
    pub fn reply_json(&self, username: &str, body: &str) {
        self.reply(
            username,
            ResponseTemplate::new(200).set_body_raw(body, "application/json"),
        );
    }

    /// Accept the next lookup of `username` but hold the reply for `delay`.
    pub fn stall(&self, username: &str, delay: Duration) {
        self.reply(
            username,
            ResponseTemplate::new(200)
                .set_body_raw(BOB_REPORT, "application/json")
                .set_delay(delay),
        );
    }

    /// Every request served so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.runtime
            .block_on(self.server.received_requests())
            .expect("request recording is on by default")
    }

    /// Path and query of every request served so far.
    pub fn request_targets(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| match r.url.query() {
                Some(query) => format!("{}?{query}", r.url.path()),
                None => r.url.path().to_string(),
            })
            .collect()
    }
}
