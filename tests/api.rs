mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{BOB_REPORT, MockBackend};
use handle_avail::check::{Backend, CheckError, Client, DatasetError, ProtocolError, StaticDataset};
use handle_avail::config::{Config, ConfigError, Overrides};
use handle_avail::controller::{Phase, SearchController};
use handle_avail::fragment::{self, PageLocation};
use handle_avail::render::DisplayState;
use wiremock::matchers::{header_regex, method, path};
use wiremock::{Mock, ResponseTemplate};

fn config_for(server: &MockBackend) -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: server.port(),
        ..Config::default()
    }
}

fn controller_for(server: &MockBackend, page: &str) -> SearchController {
    let config = config_for(server);
    let page = PageLocation::parse(page).unwrap();
    SearchController::new(Arc::new(Client::new(&config)), page, &config)
}

#[test]
fn end_to_end_single_row() {
    let server = MockBackend::start();
    server.reply_json("bob", BOB_REPORT);
    let mut controller = controller_for(&server, "http://localhost/");

    controller.on_input("bob", Instant::now());
    controller.run_until_idle();

    assert_eq!(server.request_targets(), ["/check?username=bob"]);
    assert_eq!(controller.display().to_string(), "x\t✅\t❌\n");
    let written = controller.page().read().unwrap();
    assert_eq!(fragment::decode(written).unwrap(), "bob");
    assert_eq!(controller.phase(), Phase::Idle);
}

#[test]
fn username_is_percent_encoded_in_request() {
    let body = r#"{"username":"a b&c","results":[]}"#;
    let server = MockBackend::start();
    server.reply_json("a b&c", body);
    let mut controller = controller_for(&server, "http://localhost/");

    controller.on_input(" a b&c ", Instant::now());
    controller.submit();
    controller.run_until_idle();

    assert_eq!(server.request_targets(), ["/check?username=a%20b%26c"]);
    assert_eq!(controller.display(), &DisplayState::NoResults);
    assert_eq!(controller.page().read(), Some("a%20b%26c"));
}

#[test]
fn restores_fragment_on_load() {
    let server = MockBackend::start();
    server.reply_json("bob", BOB_REPORT);
    let mut controller = controller_for(&server, "http://localhost/#%62ob");

    assert_eq!(controller.on_load(), Some("bob"));
    controller.run_until_idle();

    assert_eq!(server.request_targets(), ["/check?username=bob"]);
    assert_eq!(controller.page().as_str(), "http://localhost/#bob");
}

#[test]
fn malformed_json_shows_failure_and_keeps_fragment() {
    let server = MockBackend::start();
    server.reply_json("bob", "{not json");
    server.reply_json("bob", BOB_REPORT);
    let mut controller = controller_for(&server, "http://localhost/#previous");

    controller.on_input("bob", Instant::now());
    controller.submit();
    controller.run_until_idle();

    match controller.display() {
        DisplayState::Failed { message } => assert!(message.contains("malformed"), "{message}"),
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(controller.page().read(), Some("previous"));

    // still usable afterwards
    controller.on_input("bob", Instant::now());
    controller.submit();
    controller.run_until_idle();
    assert_eq!(controller.display().to_string(), "x\t✅\t❌\n");
}

#[test]
fn non_utf8_body_shows_failure_and_keeps_fragment() {
    let server = MockBackend::start();
    server.reply(
        "bob",
        ResponseTemplate::new(200).set_body_raw(vec![0xff, 0xfe, b'{'], "application/json"),
    );
    let mut controller = controller_for(&server, "http://localhost/#previous");

    controller.on_input("bob", Instant::now());
    controller.submit();
    controller.run_until_idle();

    assert!(
        matches!(controller.display(), DisplayState::Failed { .. }),
        "{:?}",
        controller.display()
    );
    assert_eq!(controller.page().read(), Some("previous"));
}

#[test]
fn server_error_status_is_protocol_error() {
    let server = MockBackend::start();
    server.reply("bob", ResponseTemplate::new(500).set_body_raw("{}", "application/json"));
    let client = Client::new(&config_for(&server));
    match client.check("bob") {
        Err(CheckError::Protocol(ProtocolError::Status(500))) => {}
        other => panic!("expected Status(500), got {other:?}"),
    }
}

#[test]
fn missing_fields_are_protocol_error() {
    let server = MockBackend::start();
    server.reply_json("bob", r#"{"username":"bob"}"#);
    let client = Client::new(&config_for(&server));
    match client.check("bob") {
        Err(CheckError::Protocol(ProtocolError::Body(_))) => {}
        other => panic!("expected Body error, got {other:?}"),
    }
}

#[test]
fn failed_platform_checks_render_as_unknown() {
    let body = r#"{"username":"bob","results":[
        {"platform":"b","valid":true,"available":false,"error":true},
        {"platform":"a","valid":false,"available":false,"error":false}
    ]}"#;
    let server = MockBackend::start();
    server.reply_json("bob", body);
    let mut controller = controller_for(&server, "http://localhost/");

    controller.on_input("bob", Instant::now());
    controller.submit();
    controller.run_until_idle();

    assert_eq!(controller.display().to_string(), "a\t❌\t❌\nb\t✅\t❓\n");
}

#[test]
fn timeout_is_network_error() {
    let server = MockBackend::start();
    server.stall("bob", Duration::from_secs(5));
    let config = Config {
        timeout: Duration::from_millis(300),
        ..config_for(&server)
    };
    let client = Client::new(&config);
    let started = Instant::now();
    match client.check("bob") {
        Err(e @ CheckError::Network(_)) => assert!(e.is_transport()),
        other => panic!("expected Network error, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn dataset_url_is_fetched_with_raw_accept_header() {
    let server = MockBackend::start();
    server.mount(
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .and(header_regex("accept", r"application/vnd\.github\.v3\.raw"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"[{"platform":"x","valid":true,"available":true,"error":false}]"#,
                "application/json",
            )),
    );
    let client = Client::new(&config_for(&server));

    let dataset = StaticDataset::open(&format!("{}/data.json", server.uri()), &client)
        .expect("dataset fetched");
    let report = dataset.check("bob").unwrap();
    assert_eq!(report.username, "bob");
    assert_eq!(report.results.len(), 1);
    assert_eq!(server.request_targets(), ["/data.json"]);
}

#[test]
fn missing_dataset_url_is_fetch_error() {
    let server = MockBackend::start();
    let client = Client::new(&config_for(&server));
    let url = format!("{}/data.json", server.uri());

    match StaticDataset::open(&url, &client) {
        Err(e @ DatasetError::Fetch { .. }) => assert!(e.to_string().contains(&url), "{e}"),
        other => panic!("expected Fetch error, got {other:?}"),
    }
}

#[test]
fn public_api_port_validation() {
    let page = PageLocation::parse("http://localhost/?port=http").unwrap();
    assert!(matches!(
        Config::from_page(&page, &Overrides::default()),
        Err(ConfigError::InvalidPort { .. })
    ));
}

#[test]
#[ignore = "requires a backend listening on localhost:8080"]
fn local_backend_answers() {
    let config = Config::default();
    let client = Client::new(&config);
    let report = client.check("bob").expect("backend reachable");
    assert!(!report.username.is_empty());
}
