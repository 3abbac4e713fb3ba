use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use soc_switcher::SwitcherError;
use soc_switcher::config::GrowattConfig;
use soc_switcher::growatt::{GrowattClient, PowerMonitor, hash_password};
use std::time::{Duration, Instant};

fn client_for(server: &ServerGuard, tries: u32) -> GrowattClient {
    client_with_wait(server, tries, 0)
}

fn client_with_wait(server: &ServerGuard, tries: u32, wait_seconds: u64) -> GrowattClient {
    let cfg = GrowattConfig {
        server_url: server.url(),
        username: "solar".to_string(),
        password: "secret".to_string(),
        login_tries: tries,
        login_retry_wait_seconds: wait_seconds,
        ..Default::default()
    };
    GrowattClient::new(cfg, Duration::from_secs(5))
}

fn login_ok_body() -> String {
    json!({"back": {"success": true, "user": {"accountName": "solar", "id": 4711}}}).to_string()
}

async fn mock_login_ok(server: &mut ServerGuard, hits: usize) -> Mock {
    server
        .mock("POST", "/newTwoLoginAPI.do")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("userName".into(), "solar".into()),
            Matcher::UrlEncoded("password".into(), hash_password("secret")),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("set-cookie", "JSESSIONID=abc123; Path=/")
        .with_body(login_ok_body())
        .expect(hits)
        .create_async()
        .await
}

async fn mock_directory(server: &mut ServerGuard, hits: usize) -> (Mock, Mock) {
    let plants = server
        .mock("GET", "/PlantListAPI.do")
        .match_query(Matcher::UrlEncoded("userId".into(), "4711".into()))
        .with_status(200)
        .with_body(
            json!({"back": {"data": [{"plantId": "1234", "plantName": "Roof"}], "success": true}})
                .to_string(),
        )
        .expect(hits)
        .create_async()
        .await;
    let devices = server
        .mock("GET", "/newTwoPlantAPI.do")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("op".into(), "getAllDeviceList".into()),
            Matcher::UrlEncoded("plantId".into(), "1234".into()),
        ]))
        .with_status(200)
        .with_body(json!({"deviceList": [{"deviceSn": "INV001"}]}).to_string())
        .expect(hits)
        .create_async()
        .await;
    (plants, devices)
}

fn status_query() -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("op".into(), "getSystemStatus_KW".into()),
        Matcher::UrlEncoded("plantId".into(), "1234".into()),
        Matcher::UrlEncoded("mixId".into(), "INV001".into()),
    ])
}

#[tokio::test]
async fn login_failing_every_attempt_stops_after_configured_tries() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/newTwoLoginAPI.do")
        .with_status(403)
        .expect(3)
        .create_async()
        .await;

    let mut client = client_for(&server, 3);
    let err = client.login().await.unwrap_err();

    assert!(matches!(err, SwitcherError::Auth { .. }));
    login.assert_async().await;
    assert!(client.session_info().is_none());
}

#[tokio::test]
async fn login_waits_between_attempts_but_not_after_the_last() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/newTwoLoginAPI.do")
        .with_status(403)
        .expect(3)
        .create_async()
        .await;

    let mut client = client_with_wait(&server, 3, 1);
    let started = Instant::now();
    let err = client.login().await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, SwitcherError::Auth { .. }));
    login.assert_async().await;
    assert!(elapsed >= Duration::from_secs(2), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn login_succeeding_on_second_attempt_makes_two_attempts() {
    let mut server = Server::new_async().await;
    let flaky = server
        .mock("POST", "/newTwoLoginAPI.do")
        .with_status(405)
        .expect(1)
        .create_async()
        .await;
    let ok = mock_login_ok(&mut server, 1).await;
    let (plants, devices) = mock_directory(&mut server, 1).await;

    let mut client = client_for(&server, 4);
    let info = client.login().await.unwrap();

    assert_eq!(info.user_id, "4711");
    assert_eq!(info.plant_id, "1234");
    assert_eq!(info.plant_name, "Roof");
    assert_eq!(info.inverter_sn, "INV001");
    flaky.assert_async().await;
    ok.assert_async().await;
    plants.assert_async().await;
    devices.assert_async().await;
}

#[tokio::test]
async fn rejected_credentials_are_not_retried() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/newTwoLoginAPI.do")
        .with_status(200)
        .with_body(
            json!({"back": {"success": false, "error": "User name or password is wrong"}})
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let (plants, _devices) = mock_directory(&mut server, 0).await;

    let mut client = client_for(&server, 5);
    let err = client.login().await.unwrap_err();

    assert!(matches!(err, SwitcherError::Auth { .. }));
    assert!(err.to_string().contains("password is wrong"));
    login.assert_async().await;
    plants.assert_async().await;
}

#[tokio::test]
async fn unreadable_login_body_is_retried() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/newTwoLoginAPI.do")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .expect(2)
        .create_async()
        .await;

    let mut client = client_for(&server, 2);
    let err = client.login().await.unwrap_err();

    assert!(matches!(err, SwitcherError::Auth { .. }));
    login.assert_async().await;
}

#[tokio::test]
async fn battery_reading_uses_session_cookie_and_identifiers() {
    let mut server = Server::new_async().await;
    let _login = mock_login_ok(&mut server, 1).await;
    let _dir = mock_directory(&mut server, 1).await;
    let status = server
        .mock("POST", "/newMixApi.do")
        .match_query(status_query())
        .match_header("cookie", Matcher::Regex("JSESSIONID=abc123".into()))
        .with_status(200)
        .with_body(json!({"obj": {"SOC": "77", "vBat": "53.2"}, "result": 1}).to_string())
        .expect(1)
        .create_async()
        .await;

    let mut client = client_for(&server, 1);
    client.login().await.unwrap();
    let reading = client.battery_reading().await.unwrap();

    assert_eq!(reading.soc_percent, 77);
    status.assert_async().await;
}

#[tokio::test]
async fn undecodable_status_signals_expired_session() {
    let mut server = Server::new_async().await;
    let _login = mock_login_ok(&mut server, 1).await;
    let _dir = mock_directory(&mut server, 1).await;
    let _status = server
        .mock("POST", "/newMixApi.do")
        .match_query(status_query())
        .with_status(200)
        .with_body("")
        .create_async()
        .await;

    let mut client = client_for(&server, 1);
    client.login().await.unwrap();
    let err = client.battery_reading().await.unwrap_err();

    assert!(matches!(err, SwitcherError::StatusDecode { .. }));
    assert!(err.is_session_expired());
}

#[tokio::test]
async fn status_http_failure_is_transport_error() {
    let mut server = Server::new_async().await;
    let _login = mock_login_ok(&mut server, 1).await;
    let _dir = mock_directory(&mut server, 1).await;
    let _status = server
        .mock("POST", "/newMixApi.do")
        .match_query(status_query())
        .with_status(502)
        .create_async()
        .await;

    let mut client = client_for(&server, 1);
    client.login().await.unwrap();
    let err = client.battery_reading().await.unwrap_err();

    assert!(matches!(err, SwitcherError::Transport { .. }));
}

#[tokio::test]
async fn out_of_range_soc_is_a_decode_error() {
    let mut server = Server::new_async().await;
    let _login = mock_login_ok(&mut server, 1).await;
    let _dir = mock_directory(&mut server, 1).await;
    let _status = server
        .mock("POST", "/newMixApi.do")
        .match_query(status_query())
        .with_status(200)
        .with_body(json!({"obj": {"SOC": 180}}).to_string())
        .create_async()
        .await;

    let mut client = client_for(&server, 1);
    client.login().await.unwrap();
    let err = client.battery_reading().await.unwrap_err();

    assert!(matches!(err, SwitcherError::StatusDecode { .. }));
}

#[tokio::test]
async fn reading_without_login_asks_for_a_new_session() {
    let server = Server::new_async().await;
    let client = client_for(&server, 1);
    let err = client.battery_reading().await.unwrap_err();
    assert!(err.is_session_expired());
}

#[tokio::test]
async fn fractional_soc_text_is_a_decode_error() {
    let mut server = Server::new_async().await;
    let _login = mock_login_ok(&mut server, 1).await;
    let _dir = mock_directory(&mut server, 1).await;
    let _status = server
        .mock("POST", "/newMixApi.do")
        .match_query(status_query())
        .with_status(200)
        .with_body(json!({"obj": {"SOC": "64.6"}}).to_string())
        .create_async()
        .await;

    let mut client = client_for(&server, 1);
    client.login().await.unwrap();
    let err = client.battery_reading().await.unwrap_err();

    assert!(matches!(err, SwitcherError::StatusDecode { .. }));
}
