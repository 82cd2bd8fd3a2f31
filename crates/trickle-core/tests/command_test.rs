// Command routing and the at-most-two-attempts retry policy.

mod common;

use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use trickle_api::CloudClient;
use trickle_core::{Command, CommandRunner};

use common::{controller_descriptor, vacuum_descriptor};

async fn setup() -> (MockServer, CommandRunner) {
    let server = MockServer::start().await;
    let client = CloudClient::from_reqwest(&server.uri(), reqwest::Client::new()).expect("client");
    (server, CommandRunner::new(client, 2))
}

#[tokio::test]
async fn first_failure_is_retried_without_backoff() {
    let (server, runner) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/device/on"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/device/on"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let ok = runner.run(&controller_descriptor(), &Command::Enable).await;
    assert!(ok);
    assert_eq!(
        server.received_requests().await.expect("requests").len(),
        2
    );
}

#[tokio::test]
async fn persistent_failure_gives_up_after_two_attempts() {
    let (server, runner) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/device/rain_delay"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let ok = runner
        .run(&controller_descriptor(), &Command::RainDelay { minutes: 60 })
        .await;
    assert!(!ok);
    assert_eq!(
        server.received_requests().await.expect("requests").len(),
        2
    );
}

#[tokio::test]
async fn rain_delay_converts_minutes_to_seconds() {
    let (server, runner) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/device/rain_delay"))
        .and(body_partial_json(serde_json::json!({
            "id": "dev-1",
            "duration": 7200
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    assert!(
        runner
            .run(&controller_descriptor(), &Command::RainDelay { minutes: 120 })
            .await
    );
}

#[tokio::test]
async fn zero_minute_zone_start_is_rejected_locally() {
    let (server, runner) = setup().await;

    // Build a zone descriptor off the fixture controller.
    let controller = controller_descriptor();
    let zone = trickle_core::ResourceDescriptor::zone(
        &controller,
        &serde_json::json!({ "id": "z-1", "zoneNumber": 1, "name": "Lawn" }),
    )
    .expect("zone descriptor");

    let ok = runner.run(&zone, &Command::StartZone { minutes: 0 }).await;
    assert!(!ok);
    assert!(
        server
            .received_requests()
            .await
            .expect("requests")
            .is_empty()
    );
}

#[tokio::test]
async fn kind_mismatch_is_rejected_without_remote_calls() {
    let (server, runner) = setup().await;

    let vacuum = vacuum_descriptor("dev-9", "6945841021309640");
    assert!(!runner.run(&vacuum, &Command::Enable).await);
    assert!(
        !runner
            .run(&controller_descriptor(), &Command::Dock)
            .await
    );
    assert!(
        server
            .received_requests()
            .await
            .expect("requests")
            .is_empty()
    );
}

#[tokio::test]
async fn fan_speed_writes_both_preference_keys() {
    let (server, runner) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/vacuum/dev-9/preference"))
        .and(body_partial_json(serde_json::json!({
            "key": "carpetBoost", "value": false
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/vacuum/dev-9/preference"))
        .and(body_partial_json(serde_json::json!({
            "key": "vacHigh", "value": true
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let vacuum = vacuum_descriptor("dev-9", "6945841021309640");
    assert!(
        runner
            .run(
                &vacuum,
                &Command::SetFanSpeed {
                    speed: trickle_core::FanSpeed::Performance
                }
            )
            .await
    );
}
