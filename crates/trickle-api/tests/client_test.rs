// Integration tests for `CloudClient` using wiremock.

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use trickle_api::types::Webhook;
use trickle_api::{CloudClient, Error, EventType, Person, PersonId};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, CloudClient) {
    let server = MockServer::start().await;
    let client = CloudClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

fn with_quota(template: ResponseTemplate) -> ResponseTemplate {
    template
        .insert_header("x-ratelimit-limit", "1700")
        .insert_header("x-ratelimit-remaining", "1688")
        .insert_header("x-ratelimit-reset", "2026-08-07T00:00:00Z")
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_get_self_and_person() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/person/info"))
        .respond_with(with_quota(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "person-1" })),
        ))
        .mount(&server)
        .await;

    let body = json!({
        "id": "person-1",
        "username": "gardener",
        "devices": [{
            "id": "dev-1",
            "name": "Front Yard",
            "macAddress": "AA:BB:CC:11:22:33",
            "status": "ONLINE",
            "zones": [
                {"id": "z-1", "name": "Lawn", "zoneNumber": 1, "enabled": true},
                {"id": "z-2", "name": "Beds", "zoneNumber": 2, "enabled": false},
            ],
            "scheduleRules": [
                {"id": "sr-1", "name": "Morning", "enabled": true}
            ],
            "flexScheduleRules": []
        }]
    });

    Mock::given(method("GET"))
        .and(path("/person/person-1"))
        .respond_with(with_quota(ResponseTemplate::new(200).set_body_json(&body)))
        .mount(&server)
        .await;

    let (rl, me): (_, PersonId) = client.get_self().await.unwrap();
    assert_eq!(me.id, "person-1");
    assert_eq!(rl.remaining, Some(1688));

    let (_, person): (_, Person) = client.get_person(&me.id).await.unwrap();
    assert_eq!(person.devices.len(), 1);
    assert_eq!(person.devices[0].zones.len(), 2);
    assert_eq!(person.devices[0].zones[1].zone_number, 2);
    assert_eq!(person.devices[0].schedule_rules[0].id, "sr-1");
}

#[tokio::test]
async fn test_get_device_returns_raw_document() {
    let (server, client) = setup().await;

    let body = json!({
        "id": "dev-1",
        "status": "ONLINE",
        "on": true,
        "rainDelayExpirationDate": 1_770_000_000_000_i64,
        "zones": []
    });

    Mock::given(method("GET"))
        .and(path("/device/dev-1"))
        .respond_with(with_quota(ResponseTemplate::new(200).set_body_json(&body)))
        .mount(&server)
        .await;

    let (_, doc) = client.get_device("dev-1").await.unwrap();
    assert_eq!(doc["status"], "ONLINE");
    assert_eq!(doc["rainDelayExpirationDate"], 1_770_000_000_000_i64);
}

#[tokio::test]
async fn test_rain_delay_sends_seconds() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/device/rain_delay"))
        .and(body_json(json!({ "id": "dev-1", "duration": 7200 })))
        .respond_with(with_quota(ResponseTemplate::new(204)))
        .mount(&server)
        .await;

    let rl = client.rain_delay("dev-1", 7200).await.unwrap();
    assert_eq!(rl.limit, Some(1700));
}

#[tokio::test]
async fn test_create_webhook_wire_shape() {
    let (server, client) = setup().await;

    let response = json!({
        "id": "wh-9",
        "externalId": "bridge",
        "url": "https://hub.example.net:3001",
        "eventTypes": [
            {"id": "5", "name": "DEVICE_STATUS"},
            {"id": "6", "name": "RAIN_DELAY"},
        ]
    });

    Mock::given(method("POST"))
        .and(path("/notification/webhook"))
        .and(body_json(json!({
            "device": { "id": "dev-1" },
            "externalId": "bridge",
            "url": "https://hub.example.net:3001",
            "eventTypes": [{"id": "5"}, {"id": "6"}],
        })))
        .respond_with(with_quota(
            ResponseTemplate::new(200).set_body_json(&response),
        ))
        .mount(&server)
        .await;

    let (_, wh): (_, Webhook) = client
        .create_webhook(
            "dev-1",
            "bridge",
            "https://hub.example.net:3001",
            &[EventType::DeviceStatus, EventType::RainDelay],
        )
        .await
        .unwrap();

    assert_eq!(wh.id, "wh-9");
    assert!(wh.has_event(EventType::DeviceStatus));
}

#[tokio::test]
async fn test_delete_webhook() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/notification/webhook/wh-9"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let rl = client.delete_webhook("wh-9").await.unwrap();
    assert_eq!(rl.remaining, None);
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_error_401_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.get_self().await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}

#[tokio::test]
async fn test_error_429_maps_to_rate_limited_and_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", "2026-08-07T00:00:00Z"),
        )
        .mount(&server)
        .await;

    let err = client.get_device("dev-1").await.unwrap_err();
    assert!(err.is_transient());
    match err {
        Error::RateLimited { remaining, reset } => {
            assert_eq!(remaining, 0);
            assert_eq!(reset, "2026-08-07T00:00:00Z");
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn test_error_envelope_message_is_surfaced() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/zone/start"))
        .respond_with(ResponseTemplate::new(412).set_body_json(json!({
            "errors": [{ "message": "Zone is disabled" }]
        })))
        .mount(&server)
        .await;

    let err = client.start_zone("z-1", 300).await.unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 412);
            assert_eq!(message, "Zone is disabled");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_deserialization_error_keeps_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/person/info"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client.get_self().await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "not json"),
        other => panic!("expected Deserialization error, got {other:?}"),
    }
}
