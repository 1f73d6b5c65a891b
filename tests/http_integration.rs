// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the HTTP poll and command paths using wiremock.

use std::sync::Arc;
use std::time::Duration;

use openevse_lib::protocol::Session;
use openevse_lib::{
    ChargeMode, Charger, ConnectionState, Error, ParseError, TransportError, UpdateSource,
    ValueError,
};
use parking_lot::Mutex;
use serde_json::json;
use wiremock::matchers::{basic_auth, body_json, body_partial_json, body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn charger(server: &MockServer) -> Charger {
    Charger::http(server.uri()).build().unwrap()
}

fn json_reply(status: u16, body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(body)
}

fn text_reply(status: u16, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_string(body)
}

async fn mount_config(server: &MockServer, config: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/config"))
        .respond_with(json_reply(200, config))
        .mount(server)
        .await;
}

// ============================================================================
// Polling
// ============================================================================

mod polling {
    use super::*;

    #[tokio::test]
    async fn update_merges_status_and_notifies() {
        let server = MockServer::start().await;
        let status = json!({"status": "charging", "amp": 16, "state": 3});
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(json_reply(200, status))
            .expect(2)
            .mount(&server)
            .await;

        let charger = charger(&server);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        charger.on_state_changed(move |update| {
            seen_clone
                .lock()
                .push((update.source, update.changed.len()));
        });

        let state = charger.update().await.unwrap();
        assert_eq!(state.get_str("status"), Some("charging"));
        assert_eq!(state.get_i64("amp"), Some(16));
        assert_eq!(charger.charging_current(), Some(16.0));

        // Same reply again: nothing changed, nobody notified
        charger.update().await.unwrap();
        assert_eq!(*seen.lock(), vec![(UpdateSource::Poll, 3)]);
    }

    #[tokio::test]
    async fn update_sends_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .and(basic_auth("admin", "secret"))
            .respond_with(json_reply(200, json!({"amp": 0})))
            .expect(1)
            .mount(&server)
            .await;

        let charger = Charger::http(server.uri())
            .with_credentials("admin", "secret")
            .build()
            .unwrap();
        charger.update().await.unwrap();
    }

    #[tokio::test]
    async fn update_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = charger(&server).update().await;
        assert!(matches!(result, Err(Error::Authentication)));
    }

    #[tokio::test]
    async fn update_rejects_non_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(json_reply(200, json!([1, 2, 3])))
            .mount(&server)
            .await;

        let charger = charger(&server);
        let result = charger.update().await;
        assert!(matches!(
            result,
            Err(Error::Parse(ParseError::UnexpectedFormat(_)))
        ));
        assert!(charger.state_snapshot().is_empty());
    }

    #[tokio::test]
    async fn update_rejects_invalid_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(text_reply(200, "{not json"))
            .mount(&server)
            .await;

        let result = charger(&server).update().await;
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[tokio::test]
    async fn update_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(text_reply(500, "boom"))
            .mount(&server)
            .await;

        let result = charger(&server).update().await;
        assert!(matches!(
            result,
            Err(Error::Transport(TransportError::Status { code: 500, ref body })) if body == "boom"
        ));
    }

    #[tokio::test]
    async fn update_bad_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(json_reply(400, json!({"msg": "bad"})))
            .mount(&server)
            .await;

        let result = charger(&server).update().await;
        assert!(matches!(
            result,
            Err(Error::Parse(ParseError::Rejected(ref msg))) if msg == "bad"
        ));
    }

    #[tokio::test]
    async fn update_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(
                json_reply(200, json!({}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let charger = Charger::http(server.uri())
            .with_timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let result = charger.update().await;
        assert!(matches!(
            result,
            Err(Error::Transport(TransportError::Timeout(200)))
        ));
    }

    #[tokio::test]
    async fn update_config_fills_config_cache_silently() {
        let server = MockServer::start().await;
        mount_config(
            &server,
            json!({"version": "5.1.0", "hostname": "openevse-1234", "charge_mode": "fast"}),
        )
        .await;

        let charger = charger(&server);
        let notified = Arc::new(Mutex::new(0));
        let notified_clone = Arc::clone(&notified);
        charger.on_state_changed(move |_| *notified_clone.lock() += 1);

        charger.update_config().await.unwrap();
        assert_eq!(charger.hostname(), Some("openevse-1234".to_string()));
        assert_eq!(charger.charge_mode(), Some(ChargeMode::Fast));
        assert!(charger.state_snapshot().is_empty());
        assert_eq!(*notified.lock(), 0);
    }

    #[tokio::test]
    async fn test_and_get_reads_identity() {
        let server = MockServer::start().await;
        mount_config(
            &server,
            json!({"wifi_serial": "1234567890AB", "buildenv": "openevse_wifi_v1"}),
        )
        .await;

        let info = charger(&server).test_and_get().await.unwrap();
        assert_eq!(info.serial, "1234567890AB");
        assert_eq!(info.model, "openevse_wifi_v1");
    }

    #[tokio::test]
    async fn test_and_get_old_firmware() {
        let server = MockServer::start().await;
        mount_config(&server, json!({"version": "2.8.0"})).await;

        let result = charger(&server).test_and_get().await;
        assert!(matches!(result, Err(Error::UnsupportedFeature)));
    }
}

// ============================================================================
// Session ownership
// ============================================================================

mod session {
    use super::*;

    #[tokio::test]
    async fn borrowed_session_is_never_closed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(json_reply(200, json!({"amp": 6})))
            .mount(&server)
            .await;

        let session = Arc::new(Session::new().unwrap());
        let charger = Charger::http(server.uri())
            .with_session(Arc::clone(&session))
            .build()
            .unwrap();

        for _ in 0..3 {
            charger.update().await.unwrap();
        }
        charger.ws_disconnect().await;
        charger.close().await;
        drop(charger);
        assert!(!session.is_closed());

        // Still usable by another charger
        let other = Charger::http(server.uri())
            .with_session(Arc::clone(&session))
            .build()
            .unwrap();
        other.update().await.unwrap();
    }

    #[tokio::test]
    async fn owned_session_closed_by_close() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(json_reply(200, json!({"amp": 6})))
            .mount(&server)
            .await;

        let charger = charger(&server);
        charger.update().await.unwrap();
        charger.close().await;

        let result = charger.update().await;
        assert!(matches!(
            result,
            Err(Error::Transport(TransportError::SessionClosed))
        ));
    }

    #[tokio::test]
    async fn push_refused_after_close() {
        let server = MockServer::start().await;
        let charger = charger(&server);
        charger.close().await;

        let result = charger.ws_connect(|_| {}).await;
        assert!(matches!(
            result,
            Err(Error::Transport(TransportError::SessionClosed))
        ));
        assert_eq!(charger.ws_state(), ConnectionState::Disconnected);
    }
}

// ============================================================================
// Commands
// ============================================================================

mod commands {
    use super::*;

    #[tokio::test]
    async fn set_charge_mode_acknowledged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/config"))
            .and(body_json(json!({"charge_mode": "eco"})))
            .respond_with(json_reply(200, json!({"msg": "done"})))
            .expect(1)
            .mount(&server)
            .await;

        charger(&server)
            .set_charge_mode(ChargeMode::Eco)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn set_charge_mode_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/config"))
            .respond_with(json_reply(200, json!({"msg": "error"})))
            .mount(&server)
            .await;

        let result = charger(&server).set_charge_mode(ChargeMode::Fast).await;
        assert!(matches!(result, Err(Error::CommandRejected(ref msg)) if msg == "error"));
    }

    #[tokio::test]
    async fn set_current_uses_override_on_new_firmware() {
        let server = MockServer::start().await;
        mount_config(
            &server,
            json!({"version": "4.1.2", "min_current_hard": 6, "max_current_hard": 32}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/override"))
            .respond_with(json_reply(200, json!({"state": "active"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/override"))
            .and(body_partial_json(
                json!({"state": "active", "charge_current": 16, "auto_release": true}),
            ))
            .respond_with(json_reply(200, json!({"msg": "OK"})))
            .expect(1)
            .mount(&server)
            .await;

        charger(&server).set_current(16).await.unwrap();
    }

    #[tokio::test]
    async fn set_current_validates_hardware_limits() {
        let server = MockServer::start().await;
        mount_config(
            &server,
            json!({"version": "4.1.2", "min_current_hard": 6, "max_current_hard": 32}),
        )
        .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = charger(&server).set_current(40).await;
        assert!(matches!(
            result,
            Err(Error::Value(ValueError::OutOfRange {
                min: 6,
                max: 32,
                actual: 40
            }))
        ));
    }

    #[tokio::test]
    async fn set_current_uses_rapi_on_old_firmware() {
        let server = MockServer::start().await;
        mount_config(&server, json!({"version": "4.0.1"})).await;
        let reply = json!({"cmd": "$SC 16 N", "ret": "$OK^20"});
        Mock::given(method("POST"))
            .and(path("/r"))
            .and(body_string("json=1&rapi=%24SC%2016%20N"))
            .respond_with(json_reply(200, reply))
            .expect(1)
            .mount(&server)
            .await;

        charger(&server).set_current(16).await.unwrap();
    }

    #[tokio::test]
    async fn limit_needs_firmware_5() {
        let server = MockServer::start().await;
        mount_config(&server, json!({"version": "4.1.2"})).await;

        let result = charger(&server).get_limit().await;
        assert!(matches!(result, Err(Error::UnsupportedFeature)));
    }

    #[tokio::test]
    async fn unknown_firmware_is_unsupported() {
        let server = MockServer::start().await;
        mount_config(&server, json!({"hostname": "openevse"})).await;

        let result = charger(&server).list_claims(false).await;
        assert!(matches!(result, Err(Error::UnsupportedFeature)));
    }

    #[tokio::test]
    async fn set_divert_mode_checks_plain_text_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/divertmode"))
            .and(body_string("divertmode=2"))
            .respond_with(text_reply(200, "Divert Mode changed"))
            .expect(1)
            .mount(&server)
            .await;

        charger(&server)
            .set_divert_mode(ChargeMode::Eco)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn config_version_in_reply_refreshes_config() {
        let server = MockServer::start().await;
        let config = json!({"version": "4.1.2", "led_brightness": 64});
        Mock::given(method("GET"))
            .and(path("/config"))
            .respond_with(json_reply(200, config))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/config"))
            .and(body_json(json!({"led_brightness": 64})))
            .respond_with(json_reply(200, json!({"msg": "done", "config_version": 7})))
            .expect(1)
            .mount(&server)
            .await;

        let charger = charger(&server);
        charger.set_led_brightness(64).await.unwrap();
        assert_eq!(charger.led_brightness(), Some(64));
    }

    #[tokio::test]
    async fn sensor_post_skipped_without_readings() {
        let server = MockServer::start().await;
        mount_config(&server, json!({"version": "4.1.2"})).await;
        Mock::given(method("POST"))
            .and(path("/status"))
            .and(body_json(json!({"grid_ie": -1500, "voltage": 240})))
            .respond_with(json_reply(200, json!({"msg": "done"})))
            .expect(1)
            .mount(&server)
            .await;

        let charger = charger(&server);
        charger.grid_voltage(None).await.unwrap();
        charger
            .self_production(Some(1500), None, true, Some(240))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn override_state_defaults_to_auto() {
        let server = MockServer::start().await;
        mount_config(&server, json!({"version": "4.1.2"})).await;
        Mock::given(method("GET"))
            .and(path("/override"))
            .respond_with(json_reply(200, json!({})))
            .mount(&server)
            .await;

        let state = charger(&server).override_state().await.unwrap();
        assert_eq!(state.as_deref(), Some("auto"));
    }

    #[tokio::test]
    async fn rapi_without_ret_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/r"))
            .respond_with(json_reply(200, json!({"msg": "RAPI disabled"})))
            .mount(&server)
            .await;

        let result = charger(&server)
            .send_rapi(openevse_lib::command::RapiCommand::new("$GS"))
            .await;
        assert!(matches!(result, Err(Error::CommandRejected(ref msg)) if msg == "RAPI disabled"));
    }
}
