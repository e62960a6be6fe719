mod common;

use chrono::Local;
use common::{configured, key_json, not_found, server_json, vswitch_json, FINGERPRINT, SERVER_IP};
use hetzner_robot_provider::client::RequestBody;
use hetzner_robot_provider::testing::{
    assert_error_contains, assert_plan_changes_attribute, assert_plan_no_changes,
    assert_plan_replaces, TestError,
};
use hetzner_robot_provider::ProviderError;
use reqwest::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn ssh_key_lifecycle() {
    let (mock, tester) = configured().await;
    let key_path = format!("/key/{}", FINGERPRINT);
    mock.expect_json(Method::POST, "/key", StatusCode::CREATED, key_json("deploy"))
        .expect_json(Method::GET, &key_path, StatusCode::OK, key_json("deploy"));

    let config = json!({"name": "deploy", "data": "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5 deploy@host"});
    let state = tester
        .lifecycle_create("hetznerrobot_ssh_key", config.clone())
        .await
        .unwrap();
    assert_eq!(state["id"], FINGERPRINT);
    assert_eq!(state["type"], "ED25519");

    let plan = tester
        .plan_update("hetznerrobot_ssh_key", state.clone(), config)
        .await
        .unwrap();
    assert_plan_no_changes(&plan);

    mock.expect_json(Method::PUT, &key_path, StatusCode::OK, key_json("renamed"))
        .expect_json(Method::GET, &key_path, StatusCode::OK, key_json("renamed"))
        .expect(Method::DELETE, &key_path, StatusCode::OK, "");

    let renamed = json!({"name": "renamed", "data": "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5 deploy@host"});
    let state = tester
        .lifecycle_update("hetznerrobot_ssh_key", state, renamed)
        .await
        .unwrap();
    assert_eq!(state["name"], "renamed");
    tester
        .lifecycle_delete("hetznerrobot_ssh_key", state)
        .await
        .unwrap();

    let requests = mock.requests();
    assert_eq!(requests[0].form().unwrap().get("name"), Some("deploy"));
    assert_eq!(requests[2].form().unwrap().get("name"), Some("renamed"));
    mock.assert_done();
}

#[tokio::test]
async fn ssh_key_data_change_replaces() {
    let (_, tester) = configured().await;
    let prior = json!({"id": FINGERPRINT, "name": "deploy", "data": "ssh-ed25519 AAAA", "fingerprint": FINGERPRINT});
    let plan = tester
        .plan_update("hetznerrobot_ssh_key", prior, json!({"name": "deploy", "data": "ssh-rsa BBBB"}))
        .await
        .unwrap();
    assert_plan_replaces(&plan);
    assert_plan_changes_attribute(&plan, "data");
}

#[tokio::test]
async fn ssh_key_import_checks_fingerprint() {
    let (mock, tester) = configured().await;

    let err = tester
        .import_resource("hetznerrobot_ssh_key", "not-a-fingerprint")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Validation(_)));
    assert!(mock.requests().is_empty());

    mock.expect_json(
        Method::GET,
        format!("/key/{}", FINGERPRINT),
        StatusCode::OK,
        key_json("deploy"),
    );
    let imported = tester
        .import_resource("hetznerrobot_ssh_key", FINGERPRINT)
        .await
        .unwrap();
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].resource_type, "hetznerrobot_ssh_key");
    assert_eq!(imported[0].state["name"], "deploy");
}

#[tokio::test]
async fn vswitch_lifecycle_reconciles_membership() {
    let (mock, tester) = configured().await;
    mock.expect_json(Method::POST, "/vswitch", StatusCode::CREATED, vswitch_json("backend", &[]))
        .expect(Method::POST, "/vswitch/4711/server", StatusCode::CREATED, "")
        .expect_json(Method::GET, "/vswitch/4711", StatusCode::OK, vswitch_json("backend", &[321, 421]))
        .expect_json(Method::GET, "/vswitch/4711", StatusCode::OK, vswitch_json("backend", &[321, 421]));

    let state = tester
        .lifecycle_create(
            "hetznerrobot_vswitch",
            json!({"name": "backend", "vlan": 4000, "servers": [421, 321]}),
        )
        .await
        .unwrap();
    assert_eq!(state["id"], "4711");
    assert_eq!(state["servers"], json!([321, 421]));
    assert_eq!(state["attached_servers"][1]["server_number"], 421);

    let requests = mock.requests();
    assert_eq!(requests[0].form().unwrap().get("name"), Some("backend"));
    assert_eq!(requests[0].form().unwrap().get("vlan"), Some("4000"));
    assert_eq!(requests[1].form().unwrap().get_all("server[]"), vec!["321", "421"]);

    mock.expect(Method::POST, "/vswitch/4711", StatusCode::OK, "")
        .expect(Method::POST, "/vswitch/4711/server", StatusCode::CREATED, "")
        .expect(Method::DELETE, "/vswitch/4711/server", StatusCode::OK, "")
        .expect_json(Method::GET, "/vswitch/4711", StatusCode::OK, vswitch_json("frontend", &[421, 521]))
        .expect_json(Method::GET, "/vswitch/4711", StatusCode::OK, vswitch_json("frontend", &[421, 521]));

    let state = tester
        .lifecycle_update(
            "hetznerrobot_vswitch",
            state,
            json!({"name": "frontend", "vlan": 4000, "servers": [421, 521]}),
        )
        .await
        .unwrap();
    assert_eq!(state["name"], "frontend");
    assert_eq!(state["servers"], json!([421, 521]));

    let requests = mock.requests();
    assert_eq!(requests[4].form().unwrap().get("name"), Some("frontend"));
    assert_eq!(requests[5].form().unwrap().get_all("server[]"), vec!["521"]);
    assert_eq!(requests[6].form().unwrap().get_all("server[]"), vec!["321"]);

    mock.expect(Method::DELETE, "/vswitch/4711", StatusCode::OK, "");
    tester
        .lifecycle_delete("hetznerrobot_vswitch", state)
        .await
        .unwrap();

    let requests = mock.requests();
    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    assert_eq!(
        requests.last().unwrap().form().unwrap().get("cancellation_date"),
        Some(today.as_str())
    );
    mock.assert_done();
}

#[tokio::test]
async fn vswitch_unchanged_membership_makes_no_membership_calls() {
    let (mock, tester) = configured().await;
    let prior = json!({
        "id": "4711",
        "name": "backend",
        "vlan": 4000,
        "servers": [321],
        "is_cancelled": false,
        "attached_servers": [],
        "subnets": [],
        "cloud_networks": []
    });
    mock.expect(Method::POST, "/vswitch/4711", StatusCode::OK, "")
        .expect_json(Method::GET, "/vswitch/4711", StatusCode::OK, vswitch_json("renamed", &[321]));

    tester
        .update(
            "hetznerrobot_vswitch",
            prior,
            json!({"id": "4711", "name": "renamed", "vlan": 4000, "servers": [321]}),
        )
        .await
        .unwrap();

    assert_eq!(mock.requests().len(), 2);
    mock.assert_done();
}

#[tokio::test]
async fn vswitch_rejects_vlan_out_of_range() {
    let (mock, tester) = configured().await;
    let err = tester
        .lifecycle_create("hetznerrobot_vswitch", json!({"name": "backend", "vlan": 12}))
        .await
        .unwrap_err();
    match err {
        TestError::Diagnostics(diagnostics) => assert_error_contains(&diagnostics, "VLAN"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn vswitch_rejects_negative_server_numbers() {
    let (mock, tester) = configured().await;
    let config = json!({"name": "backend", "vlan": 4000, "servers": [321, -5]});

    let err = tester
        .validate_resource_config("hetznerrobot_vswitch", config.clone())
        .await
        .unwrap_err();
    match err {
        TestError::Diagnostics(diagnostics) => {
            assert_error_contains(&diagnostics, "Invalid server number");
            assert_eq!(diagnostics[0].attribute.as_deref(), Some("servers.1"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // nothing is created when the membership cannot be sent
    mock.expect_json(Method::POST, "/vswitch", StatusCode::CREATED, vswitch_json("backend", &[]));
    let err = tester.create("hetznerrobot_vswitch", config).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidRequest(_)));
    assert!(mock.requests().is_empty());
    assert_eq!(mock.pending(), 1);
}

#[tokio::test]
async fn vswitch_read_missing_is_not_found() {
    let (mock, tester) = configured().await;
    mock.expect_json(Method::GET, "/vswitch/9", StatusCode::NOT_FOUND, not_found("NOT_FOUND"));

    let err = tester
        .read("hetznerrobot_vswitch", json!({"id": "9"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(_)));
}

#[tokio::test]
async fn firewall_lifecycle() {
    let (mock, tester) = configured().await;
    let path = format!("/firewall/{}", SERVER_IP);
    let applied = json!({
        "firewall": {
            "server_ip": SERVER_IP,
            "server_number": 321,
            "status": "in process",
            "whitelist_hos": true,
            "port": "main",
            "rules": {"input": [
                {"ip_version": "ipv4", "name": "ssh", "dst_ip": null, "src_ip": null, "dst_port": "22",
                 "src_port": null, "protocol": "tcp", "tcp_flags": null, "action": "accept"}
            ]}
        }
    });
    let mut active = applied.clone();
    active["firewall"]["status"] = json!("active");
    mock.expect_json(Method::POST, &path, StatusCode::ACCEPTED, applied)
        .expect_json(Method::GET, &path, StatusCode::OK, active);

    let config = json!({
        "server_ip": SERVER_IP,
        "active": true,
        "whitelist_hos": true,
        "rule": [{"name": "ssh", "action": "accept", "dst_port": "22", "protocol": "tcp"}]
    });
    let state = tester
        .lifecycle_create("hetznerrobot_firewall", config.clone())
        .await
        .unwrap();
    assert_eq!(state["id"], SERVER_IP);
    assert_eq!(state["active"], true);

    let form = mock.requests()[0].form().cloned().unwrap();
    assert_eq!(form.get("status"), Some("active"));
    assert_eq!(form.get("whitelist_hos"), Some("true"));
    assert_eq!(form.get("rules[input][0][ip_version]"), Some("ipv4"));
    assert_eq!(form.get("rules[input][0][dst_port]"), Some("22"));
    assert_eq!(form.get("rules[input][0][src_ip]"), None);

    let plan = tester
        .plan_update("hetznerrobot_firewall", state.clone(), config)
        .await
        .unwrap();
    assert_plan_no_changes(&plan);

    mock.expect(Method::DELETE, &path, StatusCode::OK, "");
    tester.lifecycle_delete("hetznerrobot_firewall", state).await.unwrap();
    mock.assert_done();
}

#[tokio::test]
async fn firewall_rejects_unknown_action() {
    let (_, tester) = configured().await;
    let err = tester
        .validate_resource_config(
            "hetznerrobot_firewall",
            json!({
                "server_ip": SERVER_IP,
                "active": true,
                "whitelist_hos": false,
                "rule": [{"name": "all", "action": "drop"}]
            }),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid firewall action"));
}

fn rescue_response(password: &str) -> serde_json::Value {
    json!({
        "rescue": {
            "server_ip": SERVER_IP,
            "server_ipv6_net": "2a01:4f8:111:4221::",
            "server_number": 321,
            "os": "linux",
            "arch": 64,
            "active": true,
            "password": password,
            "authorized_key": [{"key": {"name": "deploy", "fingerprint": FINGERPRINT, "type": "ED25519", "size": 256}}],
            "host_key": []
        }
    })
}

#[tokio::test]
async fn boot_profile_lifecycle() {
    let (mock, tester) = configured().await;
    mock.expect_json(Method::POST, "/boot/321/rescue", StatusCode::OK, rescue_response("s3cret"))
        .expect_json(
            Method::GET,
            "/boot/321",
            StatusCode::OK,
            json!({"boot": {"rescue": {"active": false}, "linux": {"active": false}}}),
        );

    let config = json!({
        "server_id": 321,
        "active_profile": "rescue",
        "operating_system": "linux",
        "authorized_keys": [FINGERPRINT]
    });
    let state = tester
        .lifecycle_create("hetznerrobot_boot", config)
        .await
        .unwrap();

    // the profile was consumed; the last known state survives the read
    assert_eq!(state["password"], "s3cret");
    assert_eq!(state["architecture"], "64");
    assert_eq!(state["server_ipv4"], SERVER_IP);

    let form = mock.requests()[0].form().cloned().unwrap();
    assert_eq!(form.get("arch"), Some("64"));
    assert_eq!(form.get("os"), Some("linux"));
    assert_eq!(form.get_all("authorized_key"), vec![FINGERPRINT]);

    mock.expect_json(Method::DELETE, "/boot/321/rescue", StatusCode::NOT_FOUND, not_found("BOOT_NOT_AVAILABLE"));
    tester.lifecycle_delete("hetznerrobot_boot", state).await.unwrap();
    mock.assert_done();
}

#[tokio::test]
async fn boot_profile_switch_deactivates_previous() {
    let (mock, tester) = configured().await;
    let prior = json!({
        "id": "321",
        "server_id": 321,
        "active_profile": "linux",
        "operating_system": "Debian 12 base",
        "architecture": "64",
        "language": "en",
        "password": "old"
    });
    mock.expect(Method::DELETE, "/boot/321/linux", StatusCode::OK, "{}")
        .expect_json(Method::POST, "/boot/321/rescue", StatusCode::OK, rescue_response("new"));

    let plan = tester
        .plan_update(
            "hetznerrobot_boot",
            prior.clone(),
            json!({"server_id": 321, "active_profile": "rescue", "operating_system": "linux"}),
        )
        .await
        .unwrap();
    assert!(!plan.requires_replace);

    let state = tester
        .update("hetznerrobot_boot", prior, plan.planned_state)
        .await
        .unwrap();
    assert_eq!(state["active_profile"], "rescue");
    assert_eq!(state["password"], "new");
    assert!(state["language"].is_null());
    mock.assert_done();
}

#[tokio::test]
async fn boot_read_reflects_active_profile() {
    let (mock, tester) = configured().await;
    mock.expect_json(
        Method::GET,
        "/boot/321",
        StatusCode::OK,
        json!({"boot": {
            "linux": {"active": true, "dist": "Debian 12 base", "lang": "en", "arch": 64,
                      "password": "pw", "server_ip": SERVER_IP, "authorized_key": [], "host_key": []},
            "rescue": {"active": false}
        }}),
    );

    let state = tester
        .read(
            "hetznerrobot_boot",
            json!({"id": "321", "server_id": 321, "active_profile": "rescue"}),
        )
        .await
        .unwrap();
    assert_eq!(state["active_profile"], "linux");
    assert_eq!(state["operating_system"], "Debian 12 base");
    assert_eq!(state["language"], "en");
}

#[tokio::test]
async fn server_adopt_and_rename() {
    let (mock, tester) = configured().await;
    mock.expect_json(Method::GET, "/server/321", StatusCode::OK, server_json("old-name"))
        .expect_json(Method::POST, "/server/321", StatusCode::OK, server_json("web-1"))
        .expect_json(Method::GET, "/server/321", StatusCode::OK, server_json("web-1"));

    let state = tester
        .lifecycle_create("hetznerrobot_server", json!({"server_number": 321, "server_name": "web-1"}))
        .await
        .unwrap();
    assert_eq!(state["id"], "321");
    assert_eq!(state["server_name"], "web-1");
    assert_eq!(state["datacenter"], "FSN1-DC14");

    assert_eq!(
        mock.requests()[1].body,
        RequestBody::Json(json!({"server_name": "web-1"}))
    );

    let before = mock.requests().len();
    tester.lifecycle_delete("hetznerrobot_server", state).await.unwrap();
    assert_eq!(mock.requests().len(), before);
    mock.assert_done();
}
