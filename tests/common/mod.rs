#![allow(dead_code)]

use std::sync::Arc;

use hetzner_robot_provider::testing::{MockTransport, ProviderTester};
use hetzner_robot_provider::HetznerRobotProvider;
use serde_json::{json, Value};

pub const FINGERPRINT: &str = "56:29:99:a4:5d:ed:ac:95:c1:f5:88:82:90:5d:dd:10";
pub const SERVER_IP: &str = "123.123.123.123";

pub async fn configured() -> (Arc<MockTransport>, ProviderTester<HetznerRobotProvider>) {
    let mock = Arc::new(MockTransport::new());
    let tester = ProviderTester::new(HetznerRobotProvider::with_transport(mock.clone()));
    tester
        .configure(json!({"username": "#ws+robot", "password": "secret"}))
        .await
        .unwrap();
    (mock, tester)
}

pub fn key_json(name: &str) -> Value {
    json!({
        "key": {
            "name": name,
            "fingerprint": FINGERPRINT,
            "type": "ED25519",
            "size": 256,
            "data": "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5 deploy@host",
            "created_at": "2024-01-15 10:00:00"
        }
    })
}

pub fn vswitch_json(name: &str, servers: &[u64]) -> Value {
    json!({
        "id": 4711,
        "name": name,
        "vlan": 4000,
        "cancelled": false,
        "server": servers
            .iter()
            .map(|n| json!({
                "server_ip": null,
                "server_ipv6_net": null,
                "server_number": n,
                "status": "processing"
            }))
            .collect::<Vec<_>>(),
        "subnet": [],
        "cloud_network": []
    })
}

pub fn server_json(name: &str) -> Value {
    json!({
        "server": {
            "server_ip": SERVER_IP,
            "server_ipv6_net": "2a01:4f8:111:4221::",
            "server_number": 321,
            "server_name": name,
            "product": "AX41-NVMe",
            "dc": "FSN1-DC14",
            "traffic": "unlimited",
            "status": "ready",
            "cancelled": false,
            "paid_until": "2026-12-31",
            "ip": [SERVER_IP],
            "subnet": [{"ip": "2a01:4f8:111:4221::", "mask": "64"}],
            "reset": true,
            "rescue": true,
            "vnc": true,
            "windows": false,
            "plesk": false,
            "cpanel": false,
            "wol": true,
            "hot_swap": false,
            "linked_storagebox": null
        }
    })
}

pub fn not_found(code: &str) -> Value {
    json!({"error": {"status": 404, "code": code, "message": "not found"}})
}
