// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rota_core::RunKind;
use std::collections::BTreeMap;

#[test]
fn web_response_echoes_rid_and_operate() {
    let request = WebRequest::cancel(42, RunKind::Manual, "his-1");
    let response = WebResponse::error(&request, "not found");

    assert_eq!(response.rid, 42);
    assert_eq!(response.operate, Operate::Cancel);
    assert_eq!(response.status, WebStatus::Error);
    assert_eq!(response.error_text.as_deref(), Some("not found"));
    assert!(!response.is_ok());
}

#[test]
fn heartbeat_query_omits_kind_and_id() {
    let json = serde_json::to_value(WebRequest::heartbeat_info(1)).unwrap();
    assert_eq!(json, serde_json::json!({"rid": 1, "operate": "heartbeat_info"}));
}

#[test]
fn heartbeat_info_defaults_missing_run_lists() {
    let json = r#"{"host":"w1","cores":4,"cpu_load_per_core":0.5,"mem_rate":0.25,"mem_total":1024,"timestamp_ms":9}"#;
    let info: HeartbeatInfo = serde_json::from_str(json).unwrap();

    assert_eq!(info.host, "w1");
    for kind in RunKind::ALL {
        assert!(info.running_for(kind).is_empty());
    }
}

#[yare::parameterized(
    scheduled = { RunKind::Scheduled, "s" },
    manual    = { RunKind::Manual,    "m" },
    debug     = { RunKind::Debug,     "d" },
)]
fn running_for_selects_kind(kind: RunKind, expected: &str) {
    let info = HeartbeatInfo {
        running: vec!["s".into()],
        manual_running: vec!["m".into()],
        debug_running: vec!["d".into()],
        ..HeartbeatInfo::default()
    };
    assert_eq!(info.running_for(kind), [expected.to_string()]);
}

#[test]
fn heartbeats_ride_along_in_web_response() {
    let request = WebRequest::heartbeat_info(3);
    let mut map = BTreeMap::new();
    map.insert("w1".to_string(), HeartbeatInfo { host: "w1".into(), ..Default::default() });

    let response = WebResponse::ok(&request).with_heartbeats(map);
    let frame = Frame::Response { rid: 9, response: Response::Web { response } };

    let decoded: Frame = decode(&encode(&frame).unwrap()).unwrap();
    assert_eq!(decoded, frame);
}

#[test]
fn request_names() {
    assert_eq!(Request::Cancel { kind: RunKind::Debug, id: "x".into() }.name(), "cancel");
    assert_eq!(Request::Web { request: WebRequest::heartbeat_info(1) }.name(), "web");
    assert_eq!(Request::Complete { kind: RunKind::Manual, key: "job-1".into() }.name(), "complete");
}
