//! Operator commands over durable stores

use chrono::Utc;
use oxide_cli::{commands, read_json, GateConfig};
use oxide_gate::{FinalGateStatus, PrivilegeRequest};
use oxide_test_utils::{
    fixed_now, hitl_token_value_at, sealed_token_value_at, test_key_base64, token_value_at, TEST_KEY_ID,
    TEST_OVERRIDE_ID,
};
use serde_json::json;
use tempfile::TempDir;

fn config(dir: &TempDir) -> GateConfig {
    GateConfig {
        governance_dir: dir.path().join("governance"),
        key_id: TEST_KEY_ID.to_owned(),
        hmac_key_b64: Some(test_key_base64()),
        ..GateConfig::default()
    }
}

fn request(token: serde_json::Value) -> PrivilegeRequest {
    PrivilegeRequest::new("reindex", FinalGateStatus::NoGo, "/work/tom")
        .with_paths(["memory/index.json"])
        .with_token(token)
}

#[test]
fn sealed_token_verifies_and_revocation_is_seen() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    let sealed = commands::seal(&config, token_value_at(fixed_now())).unwrap();
    let outcome = commands::verify(&config, &sealed, fixed_now());
    assert!(outcome.success);
    assert_eq!(outcome.output["overrideId"], TEST_OVERRIDE_ID);

    commands::revoke(&config, TEST_OVERRIDE_ID, "ops", "key rotation").unwrap();
    let outcome = commands::verify(&config, &sealed, fixed_now());
    assert!(!outcome.success);
    assert_eq!(outcome.output["kind"], "trust");
}

#[test]
fn sealing_without_a_key_fails() {
    let dir = TempDir::new().unwrap();
    let config = GateConfig {
        hmac_key_b64: None,
        ..config(&dir)
    };
    assert!(commands::seal(&config, token_value_at(fixed_now())).is_err());
}

#[test]
fn sealing_rejects_unknown_fields() {
    let dir = TempDir::new().unwrap();
    let mut token = token_value_at(fixed_now());
    token["capabilities"]["sudo"] = json!(true);
    assert!(commands::seal(&config(&dir), token).is_err());
}

#[test]
fn verify_does_not_consume_the_nonce() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let token = sealed_token_value_at(fixed_now());

    assert!(commands::verify(&config, &token, fixed_now()).success);
    assert!(commands::verify(&config, &token, fixed_now()).success);
    assert!(!config.replay_ledger_path().exists());
}

#[tokio::test]
async fn check_grants_once_and_records_both_decisions() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let request = request(sealed_token_value_at(Utc::now()));

    let first = commands::check(&config, &request).await.unwrap();
    assert!(first.success);
    assert_eq!(first.output["ok"], true);
    assert_eq!(first.output["result"]["overrideId"], TEST_OVERRIDE_ID);

    // A fresh process has an empty hot set; the durable ledger still refuses.
    let second = commands::check(&config, &request).await.unwrap();
    assert!(!second.success);
    assert_eq!(second.output["error"]["kind"], "trust");
    assert_eq!(second.output["error"]["origin"], "pre_check");

    let audit = commands::audit(&config);
    assert!(audit.success);
    assert_eq!(audit.output["events"], 2);
}

#[tokio::test]
async fn go_requests_need_no_token() {
    let dir = TempDir::new().unwrap();
    let request = PrivilegeRequest::new("deploy", FinalGateStatus::Go, "/work/tom");

    let outcome = commands::check(&config(&dir), &request).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.output["result"]["reason"], "Final gate is GO.");
}

#[test]
fn tampered_audit_log_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    std::fs::create_dir_all(&config.governance_dir).unwrap();
    std::fs::write(config.audit_log_path(), "{\"not\":\"chained\"}\n").unwrap();

    let outcome = commands::audit(&config);
    assert!(!outcome.success);
    assert_eq!(outcome.output["intact"], false);
}

#[test]
fn hitl_override_grants_autonomy_under_no_go() {
    let now = fixed_now();
    let granted = commands::autonomy(FinalGateStatus::NoGo, Some(hitl_token_value_at(now)), now).unwrap();
    assert!(granted.success);
    assert_eq!(granted.output["state"], "OVERRIDE_AUTONOMY");

    let supervised = commands::autonomy(FinalGateStatus::NoGo, None, now).unwrap();
    assert!(!supervised.success);
    assert_eq!(supervised.output["state"], "SUPERVISED_NO_GO");
}

#[test]
fn token_files_are_read_as_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("token.json");
    std::fs::write(&path, serde_json::to_string(&sealed_token_value_at(fixed_now())).unwrap()).unwrap();

    let token = read_json(&path).unwrap();
    assert_eq!(token["override_id"], TEST_OVERRIDE_ID);
    assert!(read_json(&dir.path().join("missing.json")).is_err());
}
