use std::fs;
use std::process::Command;

use authscript::fixture::{FixtureError, SessionFixture};
use authscript::{new_engine, EngineKind, ReadOnlyWrites, ScriptObject};
use serde_json::json;

fn write_session(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let session = json!({
        "tenant_domain": "wso2.com",
        "tenants": { "wso2.com": 7 },
        "steps": [
            { "step": 1, "idp": "LOCAL",
              "user": { "username": "bob", "user_store_domain": "LDAP", "tenant_domain": "wso2.com" } },
            { "step": 2, "idp": "github",
              "user": { "username": "bob-gh", "tenant_domain": "wso2.com", "federated_idp_name": "github",
                        "attributes": { "login": "bob-gh" } } }
        ],
        "subject": { "username": "bob", "user_store_domain": "LDAP", "tenant_domain": "wso2.com",
                     "authenticated_subject_identifier": "bob@wso2.com" },
        "roles": [ { "tenant": "wso2.com", "user": "LDAP/bob", "roles": ["dev", "ops"] } ],
        "local_claims": [ { "tenant": "wso2.com", "user": "LDAP/bob",
                            "claims": { "http://wso2.org/claims/department": "platform" } } ],
        "runtime_claims": { "http://wso2.org/claims/acr": "mfa" }
    });
    let path = dir.path().join("session.json");
    fs::write(&path, serde_json::to_vec_pretty(&session).unwrap()).unwrap();
    path
}

#[test]
fn fixture_file_builds_a_live_session() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionFixture::from_path(&write_session(&dir)).unwrap().build().unwrap();
    assert_eq!(session.context.tenant_domain(), "wso2.com");
    assert_eq!(session.context.current_step(), 2);

    let local = session.wrapper(1, Some("LOCAL"), ReadOnlyWrites::Reject).unwrap();
    assert_eq!(local.local_roles().as_slice(), &["dev".to_string(), "ops".to_string()]);

    let subject = session.wrapper(2, None, ReadOnlyWrites::Reject).unwrap();
    assert_eq!(subject.read_attribute("authenticatedSubjectIdentifier").unwrap().as_str(), Some("bob@wso2.com"));

    for kind in [EngineKind::UserData, EngineKind::ProxyTable] {
        let engine = new_engine(kind).unwrap();
        engine.bind_user("user", session.wrapper(1, Some("LOCAL"), ReadOnlyWrites::Reject).unwrap()).unwrap();
        let out = engine
            .eval("return { dept = user.localClaims['http://wso2.org/claims/department'], acr = user.claims['http://wso2.org/claims/acr'] }")
            .unwrap();
        assert_eq!(out, json!({"dept": "platform", "acr": "mfa"}), "{kind}");
    }
}

#[test]
fn missing_and_malformed_fixtures() {
    let dir = tempfile::tempdir().unwrap();
    let missing = SessionFixture::from_path(&dir.path().join("nope.json"));
    assert!(matches!(missing, Err(FixtureError::Io(_))));

    let bad = dir.path().join("bad.json");
    fs::write(&bad, "{ \"steps\": [] }").unwrap();
    assert!(matches!(SessionFixture::from_path(&bad), Err(FixtureError::Json(_))));
}

#[test]
fn failing_tenant_downgrades_roles_to_empty() {
    let fixture = SessionFixture::from_json(
        r#"{ "tenant_domain": "carbon.super",
             "steps": [ { "step": 1, "idp": "LOCAL", "user": { "username": "alice", "tenant_domain": "carbon.super" } } ],
             "roles": [ { "tenant": "carbon.super", "user": "alice", "roles": ["admin"] } ],
             "failing_tenants": ["carbon.super"] }"#,
    )
    .unwrap();
    let session = fixture.build().unwrap();
    let engine = new_engine(EngineKind::ProxyTable).unwrap();
    engine.bind_user("user", session.wrapper(1, Some("LOCAL"), ReadOnlyWrites::Reject).unwrap()).unwrap();
    assert_eq!(engine.eval("return #user.localRoles").unwrap(), json!(0));
}

#[test]
fn cli_prints_script_result_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let session = write_session(&dir);
    let script = dir.path().join("check.lua");
    fs::write(&script, "user.username = user.username .. '-' .. step\nreturn { name = user.username, roles = #user.localRoles }\n").unwrap();

    let out = Command::new(env!("CARGO_BIN_EXE_authscript"))
        .args(["--session", session.to_str().unwrap(), "--script", script.to_str().unwrap(), "--step", "1", "--idp", "LOCAL"])
        .args(["--engine", "proxy"])
        .env("RUST_LOG", "off")
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let printed: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(printed, json!({"name": "bob-1", "roles": 2}));

    let bad = Command::new(env!("CARGO_BIN_EXE_authscript"))
        .args(["--session", session.to_str().unwrap(), "--script", script.to_str().unwrap(), "--idp", "okta"])
        .env("RUST_LOG", "off")
        .output()
        .unwrap();
    assert!(!bad.status.success());
}
