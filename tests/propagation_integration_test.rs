//! Integration tests for the full propagation flow
//!
//! These tests run the driver against a temporary SQLite database and a mock
//! API server:
//! 1. Authentication handshake
//! 2. Lookup chain (reference user → group → members → identity)
//! 3. One update call per member
//! 4. Failure handling at each stage

use mobile_search_sync::api::ApiClient;
use mobile_search_sync::config::Config;
use mobile_search_sync::db::{QueryExecutor, SqlStore};
use mobile_search_sync::error::AppError;
use mobile_search_sync::propagate::{PropagationRequest, Propagator, RunState, UpdateStatus};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serial_test::serial;
use tempfile::TempDir;

const AUTH_PATH: &str = "/Services/Authentication/Authenticate";
const UPDATE_PATH: &str = "/Services/Ams/Search/SaveDefault";

/// Config pointing at the mock server and the temporary database
fn test_config(server: &ServerGuard, db_url: &str) -> Config {
    let raw = format!(
        r#"{{
            "cwusername": "svc-mobile",
            "cwpassword": "pw",
            "cwexpires": 120,
            "cwsite": "{site}",
            "cwauthurl": "{site}{auth}",
            "cwapiurl": "{site}{update}",
            "sqlurl": "{db_url}",
            "qrymobileinbox": "SELECT DEFAULTVALUE FROM PREFS WHERE EMPLOYEESID = ",
            "qrygroup": "SELECT GROUPID FROM GROUPS WHERE KEYWORD = '",
            "qrygroupempsids": "SELECT EMPLOYEESID FROM GROUPMEMBERS WHERE GROUPID = ",
            "qryemployee": "SELECT UNIQUENAME FROM EMPLOYEE WHERE EMPLOYEESID = ",
            "payload": {{"Category": "MOBILE"}}
        }}"#,
        site = server.url(),
        auth = AUTH_PATH,
        update = UPDATE_PATH,
        db_url = db_url,
    );
    let config = Config::from_json(&raw).unwrap();
    config.validate().unwrap();
    config
}

/// Database with reference user 1042 and group STREETS (id 7) holding 10, 20, 30
async fn seeded_store(dir: &TempDir) -> (SqlStore, String) {
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("cw.db").display());
    let store = SqlStore::connect(&url).await.unwrap();
    for statement in [
        "CREATE TABLE PREFS (EMPLOYEESID INTEGER, DEFAULTVALUE TEXT)",
        "CREATE TABLE GROUPS (GROUPID INTEGER, KEYWORD TEXT)",
        "CREATE TABLE GROUPMEMBERS (GROUPID INTEGER, EMPLOYEESID INTEGER)",
        "CREATE TABLE EMPLOYEE (EMPLOYEESID INTEGER, UNIQUENAME TEXT)",
        "INSERT INTO PREFS VALUES (1042, 'Open Work Orders')",
        "INSERT INTO GROUPS VALUES (7, 'STREETS')",
        "INSERT INTO GROUPS VALUES (8, 'PARKS')",
        "INSERT INTO GROUPMEMBERS VALUES (7, 10)",
        "INSERT INTO GROUPMEMBERS VALUES (7, 20)",
        "INSERT INTO GROUPMEMBERS VALUES (7, 30)",
        "INSERT INTO EMPLOYEE VALUES (10, 'ASMITH')",
        "INSERT INTO EMPLOYEE VALUES (20, 'BJONES')",
        "INSERT INTO EMPLOYEE VALUES (30, 'CLEE')",
    ] {
        sqlx::query(statement).execute(store.pool()).await.unwrap();
    }
    (store, url)
}

async fn mock_auth(server: &mut ServerGuard, body: &str) -> Mock {
    server
        .mock("GET", AUTH_PATH)
        .match_query(Matcher::UrlEncoded(
            "data".into(),
            r#"{"LoginName":"svc-mobile","Password":"pw","Expires":120}"#.into(),
        ))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await
}

async fn mock_update(server: &mut ServerGuard, employee_sid: i64, status: usize, body: &str) -> Mock {
    let data = format!(
        r#"{{"Category":"MOBILE","DefaultValue":"Open Work Orders","EmployeeSid":{}}}"#,
        employee_sid
    );
    server
        .mock("GET", UPDATE_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("token".into(), "tok-123".into()),
            Matcher::UrlEncoded("data".into(), data),
        ]))
        .with_status(status)
        .with_body(body)
        .expect(1)
        .create_async()
        .await
}

fn request(group: &str) -> PropagationRequest {
    PropagationRequest {
        reference_employee_sid: 1042,
        group_keyword: group.to_string(),
    }
}

/// Test 1: every member of the group receives the reference user's search
#[tokio::test]
#[serial]
async fn test_full_propagation() {
    let dir = TempDir::new().unwrap();
    let (store, url) = seeded_store(&dir).await;
    let mut server = Server::new_async().await;
    let config = test_config(&server, &url);

    let auth = mock_auth(&mut server, r#"{"Status": 0, "Value": {"Token": "tok-123"}}"#).await;
    let mut updates = Vec::new();
    for sid in [10, 20, 30] {
        updates.push(mock_update(&mut server, sid, 200, r#"{"Status": 0, "Value": true}"#).await);
    }

    let api = ApiClient::new(reqwest::Client::new(), &config.api);
    let mut propagator = Propagator::from_config(api, &config);
    let report = propagator.run(store, &request("STREETS")).await.unwrap();

    auth.assert_async().await;
    for mock in &updates {
        mock.assert_async().await;
    }
    assert_eq!(propagator.state(), RunState::Done);
    assert_eq!(report.group_id, 7);
    assert_eq!(report.updated_count(), 3);
    let names: Vec<&str> = report
        .outcomes
        .iter()
        .map(|o| o.unique_name.as_str())
        .collect();
    assert_eq!(names, vec!["ASMITH", "BJONES", "CLEE"]);
}

/// Test 1b: sign in first, then propagate over a store opened afterwards
#[tokio::test]
#[serial]
async fn test_sign_in_then_propagate() {
    let dir = TempDir::new().unwrap();
    let (mut seeded, url) = seeded_store(&dir).await;
    seeded.close().await;
    let mut server = Server::new_async().await;
    let config = test_config(&server, &url);

    let auth = mock_auth(&mut server, r#"{"Status": 0, "Value": {"Token": "tok-123"}}"#).await;
    let mut updates = Vec::new();
    for sid in [10, 20, 30] {
        updates.push(mock_update(&mut server, sid, 200, r#"{"Status": 0}"#).await);
    }

    let api = ApiClient::new(reqwest::Client::new(), &config.api);
    let mut propagator = Propagator::from_config(api, &config);
    let token = propagator.authenticate().await.unwrap();
    auth.assert_async().await;
    assert_eq!(propagator.state(), RunState::Authenticated);

    let mut store = SqlStore::connect(&config.database.connection_url().unwrap())
        .await
        .unwrap();
    let report = propagator
        .propagate(&mut store, &token, &request("STREETS"))
        .await;
    store.close().await;

    let report = report.unwrap();
    for mock in &updates {
        mock.assert_async().await;
    }
    assert_eq!(report.updated_count(), 3);
    assert_eq!(propagator.state(), RunState::Done);
}

/// Test 2: a rejected login stops the run before any update
#[tokio::test]
#[serial]
async fn test_authentication_failure_stops_run() {
    let dir = TempDir::new().unwrap();
    let (store, url) = seeded_store(&dir).await;
    let mut server = Server::new_async().await;
    let config = test_config(&server, &url);

    let _auth = mock_auth(&mut server, r#"{"Status": 1, "Message": "Invalid login"}"#).await;
    let no_updates = server
        .mock("GET", UPDATE_PATH)
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let api = ApiClient::new(reqwest::Client::new(), &config.api);
    let mut propagator = Propagator::from_config(api, &config);
    let err = propagator.run(store, &request("STREETS")).await.unwrap_err();

    no_updates.assert_async().await;
    assert!(matches!(err, AppError::Authentication { .. }));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(propagator.state(), RunState::Aborted);
}

/// Test 3: an unknown group keyword is a fatal lookup error
#[tokio::test]
#[serial]
async fn test_unknown_group_aborts() {
    let dir = TempDir::new().unwrap();
    let (store, url) = seeded_store(&dir).await;
    let mut server = Server::new_async().await;
    let config = test_config(&server, &url);

    let _auth = mock_auth(&mut server, r#"{"Status": 0, "Value": {"Token": "tok-123"}}"#).await;
    let no_updates = server
        .mock("GET", UPDATE_PATH)
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let api = ApiClient::new(reqwest::Client::new(), &config.api);
    let mut propagator = Propagator::from_config(api, &config);
    let err = propagator.run(store, &request("NO SUCH GROUP")).await.unwrap_err();

    no_updates.assert_async().await;
    assert!(matches!(
        err,
        AppError::LookupEmpty {
            lookup: "group",
            ..
        }
    ));
    assert_eq!(propagator.state(), RunState::Aborted);
}

/// Test 4: a group with no members finishes without calling the update endpoint
#[tokio::test]
#[serial]
async fn test_group_without_members() {
    let dir = TempDir::new().unwrap();
    let (store, url) = seeded_store(&dir).await;
    let mut server = Server::new_async().await;
    let config = test_config(&server, &url);

    let _auth = mock_auth(&mut server, r#"{"Status": 0, "Value": {"Token": "tok-123"}}"#).await;
    let no_updates = server
        .mock("GET", UPDATE_PATH)
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let api = ApiClient::new(reqwest::Client::new(), &config.api);
    let mut propagator = Propagator::from_config(api, &config);
    let report = propagator.run(store, &request("PARKS")).await.unwrap();

    no_updates.assert_async().await;
    assert_eq!(report.group_id, 8);
    assert!(report.outcomes.is_empty());
    assert_eq!(propagator.state(), RunState::Done);
}

/// Test 5: one failing update does not stop the others
#[tokio::test]
#[serial]
async fn test_failed_update_is_isolated() {
    let dir = TempDir::new().unwrap();
    let (store, url) = seeded_store(&dir).await;
    let mut server = Server::new_async().await;
    let config = test_config(&server, &url);

    let _auth = mock_auth(&mut server, r#"{"Status": 0, "Value": {"Token": "tok-123"}}"#).await;
    let first = mock_update(&mut server, 10, 200, r#"{"Status": 0}"#).await;
    let second = mock_update(&mut server, 20, 502, "Bad Gateway").await;
    let third = mock_update(&mut server, 30, 200, r#"{"Status": 0}"#).await;

    let api = ApiClient::new(reqwest::Client::new(), &config.api);
    let mut propagator = Propagator::from_config(api, &config);
    let report = propagator.run(store, &request("STREETS")).await.unwrap();

    first.assert_async().await;
    second.assert_async().await;
    third.assert_async().await;
    assert_eq!(report.updated_count(), 2);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.outcomes[1].unique_name, "BJONES");
    assert!(matches!(report.outcomes[1].status, UpdateStatus::Failed(_)));
}
