use serde_json::Value;
use shardgate_error::{ErrorCode, ErrorContext, ShardgateError};

#[test]
fn test_json_serialization() {
    let error = ShardgateError::new(ErrorCode::UnroutableQuery, "No table after FROM")
        .with_context(ErrorContext::Routing {
            table: None,
            sql_preview: "SELECT 1".to_string(),
        })
        .with_hint("Queries must name a table in their FROM clause");

    let json = error.to_json();

    let v: Value = serde_json::from_str(&json).expect("valid json");

    assert_eq!(v["code"], "SHARDGATE-2001");
    assert_eq!(v["message"], "No table after FROM");
    assert_eq!(v["hint"], "Queries must name a table in their FROM clause");
    assert_eq!(v["context"]["type"], "routing");
    assert_eq!(v["context"]["sql_preview"], "SELECT 1");
}

#[test]
fn test_error_code_parsing() {
    let code: ErrorCode = "SHARDGATE-3004".to_string().try_into().unwrap();
    assert_eq!(code, ErrorCode::UnknownBackend);
}

#[test]
fn test_error_roundtrip_through_json() {
    let error = ShardgateError::backend_unavailable("DBMS3", None, None, "connection refused");
    let back: ShardgateError = serde_json::from_str(&error.to_json()).unwrap();
    assert_eq!(back.code, ErrorCode::BackendUnavailable);
    assert_eq!(back.message, "connection refused");
}
