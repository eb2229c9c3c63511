use bsh_core::{ConfigurationPoint, RunResult};

#[test]
fn stdin_payload_is_four_lines_in_protocol_order() {
    let point = ConfigurationPoint::new(12, 1024, 4, 50_000);
    assert_eq!(point.stdin_payload(), "12\n1024\n4\n50000\n");
    assert_eq!(point.to_string(), "depth=12, batch=1024, threads=4, ops=50000");
}

#[test]
fn run_result_keeps_header_order() {
    let result: RunResult = [("depth", "12"), ("avg_live", "3.5"), ("avg_angela", "2.1")]
        .into_iter()
        .collect();
    let names: Vec<&str> = result.field_names().collect();
    assert_eq!(names, vec!["depth", "avg_live", "avg_angela"]);
    assert_eq!(result.get("avg_live"), Some("3.5"));
    assert_eq!(result.get("missing"), None);
}

#[test]
fn same_fields_ignores_order() {
    let a: RunResult = [("x", "1"), ("y", "2")].into_iter().collect();
    let b: RunResult = [("y", "3"), ("x", "4")].into_iter().collect();
    let c: RunResult = [("x", "1"), ("z", "2")].into_iter().collect();
    assert!(a.same_fields(&b));
    assert!(!a.same_fields(&c));
}

#[test]
fn run_result_serializes_as_ordered_object() {
    let result: RunResult = [("b", "1"), ("a", "2")].into_iter().collect();
    let json = serde_json::to_string(&result).expect("serialize");
    assert_eq!(json, r#"{"b":"1","a":"2"}"#);
}
