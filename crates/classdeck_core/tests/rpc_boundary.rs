use classdeck_core::{
    handle_request_json, Classroom, Scope, SectionId, SectionRepository, SqliteOrderStore,
};
use serde_json::{json, Value};
use uuid::Uuid;

fn setup(owner: Uuid, names: &[&str]) -> (SqliteOrderStore, Vec<SectionId>) {
    let mut store = SqliteOrderStore::open_in_memory().unwrap();
    let ids = names
        .iter()
        .map(|name| {
            store
                .create_section(owner, Scope::Creation, name, None)
                .unwrap()
                .section_id
        })
        .collect();
    (store, ids)
}

fn call(store: &mut SqliteOrderStore, actor: Uuid, request: Value) -> Value {
    let response = handle_request_json(store, actor, &request.to_string());
    serde_json::from_str(&response).unwrap()
}

#[test]
fn reorder_request_applies_and_reports_ok() {
    let owner = Uuid::new_v4();
    let (mut store, ids) = setup(owner, &["A", "B", "C", "D"]);

    let response = call(
        &mut store,
        owner,
        json!({
            "kind": "reorder",
            "activeContainerId": ids[1],
            "overContainerId": ids[3],
            "shiftSet": [
                {"containerId": ids[2], "order": 3},
                {"containerId": ids[3], "order": 4}
            ],
            "direction": "UP"
        }),
    );
    assert_eq!(response["ok"], json!(true));
    assert!(response.get("errorCode").is_none());

    let orders: Vec<i64> = store
        .list_sections(owner, Scope::Creation)
        .unwrap()
        .iter()
        .map(|section| section.sort_order)
        .collect();
    assert_eq!(orders, vec![1, 2, 3, 4]);
    assert_eq!(
        store.get_section(ids[1]).unwrap().unwrap().sort_order,
        4
    );
}

#[test]
fn move_request_from_foreign_actor_is_forbidden() {
    let owner = Uuid::new_v4();
    let (mut store, ids) = setup(owner, &["A", "B"]);
    let classroom = store
        .create_classroom(owner, ids[0], "History", None)
        .unwrap();

    let response = call(
        &mut store,
        Uuid::new_v4(),
        json!({
            "kind": "move",
            "itemId": classroom.classroom_id,
            "containerId": ids[1],
            "scope": "CREATION"
        }),
    );
    assert_eq!(response["ok"], json!(false));
    assert_eq!(response["errorCode"], json!("forbidden"));

    let unchanged = store
        .get_item::<Classroom>(classroom.classroom_id)
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.section_id, ids[0]);
}

#[test]
fn snapshot_query_returns_sections_with_nested_items() {
    let owner = Uuid::new_v4();
    let (mut store, ids) = setup(owner, &["A", "B"]);
    store
        .create_classroom(owner, ids[1], "Statistics", Some("math"))
        .unwrap();

    let response = call(
        &mut store,
        owner,
        json!({"kind": "snapshot", "scope": "CREATION"}),
    );
    assert_eq!(response["ok"], json!(true));
    let sections = response["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0]["section"]["sortOrder"], json!(1));
    assert_eq!(sections[0]["section"]["isDefault"], json!(true));
    assert_eq!(sections[1]["items"][0]["name"], json!("Statistics"));
    assert_eq!(sections[1]["items"][0]["subject"], json!("math"));

    let empty = call(
        &mut store,
        owner,
        json!({"kind": "snapshot", "scope": "MEMBERSHIP"}),
    );
    assert_eq!(empty["ok"], json!(true));
    assert_eq!(empty["sections"], json!([]));
}

#[test]
fn malformed_requests_return_invalid_request_envelope() {
    let owner = Uuid::new_v4();
    let (mut store, _) = setup(owner, &["A"]);

    for raw in [
        "not json",
        r#"{"kind":"teleport"}"#,
        r#"{"kind":"move","itemId":"nope"}"#,
        r#"{"kind":"reorder","direction":"SIDEWAYS"}"#,
    ] {
        let response: Value =
            serde_json::from_str(&handle_request_json(&mut store, owner, raw)).unwrap();
        assert_eq!(response["ok"], json!(false), "input: {raw}");
        assert_eq!(response["errorCode"], json!("invalid_request"), "input: {raw}");
        assert!(response["message"].as_str().unwrap().contains("invalid request"));
    }
}

#[test]
fn stale_reorder_reports_stale_shift_set() {
    let owner = Uuid::new_v4();
    let (mut store, ids) = setup(owner, &["A", "B", "C"]);

    let response = call(
        &mut store,
        owner,
        json!({
            "kind": "reorder",
            "activeContainerId": ids[0],
            "overContainerId": ids[2],
            "shiftSet": [{"containerId": ids[1], "order": 5}],
            "direction": "UP"
        }),
    );
    assert_eq!(response["errorCode"], json!("stale_shift_set"));
}
