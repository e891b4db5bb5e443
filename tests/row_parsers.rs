use serde_json::json;
use sqlx::SqlitePool;

use binuuid::{codec, db};
use binuuid::db::row_parsers::{raw_relation_from_json, raw_row_from_json, raw_row_from_sqlite};
use binuuid::models;
use binuuid::Value;

const PARENT_ID: &str = "550e8400-e29b-41d4-a716-446655440000";
const CHILD_ID: &str = "550e8400-e29b-41d4-a716-446655440001";

async fn setup_pool() -> SqlitePool {
    db::connect("sqlite::memory:", 1).await.expect("connect")
}

fn wire(canonical: &str) -> Vec<u8> {
    codec::encode(canonical).unwrap().to_vec()
}

#[tokio::test]
async fn parse_child_row_blob_identifiers() {
    let pool = setup_pool().await;
    sqlx::query("CREATE TABLE child (entity_id BLOB, parent_id BLOB, name INTEGER)")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO child (entity_id, parent_id, name) VALUES (?, ?, ?)")
        .bind(wire(CHILD_ID))
        .bind(wire(PARENT_ID))
        .bind(10i64)
        .execute(&pool)
        .await
        .unwrap();

    let row = sqlx::query(r#"SELECT entity_id AS "entityId", parent_id AS "parentId", name AS "name" FROM child"#)
        .fetch_one(&pool)
        .await
        .unwrap();

    let schema = models::schema().unwrap();
    let table = schema.table("child").unwrap();
    let parsed = raw_row_from_sqlite(&schema, table, &[], &row).expect("parse");

    assert_eq!(parsed.get("entityId"), Some(&Value::Bytes(wire(CHILD_ID))));
    assert_eq!(parsed.get("parentId"), Some(&Value::Bytes(wire(PARENT_ID))));
    assert_eq!(parsed.get("name"), Some(&Value::Integer(10)));
}

#[tokio::test]
async fn parse_parent_row_with_embedded_json_relation() {
    let pool = setup_pool().await;
    let schema = models::schema().unwrap();
    let table = schema.table("parent").unwrap();
    let children = table.relation("children").unwrap();

    let doc = json!([{ "entityId": CHILD_ID.replace('-', ""), "parentId": PARENT_ID.replace('-', ""), "name": 10 }]).to_string();
    let row = sqlx::query(r#"SELECT ? AS "entityId", NULL AS "name", ? AS "children""#)
        .bind(wire(PARENT_ID))
        .bind(doc)
        .fetch_one(&pool)
        .await
        .unwrap();

    let parsed = raw_row_from_sqlite(&schema, table, &[children], &row).expect("parse");
    assert_eq!(parsed.get("entityId"), Some(&Value::Bytes(wire(PARENT_ID))));
    assert_eq!(parsed.get("name"), Some(&Value::Null));

    let embedded = parsed.get("children").and_then(Value::as_rows).unwrap();
    assert_eq!(embedded.len(), 1);
    assert_eq!(embedded[0].get("entityId"), Some(&Value::Bytes(wire(CHILD_ID))));
    assert_eq!(embedded[0].get("parentId"), Some(&Value::Bytes(wire(PARENT_ID))));
}

#[test]
fn hex_text_and_blob_transports_yield_the_same_raw_row() {
    let schema = models::schema().unwrap();
    let table = schema.table("child").unwrap();

    let doc = json!({ "entityId": "550e8400e29b41d4a716446655440001", "parentId": null, "name": 20 });
    let parsed = raw_row_from_json(&schema, table, doc.as_object().unwrap()).unwrap();

    assert_eq!(parsed.get("entityId"), Some(&Value::Bytes(wire(CHILD_ID))));
    assert_eq!(parsed.get("parentId"), Some(&Value::Null));
    assert_eq!(parsed.get("name"), Some(&Value::Integer(20)));
}

#[test]
fn null_or_empty_many_relation_is_an_empty_sequence() {
    let schema = models::schema().unwrap();
    let children = schema.table("parent").unwrap().relation("children").unwrap();

    assert_eq!(raw_relation_from_json(&schema, children, &json!(null)).unwrap(), Value::Many(Vec::new()));
    assert_eq!(raw_relation_from_json(&schema, children, &json!([])).unwrap(), Value::Many(Vec::new()));
}

#[test]
fn rejects_non_hex_identifier_text() {
    let schema = models::schema().unwrap();
    let table = schema.table("child").unwrap();

    let doc = json!({ "entityId": "not-hex", "parentId": null, "name": 1 });
    assert!(raw_row_from_json(&schema, table, doc.as_object().unwrap()).is_err());
}
