use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt; // for oneshot

use binuuid::db::{self, provision};
use binuuid::repro::{self, CHILD_IDS, PARENT_ID};
use binuuid::{create_app, models};

async fn seeded_app() -> Result<Router> {
    let pool = db::connect("sqlite::memory:", 1).await?;
    let schema = models::schema()?;
    provision::create_tables(&pool, &schema, provision::Mode::Recreate).await?;
    repro::seed(&pool, &schema).await?;
    Ok(create_app(pool, schema))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, value))
}

fn sorted_ids(rows: &Value) -> Vec<String> {
    let mut ids: Vec<String> = rows
        .as_array()
        .map(|items| items.iter().filter_map(|r| r["entityId"].as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    ids.sort();
    ids
}

#[tokio::test]
async fn flat_and_relational_routes_agree() -> Result<()> {
    let app = seeded_app().await?;

    let (status, flat) = call(&app, "GET", &format!("/tables/child/rows?parentId={}", PARENT_ID), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sorted_ids(&flat), CHILD_IDS.to_vec());

    let (status, parent) = call(&app, "GET", &format!("/tables/parent/first?entityId={}&with=children", PARENT_ID), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parent["entityId"], json!(PARENT_ID));
    assert_eq!(sorted_ids(&parent["children"]), sorted_ids(&flat));

    for child in parent["children"].as_array().unwrap() {
        assert!(child["entityId"].is_string());
        assert_eq!(child["parentId"], json!(PARENT_ID));
    }
    Ok(())
}

#[tokio::test]
async fn nested_with_paths_embed_multiple_levels() -> Result<()> {
    let app = seeded_app().await?;

    let uri = format!("/tables/child/many?parentId={}&with=parent.children", PARENT_ID);
    let (status, rows) = call(&app, "GET", &uri, None).await?;
    assert_eq!(status, StatusCode::OK);

    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(row["parent"]["entityId"], json!(PARENT_ID));
        assert_eq!(sorted_ids(&row["parent"]["children"]), CHILD_IDS.to_vec());
    }
    Ok(())
}

#[tokio::test]
async fn repeated_with_paths_merge_into_one_embedding() -> Result<()> {
    let app = seeded_app().await?;

    let uri = format!("/tables/child/many?parentId={}&with=parent.children&with=parent", PARENT_ID);
    let (status, rows) = call(&app, "GET", &uri, None).await?;
    assert_eq!(status, StatusCode::OK);
    for row in rows.as_array().unwrap() {
        assert_eq!(row["parent"]["entityId"], json!(PARENT_ID));
        assert_eq!(sorted_ids(&row["parent"]["children"]), CHILD_IDS.to_vec());
    }

    let uri = format!("/tables/parent/first?entityId={}&with=children&with=children", PARENT_ID);
    let (status, parent) = call(&app, "GET", &uri, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sorted_ids(&parent["children"]), CHILD_IDS.to_vec());
    Ok(())
}

#[tokio::test]
async fn malformed_with_paths_are_bad_requests() -> Result<()> {
    let app = seeded_app().await?;

    for path in ["children..parent", "children.", ".children"] {
        let (status, body) = call(&app, "GET", &format!("/tables/parent/first?with={}", path), None).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "with={}", path);
        assert_eq!(body["error"], json!("bad_request"), "with={}", path);
    }
    Ok(())
}

#[tokio::test]
async fn corrupt_stored_identifiers_are_server_errors() -> Result<()> {
    let pool = db::connect("sqlite::memory:", 1).await?;
    // A table from before the width check existed.
    sqlx::query("CREATE TABLE parent (entity_id BLOB PRIMARY KEY, name INTEGER)")
        .execute(&pool)
        .await?;
    sqlx::query("INSERT INTO parent (entity_id, name) VALUES (?, 1)")
        .bind(vec![0xabu8, 0xcd])
        .execute(&pool)
        .await?;
    let app = create_app(pool, models::schema()?);

    let (status, body) = call(&app, "GET", "/tables/parent/rows", None).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("malformed_wire_value"));
    Ok(())
}

#[tokio::test]
async fn insert_route_generates_ids_and_new_parent_has_no_children() -> Result<()> {
    let app = seeded_app().await?;

    let (status, inserted) = call(&app, "POST", "/tables/parent/rows", Some(json!({ "name": 5 }))).await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = inserted[0]["entityId"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 36);

    let (status, parent) = call(&app, "GET", &format!("/tables/parent/first?entityId={}&with=children", id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parent["children"], json!([]));
    assert_eq!(parent["name"], json!(5));
    Ok(())
}

#[tokio::test]
async fn insert_route_accepts_arrays() -> Result<()> {
    let app = seeded_app().await?;

    let body = json!([
        { "parentId": PARENT_ID, "name": 30 },
        { "entityId": "550E8400E29B41D4A716446655440003", "parentId": PARENT_ID, "name": 40 }
    ]);
    let (status, inserted) = call(&app, "POST", "/tables/child/rows", Some(body)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(inserted[1]["entityId"], json!("550e8400-e29b-41d4-a716-446655440003"));

    let (_, flat) = call(&app, "GET", &format!("/tables/child/rows?parentId={}", PARENT_ID), None).await?;
    assert_eq!(flat.as_array().unwrap().len(), 4);
    Ok(())
}

#[tokio::test]
async fn malformed_identifiers_are_bad_requests() -> Result<()> {
    let app = seeded_app().await?;

    let (status, body) = call(&app, "GET", "/tables/child/rows?parentId=550e8400", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("malformed_canonical_value"));

    let (status, _) = call(&app, "POST", "/tables/parent/rows", Some(json!({ "entityId": "zz" }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn unknown_tables_relations_and_misses() -> Result<()> {
    let app = seeded_app().await?;

    let (status, _) = call(&app, "GET", "/tables/nope/rows", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "GET", "/tables/parent/first?with=siblings", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "GET", "/tables/parent/rows?with=children", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "GET",
        "/tables/parent/first?entityId=00000000-0000-0000-0000-000000000000",
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
