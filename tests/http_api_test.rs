// ==========================================
// HTTP surface integration tests
// ==========================================
// Goal: multipart upload → JSON responses through the axum router
// ==========================================

mod test_helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use catalog_import::app::{router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use test_helpers::create_test_db;
use tower::ServiceExt;

const BOUNDARY: &str = "catalog-import-test-boundary";

/// Build a multipart body from text fields and one optional file part
fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, mime, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, mime
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload(body: Vec<u8>) -> Request<Body> {
    Request::post("/api/admin/import/universal")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn create_category(app: &Router, name: &str) -> String {
    let (status, body) = send(
        app,
        Request::post("/api/admin/categories")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "name": name }).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

const DOORS_CSV: &[u8] = "Название,Цена,Артикул\nДверь А,1500,A-1\n,,\n".as_bytes();

#[tokio::test]
async fn test_headers_then_full_upload() {
    let (_tmp, db_path) = create_test_db().expect("test db");
    let app = router(AppState::new(&db_path).expect("state"));
    let category_id = create_category(&app, "Двери").await;

    // headers mode
    let (status, body) = send(
        &app,
        upload(multipart_body(
            &[("category", &category_id), ("mode", "headers")],
            Some(("doors.csv", "text/csv", DOORS_CSV)),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["headers"], json!(["Название", "Цена", "Артикул"]));
    assert_eq!(body["schema"][1]["data_type"], "number");

    // full mode
    let (status, body) = send(
        &app,
        upload(multipart_body(
            &[("category", &category_id), ("mode", "full")],
            Some(("doors.csv", "text/csv", DOORS_CSV)),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_rows"], 2);
    assert_eq!(body["valid_rows"], 1);
    assert_eq!(body["database_saved"], 1);
    assert_eq!(body["processing_status"], "partial");
    assert_eq!(body["type"], "text/csv");

    // history
    let (status, body) = send(
        &app,
        Request::get("/api/admin/import/history?limit=5")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["history"][0]["category"], "Двери");

    // category carries the refreshed count
    let (status, body) = send(
        &app,
        Request::get(format!("/api/admin/categories/{}", category_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["products_count"], 1);
}

#[tokio::test]
async fn test_upload_rejections() {
    let (_tmp, db_path) = create_test_db().expect("test db");
    let app = router(AppState::new(&db_path).expect("state"));
    let category_id = create_category(&app, "Двери").await;

    // unsupported MIME type
    let (status, body) = send(
        &app,
        upload(multipart_body(
            &[("category", &category_id)],
            Some(("photo.png", "image/png", &b"\x89PNG"[..])),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNSUPPORTED_FILE_TYPE");

    // missing file
    let (status, _) = send(&app, upload(multipart_body(&[("category", &category_id)], None))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // malformed mapping JSON
    let (status, body) = send(
        &app,
        upload(multipart_body(
            &[("category", &category_id), ("mapping", "{oops")],
            Some(("doors.csv", "text/csv", DOORS_CSV)),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    // unknown category
    let (status, _) = send(
        &app,
        upload(multipart_body(
            &[("category", "nope")],
            Some(("doors.csv", "text/csv", DOORS_CSV)),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // unreadable workbook
    let (status, body) = send(
        &app,
        upload(multipart_body(
            &[("category", &category_id)],
            Some((
                "broken.xlsx",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                &b"not a workbook"[..],
            )),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNREADABLE_FILE");
    assert!(body["debug"]["attempts"].as_array().is_some());
}

#[tokio::test]
async fn test_template_upsert_is_idempotent_per_category() {
    let (_tmp, db_path) = create_test_db().expect("test db");
    let app = router(AppState::new(&db_path).expect("state"));
    let category_id = create_category(&app, "Двери").await;

    for name in ["Первый", "Второй"] {
        let (status, _) = send(
            &app,
            Request::post("/api/admin/import-templates")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "catalog_category_id": category_id,
                        "name": name,
                        "field_mappings": [{ "source_header": "Название", "field_name": "name" }]
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &app,
        Request::get(format!(
            "/api/admin/import-templates?catalog_category_id={}",
            category_id
        ))
        .body(Body::empty())
        .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["templates"][0]["name"], "Второй");

    // unknown category
    let (status, _) = send(
        &app,
        Request::post("/api/admin/import-templates")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "catalog_category_id": "nope", "name": "x" }).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_exported_template_reimports_as_headers() {
    let (_tmp, db_path) = create_test_db().expect("test db");
    let app = router(AppState::new(&db_path).expect("state"));
    let category_id = create_category(&app, "Двери").await;

    let (status, body) = send(
        &app,
        Request::post("/api/admin/import-templates")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "catalog_category_id": category_id,
                    "name": "Двери",
                    "required_fields": [{ "fieldName": "width", "displayName": "Ширина, мм" }, "Цена"],
                    "calculator_fields": r#"[{"fieldName": "color", "displayName": "Цвет"}]"#
                })
                .to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let template_id = body["template"]["id"].as_str().unwrap().to_string();

    // export by category
    let response = app
        .clone()
        .oneshot(
            Request::get(format!(
                "/api/admin/import-templates/export?categoryId={}",
                category_id
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert!(response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .starts_with("attachment; filename=\"template_"));
    let exported = response.into_body().collect().await.unwrap().to_bytes();

    // the sheet comes back through the headers probe unchanged
    let (status, body) = send(
        &app,
        upload(multipart_body(
            &[("category", &category_id), ("mode", "headers")],
            Some(("template.csv", "text/csv", &exported[..])),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["headers"], json!(["Ширина, мм", "Цена", "Цвет"]));
    assert_eq!(body["total_rows"], 5);

    // export by template id gives the same sheet
    let response = app
        .clone()
        .oneshot(
            Request::get(format!(
                "/api/admin/import-templates/export?templateId={}",
                template_id
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let again = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(again, exported);
}

#[tokio::test]
async fn test_template_export_rejections() {
    let (_tmp, db_path) = create_test_db().expect("test db");
    let app = router(AppState::new(&db_path).expect("state"));
    let category_id = create_category(&app, "Фурнитура").await;

    // no template yet
    let (status, body) = send(
        &app,
        Request::get(format!(
            "/api/admin/import-templates/export?categoryId={}",
            category_id
        ))
        .body(Body::empty())
        .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    // template with only field mappings has nothing to export
    let (status, _) = send(
        &app,
        Request::post("/api/admin/import-templates")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "catalog_category_id": category_id,
                    "name": "Пустой",
                    "field_mappings": [{ "source_header": "Название", "field_name": "name" }],
                    "export_fields": "{broken"
                })
                .to_string(),
            ))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Request::get(format!(
            "/api/admin/import-templates/export?categoryId={}",
            category_id
        ))
        .body(Body::empty())
        .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}
