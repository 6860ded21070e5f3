// ==========================================
// CatalogImporter integration tests
// ==========================================
// Goal: the full pipeline over a real SQLite database
// ==========================================

mod test_helpers;

use catalog_import::domain::{
    DataType, FieldDescriptor, FieldMapping, ImportRequest, MappingKind, ProcessingStatus,
    PropertyValue, TemplateUpsert,
};
use catalog_import::importer::{CatalogImporter, ImportError};
use catalog_import::logging;
use catalog_import::repository::{
    CategoryRepository, ImportHistoryRepository, ProductRepository, TemplateRepository,
};
use serde_json::json;
use test_helpers::{create_test_db, csv_bytes, seed_category, TestStores};

fn csv_request(category_id: &str, lines: &[&str]) -> ImportRequest {
    ImportRequest {
        category_id: category_id.to_string(),
        file_name: "doors.csv".to_string(),
        mime_type: Some("text/csv".to_string()),
        bytes: csv_bytes(lines),
        ..Default::default()
    }
}

const DOORS: [&str; 3] = ["Название,Цена,Артикул", "Дверь А,1500,A-1", ",,"];

#[tokio::test]
async fn test_headers_mode_lists_sanitized_headers_and_schema() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().expect("test db");
    let stores = TestStores::open(&db_path).expect("stores");
    let category = seed_category(&stores, "Двери", Vec::new(), &[]).await;

    let probe = stores
        .importer()
        .probe_headers(&csv_request(&category.id, &DOORS))
        .await
        .expect("headers probe");

    assert!(probe.ok);
    assert_eq!(probe.headers, vec!["Название", "Цена", "Артикул"]);
    assert_eq!(probe.total_rows, 2);

    let price = probe.schema.iter().find(|c| c.display_name == "Цена").unwrap();
    assert_eq!(price.data_type, DataType::Number);
    assert_eq!(price.unit.as_deref(), Some("₽"));
    for header in ["Название", "Артикул"] {
        let column = probe.schema.iter().find(|c| c.display_name == header).unwrap();
        assert!(column.required, "{} should be required", header);
    }
    assert_eq!(probe.header_keys["Название"], "field_1");

    // headers mode never writes
    let products = stores.product_repo.list_by_category(&category.id).await.unwrap();
    assert!(products.is_empty());
}

#[tokio::test]
async fn test_full_mode_end_to_end() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().expect("test db");
    let stores = TestStores::open(&db_path).expect("stores");
    let category = seed_category(&stores, "Двери", Vec::new(), &[]).await;

    let result = stores
        .importer()
        .import_full(&csv_request(&category.id, &DOORS))
        .await
        .expect("full import");

    assert_eq!(result.total_rows, 2);
    assert_eq!(result.valid_rows, 1);
    assert_eq!(result.error_rows, 1);
    assert_eq!(result.database_saved, 1);
    assert_eq!(result.processing_status, ProcessingStatus::Partial);
    assert!(!result.alert);
    assert_eq!(result.mapping.kind, MappingKind::Fallback);
    assert_eq!(result.error_stats["row has no data"], 1);

    let product = stores
        .product_repo
        .find_by_sku("A-1")
        .await
        .unwrap()
        .expect("stored product");
    assert_eq!(product.name, "Дверь А");
    assert_eq!(product.base_price, 1500.0);
    assert_eq!(product.properties_data.len(), 3);
    assert_eq!(
        product.properties_data["Название"],
        PropertyValue::String("Дверь А".into())
    );
    assert_eq!(product.properties_data["Цена"], PropertyValue::String("1500".into()));
    assert_eq!(product.properties_data["Артикул"], PropertyValue::String("A-1".into()));
    assert_eq!(product.specifications, product.properties_data);

    // follow-up writes
    let refreshed = stores.category_repo.find_by_id(&category.id).await.unwrap().unwrap();
    assert_eq!(refreshed.products_count, 1);

    let history = stores.history_repo.list_recent(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].filename, "doors.csv");
    assert_eq!(history[0].products_count, 1);
    assert_eq!(history[0].status, "partial");

    let stats = stores.history_repo.get_stats(&category.id).await.unwrap().unwrap();
    assert_eq!(stats.imports_total, 1);
    assert_eq!(stats.products_imported_total, 1);
}

#[tokio::test]
async fn test_unknown_category_fails_before_reading() {
    let (_tmp, db_path) = create_test_db().expect("test db");
    let stores = TestStores::open(&db_path).expect("stores");

    let err = stores
        .importer()
        .import_full(&csv_request("missing", &DOORS))
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::CategoryNotFound(id) if id == "missing"));
}

#[tokio::test]
async fn test_headers_only_file_is_empty() {
    let (_tmp, db_path) = create_test_db().expect("test db");
    let stores = TestStores::open(&db_path).expect("stores");
    let category = seed_category(&stores, "Двери", Vec::new(), &[]).await;

    let err = stores
        .importer()
        .probe_headers(&csv_request(&category.id, &["Название,Цена"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::EmptyFile));
}

#[tokio::test]
async fn test_persistence_isolation_on_duplicate_sku() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().expect("test db");
    let stores = TestStores::open(&db_path).expect("stores");
    let category = seed_category(&stores, "Двери", Vec::new(), &[]).await;

    let lines = [
        "Название,Артикул",
        "Дверь 1,D-1",
        "Дверь 2,D-2",
        "Дверь 3,D-1",
        "Дверь 4,D-4",
        "Дверь 5,D-5",
    ];
    let result = stores
        .importer()
        .import_full(&csv_request(&category.id, &lines))
        .await
        .expect("full import");

    assert_eq!(result.imported, 5);
    assert_eq!(result.database_saved, 4);
    assert_eq!(result.failed_products, 1);
    assert_eq!(result.failures[0].row_number, 4);
    assert_eq!(result.failures[0].sku, "D-1");
    assert_eq!(result.failures[0].name, "Дверь 3");
    assert_eq!(result.processing_status, ProcessingStatus::Partial);

    for sku in ["D-1", "D-2", "D-4", "D-5"] {
        assert!(stores.product_repo.find_by_sku(sku).await.unwrap().is_some());
    }
    let d1 = stores.product_repo.find_by_sku("D-1").await.unwrap().unwrap();
    assert_eq!(d1.name, "Дверь 1");
}

#[tokio::test]
async fn test_user_mapping_wins_over_category_and_template() {
    let (_tmp, db_path) = create_test_db().expect("test db");
    let stores = TestStores::open(&db_path).expect("stores");
    let category = seed_category(
        &stores,
        "Двери",
        Vec::new(),
        &[("Название", "category_name")],
    )
    .await;
    stores
        .template_repo
        .upsert(&TemplateUpsert {
            catalog_category_id: category.id.clone(),
            name: "Шаблон".into(),
            field_mappings: json!([{ "source_header": "Название", "field_name": "template_name" }]),
            ..Default::default()
        })
        .await
        .unwrap();

    let mut request = csv_request(&category.id, &DOORS);
    request.user_mapping = Some(vec![FieldMapping::new("Название", "user_name")]);

    let result = stores.importer().import_full(&request).await.unwrap();
    assert_eq!(result.mapping.kind, MappingKind::Explicit);
    assert_eq!(result.mapping.entries.len(), 1);
    assert_eq!(result.mapping.entries[0].target_field, "user_name");

    // without a user mapping the category mapping wins
    let result = stores
        .importer()
        .import_full(&csv_request(&category.id, &["Название", "Дверь Б"]))
        .await
        .unwrap();
    assert_eq!(result.mapping.kind, MappingKind::Category);
}

#[tokio::test]
async fn test_template_required_fields_only_warn() {
    let (_tmp, db_path) = create_test_db().expect("test db");
    let stores = TestStores::open(&db_path).expect("stores");
    let category = seed_category(&stores, "Двери", Vec::new(), &[]).await;
    stores
        .template_repo
        .upsert(&TemplateUpsert {
            catalog_category_id: category.id.clone(),
            name: "Шаблон".into(),
            required_fields: json!([
                { "field_name": "Название" },
                { "field_name": "Цвет" }
            ]),
            ..Default::default()
        })
        .await
        .unwrap();

    let result = stores
        .importer()
        .import_full(&csv_request(&category.id, &["Название,Цена", "Дверь В,900"]))
        .await
        .unwrap();

    assert_eq!(result.mapping.kind, MappingKind::Template);
    assert_eq!(result.imported, 1);
    assert_eq!(result.error_rows, 0);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("Цвет"));
    assert_eq!(result.required_fields, vec!["Название", "Цвет"]);
}

#[tokio::test]
async fn test_template_auto_created_once_from_field_selection() {
    let (_tmp, db_path) = create_test_db().expect("test db");
    let stores = TestStores::open(&db_path).expect("stores");
    let category = seed_category(&stores, "Двери", Vec::new(), &[]).await;

    let mut request = csv_request(&category.id, &["Название,Артикул", "Дверь Г,G-1"]);
    request.selected_fields = Some(vec![
        FieldDescriptor::new("Название").required(),
        FieldDescriptor::new("Артикул"),
    ]);
    stores.importer().import_full(&request).await.unwrap();

    let templates = stores.template_repo.list(Some(&category.id)).await.unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].field_mappings.as_array().map(|a| a.len()), Some(2));

    // second run reuses the template instead of creating another one
    let mut again = csv_request(&category.id, &["Название,Артикул", "Дверь Д,G-2"]);
    again.selected_fields = request.selected_fields.clone();
    let result = stores.importer().import_full(&again).await.unwrap();
    assert_eq!(result.mapping.kind, MappingKind::Template);
    assert_eq!(stores.template_repo.list(Some(&category.id)).await.unwrap().len(), 1);
}
