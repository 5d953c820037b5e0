mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

fn names(body: &serde_json::Value, key: &str) -> Vec<String> {
    body[key]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|row| row["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn second_page_of_products_by_name() -> Result<()> {
    let (status, body) = common::get(r#"/api/products?page=1&order=[{"name":"asc"}]"#, Some(1)).await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["pages"], json!(3));

    let names = names(&body, "products");
    assert_eq!(names.len(), 10);
    assert_eq!(names.first().map(String::as_str), Some("Jam"));
    assert_eq!(names.last().map(String::as_str), Some("Salt"));
    Ok(())
}

#[tokio::test]
async fn page_past_the_end_is_empty_not_an_error() -> Result<()> {
    let (status, body) = common::get("/api/products?page=7", Some(1)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["products"], json!([]));
    assert_eq!(body["pages"], json!(3));
    Ok(())
}

#[tokio::test]
async fn without_page_everything_is_returned() -> Result<()> {
    let (status, body) = common::get("/api/products", Some(1)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["products"].as_array().map(Vec::len), Some(23));
    assert_eq!(body["pages"], json!(3));
    Ok(())
}

#[tokio::test]
async fn nested_keys_sort_with_id_tie_break() -> Result<()> {
    let (status, body) = common::get(r#"/api/stocks?order=[{"location":{"name":"descending"}}]"#, Some(1)).await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);

    let ids: Vec<i64> = body["stocks"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|row| row["id"].as_i64())
        .collect();
    // Pantry, then Fridge, then Freezer; ascending id within each location
    assert_eq!(ids, vec![2, 4, 6, 1, 3, 5]);
    assert_eq!(body["stocks"][0]["location"]["name"], json!("Pantry"));
    Ok(())
}

#[tokio::test]
async fn malformed_requests_fail_whole() -> Result<()> {
    let cases = [
        r#"/api/products?order={"name":"asc"}"#,
        r#"/api/products?order=[{"name":"up"}]"#,
        r#"/api/products?order=[{"name":"ASC"}]"#,
        r#"/api/products?order=[{"name":"asc","id":"desc"}]"#,
        r#"/api/products?order=[{"secret":"asc"}]"#,
        r#"/api/products?order=[{"a":{"b":{"c":{"d":{"e":"asc"}}}}}]"#,
        "/api/products?page=-1",
        "/api/products?page=two",
    ];
    for path in cases {
        let (status, body) = common::get(path, Some(1)).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} => {}", path, body);
        assert_eq!(body["error"], json!(true));
        assert_eq!(body["code"], json!("BAD_REQUEST"));
    }
    Ok(())
}

#[tokio::test]
async fn rows_are_scoped_to_the_caller() -> Result<()> {
    let (status, body) = common::get("/api/locations", Some(2)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body, "locations"), vec!["Cellar".to_string()]);
    assert_eq!(body["pages"], json!(1));

    let (status, _) = common::get("/api/locations", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn record_views_check_ownership() -> Result<()> {
    // Milk is product 11
    let (status, body) = common::get("/api/products/11", Some(1)).await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(
        body["product"],
        json!({
            "name": "Milk",
            "defaultQuantity": 1000,
            "defaultUnitOfMeasurement": "MILLILITERS",
            "defaultLocationId": 2
        })
    );

    let (status, _) = common::get("/api/products/11", Some(2)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = common::get("/api/products/999", Some(1)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = common::get("/api/products/milk", Some(1)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn health_is_public() -> Result<()> {
    let (status, body) = common::get("/health", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_object());
    Ok(())
}
