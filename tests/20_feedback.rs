mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use inventory_manager::client::FeedbackSource;

#[tokio::test]
async fn location_name_feedback() -> Result<()> {
    let cases = [
        ("Pa", "Name too short!"),
        ("Pantry", "Name already used!"),
        ("Attic", "Valid Name"),
        ("abcdefghijklmnopqrstuvwxyz0123456", "Name too long!"),
    ];
    for (name, expected) in cases {
        let (status, body) = common::get(&format!("/api/feedbacks/location-name?name={}", name), Some(1)).await?;
        assert_eq!(status, StatusCode::OK, "{} => {}", name, body);
        assert_eq!(body, json!({ "feedback": expected }), "{}", name);
    }
    Ok(())
}

#[tokio::test]
async fn names_are_only_taken_within_one_users_data() -> Result<()> {
    let client = common::api_client(2).await?;
    assert_eq!(client.feedback("/api/feedbacks/location-name", "name", "Pantry").await?, "Valid Name");
    assert_eq!(client.feedback("/api/feedbacks/location-name", "name", "Cellar").await?, "Name already used!");

    let client = common::api_client(1).await?;
    assert_eq!(client.feedback("/api/feedbacks/product-name", "name", "Milk").await?, "Name already used!");
    assert_eq!(client.feedback("/api/feedbacks/category-name", "name", "Novels").await?, "Name already used!");
    assert_eq!(client.feedback("/api/feedbacks/category-name", "name", "Poetry").await?, "Valid Name");
    Ok(())
}

#[tokio::test]
async fn missing_name_is_a_bad_request() -> Result<()> {
    let (status, body) = common::get("/api/feedbacks/product-name", Some(1)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!(true));

    let (status, _) = common::get("/api/feedbacks/product-name?name=Tea", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}
