//! API integration tests
//!
//! Run against a live server started with a bootstrap administrator:
//!
//! ```text
//! BIBLIO__BOOTSTRAP__ADMIN_USERNAME=admin \
//! BIBLIO__BOOTSTRAP__ADMIN_PASSWORD=admin-password \
//! cargo run
//! cargo test -- --ignored
//! ```

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:8080/api/v1";

async fn login(client: &Client, identifier: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "identifier": identifier, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse login response");
    body["access_token"].as_str().expect("No token in response").to_string()
}

async fn admin_token(client: &Client) -> String {
    login(client, "admin", "admin-password").await
}

/// Register, approve and log in a fresh member. Returns (user id, token).
async fn new_member(client: &Client, admin: &str) -> (String, String) {
    let username = format!("member_{}", &Uuid::new_v4().simple().to_string()[..8]);
    let password = "long-enough-password";

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.org", username),
            "password": password
        }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(response.status(), StatusCode::CREATED);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["is_active"], false);
    assert_eq!(user["role"], "MEMBER");
    let id = user["id"].as_str().unwrap().to_string();

    // Not approved yet
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "identifier": username, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .post(format!("{}/users/{}/approve", BASE_URL, id))
        .bearer_auth(admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let token = login(client, &username, password).await;
    (id, token)
}

async fn create_book(client: &Client, admin: &str, copies: i32) -> Value {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(admin)
        .json(&json!({
            "title": format!("The Left Hand of Darkness {}", Uuid::new_v4()),
            "author": "Ursula K. Le Guin",
            "genre": "Science Fiction",
            "total_copies": copies
        }))
        .send()
        .await
        .expect("Failed to create book");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

async fn post(client: &Client, token: &str, path: String) -> (StatusCode, Value) {
    let response = client
        .post(format!("{}{}", BASE_URL, path))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    (status, response.json().await.unwrap_or(Value::Null))
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_and_readiness() {
    let client = Client::new();

    for (path, status) in [("health", "healthy"), ("ready", "ready")] {
        let response = client
            .get(format!("{}/{}", BASE_URL, path))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], status);
    }
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "identifier": "admin", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_borrow_lifecycle_moves_the_counter() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, member) = new_member(&client, &admin).await;

    let book = create_book(&client, &admin, 2).await;
    assert_eq!(book["available_copies"], 2);
    let book_id = book["id"].as_str().unwrap();

    let response = client
        .post(format!("{}/borrows", BASE_URL))
        .bearer_auth(&member)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let record: Value = response.json().await.unwrap();
    assert_eq!(record["status"], "PENDING");
    assert!(record["borrow_date"].is_null());
    let borrow_id = record["id"].as_str().unwrap();

    // One active request per user and book
    let response = client
        .post(format!("{}/borrows", BASE_URL))
        .bearer_auth(&member)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let (status, outcome) = post(&client, &admin, format!("/borrows/{}/approve", borrow_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["record"]["status"], "APPROVED");
    assert!(outcome["record"]["borrow_date"].is_string());
    assert_eq!(outcome["available_copies"], 1);

    // Approving twice is a transition error, not a second decrement
    let (status, body) = post(&client, &admin, format!("/borrows/{}/approve", borrow_id)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "InvalidTransition");

    let (status, outcome) = post(&client, &member, format!("/borrows/{}/return", borrow_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["record"]["status"], "RETURNED");
    assert_eq!(outcome["available_copies"], 2);
    assert!(outcome["fine"].is_null());

    let (status, _) = post(&client, &member, format!("/borrows/{}/return", borrow_id)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let response = client
        .get(format!("{}/borrows/history?book_id={}", BASE_URL, book_id))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();
    let history: Value = response.json().await.unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_last_copy_cannot_be_approved_twice() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, first) = new_member(&client, &admin).await;
    let (_, second) = new_member(&client, &admin).await;

    let book = create_book(&client, &admin, 1).await;
    let book_id = book["id"].as_str().unwrap();

    let mut requests = Vec::new();
    for member in [&first, &second] {
        let response = client
            .post(format!("{}/borrows", BASE_URL))
            .bearer_auth(member)
            .json(&json!({ "book_id": book_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let record: Value = response.json().await.unwrap();
        requests.push(record["id"].as_str().unwrap().to_string());
    }

    // Both decisions race for the single copy
    let (first_result, second_result) = tokio::join!(
        post(&client, &admin, format!("/borrows/{}/approve", requests[0])),
        post(&client, &admin, format!("/borrows/{}/approve", requests[1]))
    );
    let results = [first_result, second_result];

    assert_eq!(results.iter().filter(|(status, _)| *status == StatusCode::OK).count(), 1);
    let loser = results
        .iter()
        .position(|(status, body)| {
            *status == StatusCode::UNPROCESSABLE_ENTITY && body["error"] == "NoAvailableCopies"
        })
        .expect("one approval should find no copy left");

    // The failed approval left the request pending, so it can still be rejected
    let (status, outcome) = post(&client, &admin, format!("/borrows/{}/reject", requests[loser])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["record"]["status"], "REJECTED");
    assert_eq!(outcome["available_copies"], 0);
}

#[tokio::test]
#[ignore]
async fn test_members_only_touch_their_own_loans() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, owner) = new_member(&client, &admin).await;
    let (_, other) = new_member(&client, &admin).await;

    let book = create_book(&client, &admin, 1).await;
    let response = client
        .post(format!("{}/borrows", BASE_URL))
        .bearer_auth(&owner)
        .json(&json!({ "book_id": book["id"] }))
        .send()
        .await
        .unwrap();
    let record: Value = response.json().await.unwrap();
    let borrow_id = record["id"].as_str().unwrap();

    post(&client, &admin, format!("/borrows/{}/approve", borrow_id)).await;

    let (status, _) = post(&client, &other, format!("/borrows/{}/return", borrow_id)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let response = client
        .get(format!("{}/borrows/{}", BASE_URL, borrow_id))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Admins may return on a member's behalf
    let (status, outcome) = post(&client, &admin, format!("/borrows/{}/return", borrow_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["available_copies"], 1);
}

#[tokio::test]
#[ignore]
async fn test_book_cannot_shrink_below_lent_copies() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, member) = new_member(&client, &admin).await;

    let book = create_book(&client, &admin, 2).await;
    let book_id = book["id"].as_str().unwrap();

    let response = client
        .post(format!("{}/borrows", BASE_URL))
        .bearer_auth(&member)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .unwrap();
    let record: Value = response.json().await.unwrap();
    post(&client, &admin, format!("/borrows/{}/approve", record["id"].as_str().unwrap())).await;

    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&admin)
        .json(&json!({ "total_copies": 5 }))
        .send()
        .await
        .unwrap();
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["total_copies"], 5);
    assert_eq!(updated["available_copies"], 4);

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore]
async fn test_list_books_with_filters() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    create_book(&client, &admin, 1).await;

    let response = client
        .get(format!("{}/books?author=le%20guin&available=true&per_page=5", BASE_URL))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body["items"].is_array());
    assert!(body["total"].as_i64().unwrap() >= 1);
    assert_eq!(body["per_page"], 5);
}

#[tokio::test]
#[ignore]
async fn test_fine_listing_is_scoped_to_caller() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, member) = new_member(&client, &admin).await;

    // A fresh member has no fines
    let response = client
        .get(format!("{}/fines?status=PENDING", BASE_URL))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fines: Value = response.json().await.unwrap();
    assert!(fines.as_array().unwrap().is_empty());

    let response = client
        .get(format!("{}/fines/all", BASE_URL))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let (status, _) = post(&client, &member, format!("/fines/{}/pay", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_demoted_admin_token_is_refused() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let username = format!("deputy_{}", &Uuid::new_v4().simple().to_string()[..8]);
    let password = "long-enough-password";
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.org", username),
            "password": password
        }))
        .send()
        .await
        .unwrap();
    let user: Value = response.json().await.unwrap();
    let id = user["id"].as_str().unwrap();
    post(&client, &admin, format!("/users/{}/approve", id)).await;

    let set_role = |role: &'static str| {
        client
            .put(format!("{}/users/{}/role", BASE_URL, id))
            .bearer_auth(&admin)
            .json(&json!({ "role": role }))
            .send()
    };

    assert_eq!(set_role("ADMIN").await.unwrap().status(), StatusCode::OK);
    let deputy = login(&client, &username, password).await;

    let pending = || {
        client
            .get(format!("{}/borrows/pending", BASE_URL))
            .bearer_auth(&deputy)
            .send()
    };
    assert_eq!(pending().await.unwrap().status(), StatusCode::OK);

    assert_eq!(set_role("MEMBER").await.unwrap().status(), StatusCode::OK);

    // The token still carries the ADMIN role; the account no longer does
    assert_eq!(pending().await.unwrap().status(), StatusCode::FORBIDDEN);
}
