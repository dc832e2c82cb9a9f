use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use lavka::config::Config;
use lavka::db::Store;
use lavka::state::SharedState;
use std::sync::Arc;
use tower::ServiceExt;

async fn spawn_app() -> (Router, Store) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // In-memory SQLite: a single connection so every query sees the same db
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config.media.media_root = std::env::temp_dir()
        .join(format!("lavka-test-media-{}", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .to_string();

    let shared = Arc::new(
        SharedState::new(config)
            .await
            .expect("Failed to create shared state"),
    );
    let store = shared.store.clone();
    let state = lavka::api::create_app_state(shared).await;
    (lavka::api::router(state).await, store)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn register(app: &Router, username: &str, phone: &str) {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register/",
            None,
            &serde_json::json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "correct horse",
                "phone": phone,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn token_for(app: &Router, username: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/token/",
            None,
            &serde_json::json!({"username": username, "password": "correct horse"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["data"]["access"].as_str().unwrap().to_string()
}

async fn seed_catalog(store: &Store) -> (i32, i32) {
    let category = store
        .create_category("Electronics", None, "default_image.png")
        .await
        .unwrap();
    let city = store.create_city("Kazan").await.unwrap();
    (category.id, city.id)
}

async fn create_product(app: &Router, token: &str, name: &str, price: i32, category: i32, city: i32) -> i64 {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/product",
            Some(token),
            &serde_json::json!({
                "name": name,
                "description": "test listing",
                "price": price,
                "category": category,
                "city": city,
                "features": [{"name": "condition", "value": "new"}],
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_register_token_and_current_user() {
    let (app, _store) = spawn_app().await;

    register(&app, "alice", "+70000000001").await;

    // Wrong password is rejected
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/token/",
            None,
            &serde_json::json!({"username": "alice", "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = token_for(&app, "alice").await;

    // Current user requires the token
    let response = app
        .clone()
        .oneshot(get_request("/api/user/", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get_request("/api/user/", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["phone"], "+70000000001");
    assert!(body["data"]["favorites"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_token_refresh() {
    let (app, _store) = spawn_app().await;

    register(&app, "bob", "+70000000002").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/token/",
            None,
            &serde_json::json!({"username": "bob", "password": "correct horse"}),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    let refresh = body["data"]["refresh"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/token/refresh/",
            None,
            &serde_json::json!({"refresh": refresh}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let access = body["data"]["access"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(get_request("/api/user/", Some(access)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // An access token is not accepted as a refresh token
    let token = token_for(&app, "bob").await;
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/token/refresh/",
            None,
            &serde_json::json!({"refresh": token}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation() {
    let (app, _store) = spawn_app().await;

    register(&app, "carol", "+70000000003").await;

    // Duplicate username
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register/",
            None,
            &serde_json::json!({
                "username": "carol",
                "email": "other@example.com",
                "password": "correct horse",
                "phone": "+70000000099",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Duplicate phone
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register/",
            None,
            &serde_json::json!({
                "username": "carol2",
                "email": "other@example.com",
                "password": "correct horse",
                "phone": "+70000000003",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Short password
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register/",
            None,
            &serde_json::json!({
                "username": "dave",
                "email": "dave@example.com",
                "password": "short",
                "phone": "+70000000004",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_product_crud_and_ownership() {
    let (app, store) = spawn_app().await;
    let (category, city) = seed_catalog(&store).await;

    register(&app, "owner", "+70000000010").await;
    register(&app, "other", "+70000000011").await;
    let owner_token = token_for(&app, "owner").await;
    let other_token = token_for(&app, "other").await;

    // Creation requires authentication
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/product",
            None,
            &serde_json::json!({
                "name": "Drill",
                "description": "barely used",
                "price": 100,
                "category": category,
                "city": city,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let id = create_product(&app, &owner_token, "Drill", 100, category, city).await;
    let uri = format!("/product/{id}/");

    // Anonymous retrieve works
    let response = app.clone().oneshot(get_request(&uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["name"], "Drill");
    assert_eq!(body["data"]["price_suffix"], "rub");
    assert_eq!(body["data"]["city_name"], "Kazan");
    assert_eq!(body["data"]["author"]["username"], "owner");
    assert_eq!(body["data"]["features"][0]["name"], "condition");

    // Authenticated non-author cannot view the listing
    let response = app
        .clone()
        .oneshot(get_request(&uri, Some(&other_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Unauthenticated update is rejected, not silently ignored
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &uri,
            None,
            &serde_json::json!({"price": 200}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Non-author update is rejected and leaves the product unchanged
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &uri,
            Some(&other_token),
            &serde_json::json!({"name": "Hijacked", "price": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.clone().oneshot(get_request(&uri, None)).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["name"], "Drill");
    assert_eq!(body["data"]["price"], 100);

    // Author can patch
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &uri,
            Some(&owner_token),
            &serde_json::json!({"price": 250, "status": "AC"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["price"], 250);

    // Features are replaced wholesale on update
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &uri,
            Some(&owner_token),
            &serde_json::json!({"features": [{"name": "power", "value": "800W"}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let features = body["data"]["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["name"], "power");

    // Full update requires the core fields
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &uri,
            Some(&owner_token),
            &serde_json::json!({"price": 300}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &uri,
            Some(&owner_token),
            &serde_json::json!({
                "name": "Drill Pro",
                "description": "updated",
                "price": 300,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["name"], "Drill Pro");

    // Delete: unauthenticated, then non-author, then author
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(&uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(&uri)
                .header("Authorization", format!("Bearer {other_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(&uri)
                .header("Authorization", format!("Bearer {owner_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.clone().oneshot(get_request(&uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_listing_modes() {
    let (app, store) = spawn_app().await;
    let (category, city) = seed_catalog(&store).await;
    let other_city = store.create_city("Samara").await.unwrap();

    register(&app, "seller", "+70000000020").await;
    let token = token_for(&app, "seller").await;

    let first = create_product(&app, &token, "Lamp", 50, category, city).await;
    let second = create_product(&app, &token, "Sofa", 900, category, other_city.id).await;

    // New products are on moderation: the public listing is empty
    let response = app.clone().oneshot(get_request("/product", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    // Own mode shows them regardless of status
    let response = app
        .clone()
        .oneshot(get_request("/product?own=1", Some(&token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    // Own mode with an explicit status filter
    let response = app
        .clone()
        .oneshot(get_request("/product?own=1&status=AC", Some(&token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    // Activate both and browse publicly
    for id in [first, second] {
        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/product/{id}/"),
                Some(&token),
                &serde_json::json!({"status": "active"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(get_request("/product", None)).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    // City filter narrows the public listing
    let response = app
        .clone()
        .oneshot(get_request(&format!("/product?city={}", other_city.id), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Sofa");

    // Unknown status values are rejected
    let response = app
        .clone()
        .oneshot(get_request("/product?status=bogus", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_listing_window_caps_at_twenty() {
    let (app, store) = spawn_app().await;
    let (category, city) = seed_catalog(&store).await;

    register(&app, "bulk", "+70000000030").await;
    let token = token_for(&app, "bulk").await;

    for i in 0..25 {
        create_product(&app, &token, &format!("Item {i}"), 10 + i, category, city).await;
    }

    let response = app
        .clone()
        .oneshot(get_request("/product?own=1", Some(&token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn test_favorite_toggle_involution() {
    let (app, store) = spawn_app().await;
    let (category, city) = seed_catalog(&store).await;

    register(&app, "seller2", "+70000000040").await;
    register(&app, "buyer", "+70000000041").await;
    let seller_token = token_for(&app, "seller2").await;
    let buyer_token = token_for(&app, "buyer").await;

    let id = create_product(&app, &seller_token, "Bike", 700, category, city).await;
    let uri = format!("/product/{id}/favorite/");

    // Requires authentication
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(&uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Unknown product
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/product/9999/favorite/")
                .header("Authorization", format!("Bearer {buyer_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Toggle alternates true/false and ends where it started
    for expected in [true, false, true] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(&uri)
                    .header("Authorization", format!("Bearer {buyer_token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"], expected);
    }

    // The favorited product shows up in the buyer's profile
    let response = app
        .clone()
        .oneshot(get_request("/api/user/", Some(&buyer_token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    let favorites = body["data"]["favorites"].as_array().unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0]["name"], "Bike");
    assert_eq!(favorites[0]["is_favorite"], true);
}

fn multipart_request(uri: &str, token: &str, files: &[(&str, &[u8])]) -> Request<Body> {
    let boundary = "lavka-test-boundary";
    let mut body: Vec<u8> = Vec::new();
    for (filename, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"{filename}\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_image_upload_and_delete() {
    let (app, store) = spawn_app().await;
    let (category, city) = seed_catalog(&store).await;

    register(&app, "photographer", "+70000000050").await;
    register(&app, "stranger", "+70000000051").await;
    let owner_token = token_for(&app, "photographer").await;
    let stranger_token = token_for(&app, "stranger").await;

    let id = create_product(&app, &owner_token, "Camera", 1500, category, city).await;
    let upload_uri = format!("/product/{id}/image");

    // Non-author cannot upload
    let response = app
        .clone()
        .oneshot(multipart_request(
            &upload_uri,
            &stranger_token,
            &[("a.jpg", b"fake-jpeg-bytes")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Author uploads two images
    let response = app
        .clone()
        .oneshot(multipart_request(
            &upload_uri,
            &owner_token,
            &[("a.jpg", b"fake-jpeg-bytes"), ("b.png", b"fake-png-bytes")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(get_request(&format!("/product/{id}/"), Some(&owner_token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    let images = body["data"]["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    let first_url = images[0]["img"].as_str().unwrap();
    assert!(first_url.starts_with("/media/images/"));
    let image_id = images[0]["id"].as_i64().unwrap();

    // Compound key must match
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/products/9999/images/{image_id}/"))
                .header("Authorization", format!("Bearer {owner_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Non-author cannot delete
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/products/{id}/images/{image_id}/"))
                .header("Authorization", format!("Bearer {stranger_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/products/{id}/images/{image_id}/"))
                .header("Authorization", format!("Bearer {owner_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(get_request(&format!("/product/{id}/"), Some(&owner_token)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["images"].as_array().unwrap().len(), 1);
}
