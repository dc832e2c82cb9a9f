use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use lavka::config::{Config, SecurityConfig};
use lavka::db::{NewUser, Store};
use lavka::models::product::{NewProduct, PriceSuffix, ProductChanges, ProductStatus};
use lavka::state::SharedState;
use std::sync::Arc;
use tower::ServiceExt;

async fn spawn_app() -> (Router, Store) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.auth.jwt_secret = "integration-test-secret".to_string();

    let shared = Arc::new(
        SharedState::new(config)
            .await
            .expect("Failed to create shared state"),
    );
    let store = shared.store.clone();
    let state = lavka::api::create_app_state(shared).await;
    (lavka::api::router(state).await, store)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn seed_author(store: &Store) -> i32 {
    let user = store
        .create_user(
            NewUser {
                username: "catalog-author".to_string(),
                email: "author@example.com".to_string(),
                password: "correct horse".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                phone: "+79990000000".to_string(),
            },
            &SecurityConfig::default(),
        )
        .await
        .unwrap();
    user.id
}

async fn seed_active_product(
    store: &Store,
    author: i32,
    name: &str,
    price: i32,
    category: i32,
    city: Option<i32>,
) -> i32 {
    let product = store
        .create_product(
            author,
            NewProduct {
                name: name.to_string(),
                description: String::new(),
                price,
                price_suffix: PriceSuffix::None,
                is_lower_bound: false,
                category_id: category,
                city_id: city,
            },
            vec![],
        )
        .await
        .unwrap();

    store
        .update_product(
            product.id,
            ProductChanges {
                status: Some(ProductStatus::Active),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    product.id
}

fn node_values(nodes: &serde_json::Value) -> Vec<i64> {
    nodes
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["value"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_category_tree_resolution() {
    let (app, store) = spawn_app().await;

    // A has children B and C; B has child D; E is a second root
    let a = store.create_category("A", None, "default_image.png").await.unwrap();
    let b = store.create_category("B", Some(a.id), "default_image.png").await.unwrap();
    let c = store.create_category("C", Some(a.id), "default_image.png").await.unwrap();
    let d = store.create_category("D", Some(b.id), "default_image.png").await.unwrap();
    let e = store.create_category("E", None, "default_image.png").await.unwrap();

    // No id: the roots, children embedded
    let (status, body) = get_json(&app, "/category/tree").await;
    assert_eq!(status, StatusCode::OK);
    let roots = node_values(&body["data"]);
    assert_eq!(roots, vec![i64::from(a.id), i64::from(e.id)]);

    let a_node = &body["data"][0];
    let a_children = node_values(&a_node["children"]);
    assert_eq!(a_children, vec![i64::from(b.id), i64::from(c.id)]);
    let b_node = &a_node["children"][0];
    assert_eq!(node_values(&b_node["children"]), vec![i64::from(d.id)]);

    // Rooted at A: {A, B, C, D} exactly once each, queried category last
    let (status, body) = get_json(&app, &format!("/category/tree?category={}", a.id)).await;
    assert_eq!(status, StatusCode::OK);
    let values = node_values(&body["data"]);
    assert_eq!(values.len(), 4);
    let mut sorted = values.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), 4);
    for id in [a.id, b.id, c.id, d.id] {
        assert!(values.contains(&i64::from(id)));
    }
    assert_eq!(*values.last().unwrap(), i64::from(a.id));

    // Rooted at a leaf
    let (status, body) = get_json(&app, &format!("/category/tree?category={}", d.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(node_values(&body["data"]), vec![i64::from(d.id)]);

    // Unknown id is a 404, not an empty list
    let (status, _body) = get_json(&app, "/category/tree?category=9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_category_list_and_images() {
    let (app, store) = spawn_app().await;

    let a = store.create_category("Furniture", None, "default_image.png").await.unwrap();
    let _child = store
        .create_category("Chairs", Some(a.id), "default_image.png")
        .await
        .unwrap();
    store
        .add_category_image(a.id, "images/2026/01/01/furniture.jpg", "cover")
        .await
        .unwrap();

    // Only roots are listed
    let (status, body) = get_json(&app, "/category").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Furniture");
    assert_eq!(rows[0]["image"], "/media/default_image.png");

    // The tree carries the image list per node
    let (_status, body) = get_json(&app, "/category/tree").await;
    let images = body["data"][0]["image"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["img"], "/media/images/2026/01/01/furniture.jpg");
}

#[tokio::test]
async fn test_city_list() {
    let (app, store) = spawn_app().await;

    store.create_city("Kazan").await.unwrap();
    store.create_city("Samara").await.unwrap();

    let (status, body) = get_json(&app, "/city").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Kazan", "Samara"]);
}

#[tokio::test]
async fn test_search_filters_and_price_hints() {
    let (app, store) = spawn_app().await;

    let author = seed_author(&store).await;
    let tools = store.create_category("Tools", None, "default_image.png").await.unwrap();
    let drills = store
        .create_category("Drills", Some(tools.id), "default_image.png")
        .await
        .unwrap();
    let kazan = store.create_city("Kazan").await.unwrap();
    let samara = store.create_city("Samara").await.unwrap();

    let p1 = seed_active_product(&store, author, "Hammer", 100, tools.id, Some(kazan.id)).await;
    let p2 = seed_active_product(&store, author, "Drill", 500, drills.id, Some(samara.id)).await;

    // A product still on moderation never shows up in search
    store
        .create_product(
            author,
            NewProduct {
                name: "Hidden".to_string(),
                description: String::new(),
                price: 300,
                price_suffix: PriceSuffix::None,
                is_lower_bound: false,
                category_id: tools.id,
                city_id: None,
            },
            vec![],
        )
        .await
        .unwrap();

    // No filters: both, with the shared aggregate range
    let (status, body) = get_json(&app, "/search/").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(row["min_price"], 100);
        assert_eq!(row["max_price"], 500);
    }

    // Price range collapses the result and the hints
    let (status, body) = get_json(&app, "/search/?minRange=200&maxRange=1000").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], i64::from(p2));
    assert_eq!(rows[0]["min_price"], 500);
    assert_eq!(rows[0]["max_price"], 500);

    // A single bound applies no price filter
    let (_status, body) = get_json(&app, "/search/?minRange=200").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    // Name filter is a case-insensitive substring match
    let (_status, body) = get_json(&app, "/search/?name=hAmM").await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], i64::from(p1));

    // Category filter includes the whole subtree
    let (_status, body) = get_json(&app, &format!("/search/?category={}", tools.id)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_status, body) = get_json(&app, &format!("/search/?category={}", drills.id)).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], i64::from(p2));

    // City filter
    let (_status, body) = get_json(&app, &format!("/search/?city={}", kazan.id)).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], i64::from(p1));

    // Conjunction of filters can be empty
    let (status, body) =
        get_json(&app, &format!("/search/?name=Drill&city={}", kazan.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    // Inverted range is rejected
    let (status, _body) = get_json(&app, "/search/?minRange=500&maxRange=100").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown category matches nothing rather than failing
    let (status, body) = get_json(&app, "/search/?category=9999").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_category_cycle_rejection() {
    let (_app, store) = spawn_app().await;

    let a = store.create_category("A", None, "default_image.png").await.unwrap();
    let b = store.create_category("B", Some(a.id), "default_image.png").await.unwrap();
    let c = store.create_category("C", Some(b.id), "default_image.png").await.unwrap();

    // Moving the root under its own descendant is refused
    assert!(store.set_category_parent(a.id, Some(c.id)).await.is_err());

    // A category cannot become its own parent
    assert!(store.set_category_parent(b.id, Some(b.id)).await.is_err());

    // Legal moves still work
    store.set_category_parent(c.id, Some(a.id)).await.unwrap();
    store.set_category_parent(c.id, None).await.unwrap();

    // A parent that does not exist is refused
    assert!(store.set_category_parent(c.id, Some(9999)).await.is_err());

    // Subtree resolution for an unknown root reports absence
    assert!(store.category_subtree_ids(9999).await.unwrap().is_none());
}
