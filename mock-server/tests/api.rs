use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, VALUE_CONTENT_TYPE};
use tower::{Service, ServiceExt};

const AUTH: &str = "Basic dGVzdDp0ZXN0";

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, AUTH)
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, AUTH)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn value_request(method: &str, uri: &str, content_type: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, AUTH)
        .header(http::header::CONTENT_TYPE, content_type)
        .body(body.to_string())
        .unwrap()
}

// --- users ---

#[tokio::test]
async fn anonymous_user_lookup() {
    let resp = app()
        .oneshot(Request::builder().uri("/users/test").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let user = body_json(resp).await;
    assert_eq!(user["name"], "test");
    assert!(user["id"].is_string());
}

#[tokio::test]
async fn bad_password_is_unauthorized() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/users/test")
                .header(http::header::AUTHORIZATION, "Basic dGVzdDpiYWQ=")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_user_not_found() {
    let resp = app().oneshot(request("GET", "/users/nobody")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn origin_is_echoed() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/users/test")
                .header(http::header::ORIGIN, "http://foo.com")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[http::header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://foo.com"
    );
}

// --- namespaces ---

#[tokio::test]
async fn anonymous_namespace_create_is_unauthorized() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/namespaces/test")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(r#"{"name":"x","description":"will fail"}"#.to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn writing_another_users_namespace_is_unauthorized() {
    let resp = app()
        .oneshot(json_request("POST", "/namespaces/fluiddb", r#"{"name":"x"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn namespace_lifecycle() {
    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/namespaces/test",
            r#"{"name":"ns","description":"a test namespace"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    assert_eq!(created["URI"], "/namespaces/test/ns");

    // duplicate
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/namespaces/test", r#"{"name":"ns"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", "/namespaces/test/ns?returnDescription=True"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched = body_json(resp).await;
    assert_eq!(fetched["id"], created["id"]);
    assert_eq!(fetched["description"], "a test namespace");

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", "/namespaces/test?returnNamespaces=true"))
        .await
        .unwrap();
    let parent = body_json(resp).await;
    assert_eq!(parent["namespaceNames"], serde_json::json!(["ns"]));
    assert!(parent.get("description").is_none());

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("DELETE", "/namespaces/test/ns"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", "/namespaces/test/ns"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- tags and values ---

#[tokio::test]
async fn tag_value_lifecycle() {
    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/tags/test",
            r#"{"name":"rating","description":"a test tag","indexed":false}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let tag = body_json(resp).await;
    let object = tag["id"].as_str().unwrap().to_string();
    let path = format!("/objects/{object}/test/rating");

    // primitive
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(value_request("PUT", &path, VALUE_CONTENT_TYPE, "1.5"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", &path))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], VALUE_CONTENT_TYPE);
    assert_eq!(body_bytes(resp).await, "1.5");

    // a mapping is not a primitive value
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(value_request("PUT", &path, VALUE_CONTENT_TYPE, r#"{"a":1}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // opaque
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(value_request("PUT", &path, "text/html", "<h1>Hi</h1>"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("HEAD", &path))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "text/html");
    assert!(body_bytes(resp).await.is_empty());

    // delete the tag, and its values with it
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("DELETE", "/tags/test/rating"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", &path))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn value_for_unknown_tag_is_not_found() {
    let resp = app()
        .oneshot(value_request(
            "PUT",
            "/about/foo/test/missing",
            VALUE_CONTENT_TYPE,
            "1",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_object_id_returns_400() {
    let resp = app()
        .oneshot(request("GET", "/objects/not-a-uuid/test/tag"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn about_values_and_query() {
    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/tags/test", r#"{"name":"colour"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(value_request(
            "PUT",
            "/about/an%2F-%20object/test/colour",
            VALUE_CONTENT_TYPE,
            r#""blue""#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", "/about/an%2F-%20object"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let object = body_json(resp).await;
    let id = object["id"].as_str().unwrap().to_string();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request(
            "GET",
            "/values?query=has+test%2Fcolour&tag=fluiddb%2Fabout&tag=test%2Fcolour",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let values = body_json(resp).await;
    let entry = &values["results"]["id"][id.as_str()];
    assert_eq!(entry["test/colour"]["value"], "blue");
    assert_eq!(entry["fluiddb/about"]["value"], "an/- object");
}
