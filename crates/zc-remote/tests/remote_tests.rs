//! Remote resource integration tests
//!
//! A single MockServer plays both the gateway (route table at `/`) and the
//! remote services the routes point to.

use std::sync::Arc;

use jsonwebtoken::Algorithm;
use serde_json::json;
use wiremock::matchers::{header, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zc_auth::{ServiceTokenIssuer, TokenVerifier};
use zc_common::RemoteResource;
use zc_config::HttpClientConfig;
use zc_remote::{
    build_http_client, Method, PathParams, RemoteError, RemoteResources, RouteResolver,
    ServiceClient, Wrapped,
};

const SECRET: &[u8] = b"integration-secret";

async fn mount_gateway(server: &MockServer) {
    let domain = server.uri();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "/users{/id}": {"domain": domain, "resource_type": "User"},
            "/articles{/id}": {"domain": domain, "resource_type": "Article"},
            "/events": {"domain": domain, "resource_type": "UserEvent"}
        })))
        .mount(server)
        .await;
}

fn remote(server: &MockServer) -> RemoteResources {
    let http = build_http_client(&HttpClientConfig::default()).unwrap();
    let issuer = ServiceTokenIssuer::new(SECRET, Algorithm::HS256).unwrap();
    let resolver = RouteResolver::gateway(http.clone(), format!("{}/", server.uri()));
    let client = ServiceClient::new(http, Arc::new(issuer));
    RemoteResources::new(Arc::new(resolver), Arc::new(client))
}

fn user_document() -> serde_json::Value {
    json!({
        "data": {
            "type": "User",
            "id": "1",
            "attributes": {"firstName": "Ada", "lastName": "Lovelace"}
        }
    })
}

#[tokio::test]
async fn test_get_resource_sends_signed_request() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .and(header_regex("Authorization", "^JWT .+"))
        .and(header("Content-Type", "application/vnd.api+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_document()))
        .expect(1)
        .mount(&server)
        .await;

    let remote = remote(&server);
    let wrapped = remote
        .get_resource("orders", "User", &PathParams::id(1), None, None)
        .await
        .unwrap();

    let user = wrapped.as_single().unwrap();
    assert_eq!(user.resource_type(), "User");
    assert_eq!(user.id(), "1");
    assert_eq!(user.attr_str("first_name"), Some("Ada"));
}

#[tokio::test]
async fn test_service_token_identifies_caller() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_document()))
        .mount(&server)
        .await;

    remote(&server)
        .get_resource("orders", "User", &PathParams::id(1), None, None)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let call = requests
        .iter()
        .find(|request| request.url.path() == "/users/1")
        .unwrap();
    let header = call.headers.get("Authorization").unwrap().to_str().unwrap();

    let verifier = TokenVerifier::new(SECRET, Algorithm::HS256, "JWT").unwrap();
    let caller = verifier.authenticate(Some(header)).unwrap().unwrap();
    assert_eq!(caller.service_name.as_deref(), Some("orders"));
    assert!(caller.is_service());
}

#[tokio::test]
async fn test_gateway_is_called_without_credentials() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_document()))
        .mount(&server)
        .await;

    remote(&server)
        .get_resource("orders", "User", &PathParams::id(1), None, None)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let gateway_call = requests.iter().find(|request| request.url.path() == "/").unwrap();
    assert!(gateway_call.headers.get("Authorization").is_none());
}

#[tokio::test]
async fn test_include_and_page_size_are_forwarded() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;

    Mock::given(method("GET"))
        .and(path("/articles"))
        .and(query_param("include", "author"))
        .and(query_param("page_size", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"type": "Article", "id": "1", "attributes": {"title": "Omakase"},
                 "relationships": {"author": {"data": {"type": "People", "id": "9"}}}},
                {"type": "Article", "id": "2", "attributes": {"title": "Kaiseki"},
                 "relationships": {"author": {"data": {"type": "People", "id": "9"}}}}
            ],
            "included": [
                {"type": "People", "id": "9", "attributes": {"name": "Dan Gebhardt"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let wrapped = remote(&server)
        .get_resource("orders", "Article", &PathParams::new(), Some("author"), Some(25))
        .await
        .unwrap();

    let articles = wrapped.as_collection().unwrap();
    assert_eq!(articles.len(), 2);
    for article in articles {
        assert_eq!(article.one("author").unwrap().attr_str("name"), Some("Dan Gebhardt"));
    }
}

#[tokio::test]
async fn test_id_list_becomes_filter() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("filter[id__in]", "1,2,3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let wrapped = remote(&server)
        .get_resource("orders", "User", &PathParams::id(vec![1, 2, 3]), None, None)
        .await
        .unwrap();

    assert_eq!(wrapped, Wrapped::Collection(Vec::new()));
}

#[tokio::test]
async fn test_not_found_surfaces_service_request_error() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;

    Mock::given(method("GET"))
        .and(path("/users/404"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"errors":[{"status":"404"}]}"#))
        .mount(&server)
        .await;

    let err = remote(&server)
        .get_resource("orders", "User", &PathParams::id(404), None, None)
        .await
        .unwrap_err();

    let failure = err.service_request().expect("service request error");
    assert_eq!(failure.status_code(), 404);
    assert_eq!(failure.url, format!("{}/users/404", server.uri()));
    assert_eq!(failure.method, Method::GET);
    assert_eq!(failure.reason, "Not Found");
    assert!(failure.body.contains("errors"));
    assert!(failure.is_client_error());
}

#[tokio::test]
async fn test_server_error_is_classified() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = remote(&server)
        .get_resource("orders", "User", &PathParams::id(1), None, None)
        .await
        .unwrap_err();

    assert!(err.is_request_failure());
    assert!(err.service_request().unwrap().is_server_error());
}

#[tokio::test]
async fn test_missing_data_is_remote_resource_error() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"meta": {"count": 0}})))
        .mount(&server)
        .await;

    let err = remote(&server)
        .get_resource("orders", "User", &PathParams::id(1), None, None)
        .await
        .unwrap_err();

    match err {
        RemoteError::RemoteResource { url, content } => {
            assert_eq!(url, format!("{}/users/1", server.uri()));
            assert!(content.contains("count"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_resource_type() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;

    let err = remote(&server)
        .get_resource("orders", "Movie", &PathParams::id(1), None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteError::RouteNotFound(_)));
}

#[tokio::test]
async fn test_gateway_failure_propagates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = remote(&server)
        .get_resource("orders", "User", &PathParams::id(1), None, None)
        .await
        .unwrap_err();

    assert_eq!(err.service_request().unwrap().status_code(), 502);
}

#[tokio::test]
async fn test_get_resource_from_url() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/1/company"))
        .and(header_regex("Authorization", "^JWT .+"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"type": "Company", "id": "4", "attributes": {"name": "ZeroCater"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let wrapped = remote(&server)
        .get_resource_from_url("orders", &format!("{}/users/1/company", server.uri()))
        .await
        .unwrap();

    assert_eq!(wrapped.as_single().unwrap().attr_str("name"), Some("ZeroCater"));
}

#[tokio::test]
async fn test_get_reference() {
    let server = MockServer::start().await;
    mount_gateway(&server).await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_document()))
        .expect(1)
        .mount(&server)
        .await;

    let remote = remote(&server);
    let wrapped = remote
        .get_reference("orders", &RemoteResource::new("User", 1), None)
        .await
        .unwrap();
    assert_eq!(wrapped.as_single().unwrap().id(), "1");

    let err = remote
        .get_reference("orders", &RemoteResource::empty(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::InvalidReference(_)));
}

#[tokio::test]
async fn test_unsupported_method_is_rejected_before_dispatch() {
    let server = MockServer::start().await;

    let remote = remote(&server);
    let err = remote
        .client()
        .request("orders", &format!("{}/users/1", server.uri()), Method::DELETE, None)
        .await
        .unwrap_err();

    match err {
        RemoteError::UnsupportedMethod { method, service_name, .. } => {
            assert_eq!(method, Method::DELETE);
            assert_eq!(service_name, "orders");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_patch_sends_body() {
    let server = MockServer::start().await;
    let body = json!({"data": {"type": "User", "id": "1", "attributes": {"firstName": "Grace"}}});

    Mock::given(method("PATCH"))
        .and(path("/users/1"))
        .and(wiremock::matchers::body_json(&body))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let response = remote(&server)
        .client()
        .request("orders", &format!("{}/users/1", server.uri()), Method::PATCH, Some(&body))
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 200);
    let echoed: serde_json::Value = response.json().unwrap();
    assert_eq!(echoed, body);
}

#[tokio::test]
async fn test_route_table_cache_avoids_refetch() {
    let server = MockServer::start().await;
    let domain = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "/users{/id}": {"domain": domain, "resource_type": "User"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let http = build_http_client(&HttpClientConfig::default()).unwrap();
    let resolver = RouteResolver::gateway(http, format!("{}/", server.uri()))
        .with_cache_ttl(Some(std::time::Duration::from_secs(60)));

    let first = resolver.resolve("User", &PathParams::id(1), &[]).await.unwrap();
    let second = resolver.resolve("User", &PathParams::id(2), &[]).await.unwrap();

    assert_eq!(first, format!("{}/users/1", server.uri()));
    assert_eq!(second, format!("{}/users/2", server.uri()));
}
