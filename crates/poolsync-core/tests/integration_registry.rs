#![allow(unused_crate_dependencies)]
#![allow(clippy::tests_outside_test_module, reason = "integration tests live in tests/ dir")]
#![allow(clippy::expect_used, reason = "integration test — panics are the assertion mechanism")]

use poolsync_core::{NacosRegistryClient, RegistryClient};
use poolsync_types::models::RegistryConfig;
use poolsync_types::{MemberSpec, RegistryError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SERVICE_LIST: &str = "/nacos/v1/ns/service/list";
const INSTANCE_LIST: &str = "/nacos/v1/ns/instance/list";

fn client(base_url: &str, page_size: u32) -> NacosRegistryClient {
    NacosRegistryClient::new(&RegistryConfig {
        base_url: base_url.to_string(),
        page_size,
        ..RegistryConfig::default()
    })
    .expect("client")
}

#[tokio::test]
async fn test_service_names_are_paged() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SERVICE_LIST))
        .and(query_param("pageNo", "1"))
        .and(query_param("pageSize", "2"))
        .and(query_param("namespaceId", "public"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "count": 3, "doms": ["orders", "billing"] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(SERVICE_LIST))
        .and(query_param("pageNo", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "count": 3, "doms": ["search"] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let names = client(&server.uri(), 2).list_service_names().await.expect("listing");

    assert_eq!(names, vec!["orders", "billing", "search"]);
}

#[tokio::test]
async fn test_registry_failure_is_explicit() {
    let server = MockServer::start().await;

    {
        let _guard = Mock::given(method("GET"))
            .and(path(SERVICE_LIST))
            .respond_with(ResponseTemplate::new(503).set_body_string("server is starting"))
            .mount_as_scoped(&server)
            .await;

        let err = client(&server.uri(), 10).list_service_names().await.expect_err("503");
        assert_eq!(
            err,
            RegistryError::Status { status: 503, message: "server is starting".to_string() }
        );
    }

    {
        let _guard = Mock::given(method("GET"))
            .and(path(SERVICE_LIST))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount_as_scoped(&server)
            .await;

        let err = client(&server.uri(), 10).list_service_names().await.expect_err("garbage");
        assert!(matches!(err, RegistryError::Decode { .. }));
    }

    let err = client("http://127.0.0.1:1", 10).list_service_names().await.expect_err("closed port");
    assert!(matches!(err, RegistryError::Transport { .. }));
}

#[tokio::test]
async fn test_instances_filtered_to_usable_hosts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(INSTANCE_LIST))
        .and(query_param("serviceName", "orders"))
        .and(query_param("namespaceId", "public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "DEFAULT_GROUP@@orders",
            "hosts": [
                {"ip": "10.0.3.1", "port": 8080, "healthy": true, "enabled": true, "weight": 1.0},
                {"ip": "10.0.3.2", "port": 8080, "healthy": false, "enabled": true},
                {"ip": "10.0.3.3", "port": 8080, "healthy": true, "enabled": false}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let members = client(&server.uri(), 10).list_service_instances("orders").await.expect("instances");

    assert_eq!(members, vec![MemberSpec::new("10.0.3.1", 8080)]);
}

#[tokio::test]
async fn test_blank_service_name_skips_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(INSTANCE_LIST))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let members = client(&server.uri(), 10).list_service_instances("  ").await.expect("no call");
    assert!(members.is_empty());
}
