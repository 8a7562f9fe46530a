use crate::integration::init_tracing;
use crate::utils::{TestClient, TestServer, wait_until};

#[tokio::test]
async fn test_connect_assigns_id() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");

    let first = TestClient::connect(&server.url())
        .await
        .expect("Failed to connect client 1");
    let second = TestClient::connect(&server.url())
        .await
        .expect("Failed to connect client 2");

    assert!(!first.assigned_id.as_str().is_empty());
    assert_ne!(first.assigned_id, second.assigned_id);
    assert!(server.service.registry().is_connected(&first.assigned_id));

    let gone = first.assigned_id.clone();
    first.close().await.expect("Failed to close client 1");

    let registry = server.service.registry();
    assert!(
        wait_until(2000, || !registry.is_connected(&gone)).await,
        "Closed connection should be unregistered"
    );
    assert!(registry.is_connected(&second.assigned_id));
}
