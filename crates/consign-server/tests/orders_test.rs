//! Integration tests for the unary AddOrder and GetOrder RPCs.

mod common;

use common::TestServer;
use consign_server::config::Config;
use consign_server::proto::consign::v1::{Order, OrderId};
use tonic::Code;

fn order_id(value: &str) -> OrderId {
    OrderId {
        value: value.to_string(),
    }
}

#[tokio::test]
async fn test_get_sample_order() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let order = client.get_order(order_id("103")).await.unwrap().into_inner();

    assert_eq!(order.id, "103");
    assert_eq!(order.items, vec!["Apple Watch S4"]);
    assert_eq!(order.destination, "San Jose, CA");
    assert!((order.price - 400.0).abs() < f64::EPSILON);

    server.shutdown().await;
}

#[tokio::test]
async fn test_get_unknown_order() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let status = client.get_order(order_id("101")).await.unwrap_err();
    assert_eq!(status.code(), Code::NotFound);

    server.shutdown().await;
}

#[tokio::test]
async fn test_get_empty_id() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let status = client.get_order(order_id("")).await.unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    server.shutdown().await;
}

#[tokio::test]
async fn test_sample_data_can_be_disabled() {
    let server = TestServer::start_with(Config {
        no_sample_data: true,
        ..Config::default()
    })
    .await;
    let mut client = server.client().await;

    let status = client.get_order(order_id("102")).await.unwrap_err();
    assert_eq!(status.code(), Code::NotFound);

    server.shutdown().await;
}

#[tokio::test]
async fn test_add_then_get() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let order = Order {
        id: String::new(),
        items: vec!["Pixel Watch".into(), "Charger".into()],
        destination: "Sunnyvale, CA".into(),
        price: 349.0,
    };

    let id = client
        .add_order(order.clone())
        .await
        .unwrap()
        .into_inner()
        .value;
    assert!(!id.is_empty());

    let stored = client.get_order(order_id(&id)).await.unwrap().into_inner();
    assert_eq!(stored, Order { id, ..order });

    server.shutdown().await;
}

#[tokio::test]
async fn test_added_order_joins_shipments() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let id = client
        .add_order(Order {
            id: String::new(),
            items: vec!["Google Nest Wifi".into()],
            destination: "Mountain View, CA".into(),
            price: 169.0,
        })
        .await
        .unwrap()
        .into_inner()
        .value;

    let mut session = server.consign_client().await.process_orders().await.unwrap();
    session.send("102").await.unwrap();
    session.send(id.clone()).await.unwrap();
    session.close_send();

    let shipment = session.next_shipment().await.unwrap().unwrap();
    assert_eq!(shipment.id, "cmb - Mountain View, CA");
    assert_eq!(common::order_ids(&shipment), vec!["102", id.as_str()]);
    assert!(session.next_shipment().await.unwrap().is_none());

    server.shutdown().await;
}

#[tokio::test]
async fn test_add_rejects_negative_price() {
    let server = TestServer::start().await;
    let mut client = server.client().await;

    let status = client
        .add_order(Order {
            id: String::new(),
            items: vec!["Refund".into()],
            destination: "San Jose, CA".into(),
            price: -10.0,
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    server.shutdown().await;
}
