//! Order listing and status modification over the plain HTTP surface.

use anyhow::Result;
use chrono::{TimeZone, Utc};

use platen_client::backend::{BackendClient, BackendError};
use platen_client::{EnvelopeBuilder, TransferSession};
use platen_core::order::{Material, ModifyOrderRequest, OrderStatus, Process};

use crate::{payload_of, spawn_daemon, TestDaemon};

async fn place_order(daemon: &TestDaemon, name: &str) -> Result<()> {
    let metadata = EnvelopeBuilder::new()
        .submitter(name, &format!("{}@example.org", name.to_lowercase()))
        .copies("1")
        .file(&format!("{}.stl", name.to_lowercase()), 4_096)
        .material(Material::PLA)
        .process(Process::Standard)
        .build()?;
    let session = TransferSession::new(daemon.ws_url());
    session.submit(metadata, payload_of(4_096)).await?;
    Ok(())
}

#[tokio::test]
async fn modify_updates_only_the_matching_order() -> Result<()> {
    let daemon = spawn_daemon().await?;
    place_order(&daemon, "Ada").await?;
    place_order(&daemon, "Grace").await?;

    let client = BackendClient::new(daemon.base_url.clone());
    let before = client.orders().await?;
    assert_eq!(before.len(), 2);
    let target = before
        .iter()
        .find(|o| o.submitter_name == "Ada")
        .expect("Ada's order should be listed");

    client
        .modify_order(&ModifyOrderRequest {
            datetime: target.created_at,
            new_status: OrderStatus::InProgress,
        })
        .await?;

    let after = client.orders().await?;
    let ada = after.iter().find(|o| o.submitter_name == "Ada").unwrap();
    let grace = after.iter().find(|o| o.submitter_name == "Grace").unwrap();

    // Only the status field of the addressed order changed.
    assert_eq!(ada.status, OrderStatus::InProgress);
    assert_eq!(ada.computed_price, target.computed_price);
    assert_eq!(ada.created_at, target.created_at);
    assert_eq!(grace.status, OrderStatus::New);
    Ok(())
}

#[tokio::test]
async fn orders_can_walk_the_whole_lifecycle() -> Result<()> {
    let daemon = spawn_daemon().await?;
    place_order(&daemon, "Ada").await?;

    let client = BackendClient::new(daemon.base_url.clone());
    let created_at = client.orders().await?[0].created_at;

    for status in [
        OrderStatus::InProgress,
        OrderStatus::Completed,
        OrderStatus::Canceled,
    ] {
        client
            .modify_order(&ModifyOrderRequest {
                datetime: created_at,
                new_status: status,
            })
            .await?;
        assert_eq!(client.orders().await?[0].status, status);
    }

    // Orders are never deleted, only re-labeled.
    assert_eq!(client.orders().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn modify_of_unknown_datetime_is_rejected() -> Result<()> {
    let daemon = spawn_daemon().await?;
    let client = BackendClient::new(daemon.base_url.clone());

    let ghost = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    match client
        .modify_order(&ModifyOrderRequest {
            datetime: ghost,
            new_status: OrderStatus::Canceled,
        })
        .await
    {
        Err(BackendError::NoSuchOrder(_)) => Ok(()),
        other => panic!("expected NoSuchOrder, got {other:?}"),
    }
}
