//! Partition, deactivation, and resynchronization behavior.

use bytes::Bytes;
use phalanx_core::{Command, PhalanxError};
use phalanx_engine::EngineConfig;
use phalanx_testing::{init_test_logging, TestCluster};
use std::time::Duration;
use tokio::time::{sleep, timeout};

#[tokio::test]
async fn minority_partition_does_not_block_the_quorum() -> anyhow::Result<()> {
    init_test_logging();
    let cluster = TestCluster::launch(5, EngineConfig::testing());
    cluster.wait_all_started().await?;

    // Two of five replicas drop off; f = 2, so three remain a quorum.
    cluster.disconnect(3);
    cluster.disconnect(4);

    let results = timeout(
        Duration::from_secs(10),
        cluster.apply(0, vec![Command::new("SET city amsterdam")]),
    )
    .await??;
    assert_eq!(results, vec![Bytes::from("OK")]);

    let read = timeout(
        Duration::from_secs(10),
        cluster.apply(1, vec![Command::new("GET city")]),
    )
    .await??;
    assert_eq!(read, vec![Bytes::from("amsterdam")]);

    cluster.stop_all().await;
    Ok(())
}

#[tokio::test]
async fn a_partitioned_node_goes_dormant_and_rejects_submissions() -> anyhow::Result<()> {
    init_test_logging();
    let cluster = TestCluster::launch(3, EngineConfig::testing());
    cluster.wait_all_started().await?;

    cluster.disconnect(2);
    // Deactivation runs on the node's critical worker; give it a beat.
    sleep(Duration::from_millis(200)).await;

    assert!(!cluster.statistics(2).is_active);
    let err = cluster
        .apply(2, vec![Command::new("SET k v")])
        .await
        .unwrap_err();
    assert!(matches!(err, PhalanxError::NodeInactive));

    cluster.stop_all().await;
    Ok(())
}

#[tokio::test]
async fn a_rejoining_node_resynchronizes_from_its_peers() -> anyhow::Result<()> {
    init_test_logging();
    let cluster = TestCluster::launch(5, EngineConfig::testing());
    cluster.wait_all_started().await?;

    cluster.disconnect(4);
    sleep(Duration::from_millis(200)).await;
    assert!(!cluster.statistics(4).is_active);

    // The remaining quorum keeps committing while node 4 is away.
    timeout(
        Duration::from_secs(10),
        cluster.apply(0, vec![Command::new("SET missed update")]),
    )
    .await??;

    cluster.reconnect(4);
    timeout(Duration::from_secs(10), cluster.nodes[4].engine.wait_started()).await?;

    // The rejoined node serves reads from the restored state once its next
    // submission commits.
    let read = timeout(
        Duration::from_secs(10),
        cluster.apply(4, vec![Command::new("GET missed")]),
    )
    .await??;
    assert_eq!(read, vec![Bytes::from("update")]);

    cluster.stop_all().await;
    Ok(())
}

#[tokio::test]
async fn commits_resume_after_a_full_stop_of_one_node() -> anyhow::Result<()> {
    init_test_logging();
    let cluster = TestCluster::launch(5, EngineConfig::testing());
    cluster.wait_all_started().await?;

    timeout(
        Duration::from_secs(10),
        cluster.apply(1, vec![Command::new("SET a 1")]),
    )
    .await??;

    // Stopping one engine outright must not block the others.
    cluster.nodes[3].engine.stop().await;

    let results = timeout(
        Duration::from_secs(10),
        cluster.apply(2, vec![Command::new("SET b 2")]),
    )
    .await??;
    assert_eq!(results, vec![Bytes::from("OK")]);

    cluster.stop_all().await;
    Ok(())
}
