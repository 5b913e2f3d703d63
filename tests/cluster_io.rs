//! End-to-end tests against real mock services on loopback

use testcluster::common::{blake3_hash, DirectoryService, ServiceMock, ServiceState};
use testcluster::{ClusterConfig, Error, TestCluster};

fn small_stripes() -> ClusterConfig {
    ClusterConfig {
        stripe_size: 8,
        ..Default::default()
    }
}

async fn started(devices: usize) -> TestCluster {
    let mut cluster = TestCluster::with_config(small_stripes());
    cluster.add_storage_devices(devices).unwrap();
    assert!(cluster.start().await);
    cluster
}

#[tokio::test]
async fn test_cluster_lifecycle() {
    let mut cluster = started(3).await;

    let directory = cluster.directory().address().unwrap();
    assert_eq!(cluster.config().service_address, directory);
    assert_eq!(
        cluster.directory().resolve_volume("test"),
        cluster.catalog().address()
    );

    let expected: Vec<String> = cluster
        .storage_devices()
        .iter()
        .map(|d| d.address().unwrap())
        .collect();
    let volume = cluster.open_volume().await.unwrap();
    assert_eq!(volume.name(), "test");
    assert_eq!(volume.storage_devices().await.unwrap(), expected);
    assert!(cluster.client().unwrap().is_running());

    cluster.try_stop().await.unwrap();

    assert!(cluster.client().is_none());
    assert_eq!(cluster.directory().state(), ServiceState::Stopped);
    assert_eq!(cluster.catalog().state(), ServiceState::Stopped);
    for device in cluster.storage_devices() {
        assert_eq!(device.state(), ServiceState::Stopped);
        assert!(device.address().is_none());
    }
}

#[tokio::test]
async fn test_striped_write_and_read() {
    let mut cluster = started(3).await;
    let volume = cluster.open_volume().await.unwrap();
    let mut file = volume.open("/striped.bin", true).await.unwrap();

    let data: Vec<u8> = (0u8..30).collect();
    assert_eq!(file.write(0, &data).await.unwrap(), 30);
    assert_eq!(file.stat().await.unwrap().size, 30);
    assert_eq!(file.read(0, 30).await.unwrap(), data);
    assert_eq!(file.read(5, 10).await.unwrap(), data[5..15].to_vec());

    // 30 bytes / 8-byte stripes = objects 0..=3, round-robin over 3 devices
    let file_id = file.file_id().to_string();
    let counts: Vec<usize> = cluster
        .storage_devices()
        .iter()
        .map(|d| d.objects().object_count(&file_id))
        .collect();
    assert_eq!(counts, vec![2, 1, 1]);

    cluster.stop().await;
}

#[tokio::test]
async fn test_partial_overwrite() {
    let mut cluster = started(2).await;
    let volume = cluster.open_volume().await.unwrap();
    let mut file = volume.open("/overwrite.txt", true).await.unwrap();

    file.write(0, b"aaaaaaaaaaaa").await.unwrap();
    file.write(6, b"bbbb").await.unwrap();

    assert_eq!(file.read(0, 100).await.unwrap(), b"aaaaaabbbbaa");
    assert_eq!(file.record().size, 12);

    cluster.stop().await;
}

#[tokio::test]
async fn test_sparse_file_reads_zeros() {
    let mut cluster = started(3).await;
    let volume = cluster.open_volume().await.unwrap();
    let mut file = volume.open("/sparse", true).await.unwrap();

    file.write(20, b"xyz").await.unwrap();

    let mut expected = vec![0u8; 20];
    expected.extend_from_slice(b"xyz");
    assert_eq!(file.read(0, 64).await.unwrap(), expected);
    assert!(file.read(23, 10).await.unwrap().is_empty());

    cluster.stop().await;
}

#[tokio::test]
async fn test_truncate_drops_tail() {
    let mut cluster = started(3).await;
    let volume = cluster.open_volume().await.unwrap();
    let mut file = volume.open("/shrink", true).await.unwrap();

    let data = b"0123456789abcdefghijklmnopqrst";
    file.write(0, data).await.unwrap();
    file.truncate(10).await.unwrap();

    assert_eq!(file.stat().await.unwrap().size, 10);
    assert_eq!(file.read(0, 100).await.unwrap(), b"0123456789");

    let file_id = file.file_id().to_string();
    let total: usize = cluster
        .storage_devices()
        .iter()
        .map(|d| d.objects().object_count(&file_id))
        .sum();
    assert_eq!(total, 2);

    // Growing again exposes zeros, not the old bytes
    file.truncate(16).await.unwrap();
    let mut expected = b"0123456789".to_vec();
    expected.resize(16, 0);
    assert_eq!(file.read(0, 100).await.unwrap(), expected);

    cluster.stop().await;
}

#[tokio::test]
async fn test_offsets_at_the_end_of_the_address_space() {
    let mut cluster = started(2).await;
    let volume = cluster.open_volume().await.unwrap();
    let mut file = volume.open("/far", true).await.unwrap();

    assert!(matches!(
        file.write(u64::MAX - 2, &[1u8; 8]).await,
        Err(Error::InvalidRange(_))
    ));
    assert_eq!(file.stat().await.unwrap().size, 0);

    // Ending exactly on the last addressable byte is allowed
    assert_eq!(file.write(u64::MAX - 3, b"end").await.unwrap(), 3);
    assert_eq!(file.record().size, u64::MAX);
    assert_eq!(
        file.read(u64::MAX - 5, 100).await.unwrap(),
        vec![0, 0, b'e', b'n', b'd']
    );

    let mut huge = volume.open("/huge", true).await.unwrap();
    huge.truncate(u64::MAX).await.unwrap();
    assert_eq!(huge.read(u64::MAX - 5, 100).await.unwrap(), vec![0u8; 5]);

    cluster.stop().await;
}

#[tokio::test]
async fn test_object_checksum() {
    let mut cluster = started(2).await;
    let volume = cluster.open_volume().await.unwrap();
    let mut file = volume.open("/sum", true).await.unwrap();

    file.write(0, b"abcdefghIJKL").await.unwrap();

    let first = file.object_checksum(0).await.unwrap();
    assert_eq!(first.size, 8);
    assert_eq!(first.checksum, blake3_hash(b"abcdefgh"));
    let second = file.object_checksum(1).await.unwrap();
    assert_eq!(second.checksum, blake3_hash(b"IJKL"));
    assert!(matches!(
        file.object_checksum(2).await,
        Err(Error::ObjectNotFound { .. })
    ));

    cluster.stop().await;
}

#[tokio::test]
async fn test_reopen_sees_same_file() {
    let mut cluster = started(1).await;
    let volume = cluster.open_volume().await.unwrap();

    let mut first = volume.open("/shared", true).await.unwrap();
    first.write(0, b"hello").await.unwrap();

    let mut second = volume.open("/shared", false).await.unwrap();
    assert_eq!(second.file_id(), first.file_id());
    assert_eq!(second.read(0, 5).await.unwrap(), b"hello");

    cluster.stop().await;
}

#[tokio::test]
async fn test_lookup_errors() {
    let mut cluster = started(1).await;
    let volume = cluster.open_volume().await.unwrap();

    assert!(matches!(
        volume.open("/missing", false).await,
        Err(Error::FileNotFound(_))
    ));
    assert!(matches!(
        volume.open("relative", true).await,
        Err(Error::InvalidPath(_))
    ));
    assert!(matches!(
        cluster.client().unwrap().open_volume("nope").await,
        Err(Error::VolumeNotFound(_))
    ));

    cluster.stop().await;
}

#[tokio::test]
async fn test_handles_fail_after_stop() {
    let mut cluster = started(1).await;
    let volume = cluster.open_volume().await.unwrap();

    cluster.stop().await;

    assert!(matches!(
        volume.open("/late", true).await,
        Err(Error::NotRunning(_))
    ));
}

#[tokio::test]
async fn test_service_address_override() {
    let mut primary = started(2).await;

    let config = ClusterConfig {
        service_address: primary.config().service_address.clone(),
        ..small_stripes()
    };
    let mut secondary = TestCluster::with_config(config);
    assert!(secondary.start().await);

    // The secondary's client resolves volumes through the primary's directory
    let volume = secondary.open_volume().await.unwrap();
    assert_eq!(
        Some(volume.catalog_address().to_string()),
        primary.catalog().address()
    );
    assert_ne!(
        secondary.directory().address().unwrap(),
        secondary.config().service_address
    );

    secondary.stop().await;
    primary.stop().await;
}

#[tokio::test]
async fn test_client_start_fails_without_directory() {
    let config = ClusterConfig {
        // Reserved port nothing listens on
        service_address: "127.0.0.1:9".to_string(),
        connect_timeout_ms: 500,
        ..Default::default()
    };
    let mut cluster = TestCluster::with_config(config);

    assert!(matches!(
        cluster.try_start().await,
        Err(Error::ClientStart(_))
    ));
    assert!(cluster.client().is_some());

    cluster.try_stop().await.unwrap();
}
