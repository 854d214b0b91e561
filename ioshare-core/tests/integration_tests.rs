// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! End-to-end integration tests for ioshare.
//!
//! Every test uses real POSIX objects under names unique to this process,
//! with separate handles standing in for separate participants.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use ioshare_core::shm::Mapping;
use ioshare_core::{
    Capacity, Channel, ChannelMode, ConfigLoader, ExclusiveLock, GuardedRegion, MaxReaders,
    ObjectName, Ownership, ReaderWriterLock, ShareError, ShmError,
};

/// How long a blocked acquisition must stay blocked to count as blocked.
const BLOCKED_FOR: Duration = Duration::from_millis(200);

/// Upper bound for an acquisition that should proceed.
const PROCEEDS_WITHIN: Duration = Duration::from_secs(10);

fn unique(tag: &str) -> String {
    format!("/ioshare-it-{}-{}", tag, std::process::id())
}

fn capacity(bytes: usize) -> Capacity {
    Capacity::new(bytes).unwrap()
}

/// Two handles on one 15-byte region: write under one scope, read back
/// under another.
#[test]
fn test_scenario_shared_hello() {
    let name = unique("r1");
    let mut writer = ExclusiveLock::create_or_attach(&name, capacity(15), Ownership::Owner).unwrap();
    let mut reader =
        ExclusiveLock::create_or_attach(&name, capacity(15), Ownership::Attached).unwrap();

    {
        let mut scope = writer.lock().unwrap();
        assert_eq!(scope.write(b"Hello, World!!!").unwrap(), 15);
    }

    {
        let mut scope = reader.lock().unwrap();
        scope.seek(0).unwrap();
        assert_eq!(scope.read(15).unwrap(), b"Hello, World!!!");
    }

    assert!(matches!(reader.read(15), Err(ShareError::ReadAccess { .. })));
}

/// A producer handle hands a payload to a consumer handle; crossed calls
/// are rejected.
#[test]
fn test_scenario_channel_handoff() {
    let name = unique("handoff");
    let mut producer =
        Channel::create_or_attach(&name, capacity(1024), ChannelMode::Producer, Ownership::Owner)
            .unwrap();
    let mut consumer = Channel::create_or_attach(
        &name,
        capacity(1024),
        ChannelMode::Consumer,
        Ownership::Attached,
    )
    .unwrap();

    let payload: Vec<u8> = (0..=255u8).collect();
    producer.produce(&payload).unwrap();
    assert_eq!(consumer.consume().unwrap(), payload);

    let err = consumer.produce(&payload).unwrap_err();
    assert!(matches!(err, ShareError::ModeViolation { .. }));
    assert!(err.to_string().contains("consumer"));
}

#[test]
fn test_round_trip_sizes() {
    let name = unique("roundtrip");
    let mut shm = ExclusiveLock::create_or_attach(&name, capacity(4096), Ownership::Owner).unwrap();
    let mut scope = shm.lock().unwrap();

    for len in [0usize, 1, 15, 255, 4096] {
        let payload: Vec<u8> = (0..len).map(|i| (i * 7 % 251) as u8).collect();
        scope.seek(0).unwrap();
        scope.write(&payload).unwrap();
        scope.seek(0).unwrap();
        assert_eq!(scope.read(len).unwrap(), payload, "length {}", len);
    }
}

#[test]
fn test_capacity_boundary_preserves_state() {
    let name = unique("boundary");
    let mut shm = ExclusiveLock::create_or_attach(&name, capacity(8), Ownership::Owner).unwrap();
    let mut scope = shm.lock().unwrap();

    scope.write(b"abcd").unwrap();
    assert!(matches!(
        scope.write(b"efghi"),
        Err(ShareError::CapacityExceeded { requested: 5, available: 4, .. })
    ));
    assert_eq!(scope.tell(), 4);

    scope.seek(0).unwrap();
    assert!(matches!(
        scope.write(&[0u8; 9]),
        Err(ShareError::CapacityExceeded { requested: 9, .. })
    ));
    assert_eq!(scope.tell(), 0);
    assert_eq!(scope.read(4).unwrap(), b"abcd");
}

/// Each worker appends a two-byte marker with a yield between the bytes.
/// Under mutual exclusion every marker lands whole and none are lost.
#[test]
fn test_mutual_exclusion_orders_markers() {
    const ROUNDS: usize = 200;
    const HEADER: usize = 8;

    let name = unique("mutex");
    let size = HEADER + 2 * 2 * ROUNDS;
    let mut owner = ExclusiveLock::create_or_attach(&name, capacity(size), Ownership::Owner).unwrap();

    let workers: Vec<_> = [b'A', b'B']
        .into_iter()
        .map(|marker| {
            let name = name.clone();
            thread::spawn(move || {
                let mut shm =
                    ExclusiveLock::create_or_attach(&name, capacity(size), Ownership::Attached)
                        .unwrap();
                for _ in 0..ROUNDS {
                    let mut scope = shm.lock().unwrap();
                    scope.seek(0).unwrap();
                    let count = u64::from_le_bytes(scope.read(HEADER).unwrap().try_into().unwrap());

                    scope.seek(HEADER + 2 * count as usize).unwrap();
                    scope.write_byte(marker).unwrap();
                    thread::yield_now();
                    scope.write_byte(marker).unwrap();

                    scope.seek(0).unwrap();
                    scope.write(&(count + 1).to_le_bytes()).unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let mut scope = owner.lock().unwrap();
    let count = u64::from_le_bytes(scope.read(HEADER).unwrap().try_into().unwrap());
    assert_eq!(count as usize, 2 * ROUNDS);

    let log = scope.read(4 * ROUNDS).unwrap();
    for pair in log.chunks(2) {
        assert_eq!(pair[0], pair[1], "interleaved marker {:?}", pair);
    }
    assert_eq!(log.iter().filter(|&&b| b == b'A').count(), 2 * ROUNDS);
}

fn rw_handle(name: &str, ownership: Ownership) -> ReaderWriterLock {
    ReaderWriterLock::create_or_attach(name, capacity(64), MaxReaders::new(4).unwrap(), ownership)
        .unwrap()
}

#[test]
fn test_readers_share_writer_waits() {
    let name = unique("rw-readers");
    let mut first = rw_handle(&name, Ownership::Owner);
    let mut second = rw_handle(&name, Ownership::Attached);

    let read_a = first.read_lock().unwrap();
    let read_b = second.read_lock().unwrap();

    let (tx, rx) = mpsc::channel();
    let writer_name = name.clone();
    let writer = thread::spawn(move || {
        let mut shm = rw_handle(&writer_name, Ownership::Attached);
        let mut scope = shm.write_lock().unwrap();
        scope.write(b"written").unwrap();
        tx.send(()).unwrap();
    });

    assert!(rx.recv_timeout(BLOCKED_FOR).is_err(), "writer entered while readers held");

    drop(read_a);
    assert!(rx.recv_timeout(BLOCKED_FOR).is_err(), "writer entered while a reader held");

    drop(read_b);
    rx.recv_timeout(PROCEEDS_WITHIN).unwrap();
    writer.join().unwrap();

    let mut scope = first.read_lock().unwrap();
    scope.seek(0).unwrap();
    assert_eq!(scope.read(7).unwrap(), b"written");
}

#[test]
fn test_excess_reader_blocks_until_release() {
    let name = unique("rw-excess");
    let open = |ownership| {
        ReaderWriterLock::create_or_attach(
            &name,
            capacity(64),
            MaxReaders::new(2).unwrap(),
            ownership,
        )
        .unwrap()
    };
    let mut first = open(Ownership::Owner);
    let mut second = open(Ownership::Attached);

    let read_a = first.read_lock().unwrap();
    let _read_b = second.read_lock().unwrap();

    let (tx, rx) = mpsc::channel();
    let third_name = name.clone();
    let third = thread::spawn(move || {
        let mut shm = ReaderWriterLock::create_or_attach(
            &third_name,
            capacity(64),
            MaxReaders::new(2).unwrap(),
            Ownership::Attached,
        )
        .unwrap();
        let _scope = shm.read_lock().unwrap();
        tx.send(()).unwrap();
    });

    assert!(rx.recv_timeout(BLOCKED_FOR).is_err(), "third reader entered past max_readers");

    drop(read_a);
    rx.recv_timeout(PROCEEDS_WITHIN).unwrap();
    third.join().unwrap();
}

#[test]
fn test_writer_blocks_readers() {
    let name = unique("rw-writer");
    let mut shm = rw_handle(&name, Ownership::Owner);
    let write_scope = shm.write_lock().unwrap();

    let (tx, rx) = mpsc::channel();
    let reader_name = name.clone();
    let reader = thread::spawn(move || {
        let mut shm = rw_handle(&reader_name, Ownership::Attached);
        let _scope = shm.read_lock().unwrap();
        tx.send(()).unwrap();
    });

    assert!(rx.recv_timeout(BLOCKED_FOR).is_err(), "reader entered while writer held");
    write_scope.exit().unwrap();
    rx.recv_timeout(PROCEEDS_WITHIN).unwrap();
    reader.join().unwrap();

    assert_eq!(shm.available_readers().unwrap(), 4);
}

#[test]
fn test_channel_consume_blocks_until_produce() {
    let name = unique("slot");
    let mut producer =
        Channel::create_or_attach(&name, capacity(256), ChannelMode::Producer, Ownership::Owner)
            .unwrap();

    let (tx, rx) = mpsc::channel();
    let consumer_name = name.clone();
    let consumer = thread::spawn(move || {
        let mut consumer = Channel::create_or_attach(
            &consumer_name,
            capacity(256),
            ChannelMode::Consumer,
            Ownership::Attached,
        )
        .unwrap();
        for _ in 0..2 {
            tx.send(consumer.consume().unwrap()).unwrap();
        }
    });

    assert!(rx.recv_timeout(BLOCKED_FOR).is_err(), "consume returned before produce");

    producer.produce(&b"first".to_vec()).unwrap();
    assert_eq!(rx.recv_timeout(PROCEEDS_WITHIN).unwrap(), b"first");

    assert!(rx.recv_timeout(BLOCKED_FOR).is_err(), "consume returned a stale item");

    producer.produce(&b"second".to_vec()).unwrap();
    assert_eq!(rx.recv_timeout(PROCEEDS_WITHIN).unwrap(), b"second");
    consumer.join().unwrap();
}

#[test]
fn test_only_owner_unlinks_on_drop() {
    let name = unique("ownership");
    let object = ObjectName::new(name.as_str()).unwrap();

    let attached = ExclusiveLock::create_or_attach(&name, capacity(16), Ownership::Attached).unwrap();
    drop(attached);
    // Still there: the unlink below is the first one.
    Mapping::unlink(&object).unwrap();

    let owner = ExclusiveLock::create_or_attach(&name, capacity(16), Ownership::Owner).unwrap();
    drop(owner);
    assert!(matches!(
        Mapping::unlink(&object),
        Err(ShmError::ResourceAlreadyGone { .. })
    ));
    ExclusiveLock::unlink(&object).unwrap();
}

#[test]
fn test_teardown_closes_region() {
    let name = unique("teardown");
    let mut shm = ExclusiveLock::create_or_attach(&name, capacity(16), Ownership::Attached).unwrap();
    shm.teardown(true).unwrap();
    shm.teardown(true).unwrap();

    let mut scope = shm.lock().unwrap();
    assert!(matches!(
        scope.write(b"late"),
        Err(ShareError::SharedMemory(ShmError::Closed { .. }))
    ));
}

#[test]
fn test_config_drives_regions() {
    use std::io::Write;

    let name = unique("configured");
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "defaults:\n  max_readers: 2\nregions:\n  - name: {}\n    size: 1K\n    owner: true\n",
        name
    )
    .unwrap();

    let config = ConfigLoader::load_file(file.path()).unwrap();
    let region = config.region(&name).unwrap();
    assert_eq!(region.capacity.bytes(), 1024);

    let mut shm = ReaderWriterLock::open(
        &region.name,
        region.capacity,
        region.max_readers,
        region.ownership,
    )
    .unwrap();
    assert_eq!(shm.max_readers().value(), 2);
    assert_eq!(shm.available_readers().unwrap(), 2);

    let scope = shm.read_lock().unwrap();
    assert_eq!(scope.capacity(), 1024);
}
