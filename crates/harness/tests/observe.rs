use std::thread;
use std::time::Duration;

use herdlog_core::RecordId;
use herdlog_harness::{TestDevice, init_tracing, sample_record};

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn first_snapshot_is_current_table() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let device = TestDevice::new()?;
    let a = device.capture("COW-1", 0, 72)?;
    let b = device.capture("COW-2", 1, 81)?;

    let mut observer = device.store.observe_all();
    let snapshot = observer.next_snapshot().expect("observer open")?;
    assert_eq!(snapshot.iter().map(|r| r.id).collect::<Vec<_>>(), vec![b, a]);
    Ok(())
}

#[test]
fn empty_store_emits_empty_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let device = TestDevice::new()?;
    let mut observer = device.store.observe_all();
    assert!(observer.next_snapshot().expect("observer open")?.is_empty());
    Ok(())
}

#[test]
fn every_write_kind_produces_a_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let device = TestDevice::new()?;
    let mut observer = device.store.observe_all();
    observer.next_snapshot().expect("observer open")?;

    let id = device.capture("COW-1", 0, 72)?;
    let snap = observer.next_timeout(WAIT).expect("insert signalled")?;
    assert_eq!(snap.len(), 1);

    device.store.mark_synced(id)?;
    let snap = observer.next_timeout(WAIT).expect("mark signalled")?;
    assert!(snap[0].synced);

    let mut edited = snap[0].clone();
    edited.atc_score = 90;
    device.store.update(&edited)?;
    let snap = observer.next_timeout(WAIT).expect("update signalled")?;
    assert_eq!(snap[0].atc_score, 90);

    device.store.delete(&edited)?;
    let snap = observer.next_timeout(WAIT).expect("delete signalled")?;
    assert!(snap.is_empty());

    Ok(())
}

#[test]
fn clear_all_emits_empty_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let device = TestDevice::new()?;
    device.capture("COW-1", 0, 72)?;
    device.capture("COW-2", 1, 81)?;

    let mut observer = device.store.observe_all();
    assert_eq!(observer.next_snapshot().expect("observer open")?.len(), 2);

    device.store.clear_all()?;
    assert!(observer.next_timeout(WAIT).expect("clear signalled")?.is_empty());
    Ok(())
}

#[test]
fn bursts_coalesce_into_latest_state() -> Result<(), Box<dyn std::error::Error>> {
    let device = TestDevice::new()?;
    let mut observer = device.store.observe_all();
    observer.next_snapshot().expect("observer open")?;

    for n in 0..10 {
        device.capture("COW-1", n, 70)?;
    }

    let snap = observer.next_timeout(WAIT).expect("burst signalled")?;
    assert_eq!(snap.len(), 10);
    // The burst was drained along with the first signal.
    assert!(observer.next_timeout(Duration::from_millis(50)).is_none());
    Ok(())
}

#[test]
fn several_observers_each_see_changes() -> Result<(), Box<dyn std::error::Error>> {
    let device = TestDevice::new()?;
    let mut first = device.store.observe_all();
    let mut second = device.store.observe_all();
    assert_eq!(device.store.observer_count(), 2);
    first.next_snapshot().expect("open")?;
    second.next_snapshot().expect("open")?;

    device.capture("COW-1", 0, 72)?;
    assert_eq!(first.next_timeout(WAIT).expect("signalled")?.len(), 1);
    assert_eq!(second.next_timeout(WAIT).expect("signalled")?.len(), 1);
    Ok(())
}

#[test]
fn cancel_and_drop_detach_observers() -> Result<(), Box<dyn std::error::Error>> {
    let device = TestDevice::new()?;
    let kept = device.store.observe_all();
    let cancelled = device.store.observe_all();
    let dropped = device.store.observe_all();
    assert_eq!(device.store.observer_count(), 3);

    cancelled.cancel();
    drop(dropped);
    assert_eq!(device.store.observer_count(), 1);

    // Writes still go through with a detached observer gone.
    device.capture("COW-1", 0, 72)?;
    assert_eq!(device.store.count()?, 1);
    drop(kept);
    assert_eq!(device.store.observer_count(), 0);
    Ok(())
}

#[test]
fn writer_thread_feeds_observer_thread() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let device = TestDevice::on_disk()?;
    let mut observer = device.store.observe_all();
    assert!(observer.next_snapshot().expect("observer open")?.is_empty());

    let writer_store = device.store.clone();
    let writer = thread::spawn(move || -> Result<Vec<RecordId>, herdlog_engine::EngineError> {
        (0..25)
            .map(|n| writer_store.insert(&sample_record(&format!("COW-{n}"), n, 60)))
            .collect()
    });

    let mut seen = 0;
    while seen < 25 {
        let snap = observer.next_timeout(WAIT).expect("writer kept signalling")?;
        assert!(snap.len() >= seen, "snapshots never go backwards");
        seen = snap.len();
    }

    let ids = writer.join().expect("writer thread panicked")?;
    assert_eq!(ids.len(), 25);
    assert_eq!(device.store.count()?, 25);
    Ok(())
}

#[test]
fn concurrent_writers_all_land() -> Result<(), Box<dyn std::error::Error>> {
    let device = TestDevice::on_disk()?;

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = device.store.clone();
            thread::spawn(move || {
                for n in 0..10 {
                    store
                        .insert(&sample_record(&format!("COW-{t}-{n}"), n, 70))
                        .expect("insert failed");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    let all = device.store.get_all()?;
    assert_eq!(all.len(), 40);
    let mut ids: Vec<_> = all.iter().map(|r| r.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 40);
    Ok(())
}
