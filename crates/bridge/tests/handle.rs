mod common;

use std::collections::{BTreeMap, HashSet};

use anyhow::Result;
use common::{engine, four_substations};
use powsybl_bridge::{Error, Handle, has_pending_error, set_pending_error};
use powsybl_loopback::probe;

#[test]
fn clones_share_one_engine_object() -> Result<()> {
    let engine = engine();
    let network = four_substations(&engine);
    let raw = network.as_ptr();
    let clones: Vec<Handle> = (0..5).map(|_| network.clone()).collect();
    assert_eq!(network.share_count(), 6);
    assert!(clones.iter().all(|clone| *clone == network));

    drop(network);
    assert!(probe::is_handle_live(raw));
    assert_eq!(engine.network_metadata(&clones[4])?.id, "four_substations");

    drop(clones);
    assert!(!probe::is_handle_live(raw));
    assert_eq!(probe::destroy_count(raw), 1);
    Ok(())
}

#[test]
fn null_handle_is_never_destroyed() {
    let handle = Handle::null();
    let copy = handle.clone();
    drop(handle);
    drop(copy);
    assert_eq!(probe::destroy_count(std::ptr::null_mut()), 0);
}

#[test]
fn last_clone_may_drop_on_another_thread() -> Result<()> {
    let engine = engine();
    let network = engine.create_network("ieee14", "shared")?;
    let raw = network.as_ptr();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let network = network.clone();
            std::thread::spawn(move || engine.network_metadata(&network).map(|m| m.id))
        })
        .collect();
    for worker in workers {
        assert_eq!(worker.join().expect("worker")?, "shared");
    }

    let last = network.clone();
    drop(network);
    std::thread::spawn(move || drop(last))
        .join()
        .expect("dropping thread");
    assert_eq!(probe::destroy_count(raw), 1);
    assert!(!probe::is_handle_live(raw));
    Ok(())
}

#[test]
fn distinct_objects_get_distinct_handles() -> Result<()> {
    let engine = engine();
    let handles: Vec<Handle> = (0..3)
        .map(|i| engine.create_network("empty", &format!("e{i}")))
        .collect::<Result<_, _>>()?;
    let unique: HashSet<&Handle> = handles.iter().collect();
    assert_eq!(unique.len(), 3);
    Ok(())
}

#[test]
fn absent_reporter_is_passed_as_null() -> Result<()> {
    let engine = engine();
    let network = four_substations(&engine);
    let buffer = engine.save_network_to_binary_buffer(&network, "LOOPBACK", &BTreeMap::new(), None)?;
    let reloaded = engine.load_network_from_string(
        "copy.lnet",
        std::str::from_utf8(&buffer)?,
        &BTreeMap::new(),
        None,
    )?;
    assert_ne!(reloaded, network);
    assert!(!reloaded.is_null());
    Ok(())
}

#[test]
fn wrong_kind_of_handle_is_an_engine_error() {
    let engine = engine();
    let network = four_substations(&engine);
    let err = engine.print_report(&network).expect_err("not a reporter");
    assert!(err.to_string().contains("is not a reporter"), "{err}");
}

#[test]
fn drop_with_a_pending_callback_error_still_destroys() -> Result<()> {
    let engine = engine();
    let network = four_substations(&engine);
    let raw = network.as_ptr();

    set_pending_error("sink failed before the drop");
    drop(network);
    assert_eq!(probe::destroy_count(raw), 1);
    assert!(!probe::is_handle_live(raw));

    // The failure stays parked for the next call on this thread.
    assert!(has_pending_error());
    let err = engine.is_config_read().expect_err("pending failure");
    assert!(
        matches!(err, Error::Callback(ref e) if e.to_string() == "sink failed before the drop"),
        "{err:?}"
    );
    assert!(!has_pending_error());
    engine.is_config_read()?;
    Ok(())
}

#[test]
fn drop_does_not_touch_the_log_level() -> Result<()> {
    let engine = engine();
    let network = four_substations(&engine);
    let raw = network.as_ptr();

    probe::fail_next_log_level("log level rejected");
    drop(network);
    assert_eq!(probe::destroy_count(raw), 1);
    assert!(!probe::is_handle_live(raw));

    let err = engine.is_config_read().expect_err("log level failure still armed");
    assert!(matches!(err, Error::Engine(ref m) if m == "log level rejected"), "{err:?}");
    engine.is_config_read()?;
    Ok(())
}
