//! A failed configuration must leave the isolate unpublished, which only holds
//! in a process that has not created it yet.

mod common;

use anyhow::Result;
use common::{LogLine, TestHost, config, take_logs};
use powsybl_bridge::{Engine, EngineLogLevel, Error, Isolate};
use powsybl_loopback::probe;

#[test]
fn configuration_failure_is_retried_by_the_next_init() -> Result<()> {
    probe::fail_next_call("setup rejected");
    let err = Engine::init(powsybl_loopback::api(), TestHost, &config()).expect_err("setup");
    assert!(matches!(err, Error::Engine(ref m) if m == "setup rejected"), "{err:?}");
    assert!(Isolate::get().is_none());
    assert!(Engine::current().is_none());
    assert_eq!(probe::java_library_path(), None);
    assert_eq!(probe::isolate_creations(), 1);

    let engine = Engine::init(powsybl_loopback::api(), TestHost, &config())?;
    assert!(std::ptr::eq(Isolate::current(), engine.isolate()));
    assert_eq!(probe::isolate_creations(), 1);
    assert_eq!(
        probe::java_library_path().as_deref(),
        Some(common::JAVA_LIBRARY_PATH)
    );
    assert!(!engine.is_config_read()?);

    take_logs();
    probe::log(30, "network", "configured");
    assert_eq!(
        take_logs(),
        [LogLine {
            level: EngineLogLevel::Warn,
            logger: "network".to_string(),
            message: "configured".to_string(),
        }]
    );

    // Published now: a further init ignores its arguments.
    probe::fail_next_call("not applied");
    let again = Engine::init(powsybl_loopback::api(), TestHost, &config())?;
    assert!(std::ptr::eq(again.isolate(), engine.isolate()));
    let err = engine.is_config_read().expect_err("injected failure still armed");
    assert!(matches!(err, Error::Engine(ref m) if m == "not applied"), "{err:?}");
    Ok(())
}
