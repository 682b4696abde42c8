mod common;

use std::collections::BTreeMap;

use anyhow::Result;
use common::{JAVA_LIBRARY_PATH, engine, four_substations};
use powsybl_bridge::{ElementFilter, ElementType, Error, Handle};
use powsybl_loopback::probe;

#[test]
fn init_applies_bridge_config() -> Result<()> {
    let engine = engine();
    assert_eq!(probe::java_library_path().as_deref(), Some(JAVA_LIBRARY_PATH));
    assert!(!engine.is_config_read()?);

    engine.set_config_read(true)?;
    assert!(engine.is_config_read()?);
    engine.set_config_read(false)?;

    engine.set_java_library_path("/usr/lib/powsybl")?;
    assert_eq!(probe::java_library_path().as_deref(), Some("/usr/lib/powsybl"));
    engine.set_java_library_path(JAVA_LIBRARY_PATH)?;
    Ok(())
}

#[test]
fn second_init_returns_the_same_isolate() -> Result<()> {
    let first = engine();
    let second = powsybl_bridge::Engine::init(
        powsybl_loopback::api(),
        common::TestHost,
        &powsybl_bridge::BridgeConfig::default(),
    )?;
    assert!(std::ptr::eq(first.isolate(), second.isolate()));
    assert!(std::ptr::eq(
        powsybl_bridge::Engine::current().expect("engine").isolate(),
        first.isolate()
    ));
    Ok(())
}

#[test]
fn load_flow_providers() -> Result<()> {
    let engine = engine();
    assert_eq!(engine.load_flow_provider_names()?, ["OpenLoadFlow", "DynaFlow"]);
    assert_eq!(engine.default_load_flow_provider()?, "OpenLoadFlow");

    engine.set_default_load_flow_provider("DynaFlow")?;
    assert_eq!(engine.default_load_flow_provider()?, "DynaFlow");
    engine.set_default_load_flow_provider("OpenLoadFlow")?;

    let err = engine
        .set_default_load_flow_provider("Hades2")
        .expect_err("unknown provider");
    assert_eq!(err.to_string(), "No loadflow provider for name 'Hades2'");
    assert_eq!(engine.default_load_flow_provider()?, "OpenLoadFlow");
    Ok(())
}

#[test]
fn version_table_and_import_formats() -> Result<()> {
    let engine = engine();
    let table = engine.version_table()?;
    assert!(table.starts_with("+-"));
    assert!(table.contains("Repository name"));
    assert_eq!(engine.network_import_formats()?, ["LOOPBACK"]);
    Ok(())
}

#[test]
fn network_metadata_is_copied() -> Result<()> {
    let engine = engine();
    let network = four_substations(&engine);
    let metadata = engine.network_metadata(&network)?;
    assert_eq!(metadata.id, "four_substations");
    assert_eq!(metadata.name, "four_substations");
    assert_eq!(metadata.source_format, "code");
    assert_eq!(metadata.forecast_distance, 0);
    assert!((metadata.case_date - 1_388_534_400.0).abs() < f64::EPSILON);
    Ok(())
}

#[test]
fn unknown_import_format_is_reported() {
    let engine = engine();
    let err = engine
        .load_network_from_string("grid.xiidm", "<network/>", &BTreeMap::new(), None)
        .expect_err("unsupported file");
    assert_eq!(err.to_string(), "Unsupported file format or invalid file: grid.xiidm");
}

#[test]
fn reporter_collects_messages_from_calls() -> Result<()> {
    let engine = engine();
    let reporter = engine.create_reporter_model("loadflow", "Load flow report")?;
    let network = four_substations(&engine);
    let buffer =
        engine.save_network_to_binary_buffer(&network, "LOOPBACK", &BTreeMap::new(), Some(&reporter))?;
    let reloaded = engine.load_network_from_string(
        "grid.lnet",
        std::str::from_utf8(&buffer)?,
        &BTreeMap::new(),
        Some(&reporter),
    )?;
    engine.run_load_flow(
        &reloaded,
        false,
        &powsybl_bridge::LoadFlowParameters::default(),
        "OpenLoadFlow",
        Some(&reporter),
    )?;

    let report = engine.print_report(&reporter)?;
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines[0], "+ Load flow report");
    assert_eq!(lines[1].trim(), "Network four_substations exported in LOOPBACK");
    assert_eq!(lines[2].trim(), "Network four_substations imported from grid.lnet");
    assert_eq!(
        lines[3].trim(),
        "AC load flow with OpenLoadFlow on network four_substations: 1 component(s)"
    );
    Ok(())
}

#[test]
fn merge_networks() -> Result<()> {
    let engine = engine();
    let a = engine.create_network("four_substations", "a")?;
    let b = engine.create_network("eurostag_tutorial_example1", "b")?;
    let merged = engine.merge(&[a.clone(), b])?;
    assert_eq!(engine.network_metadata(&merged)?.id, "a+b");
    assert!(!merged.is_null() && merged != a);

    let substations =
        engine.network_elements_ids(&merged, ElementType::Substation, &ElementFilter::default())?;
    assert_eq!(substations, ["S1", "S2", "S3", "S4", "P1", "P2"]);

    let main = ElementFilter {
        main_connected_component: true,
        ..ElementFilter::default()
    };
    let main_substations = engine.network_elements_ids(&merged, ElementType::Substation, &main)?;
    assert_eq!(main_substations, ["S1", "S2", "S3", "S4"]);

    let err = engine.merge(&[]).expect_err("nothing to merge");
    assert!(matches!(err, Error::Engine(ref m) if m == "At least one network is required to merge"));
    Ok(())
}

#[test]
fn reduce_network_by_voltage() -> Result<()> {
    let engine = engine();
    let network = four_substations(&engine);
    engine.reduce_network(&network, 300.0, 500.0, &[], &[], &[], false)?;
    let buses = engine.network_elements_ids(&network, ElementType::Bus, &ElementFilter::default())?;
    assert_eq!(buses, ["S1VL2_0", "S2VL1_0", "S3VL1_0", "S4VL1_0"]);
    let substations =
        engine.network_elements_ids(&network, ElementType::Substation, &ElementFilter::default())?;
    assert_eq!(substations.len(), 4);
    Ok(())
}

#[test]
fn reduce_network_by_voltage_levels() -> Result<()> {
    let engine = engine();
    let network = four_substations(&engine);
    let levels = vec!["S3VL1".to_string()];
    engine.reduce_network(&network, 0.0, 1000.0, &[], &levels, &[1], true)?;
    let loads = engine.network_elements_ids(&network, ElementType::Load, &ElementFilter::default())?;
    assert_eq!(loads, ["LD2"]);

    let err = engine
        .reduce_network(&network, 0.0, 1000.0, &[], &levels, &[], false)
        .expect_err("depth missing");
    assert_eq!(err.to_string(), "depths and voltage levels differ in length");
    Ok(())
}

#[test]
fn unknown_handle_is_reported_and_dropping_it_does_not_panic() {
    let engine = engine();
    let bogus = unsafe { Handle::from_raw(std::ptr::without_provenance_mut(0xdead_beef)) };
    let err = engine.network_metadata(&bogus).expect_err("unknown handle");
    assert_eq!(err.to_string(), "Object handle 0xdeadbeef does not exist");
    drop(bogus);
    assert_eq!(probe::destroy_count(std::ptr::without_provenance_mut(0xdead_beef)), 0);
}

#[test]
fn close_shuts_down_engine_services() -> Result<()> {
    let engine = engine();
    engine.close()?;
    assert!(probe::is_closed());
    Ok(())
}
