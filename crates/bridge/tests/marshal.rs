mod common;

use std::collections::BTreeMap;

use anyhow::Result;
use common::{engine, four_substations};
use powsybl_bridge::{
    ElementFilter, ElementType, Error, has_pending_error, set_pending_error,
    marshal::{ReturnedArray, Strings},
};
use powsybl_loopback::{Kind, Release, probe};

fn released(kind: Kind) -> Vec<Release> {
    probe::take_releases()
        .into_iter()
        .filter(|release| release.kind == kind)
        .collect()
}

#[test]
fn returned_string_array_is_copied_then_released_once() -> Result<()> {
    let engine = engine();
    probe::take_releases();
    let names = engine.load_flow_provider_names()?;
    assert_eq!(names, ["OpenLoadFlow", "DynaFlow"]);

    let releases = released(Kind::StringArray);
    assert_eq!(releases.len(), 1);
    assert!(!probe::is_allocation_live(std::ptr::without_provenance::<u8>(releases[0].addr)));
    Ok(())
}

#[test]
fn returned_array_can_be_read_twice_before_release() -> Result<()> {
    let engine = engine();
    let isolate = engine.isolate();
    probe::take_releases();

    let raw = isolate.call(|thread, exc| unsafe {
        (isolate.api().get_network_import_formats)(thread, exc)
    })?;
    let formats = unsafe { ReturnedArray::<Strings>::from_raw(raw) };
    assert_eq!(formats.len(), 1);
    assert_eq!(formats.to_vec()?, formats.to_vec()?);
    assert!(probe::is_allocation_live(raw.cast_const()));
    drop(formats);

    assert!(!probe::is_allocation_live(raw.cast_const()));
    assert_eq!(released(Kind::StringArray).len(), 1);
    Ok(())
}

#[test]
fn null_returned_array_is_empty_and_never_released() -> Result<()> {
    let array = unsafe { ReturnedArray::<Strings>::from_raw(std::ptr::null_mut()) };
    assert!(array.is_empty());
    assert!(array.into_vec()?.is_empty());
    assert!(probe::take_releases().is_empty());
    Ok(())
}

#[test]
fn returned_string_is_freed_with_free_string() -> Result<()> {
    let engine = engine();
    probe::take_releases();
    let table = engine.version_table()?;
    assert!(table.contains("powsybl-loopback"));
    assert_eq!(released(Kind::String).len(), 1);
    Ok(())
}

#[test]
fn binary_buffer_round_trips_through_transient_strings() -> Result<()> {
    let engine = engine();
    let network = four_substations(&engine);
    probe::take_releases();

    let buffer = engine.save_network_to_binary_buffer(&network, "LOOPBACK", &BTreeMap::new(), None)?;
    assert_eq!(released(Kind::BinaryBuffer).len(), 1);

    let parameters = BTreeMap::from([("name".to_string(), "renamed".to_string())]);
    let copy = engine.load_network_from_string(
        "four_substations.lnet",
        std::str::from_utf8(&buffer)?,
        &parameters,
        None,
    )?;
    let metadata = engine.network_metadata(&copy)?;
    assert_eq!(metadata.id, "four_substations");
    assert_eq!(metadata.name, "renamed");
    assert_eq!(metadata.source_format, "LOOPBACK");
    assert_eq!(released(Kind::NetworkMetadata).len(), 1);
    Ok(())
}

#[test]
fn unsupported_export_format_is_reported() {
    let engine = engine();
    let network = four_substations(&engine);
    let err = engine
        .save_network_to_binary_buffer(&network, "XIIDM", &BTreeMap::new(), None)
        .expect_err("unsupported format");
    assert_eq!(err.to_string(), "Export format XIIDM not supported");
}

#[test]
fn empty_transient_buffers_are_accepted() -> Result<()> {
    let engine = engine();
    let network = four_substations(&engine);
    let buses = engine.network_elements_ids(&network, ElementType::Bus, &ElementFilter::default())?;
    assert_eq!(buses.len(), 5);

    let empty = engine.create_network("empty", "")?;
    probe::take_releases();
    let none = engine.network_elements_ids(&empty, ElementType::Line, &ElementFilter::default())?;
    assert!(none.is_empty());
    assert_eq!(released(Kind::StringArray).len(), 1);
    Ok(())
}

#[test]
fn transient_filters_reach_the_engine() -> Result<()> {
    let engine = engine();
    let network = four_substations(&engine);
    let filter = ElementFilter {
        nominal_voltages: vec![400.0],
        countries: vec!["BE".to_string(), "DE".to_string()],
        ..ElementFilter::default()
    };
    let loads = engine.network_elements_ids(&network, ElementType::Load, &filter)?;
    assert_eq!(loads, ["LD2", "LD6"]);
    Ok(())
}

#[test]
fn string_map_is_copied_then_released() -> Result<()> {
    let engine = engine();
    let network = engine.create_network("ieee14", "")?;
    probe::take_releases();
    let indicators = engine.voltage_initializer_indicators(&network)?;
    assert_eq!(indicators.len(), 3);
    assert_eq!(indicators["network_id"], "ieee14");
    assert_eq!(indicators["nb_buses"], "14");
    assert_eq!(indicators["status"], "OK");
    assert_eq!(released(Kind::StringMap).len(), 1);
    Ok(())
}

#[test]
fn interior_nul_is_rejected_before_the_engine_is_called() {
    let engine = engine();
    probe::take_releases();
    let err = engine
        .create_network("four\0substations", "")
        .expect_err("nul byte");
    assert!(matches!(err, powsybl_bridge::Error::InvalidArgument(_)), "{err:?}");
    assert!(probe::take_releases().is_empty());
}

#[test]
fn returned_array_is_released_while_a_callback_error_is_pending() -> Result<()> {
    let engine = engine();
    let isolate = engine.isolate();
    probe::take_releases();

    let raw = isolate.call(|thread, exc| unsafe {
        (isolate.api().get_network_import_formats)(thread, exc)
    })?;
    let formats = unsafe { ReturnedArray::<Strings>::from_raw(raw) };
    set_pending_error("sink failed");
    drop(formats);

    assert!(!probe::is_allocation_live(raw.cast_const()));
    assert_eq!(released(Kind::StringArray).len(), 1);
    assert!(has_pending_error());
    let err = engine.network_import_formats().expect_err("pending failure");
    assert!(matches!(err, Error::Callback(_)), "{err:?}");
    Ok(())
}
