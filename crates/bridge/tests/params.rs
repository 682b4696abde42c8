mod common;

use std::fmt::Debug;

use anyhow::Result;
use common::{engine, four_substations};
use powsybl_bridge::{
    BalanceType, ComponentStatus, ConnectedComponentMode, Error, FlowDecompositionParameters,
    LoadFlowParameters, LoadFlowValidationParameters, Parameters, SecurityAnalysisParameters,
    SensitivityAnalysisParameters, ShortCircuitAnalysisParameters, StudyType,
};
use powsybl_loopback::{Kind, probe};

fn assert_engine_defaults_match<P>() -> Result<()>
where
    P: Parameters + Default + PartialEq + Debug,
{
    let engine = engine();
    probe::take_releases();
    let defaults: P = engine.default_parameters()?;
    assert_eq!(defaults, P::default());

    let releases = probe::take_releases();
    assert_eq!(releases.len(), 1, "{releases:?}");
    assert_eq!(releases[0].kind, Kind::Parameters);
    Ok(())
}

#[test]
fn load_flow_defaults_match_engine() -> Result<()> {
    assert_engine_defaults_match::<LoadFlowParameters>()
}

#[test]
fn validation_defaults_match_engine() -> Result<()> {
    assert_engine_defaults_match::<LoadFlowValidationParameters>()
}

#[test]
fn security_analysis_defaults_match_engine() -> Result<()> {
    assert_engine_defaults_match::<SecurityAnalysisParameters>()
}

#[test]
fn sensitivity_analysis_defaults_match_engine() -> Result<()> {
    assert_engine_defaults_match::<SensitivityAnalysisParameters>()
}

#[test]
fn flow_decomposition_defaults_match_engine() -> Result<()> {
    assert_engine_defaults_match::<FlowDecompositionParameters>()
}

#[test]
fn short_circuit_defaults_match_engine() -> Result<()> {
    assert_engine_defaults_match::<ShortCircuitAnalysisParameters>()?;
    let defaults: ShortCircuitAnalysisParameters = engine().default_parameters()?;
    assert_eq!(defaults.study_type, StudyType::Transient);
    Ok(())
}

#[test]
fn load_flow_parameters_reach_the_engine() -> Result<()> {
    let engine = engine();
    let network = four_substations(&engine);
    let parameters = LoadFlowParameters {
        balance_type: BalanceType::ProportionalToLoad,
        countries_to_balance: vec!["FR".to_string(), "BE".to_string(), "DE".to_string()],
        provider_parameters: vec![("maxIteration".to_string(), "30".to_string())],
        ..LoadFlowParameters::default()
    };
    probe::take_releases();

    let results = engine.run_load_flow(&network, false, &parameters, "OpenLoadFlow", None)?;
    assert_eq!(results.len(), 1);
    let main = &results[0];
    assert!(main.converged());
    assert_eq!(main.status, ComponentStatus::Converged);
    assert_eq!(main.status_text, "CONVERGED");
    assert_eq!(main.iteration_count, 3);
    assert_eq!(main.slack_bus_id, "S1VL1_0");
    assert!((main.distributed_active_power - 3.6).abs() < 1e-9);

    let releases = probe::take_releases();
    assert_eq!(
        releases
            .iter()
            .filter(|release| release.kind == Kind::ComponentResults)
            .count(),
        1
    );
    Ok(())
}

#[test]
fn provider_parameters_change_the_outcome() -> Result<()> {
    let engine = engine();
    let network = four_substations(&engine);
    let parameters = LoadFlowParameters {
        distributed_slack: false,
        provider_parameters: vec![("maxIteration".to_string(), "2".to_string())],
        ..LoadFlowParameters::default()
    };
    let results = engine.run_load_flow(&network, false, &parameters, "", None)?;
    assert_eq!(results[0].status, ComponentStatus::MaxIterationReached);
    assert!(!results[0].converged());
    assert!(results[0].distributed_active_power.abs() < f64::EPSILON);

    let bad = LoadFlowParameters {
        provider_parameters: vec![("maxIteration".to_string(), "many".to_string())],
        ..LoadFlowParameters::default()
    };
    let err = engine
        .run_load_flow(&network, false, &bad, "", None)
        .expect_err("non-numeric max iteration");
    assert_eq!(err.to_string(), "maxIteration must be an integer");
    Ok(())
}

#[test]
fn dc_load_flow_on_every_component() -> Result<()> {
    let engine = engine();
    let a = engine.create_network("ieee14", "a")?;
    let b = engine.create_network("eurostag_tutorial_example1", "b")?;
    let merged = engine.merge(&[a, b])?;
    let parameters = LoadFlowParameters {
        connected_component_mode: ConnectedComponentMode::All,
        ..LoadFlowParameters::default()
    };

    let results = engine.run_load_flow(&merged, true, &parameters, "DynaFlow", None)?;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|result| result.converged()));
    assert_eq!(results[1].connected_component_num, 1);
    assert_eq!(results[1].slack_bus_id, "VLGEN_0");

    let main_only = engine.run_load_flow(&merged, true, &LoadFlowParameters::default(), "", None)?;
    assert_eq!(main_only.len(), 1);
    Ok(())
}

#[test]
fn nul_in_parameters_fails_before_the_call() {
    let engine = engine();
    let network = four_substations(&engine);
    let parameters = LoadFlowParameters {
        countries_to_balance: vec!["FR".to_string(), "B\0E".to_string()],
        ..LoadFlowParameters::default()
    };
    probe::take_releases();
    let err = engine
        .run_load_flow(&network, false, &parameters, "", None)
        .expect_err("nul byte");
    assert!(matches!(err, Error::InvalidArgument(_)), "{err:?}");
    assert!(probe::take_releases().is_empty());
}
