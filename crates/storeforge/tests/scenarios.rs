//! End-to-end clustering scenarios.

use std::collections::HashSet;
use std::io::Write;

use storeforge::{
    cluster_stores_with, read_records, ClusteringConfig, ClusteringError, ClusteringOutput,
    ConstraintConfig, DataFlag, FeasibilityAnalysis, FinalState, RunWarning, StoreRecord,
};
use storeforge_test::{blob_records, scenario_a_records, uniform_records, without_reference_every};

fn config(min: usize, max: usize, target: usize, range: f64) -> ClusteringConfig {
    ClusteringConfig::default().with_constraints(
        ConstraintConfig::with_sizes(min, max, target).with_max_covariate_range(range),
    )
}

fn assert_partition(records: &[StoreRecord], output: &ClusteringOutput) {
    assert_eq!(output.assignments.len(), records.len());
    for (record, assignment) in records.iter().zip(&output.assignments) {
        assert_eq!(record.store_id, assignment.store_id);
        assert!(assignment.cluster_id < output.cluster_count());
    }
    let ids: HashSet<&str> = output.assignments.iter().map(|a| a.store_id.as_str()).collect();
    assert_eq!(ids.len(), records.len());
    for profile in &output.profiles {
        let members = output
            .assignments
            .iter()
            .filter(|a| a.cluster_id == profile.cluster_id)
            .count();
        assert_eq!(members, profile.size);
        assert!(profile.size > 0);
    }
}

fn assert_compliant(output: &ClusteringOutput, config: &ClusteringConfig) {
    let c = &config.constraints;
    assert!(output.report.is_compliant());
    assert!(output.report.unresolved_violations.is_empty());
    for profile in &output.profiles {
        assert!(
            (c.min_stores_per_cluster..=c.max_stores_per_cluster).contains(&profile.size),
            "cluster {} has {} stores",
            profile.cluster_id,
            profile.size
        );
        assert!(profile.covariate_range <= c.max_covariate_range);
    }
}

fn assert_monotonic(output: &ClusteringOutput) {
    for step in &output.report.trace {
        assert!(step.magnitude_after <= step.magnitude_before + 1e-9);
    }
}

#[test]
fn test_regional_table_converges() {
    let records = scenario_a_records(42);
    let config = config(35, 50, 42, 5.0);

    let output = cluster_stores_with(&records, config.clone()).unwrap();

    let feasibility = &output.report.feasibility;
    assert_eq!((feasibility.min_clusters, feasibility.max_clusters), (46, 64));
    assert_eq!(feasibility.optimal_clusters, 54);
    assert_eq!(output.cluster_count(), 54);
    assert_eq!(output.report.final_state, FinalState::Converged);
    assert_partition(&records, &output);
    assert_compliant(&output, &config);
    assert_monotonic(&output);
}

#[test]
fn test_small_table_forms_single_cluster() {
    let records = uniform_records(46, 3, 2.0, 8);
    let config = config(35, 50, 42, 5.0);

    let output = cluster_stores_with(&records, config.clone()).unwrap();

    assert_eq!(output.cluster_count(), 1);
    assert_eq!(output.profiles[0].size, 46);
    assert!(output.assignments.iter().all(|a| a.cluster_id == 0));
    assert_compliant(&output, &config);
}

#[test]
fn test_two_cluster_table() {
    let records = blob_records(&[100, 100], 2, 3);
    let config = config(100, 110, 105, 5.0);

    let output = cluster_stores_with(&records, config.clone()).unwrap();

    assert_eq!(output.cluster_count(), 2);
    assert_partition(&records, &output);
    assert_compliant(&output, &config);
    for profile in &output.profiles {
        assert_eq!(profile.size, 100);
    }
}

#[test]
fn test_feasibility_boundaries() {
    let constraints = ConstraintConfig::with_sizes(100, 105, 100);
    let analysis = FeasibilityAnalysis::analyze(200, &constraints).unwrap();
    assert_eq!(analysis.cluster_range(), 2..=2);

    let records = uniform_records(150, 2, 3.0, 1);
    let err = cluster_stores_with(&records, config(100, 105, 100, 5.0)).unwrap_err();
    assert!(matches!(
        err,
        ClusteringError::ConfigurationInfeasible {
            store_count: 150,
            min_clusters: 2,
            max_clusters: 1,
            ..
        }
    ));
}

#[test]
fn test_identical_input_gives_identical_assignments() {
    let records = uniform_records(180, 3, 8.0, 21);
    let config = config(20, 30, 25, 4.0).with_random_seed(1234);

    let first = cluster_stores_with(&records, config.clone()).unwrap();
    let second = cluster_stores_with(&records, config).unwrap();

    assert_eq!(
        first.assignments_json().unwrap(),
        second.assignments_json().unwrap()
    );
    assert_eq!(first.report.trace, second.report.trace);
}

#[test]
fn test_repair_on_unstructured_table() {
    let records = uniform_records(400, 3, 20.0, 0);
    let config = config(10, 20, 15, 10.0);

    let output = cluster_stores_with(&records, config.clone()).unwrap();

    assert_eq!(output.report.final_state, FinalState::Converged);
    assert!(!output.report.trace.is_empty());
    assert_eq!(
        output.report.iteration_count as usize,
        output.report.trace.len()
    );
    assert_partition(&records, &output);
    assert_compliant(&output, &config);
    assert_monotonic(&output);
}

#[test]
fn test_unbalanced_blobs_are_repaired() {
    // The middle blob is 10 over the maximum and the first is 5 short.
    let records = blob_records(&[30, 60, 36], 2, 17);
    let config = ClusteringConfig::default();

    let output = cluster_stores_with(&records, config.clone()).unwrap();

    assert_eq!(output.cluster_count(), 3);
    assert_eq!(output.report.final_state, FinalState::Converged);
    assert_eq!(output.report.trace.len(), 10);
    let oversized = output.cluster_of("b01-s0000").unwrap();
    assert!(output
        .report
        .trace
        .iter()
        .all(|step| step.from_cluster == oversized));
    assert_eq!(output.profiles[oversized].size, 50);
    assert_partition(&records, &output);
    assert_compliant(&output, &config);
    assert_monotonic(&output);
}

#[test]
fn test_tight_two_cluster_table_is_repaired() {
    let records = blob_records(&[120, 80], 2, 5);
    let config = config(100, 105, 100, 5.0);

    let output = cluster_stores_with(&records, config.clone()).unwrap();

    let feasibility = &output.report.feasibility;
    assert_eq!((feasibility.min_clusters, feasibility.max_clusters), (2, 2));
    assert_eq!(output.report.final_state, FinalState::Converged);
    assert_eq!(output.report.trace.len(), 20);
    for profile in &output.profiles {
        assert_eq!(profile.size, 100);
    }
    assert_partition(&records, &output);
    assert_compliant(&output, &config);
    assert_monotonic(&output);
}

#[test]
fn test_missing_reference_seasons_are_flagged() {
    let records = without_reference_every(blob_records(&[12, 12], 2, 4), 5);
    let config = config(10, 14, 12, 5.0);

    let output = cluster_stores_with(&records, config).unwrap();

    let flagged: Vec<&str> = output
        .assignments
        .iter()
        .filter(|a| a.data_flag == DataFlag::ReferenceMissing)
        .map(|a| a.store_id.as_str())
        .collect();
    let expected: Vec<&str> = records
        .iter()
        .filter(|r| r.reference_features.is_none())
        .map(|r| r.store_id.as_str())
        .collect();
    assert_eq!(flagged, expected);
    let warned = output
        .report
        .warnings
        .iter()
        .filter(|w| matches!(w, RunWarning::DataIncomplete { .. }))
        .count();
    assert_eq!(warned, expected.len());
    assert_eq!(
        output
            .profiles
            .iter()
            .map(|p| p.reference_missing_count)
            .sum::<usize>(),
        expected.len()
    );
}

#[test]
fn test_read_records_from_json() {
    let records = blob_records(&[3, 3], 2, 9);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(&records).unwrap().as_bytes())
        .unwrap();

    let loaded = read_records(file.path()).unwrap();

    assert_eq!(loaded, records);
    for (read, written) in loaded.iter().zip(&records) {
        assert_eq!(read.covariate.to_bits(), written.covariate.to_bits());
    }
    assert!(matches!(
        read_records("does-not-exist.json"),
        Err(ClusteringError::InvalidInput(_))
    ));
}
