//! Loading whole runs: index files on disk, load policies, and the
//! step-set consistency check.

use caviz_core::{Extent, NodeId, OffsetRecord, StageError, StepId};
use caviz_stage::{DataFormat, LoadPolicy, Stage, StageReader};
use caviz_test_utils::fixtures::{IndexStyle, RunFixture, StepSpec};

fn three_step_run(style: IndexStyle) -> RunFixture {
    let steps = [
        StepSpec::uniform(0, 4, Extent::new(4, 4)),
        StepSpec::uniform(50, 4, Extent::new(4, 4)),
        StepSpec::uniform(100, 4, Extent::new(4, 4)),
    ];
    RunFixture::write(2, 2, DataFormat::Text, &steps, style).unwrap()
}

#[test]
fn load_all_reads_every_index() {
    let run = three_step_run(IndexStyle::Extended);
    let mut stage = Stage::prepare(2, 2);
    let report = stage
        .load_all(run.config(), LoadPolicy::AbortOnError)
        .unwrap();

    assert_eq!(report.loaded.len(), 4);
    assert!(report.failures.is_empty());
    assert!(report.duplicates.is_empty());

    for n in 0..4 {
        let node = NodeId(n);
        for &(step, record) in run.records(node) {
            assert_eq!(stage.record(step, node).unwrap(), record);
        }
    }
    assert!(stage.check_consistency().is_consistent());
}

#[test]
fn legacy_index_records_have_no_extent() {
    let run = three_step_run(IndexStyle::Legacy);
    let stage = run.load_stage();
    let record = stage.record(StepId(50), NodeId(3)).unwrap();
    assert_eq!(record.extent, None);
    assert_eq!(record.position, run.records(NodeId(3))[1].1.position);
}

#[test]
fn duplicate_steps_keep_first_offset() {
    let run = three_step_run(IndexStyle::Legacy);
    let original = run.records(NodeId(1));
    let mut text = String::new();
    for (step, record) in original {
        text.push_str(&format!("{step} {}\n", record.position));
    }
    text.push_str("50 999999\n");
    run.write_index(NodeId(1), &text).unwrap();

    let mut stage = Stage::prepare(2, 2);
    let report = stage
        .load_all(run.config(), LoadPolicy::AbortOnError)
        .unwrap();

    assert_eq!(report.duplicates.len(), 1);
    let dup = report.duplicates[0];
    assert_eq!(dup.node, NodeId(1));
    assert_eq!(dup.step, StepId(50));
    assert_eq!(dup.ignored, OffsetRecord::at(999_999));
    assert_eq!(dup.line_number, 4);
    assert_eq!(stage.record(StepId(50), NodeId(1)).unwrap(), original[1].1);
}

#[test]
fn missing_index_aborts_by_default() {
    let run = three_step_run(IndexStyle::Legacy);
    run.remove_index(NodeId(2)).unwrap();

    let mut stage = Stage::prepare(2, 2);
    match stage.load_all(run.config(), LoadPolicy::AbortOnError) {
        Err(StageError::IndexFileNotFound { node, path }) => {
            assert_eq!(node, NodeId(2));
            assert_eq!(path, run.files().index_path(NodeId(2)));
        }
        other => panic!("expected IndexFileNotFound, got {other:?}"),
    }
}

#[test]
fn continue_on_error_loads_the_rest() {
    let run = three_step_run(IndexStyle::Legacy);
    run.remove_index(NodeId(2)).unwrap();
    run.write_index(NodeId(3), "0 0\n50 oops\n").unwrap();

    let mut stage = Stage::prepare(2, 2);
    let report = stage
        .load_all(run.config(), LoadPolicy::ContinueOnError)
        .unwrap();

    assert_eq!(report.loaded, vec![NodeId(0), NodeId(1)]);
    let failed: Vec<NodeId> = report.failures.iter().map(|(n, _)| *n).collect();
    assert_eq!(failed, vec![NodeId(2), NodeId(3)]);
    assert!(matches!(
        report.failures[1].1,
        StageError::MalformedIndexLine { line_number: 2, .. }
    ));

    // Lenient listing still works off node 0; strict listing refuses.
    assert_eq!(
        stage.available_steps(false).unwrap(),
        vec![StepId(0), StepId(50), StepId(100)]
    );
    assert!(matches!(
        stage.available_steps(true),
        Err(StageError::StepSetMismatch { node: NodeId(2), actual_count: 0, .. })
    ));
}

#[test]
fn strict_reader_reports_step_set_mismatch() {
    let mut run = three_step_run(IndexStyle::Legacy);
    let kept = &run.records(NodeId(1))[..2];
    let text: String = kept
        .iter()
        .map(|(step, record)| format!("{step} {}\n", record.position))
        .collect();
    run.write_index(NodeId(1), &text).unwrap();
    run.config_mut().strict_steps = true;

    let stage = run.load_stage();
    let reader = StageReader::new(&stage, run.config()).unwrap();
    match reader.available_steps() {
        Err(StageError::StepSetMismatch {
            node,
            expected_count,
            actual_count,
        }) => {
            assert_eq!(node, NodeId(1));
            assert_eq!(expected_count, 3);
            assert_eq!(actual_count, 2);
        }
        other => panic!("expected StepSetMismatch, got {other:?}"),
    }
}

#[test]
fn reload_after_clear() {
    let run = three_step_run(IndexStyle::Extended);
    let mut stage = run.load_stage();
    stage.clear();
    assert_eq!(stage.node_count(), 0);

    stage = Stage::prepare(2, 2);
    stage
        .load_all(run.config(), LoadPolicy::AbortOnError)
        .unwrap();
    assert_eq!(stage.loaded_nodes().len(), 4);
}
