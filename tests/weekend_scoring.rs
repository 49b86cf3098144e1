//! End-to-end scoring of the bundled sample weekend in both on-disk formats.

use std::sync::Arc;

use drivegrade::ingest::{
    TableFormat, WeekendTableLoader, build_tables, load_weekend_file, write_tables,
};
use drivegrade::season::InputFormat;
use drivegrade::{CalibrationProfile, DriveGradePipeline, ErrorKind, SeasonRunner};

const SAMPLE_JSON: &str = "test-data/weekends/sample_weekend.json";
const SAMPLE_TABLES: &str = "test-data/weekends/sample_weekend_tables";

fn fixture(relative: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(relative)
}

fn pipeline() -> DriveGradePipeline {
    DriveGradePipeline::new(Arc::new(CalibrationProfile::default()))
}

#[test]
fn json_and_tables_describe_the_same_weekend() -> anyhow::Result<()> {
    let from_json = load_weekend_file(fixture(SAMPLE_JSON))?;
    let from_tables = WeekendTableLoader::new(fixture(SAMPLE_TABLES))?.build_driver_inputs()?;

    assert_eq!(from_json.len(), 4);
    assert_eq!(from_json, from_tables);
    Ok(())
}

#[test]
fn both_formats_grade_identically() -> anyhow::Result<()> {
    let runner = SeasonRunner::new(pipeline());
    let json = runner.run_race(fixture(SAMPLE_JSON), None)?;
    let tables = runner.run_race(fixture(SAMPLE_TABLES), Some(InputFormat::Tables))?;

    assert_eq!(json.drivers().collect::<Vec<_>>(), vec!["VER", "NOR", "HAM", "SAR"]);
    for grade in json.iter() {
        let other = tables.get(&grade.driver).expect("driver graded from tables");
        assert!((grade.breakdown.total_grade() - other.total_grade()).abs() < 1e-12);
    }
    Ok(())
}

#[test]
fn sample_grades_are_bounded_and_ordered() -> anyhow::Result<()> {
    let grades = pipeline().run_from_json(fixture(SAMPLE_JSON))?;

    for grade in grades.iter() {
        let breakdown = &grade.breakdown;
        for score in [
            breakdown.consistency_score(),
            breakdown.team_strategy_score(),
            breakdown.racecraft_score(),
            breakdown.penalty_score(),
            breakdown.total_grade(),
        ] {
            assert!((0.0..=1.0).contains(&score), "{} out of range: {score}", grade.driver);
        }
    }

    let ver = grades.get("VER").expect("VER graded");
    let sar = grades.get("SAR").expect("SAR graded");
    assert!(ver.total_grade() > sar.total_grade());
    assert_eq!(ver.penalty_score(), 0.0);
    assert!(sar.penalty_score() > 0.0);
    assert_eq!(grades.get("NOR").map(|b| b.pit_cycle_events()), Some(1));
    assert_eq!(ver.on_track_events(), 1);
    Ok(())
}

#[test]
fn exported_tables_reload_to_the_same_grades() -> anyhow::Result<()> {
    let inputs = load_weekend_file(fixture(SAMPLE_JSON))?;
    for format in [TableFormat::Csv, TableFormat::Parquet] {
        let dir = tempfile::tempdir()?;
        write_tables(&build_tables(&inputs), dir.path(), format)?;

        let reloaded = WeekendTableLoader::new(dir.path())?.build_driver_inputs()?;
        assert_eq!(pipeline().score_inputs(&inputs), pipeline().score_inputs(&reloaded));
    }
    Ok(())
}

#[test]
fn duplicate_driver_weekend_is_rejected() -> anyhow::Result<()> {
    let text = std::fs::read_to_string(fixture(SAMPLE_JSON))?;
    let mut weekend: serde_json::Value = serde_json::from_str(&text)?;
    let drivers = weekend["drivers"].as_array_mut().expect("drivers array");
    let first = drivers[0].clone();
    drivers.push(first);

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("duplicate.json");
    std::fs::write(&path, serde_json::to_string(&weekend)?)?;
    let error = load_weekend_file(&path).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert!(error.to_string().contains("Duplicate driver 'VER'"), "{error}");
    Ok(())
}

#[test]
fn season_skips_testing_and_exports_summary() -> anyhow::Result<()> {
    let runner = SeasonRunner::new(pipeline());
    let season = runner.run_season([
        ("pre_season_testing", fixture(SAMPLE_JSON)),
        ("bahrain_grand_prix", fixture(SAMPLE_JSON)),
        ("saudi_arabian_grand_prix", fixture(SAMPLE_TABLES)),
    ])?;

    assert_eq!(season.races().len(), 2);
    let ver = season.driver("VER").expect("VER in summary");
    assert_eq!(ver.races, 2);
    let averages: Vec<f64> = season.summary_rows().iter().map(|row| row.average_grade).collect();
    assert!(averages.windows(2).all(|pair| pair[0] >= pair[1]));

    let out = tempfile::tempdir()?;
    let written = season.save_outputs(out.path())?;
    assert_eq!(written.len(), 2);
    let summary = std::fs::read_to_string(out.path().join(drivegrade::season::SEASON_SUMMARY_FILE))?;
    assert!(summary.lines().next().is_some_and(|header| header.starts_with("driver,")));
    assert_eq!(summary.lines().count(), 5);
    Ok(())
}
