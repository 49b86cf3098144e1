//! Multi-source resolution against the bundled archive and canned HTTP responses.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use drivegrade::providers::{
    ARCHIVE_PROVIDER, ArchiveTelemetryProvider, DirectorySessionArchive, JsonTransport, LEGACY_PROVIDER,
    LegacyResultsProvider, RealtimeApiProvider,
};
use drivegrade::{
    CalibrationProfile, DriveGradeError, DriveGradePipeline, EventType, LapDataProvider, MultiSourceFetcher,
    RaceDataProvider, resolve_lap_provider,
};
use serde_json::{Value, json};

/// Answers from canned documents keyed by URL suffix and fails everything else.
#[derive(Default)]
struct CannedTransport {
    responses: Vec<(&'static str, Value)>,
}

impl CannedTransport {
    fn with(mut self, suffix: &'static str, body: Value) -> Self {
        self.responses.push((suffix, body));
        self
    }
}

#[async_trait::async_trait]
impl JsonTransport for CannedTransport {
    async fn get_json(&self, url: &str, _query: &[(&str, String)]) -> drivegrade::Result<Value> {
        self.responses
            .iter()
            .find(|(suffix, _)| url.ends_with(suffix))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| DriveGradeError::provider_failed("canned", format!("{url} unreachable")))
    }
}

fn archive_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test-data/sessions")
}

fn archive(root: PathBuf) -> Arc<ArchiveTelemetryProvider> {
    Arc::new(ArchiveTelemetryProvider::new(
        Arc::new(DirectorySessionArchive::new(root)),
        Duration::from_secs(10),
    ))
}

fn offline_realtime() -> Arc<RealtimeApiProvider> {
    Arc::new(RealtimeApiProvider::new("https://realtime.invalid/v1", "Race", Arc::new(CannedTransport::default())))
}

fn legacy(transport: CannedTransport) -> Arc<LegacyResultsProvider> {
    Arc::new(LegacyResultsProvider::new("https://legacy.invalid/f1", Arc::new(transport)))
}

fn legacy_monaco() -> CannedTransport {
    let race = |extra: Value| {
        let mut race = json!({"season": "2024", "round": "8", "raceName": "Monaco Grand Prix",
                              "Circuit": {"circuitName": "Circuit de Monaco"}});
        if let (Some(race), Some(extra)) = (race.as_object_mut(), extra.as_object()) {
            race.extend(extra.clone());
        }
        json!({"MRData": {"RaceTable": {"Races": [race]}}})
    };
    CannedTransport::default()
        .with(
            "2024/8/results.json",
            race(json!({"Results": [
                {"number": "16", "position": "1", "grid": "1",
                 "Driver": {"driverId": "leclerc", "code": "LEC", "givenName": "Charles", "familyName": "Leclerc"},
                 "Constructor": {"name": "Ferrari"}},
                {"number": "81", "position": "2", "grid": "2",
                 "Driver": {"driverId": "piastri", "code": "PIA", "givenName": "Oscar", "familyName": "Piastri"},
                 "Constructor": {"name": "McLaren"}}
            ]})),
        )
        .with(
            "2024/8/laps.json",
            race(json!({"Laps": [
                {"number": "1", "Timings": [
                    {"driverId": "leclerc", "position": "1", "time": "1:20.000"},
                    {"driverId": "piastri", "position": "2", "time": "1:20.400"}
                ]}
            ]})),
        )
        .with("2024/8/pitstops.json", race(json!({"PitStops": []})))
}

#[tokio::test]
async fn archive_schedule_skips_testing() -> anyhow::Result<()> {
    let schedule = archive(archive_root()).fetch_schedule(2024).await?;

    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].round, 6);
    assert_eq!(schedule[0].slug, "miami_grand_prix");
    assert_eq!(schedule[0].circuit, "Miami International Autodrome");
    Ok(())
}

#[tokio::test]
async fn archived_weekend_detects_overtakes_and_scores() -> anyhow::Result<()> {
    let weekend = archive(archive_root()).fetch_weekend(2024, 6).await?;

    assert_eq!(weekend.source, ARCHIVE_PROVIDER);
    let drivers: Vec<&str> = weekend.drivers.iter().map(|entry| entry.driver.as_str()).collect();
    assert_eq!(drivers, vec!["NOR", "VER", "LEC"]);

    let norris = &weekend.drivers[0];
    assert_eq!(norris.grid_position, Some(5));
    assert_eq!(norris.strategy.actual_pit_laps, vec![4]);
    assert_eq!(norris.strategy.optimal_pit_laps, vec![4]);
    // The in-lap is the only lap far enough off the pace to count as a mistake
    assert_eq!(norris.penalties.len(), 1);
    assert_eq!(norris.overtakes.len(), 2);

    let pass = &norris.overtakes[0];
    assert_eq!(pass.lap_number, Some(2));
    assert_eq!(pass.opponent_driver.as_deref(), Some("LEC"));
    assert_eq!(pass.event_type, EventType::OnTrack.as_str());
    assert_eq!(pass.context.ers_delta, 7.0);
    assert_eq!(pass.context.tire_delta, 0.0);

    let undercut = &norris.overtakes[1];
    assert_eq!(undercut.lap_number, Some(4));
    assert_eq!(undercut.opponent_driver.as_deref(), Some("VER"));
    assert_eq!(undercut.event_type, EventType::PitCycle.as_str());

    let grades = DriveGradePipeline::new(Arc::new(CalibrationProfile::default())).run_weekend(&weekend)?;
    assert_eq!(grades.len(), 3);
    assert_eq!(grades.get("NOR").map(|b| (b.on_track_events(), b.pit_cycle_events())), Some((1, 1)));
    Ok(())
}

#[tokio::test]
async fn falls_back_past_missing_archive_and_offline_api() -> anyhow::Result<()> {
    drivegrade::logging::init_tracing();
    let fetcher = MultiSourceFetcher::new(vec![
        archive(PathBuf::from("/nonexistent/drivegrade/archive")),
        offline_realtime(),
        legacy(legacy_monaco()),
    ]);
    assert_eq!(fetcher.provider_names(), vec![ARCHIVE_PROVIDER, "realtime", LEGACY_PROVIDER]);
    assert_eq!(fetcher.available_providers().len(), 2);

    let weekend = fetcher.fetch_race(2024, 8).await?;
    assert_eq!(weekend.source, LEGACY_PROVIDER);
    assert_eq!(weekend.slug, "monaco_grand_prix");
    assert_eq!(weekend.drivers.len(), 2);

    let concurrent = fetcher.race_weekend(2024, 8).await?;
    assert_eq!(concurrent.source, LEGACY_PROVIDER);
    Ok(())
}

#[tokio::test]
async fn exhausted_providers_surface_an_error() {
    let fetcher = MultiSourceFetcher::new(vec![offline_realtime(), legacy(CannedTransport::default())]);

    assert!(fetcher.fetch_race(2024, 8).await.is_err());
    assert!(fetcher.fetch_schedule(2024).await.is_err());
}

#[tokio::test]
async fn laps_resolve_from_the_archive() -> anyhow::Result<()> {
    let providers: Vec<Arc<dyn LapDataProvider>> = vec![offline_realtime(), archive(archive_root())];
    let resolved = resolve_lap_provider(2024, 6, "R", &providers).await?;

    assert_eq!(resolved.provider_name, ARCHIVE_PROVIDER);
    assert_eq!(resolved.laps.len(), 18);
    let in_laps = resolved.laps.iter().filter(|lap| lap.pit_in).count();
    assert_eq!(in_laps, 3);
    Ok(())
}
