//! Race data provider implementations
//!
//! - [`ArchiveTelemetryProvider`] archived sessions with lap-level telemetry (richest)
//! - [`RealtimeApiProvider`] real-time timing REST API
//! - [`LegacyResultsProvider`] legacy results API (classification, laps and pit stops only)
//!
//! All three produce [`WeekendDescriptor`](crate::schema::WeekendDescriptor)s with
//! team-anchored car pace; [`crate::resolver`] chains them with fallback.

mod archive;
mod http;
mod legacy;
mod metrics;
mod overtakes;
mod realtime;
mod track;

pub use archive::{
    ARCHIVE_PROVIDER, ArchiveTelemetryProvider, ArchivedEvent, ArchivedSession, DirectorySessionArchive,
    RACE_SESSION, SessionArchive, SessionResult, ThrottleSample, TimedLap, session_file_stem,
};
pub use http::{HttpTransport, JsonTransport, join_url};
pub use legacy::{LEGACY_PROVIDER, LegacyResultsProvider};
pub use overtakes::{DetectedOvertake, detect_overtakes};
pub use realtime::{REALTIME_PROVIDER, RealtimeApiProvider};
pub use track::{
    DEFAULT_TRACK_DIFFICULTY, compound_rank, lap_time_to_seconds, slugify_race, track_difficulty,
};
