//! Race naming and circuit characteristics shared by all providers

/// Overtaking difficulty used when a circuit is not in the table.
pub const DEFAULT_TRACK_DIFFICULTY: f64 = 0.5;

const TRACK_DIFFICULTY: &[(&str, f64)] = &[
    ("monaco_grand_prix", 0.95),
    ("monaco", 0.95),
    ("singapore_grand_prix", 0.85),
    ("hungarian_grand_prix", 0.75),
    ("dutch_grand_prix", 0.7),
    ("japanese_grand_prix", 0.65),
    ("belgian_grand_prix", 0.65),
    ("emilia_romagna_grand_prix", 0.65),
    ("azerbaijan_grand_prix", 0.6),
    ("spanish_grand_prix", 0.6),
    ("são_paulo_grand_prix", 0.55),
    ("australian_grand_prix", 0.55),
    ("canadian_grand_prix", 0.55),
    ("british_grand_prix", 0.55),
    ("bahrain_grand_prix", 0.5),
    ("chinese_grand_prix", 0.5),
    ("qatar_grand_prix", 0.5),
    ("united_states_grand_prix", 0.5),
    ("austrian_grand_prix", 0.5),
    ("miami_grand_prix", 0.45),
    ("abu_dhabi_grand_prix", 0.45),
    ("mexico_city_grand_prix", 0.45),
    ("saudi_arabian_grand_prix", 0.4),
    ("las_vegas_grand_prix", 0.4),
    ("italian_grand_prix", 0.35),
];

/// How hard it is to pass at a circuit, keyed by race slug.
pub fn track_difficulty(slug: &str) -> f64 {
    TRACK_DIFFICULTY
        .iter()
        .find(|(key, _)| *key == slug)
        .map(|(_, difficulty)| *difficulty)
        .unwrap_or(DEFAULT_TRACK_DIFFICULTY)
}

/// Filesystem and lookup friendly identifier for a race name.
///
/// ```rust
/// use drivegrade::providers::slugify_race;
///
/// assert_eq!(slugify_race("Emilia-Romagna Grand Prix"), "emilia_romagna_grand_prix");
/// assert_eq!(slugify_race("  "), "race");
/// ```
pub fn slugify_race(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().to_lowercase().chars() {
        match ch {
            '\'' => {}
            ' ' | '/' | '-' | '.' | '(' | ')' | '_' => {
                if !slug.ends_with('_') {
                    slug.push('_');
                }
            }
            other => slug.push(other),
        }
    }
    let slug = slug.trim_matches('_');
    if slug.is_empty() { "race".to_string() } else { slug.to_string() }
}

/// Softness rank of a tyre compound; 0 for unknown compounds.
pub fn compound_rank(compound: &str) -> i32 {
    match compound.trim().to_uppercase().as_str() {
        "HARD" | "C1" | "WET" => 1,
        "MEDIUM" | "C2" | "INTERMEDIATE" => 2,
        "SOFT" | "C3" | "C4" | "C5" => 3,
        _ => 0,
    }
}

/// Parse a lap time written as seconds or `m:ss.sss` (`h:mm:ss.sss` also accepted).
pub fn lap_time_to_seconds(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let mut total = 0.0;
    for part in text.split(':') {
        let value: f64 = part.trim().parse().ok()?;
        total = total * 60.0 + value;
    }
    total.is_finite().then_some(total)
}
