//! Canonical stat-type vocabulary.
//!
//! DFS platforms label the same stat every possible way ("Kills",
//! "MAPS 1-2 Kills", "HS%", "Headshots (Maps 1+2)"). Everything downstream
//! keys on the canonical names, so normalization happens once at the
//! ingestion boundary.

/// Map an arbitrary source stat label onto the canonical vocabulary.
///
/// Case-insensitive substring match: anything containing "kill" becomes
/// `kills`, anything containing "headshot" or "hs" becomes `headshots`.
/// Unrecognized labels pass through lower-cased. Idempotent.
pub fn normalize_stat_type(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.contains("kill") {
        "kills".to_string()
    } else if lower.contains("headshot") || lower.contains("hs") {
        "headshots".to_string()
    } else {
        lower
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kills_variants() {
        assert_eq!(normalize_stat_type("kill"), "kills");
        assert_eq!(normalize_stat_type("Kills"), "kills");
        assert_eq!(normalize_stat_type("MAPS 1-2 Kills"), "kills");
    }

    #[test]
    fn headshot_variants() {
        assert_eq!(normalize_stat_type("Headshots"), "headshots");
        assert_eq!(normalize_stat_type("HS%"), "headshots");
        assert_eq!(normalize_stat_type("headshot count"), "headshots");
    }

    #[test]
    fn unknown_passes_through_lowercased() {
        assert_eq!(normalize_stat_type("Assists"), "assists");
        assert_eq!(normalize_stat_type(""), "");
    }

    #[test]
    fn idempotent() {
        for raw in ["Kills", "HS%", "Assists", "first bloods", ""] {
            let once = normalize_stat_type(raw);
            assert_eq!(normalize_stat_type(&once), once);
        }
    }
}
