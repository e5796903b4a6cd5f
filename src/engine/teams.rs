//! Team-name fuzzy matching.
//!
//! Feed sources never agree on team naming ("NAVI", "Natus Vincere",
//! "natus-vincere"). Matching is deliberately simple: strip separators,
//! lowercase, and test substring containment in either direction. That
//! handles the common "FaZe" vs "FaZe Clan" case; a short tag colliding
//! with an unrelated team is an accepted false-positive risk.

/// Normalize a team name for comparison: drop spaces, hyphens and
/// underscores, lowercase the rest.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Whether two team names refer to the same team: one normalized name
/// must contain the other. Symmetric; empty names never match.
pub fn teams_match(a: &str, b: &str) -> bool {
    let na = normalize_name(a);
    let nb = normalize_name(b);
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    na.contains(&nb) || nb.contains(&na)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_separators() {
        assert_eq!(normalize_name("Natus Vincere"), "natusvincere");
        assert_eq!(normalize_name("natus-vincere"), "natusvincere");
        assert_eq!(normalize_name("G2_Esports"), "g2esports");
    }

    #[test]
    fn exact_match() {
        assert!(teams_match("FaZe Clan", "faze clan"));
    }

    #[test]
    fn substring_match() {
        assert!(teams_match("FaZe", "FaZe Clan"));
        assert!(teams_match("Natus Vincere", "natus-vincere-junior"));
    }

    #[test]
    fn no_match_for_unrelated_teams() {
        assert!(!teams_match("Vitality", "Astralis"));
    }

    #[test]
    fn empty_never_matches() {
        assert!(!teams_match("", "FaZe"));
        assert!(!teams_match("FaZe", ""));
        assert!(!teams_match("", ""));
    }

    #[test]
    fn symmetry() {
        let pairs = [
            ("FaZe", "FaZe Clan"),
            ("Vitality", "Astralis"),
            ("G2", "G2 Esports"),
            ("", "MOUZ"),
        ];
        for (a, b) in pairs {
            assert_eq!(teams_match(a, b), teams_match(b, a), "{a:?} vs {b:?}");
        }
    }
}
