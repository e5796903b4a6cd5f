//! Prop aggregation and player-to-match assignment.
//!
//! Raw props arrive per platform with no match affiliation and, for most
//! sources, no team field either. The aggregator merges every platform's
//! lines into one record per player/stat, then hands each match the subset
//! of players that belong to it. When team matching finds nobody (no
//! source supplied usable team names), a chunked fallback distribution
//! guarantees every match still receives *some* roster: the global player
//! list is partitioned into consecutive chunks and one chunk is handed out
//! per match. Fallback rosters are best-effort filler, not ground truth.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::db::models::{DfsLine, Match, Platform, PropRecord};
use crate::engine::teams::teams_match;

/// One player's aggregated lines for a single stat type within a match.
#[derive(Debug, Clone)]
pub struct PlayerProps {
    pub player_name: String,
    pub team: String,
    pub stat_type: String,
    pub dfs_lines: Vec<DfsLine>,
}

#[derive(Debug, Clone)]
struct AggregatedPlayer {
    name: String,
    /// First non-empty team reported by any source
    team: Option<String>,
    /// stat_type -> platform lines, insertion-ordered by stat
    stats: Vec<StatLines>,
}

#[derive(Debug, Clone)]
struct StatLines {
    stat_type: String,
    /// At most one line per platform; a later report from the same
    /// platform replaces the earlier one.
    lines: Vec<DfsLine>,
}

/// Aggregates raw props for one refresh pass. The fallback cursor is
/// per-instance state, so concurrent pipelines (and tests) never share it;
/// one instance must only serve a single pass.
pub struct PropAggregator {
    players: Vec<AggregatedPlayer>,
    fallback_cursor: usize,
}

impl PropAggregator {
    /// Group all raw props by player, merging stat types and platform lines.
    /// Player discovery order is preserved: it drives the fallback partition.
    pub fn new(props: &[PropRecord]) -> Self {
        let mut players: Vec<AggregatedPlayer> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for prop in props {
            let idx = *index.entry(prop.player_name.clone()).or_insert_with(|| {
                players.push(AggregatedPlayer {
                    name: prop.player_name.clone(),
                    team: None,
                    stats: Vec::new(),
                });
                players.len() - 1
            });
            let player = &mut players[idx];

            if player.team.is_none() {
                if let Some(team) = prop.team.as_deref() {
                    if !team.trim().is_empty() {
                        player.team = Some(team.to_string());
                    }
                }
            }

            let line = DfsLine {
                platform: prop.platform,
                stat_type: prop.stat_type.clone(),
                line: prop.line,
                maps: prop.maps.clone().unwrap_or_else(|| "Map1+Map2".to_string()),
            };

            match player
                .stats
                .iter_mut()
                .find(|s| s.stat_type == prop.stat_type)
            {
                Some(stat) => {
                    match stat.lines.iter_mut().find(|l| l.platform == prop.platform) {
                        Some(existing) => *existing = line,
                        None => stat.lines.push(line),
                    }
                }
                None => player.stats.push(StatLines {
                    stat_type: prop.stat_type.clone(),
                    lines: vec![line],
                }),
            }
        }

        PropAggregator {
            players,
            fallback_cursor: 0,
        }
    }

    /// Total number of distinct players discovered across all sources.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Produce the per-player prop records that belong to the given match.
    ///
    /// Players whose reported team matches team1/team2 form the roster.
    /// When nobody matches, the next fallback chunk of the global player
    /// list is handed out instead, sized `max(10, total / 10)`.
    pub fn props_for_match(&mut self, m: &Match) -> Vec<PlayerProps> {
        let matched: Vec<usize> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                p.team
                    .as_deref()
                    .map(|t| teams_match(t, &m.team1) || teams_match(t, &m.team2))
                    .unwrap_or(false)
            })
            .map(|(i, _)| i)
            .collect();

        let (selected, by_team_match) = if !matched.is_empty() {
            (matched, true)
        } else {
            info!(
                "No team-matched players for {} vs {}, using fallback distribution",
                m.team1, m.team2
            );
            (self.next_fallback_chunk(), false)
        };

        let mut records = Vec::new();
        for (pos, &idx) in selected.iter().enumerate() {
            let player = &self.players[idx];
            let team = if by_team_match {
                let reported = player.team.as_deref().unwrap_or_default();
                if teams_match(reported, &m.team1) {
                    m.team1.clone()
                } else {
                    m.team2.clone()
                }
            } else if pos % 2 == 0 {
                // Fallback rosters carry no real affiliation; split the
                // chunk evenly across the two teams by list position.
                m.team1.clone()
            } else {
                m.team2.clone()
            };

            for stat in &player.stats {
                if stat.lines.is_empty() {
                    continue;
                }
                records.push(PlayerProps {
                    player_name: player.name.clone(),
                    team: team.clone(),
                    stat_type: stat.stat_type.clone(),
                    dfs_lines: stat.lines.clone(),
                });
            }
        }

        debug!(
            "Match {} vs {}: {} prop records ({})",
            m.team1,
            m.team2,
            records.len(),
            if by_team_match { "team-matched" } else { "fallback" }
        );
        records
    }

    /// Advance the fallback cursor by one chunk and return the player
    /// indices it covers. Called once per match that needed the fallback;
    /// successive calls consume the player list in order without overlap.
    fn next_fallback_chunk(&mut self) -> Vec<usize> {
        let total = self.players.len();
        if total == 0 {
            return Vec::new();
        }
        let chunk_size = (total / 10).max(10);
        let start = self.fallback_cursor;
        let end = (start + chunk_size).min(total);
        self.fallback_cursor = end.max(start);
        if start >= total {
            return Vec::new();
        }
        (start..end).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::MatchStatus;
    use chrono::Utc;

    fn prop(player: &str, stat: &str, line: f64, platform: Platform, team: Option<&str>) -> PropRecord {
        PropRecord {
            player_name: player.to_string(),
            stat_type: stat.to_string(),
            line,
            platform,
            team: team.map(str::to_string),
            maps: None,
        }
    }

    fn make_match(team1: &str, team2: &str) -> Match {
        Match {
            id: "m1".into(),
            team1: team1.to_string(),
            team2: team2.to_string(),
            tournament: "IEM".into(),
            start_time: Utc::now(),
            map1: "TBD".into(),
            map2: "TBD".into(),
            status: MatchStatus::Upcoming,
        }
    }

    #[test]
    fn merges_platform_lines_per_stat() {
        let props = vec![
            prop("s1mple", "kills", 45.5, Platform::Prizepicks, Some("Natus Vincere")),
            prop("s1mple", "kills", 44.0, Platform::Underdog, Some("Natus Vincere")),
            prop("s1mple", "headshots", 21.5, Platform::Prizepicks, Some("Natus Vincere")),
        ];
        let mut agg = PropAggregator::new(&props);
        let m = make_match("Natus Vincere", "FaZe Clan");
        let records = agg.props_for_match(&m);

        // Stat-type set is the union across platforms
        let stats: Vec<&str> = records.iter().map(|r| r.stat_type.as_str()).collect();
        assert_eq!(stats, vec!["kills", "headshots"]);

        let kills = &records[0];
        assert_eq!(kills.dfs_lines.len(), 2);
        assert_eq!(kills.team, "Natus Vincere");
    }

    #[test]
    fn later_report_from_same_platform_replaces_line() {
        let props = vec![
            prop("ZywOo", "kills", 46.0, Platform::Prizepicks, Some("Vitality")),
            prop("ZywOo", "kills", 47.5, Platform::Prizepicks, Some("Vitality")),
        ];
        let mut agg = PropAggregator::new(&props);
        let records = agg.props_for_match(&make_match("Vitality", "MOUZ"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].dfs_lines.len(), 1);
        assert!((records[0].dfs_lines[0].line - 47.5).abs() < 1e-9);
    }

    #[test]
    fn roster_filtered_by_team_match() {
        let props = vec![
            prop("s1mple", "kills", 45.5, Platform::Prizepicks, Some("NAVI")),
            prop("rain", "kills", 38.0, Platform::Prizepicks, Some("FaZe")),
            prop("NiKo", "kills", 42.0, Platform::Prizepicks, Some("G2 Esports")),
        ];
        let mut agg = PropAggregator::new(&props);
        let records = agg.props_for_match(&make_match("FaZe Clan", "Astralis"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].player_name, "rain");
        assert_eq!(records[0].team, "FaZe Clan");
    }

    #[test]
    fn fallback_chunks_are_consecutive_and_disjoint() {
        // 25 players with no team info: chunk size max(10, 25/10) = 10,
        // so three matches consume 10 + 10 + 5 players, a fourth gets none.
        let props: Vec<PropRecord> = (0..25)
            .map(|i| prop(&format!("player{i:02}"), "kills", 40.0, Platform::Prizepicks, None))
            .collect();
        let mut agg = PropAggregator::new(&props);

        let mut seen: Vec<String> = Vec::new();
        let mut sizes = Vec::new();
        for _ in 0..3 {
            let roster = agg.props_for_match(&make_match("Alpha", "Beta"));
            let mut names: Vec<String> =
                roster.iter().map(|r| r.player_name.clone()).collect();
            sizes.push(names.len());
            for n in &names {
                assert!(!seen.contains(n), "player {n} assigned twice");
            }
            seen.append(&mut names);
        }
        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(seen.len(), 25);
        // Consumed in discovery order
        assert_eq!(seen[0], "player00");
        assert_eq!(seen[24], "player24");

        let fourth = agg.props_for_match(&make_match("Alpha", "Beta"));
        assert!(fourth.is_empty());
    }

    #[test]
    fn fallback_splits_teams_by_list_position() {
        let props: Vec<PropRecord> = (0..4)
            .map(|i| prop(&format!("p{i}"), "kills", 40.0, Platform::Prizepicks, None))
            .collect();
        let mut agg = PropAggregator::new(&props);
        let records = agg.props_for_match(&make_match("Alpha", "Beta"));
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].team, "Alpha");
        assert_eq!(records[1].team, "Beta");
        assert_eq!(records[2].team, "Alpha");
        assert_eq!(records[3].team, "Beta");
    }

    #[test]
    fn team_match_does_not_advance_fallback_cursor() {
        let mut props: Vec<PropRecord> = (0..12)
            .map(|i| prop(&format!("p{i}"), "kills", 40.0, Platform::Prizepicks, None))
            .collect();
        props.push(prop("s1mple", "kills", 45.0, Platform::Prizepicks, Some("NAVI")));
        let mut agg = PropAggregator::new(&props);

        // Matched roster first: cursor must stay put
        let matched = agg.props_for_match(&make_match("NAVI", "FaZe"));
        assert_eq!(matched.len(), 1);

        let fallback = agg.props_for_match(&make_match("Alpha", "Beta"));
        assert_eq!(fallback[0].player_name, "p0");
    }

    #[test]
    fn no_players_means_empty_roster() {
        let mut agg = PropAggregator::new(&[]);
        assert!(agg.props_for_match(&make_match("Alpha", "Beta")).is_empty());
        assert_eq!(agg.player_count(), 0);
    }
}
