//! Human-readable and structured summaries of an [`AggregateResult`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::aggregate::{AggregateResult, Outcome};
use crate::tables::EntityTables;

const TOP_WINNERS: usize = 5;
const UNKNOWN_TEAM: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinnerLine {
    pub driver: String,
    pub team: String,
    pub win: f64,
    pub podium: f64,
    pub points: f64,
    pub championship_position: Option<u32>,
    pub championship_points: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamLine {
    pub team: String,
    pub win: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub track: String,
    pub num_simulations: usize,
    pub top_winners: Vec<WinnerLine>,
    pub team_win_probabilities: Vec<TeamLine>,
}

/// Builds the report for one result. No side effects; same input, same output.
pub fn summarize(result: &AggregateResult, tables: &EntityTables) -> Summary {
    let mut ranked: Vec<(&String, f64)> = result.win_probabilities.iter().map(|(k, v)| (k, *v)).collect();
    ranked.sort_by(|a, b| descending(a.1, b.1).then_with(|| a.0.cmp(b.0)));

    let top_winners = ranked
        .into_iter()
        .take(TOP_WINNERS)
        .map(|(name, win)| {
            let profile = tables.get_driver_profile(name).ok();
            WinnerLine {
                driver: name.clone(),
                team: profile.map_or_else(|| UNKNOWN_TEAM.to_string(), |d| d.team.clone()),
                win,
                podium: result.frequency(Outcome::Podium, name).unwrap_or(0.0),
                points: result.frequency(Outcome::Points, name).unwrap_or(0.0),
                championship_position: profile.map(|d| d.championship_position),
                championship_points: profile.map(|d| d.championship_points),
            }
        })
        .collect();

    let mut by_team: BTreeMap<String, f64> = BTreeMap::new();
    for (name, win) in &result.win_probabilities {
        let team = tables
            .get_driver_profile(name)
            .map_or_else(|_| UNKNOWN_TEAM.to_string(), |d| d.team.clone());
        *by_team.entry(team).or_insert(0.0) += win;
    }
    let mut team_win_probabilities: Vec<TeamLine> =
        by_team.into_iter().map(|(team, win)| TeamLine { team, win }).collect();
    team_win_probabilities.sort_by(|a, b| descending(a.win, b.win).then_with(|| a.team.cmp(&b.team)));

    Summary {
        track: result.track.clone(),
        num_simulations: result.num_simulations,
        top_winners,
        team_win_probabilities,
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

fn with_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "F1 Race Prediction - {}", self.track)?;
        writeln!(f, "Based on {} Monte Carlo simulations", with_thousands(self.num_simulations))?;
        writeln!(f)?;
        writeln!(f, "Top {} Most Likely Winners:", self.top_winners.len())?;
        for (i, line) in self.top_winners.iter().enumerate() {
            writeln!(
                f,
                "{}. {} ({}): {:.1}% win, {:.1}% podium",
                i + 1,
                line.driver,
                line.team,
                line.win * 100.0,
                line.podium * 100.0
            )?;
            if let (Some(pos), Some(pts)) = (line.championship_position, line.championship_points) {
                writeln!(f, "   Championship: #{} ({} pts)", pos, pts)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> AggregateResult {
        let win = [("Max Verstappen", 0.5), ("Lando Norris", 0.3), ("Oscar Piastri", 0.1), ("Yuki Tsunoda", 0.0)];
        let podium = [("Max Verstappen", 0.9), ("Lando Norris", 0.8), ("Oscar Piastri", 0.7), ("Yuki Tsunoda", 0.6)];
        let to_map = |items: &[(&str, f64)]| items.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        AggregateResult {
            track: "Monaco".to_string(),
            num_simulations: 12000,
            win_probabilities: to_map(&win[..]),
            podium_probabilities: to_map(&podium[..]),
            points_probabilities: to_map(&podium[..]),
            race_results: Vec::new(),
            seed: Some(3),
        }
    }

    #[test]
    fn test_summary_ranks_winners() {
        let tables = EntityTables::builtin().unwrap();
        let summary = summarize(&fixture(), &tables);

        let names: Vec<&str> = summary.top_winners.iter().map(|w| w.driver.as_str()).collect();
        assert_eq!(names, vec!["Max Verstappen", "Lando Norris", "Oscar Piastri", "Yuki Tsunoda"]);
        assert_eq!(summary.top_winners[1].team, "McLaren");
        assert_eq!(summary.top_winners[0].championship_points, Some(314));

        assert_eq!(summary.team_win_probabilities[0].team, "Red Bull Racing");
        assert!((summary.team_win_probabilities[0].win - 0.5).abs() < 1e-12);
        assert_eq!(summary.team_win_probabilities[1].team, "McLaren");
        assert!((summary.team_win_probabilities[1].win - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_text_rendering() {
        let tables = EntityTables::builtin().unwrap();
        let text = summarize(&fixture(), &tables).to_string();
        assert!(text.starts_with("F1 Race Prediction - Monaco\n"));
        assert!(text.contains("Based on 12,000 Monte Carlo simulations"));
        assert!(text.contains("1. Max Verstappen (Red Bull Racing): 50.0% win, 90.0% podium"));
        assert!(text.contains("   Championship: #1 (314 pts)"));
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let tables = EntityTables::builtin().unwrap();
        let result = fixture();
        let first = summarize(&result, &tables);
        let second = summarize(&result, &tables);
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn test_foreign_driver_renders_unknown_team() {
        let tables = EntityTables::builtin().unwrap();
        let mut result = fixture();
        result.win_probabilities.insert("Test Driver".to_string(), 0.9);
        let summary = summarize(&result, &tables);
        assert_eq!(summary.top_winners[0].team, "Unknown");
        assert_eq!(summary.top_winners[0].championship_position, None);
    }

    #[test]
    fn test_thousands_separator() {
        assert_eq!(with_thousands(7), "7");
        assert_eq!(with_thousands(1000), "1,000");
        assert_eq!(with_thousands(1234567), "1,234,567");
    }
}
