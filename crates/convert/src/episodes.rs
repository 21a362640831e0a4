use std::collections::BTreeMap;
use std::fmt;
use log::{debug, warn};
use regex::Regex;
use crate::filename::{parse_filename, FilenamePattern};
use crate::naming::{normalize_rip_name, split_extension};

/// `S01D02` marker that ends the free-text part of a normalized rip name
const DISC_MARKER: &str = r"s\d+d\d+";

/// One file within a disc
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleEntry {
    pub filename: String,
    pub qty: u32,
    /// Explicit episode number from the filename, 0 when absent
    pub episode_hint: u32,
}

/// title number -> entry
pub type DiscGroup = BTreeMap<u32, TitleEntry>;
/// disc number (0 for episode-numbered files) -> titles
pub type SeasonGroup = BTreeMap<u32, DiscGroup>;

/// Final identity of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeAssignment {
    pub series: String,
    pub season: u32,
    pub first_episode: u32,
    pub last_episode: u32,
    /// Free text between the series name and the disc marker
    pub descriptor: Option<String>,
    /// Original extension including the dot
    pub extension: String,
    /// Filename as found in the series directory
    pub source_name: String,
}

impl EpisodeAssignment {
    /// e.g. `Show - s01e03-e04 - Pilot.mkv`
    pub fn output_name(&self) -> String {
        let mut name = format!("{} - s{:02}e{:02}", self.series, self.season, self.first_episode);
        if self.last_episode > self.first_episode {
            name.push_str(&format!("-e{:02}", self.last_episode));
        }
        if let Some(descriptor) = &self.descriptor {
            name.push_str(" - ");
            name.push_str(descriptor);
        }
        name.push_str(&self.extension);
        name
    }
}

/// Disc number the season's sequence expected but did not find
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDisc {
    pub series: String,
    pub season: u32,
    pub disc: u32,
}

impl fmt::Display for MissingDisc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} season {}: missing disc {}", self.series, self.season, self.disc)
    }
}

/// Numbering result for one series directory
#[derive(Debug, Clone, Default)]
pub struct SeriesPlan {
    /// In processing order: season, then disc, then title
    pub assignments: Vec<EpisodeAssignment>,
    pub warnings: Vec<MissingDisc>,
}

/// Group recognised filenames into season -> disc -> title.
///
/// Later names win when two files claim the same title, so callers should pass
/// names in a stable order.
pub fn group_titles<'a, I>(names: I) -> BTreeMap<u32, SeasonGroup>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seasons: BTreeMap<u32, SeasonGroup> = BTreeMap::new();

    for name in names {
        let parsed = parse_filename(name);
        let (season, disc, title, episode_hint) = match parsed.pattern {
            FilenamePattern::Episode { season, episode } => (season, 0, episode, episode),
            FilenamePattern::DiscTitle { season, disc, title } => (season, disc, title, 0),
            FilenamePattern::Unrecognized => {
                debug!("Ignoring {}: not a rip name", name);
                continue;
            }
        };

        let previous = seasons.entry(season).or_default().entry(disc).or_default().insert(
            title,
            TitleEntry { filename: name.to_string(), qty: parsed.qty, episode_hint },
        );
        if let Some(previous) = previous {
            warn!("{} replaces {} as season {} disc {} title {}", name, previous.filename, season, disc, title);
        }
    }

    seasons
}

/// Text between the series name and the disc marker of a normalized name
pub fn extract_descriptor(series: &str, normalized_name: &str) -> Option<String> {
    // (?i)^<series>(.+)s\d+d\d+ with a greedy capture
    let pattern = format!("(?i)^{}(.+){}", regex::escape(series), DISC_MARKER);
    let re = Regex::new(&pattern).ok()?;
    let captured = re.captures(normalized_name)?.get(1)?.as_str();

    let descriptor = captured.trim_matches(|c: char| c == ' ' || c == '-');
    if descriptor.is_empty() {
        None
    } else {
        Some(descriptor.to_string())
    }
}

/// Reconstruct season/episode identity for every rip file in a series directory.
///
/// Seasons, discs and titles are walked in ascending order and episodes are
/// handed out consecutively. Explicit episode numbers (`s01e05`) reset the
/// counter and `x2` titles span several episodes.
pub fn plan_series<'a, I>(series: &str, names: I) -> SeriesPlan
where
    I: IntoIterator<Item = &'a str>,
{
    let mut sorted: Vec<&str> = names.into_iter().collect();
    sorted.sort_unstable();

    let mut plan = SeriesPlan::default();

    for (season, discs) in group_titles(sorted) {
        let mut episode = 1u32;
        let mut expected_disc = 0u32;

        for (disc, titles) in discs {
            // every disc key counts, episode-numbered files (disc 0) included;
            // the expected counter never resyncs to the actual disc
            expected_disc = expected_disc.saturating_add(1);
            if expected_disc != disc {
                let gap = MissingDisc { series: series.to_string(), season, disc: expected_disc };
                warn!("{}", gap);
                plan.warnings.push(gap);
            }

            for (_, entry) in titles {
                if entry.episode_hint != 0 {
                    episode = entry.episode_hint;
                }
                let first_episode = episode;
                let last_episode = episode.saturating_add(entry.qty - 1);
                episode = episode.saturating_add(entry.qty);

                let normalized = normalize_rip_name(&entry.filename);
                let extension = split_extension(&entry.filename).1.to_string();

                plan.assignments.push(EpisodeAssignment {
                    series: series.to_string(),
                    season,
                    first_episode,
                    last_episode,
                    descriptor: extract_descriptor(series, &normalized),
                    extension,
                    source_name: entry.filename,
                });
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn episodes(plan: &SeriesPlan) -> Vec<(u32, u32, u32)> {
        plan.assignments
            .iter()
            .map(|a| (a.season, a.first_episode, a.last_episode))
            .collect()
    }

    #[test]
    fn test_discs_and_titles_numbered_in_order() {
        let names = [
            "show_s01d02_t01.mkv",
            "show_s01d01_t02.mkv",
            "show_s01d01_t01.mkv",
            "show_s02d01_t05.mkv",
        ];
        let plan = plan_series("Show", names);

        assert_eq!(episodes(&plan), vec![(1, 1, 1), (1, 2, 2), (1, 3, 3), (2, 1, 1)]);
        assert_eq!(plan.assignments[0].source_name, "show_s01d01_t01.mkv");
        assert_eq!(plan.assignments[2].source_name, "show_s01d02_t01.mkv");
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_multi_episode_title() {
        let names = ["show_s01d01_t01x2.mkv", "show_s01d01_t02.mkv"];
        let plan = plan_series("Show", names);

        assert_eq!(episodes(&plan), vec![(1, 1, 2), (1, 3, 3)]);
        assert_eq!(plan.assignments[0].output_name(), "Show - s01e01-e02.mkv");
        assert_eq!(plan.assignments[1].output_name(), "Show - s01e03.mkv");
    }

    #[test]
    fn test_episode_hint_overrides_counter() {
        // counter reaches 3 on disc 1, then the hinted file resumes at 5
        let names = ["show_s01d01_t01x2.mkv", "show_s01e05.mkv"];
        let plan = plan_series("Show", names);
        assert_eq!(episodes(&plan), vec![(1, 5, 5), (1, 6, 7)]);

        let names = ["show_s01e05x2.mkv"];
        let plan = plan_series("Show", names);
        assert_eq!(episodes(&plan), vec![(1, 5, 6)]);
    }

    #[test]
    fn test_hint_resumes_after_running_counter() {
        // counter sits at 3 after the double episode, the next file jumps to 5
        let plan = plan_series("Show", ["show_s01e01x2.mkv", "show_s01e05.mkv", "show_s01d01_t01.mkv"]);
        assert_eq!(episodes(&plan), vec![(1, 1, 2), (1, 5, 5), (1, 6, 6)]);
    }

    #[test]
    fn test_missing_disc_warns_once_and_keeps_numbering() {
        let names = ["show_s01d01_t01.mkv", "show_s01d03_t01.mkv", "show_s01d03_t02.mkv"];
        let plan = plan_series("Show", names);

        assert_eq!(plan.warnings.len(), 1);
        assert_eq!(plan.warnings[0].disc, 2);
        assert_eq!(plan.warnings[0].to_string(), "Show season 1: missing disc 2");
        assert_eq!(episodes(&plan), vec![(1, 1, 1), (1, 2, 2), (1, 3, 3)]);
    }

    #[test]
    fn test_expected_disc_does_not_resync_after_gap() {
        let names = ["s_s01d01_t01.mkv", "s_s01d03_t01.mkv", "s_s01d04_t01.mkv"];
        let plan = plan_series("S", names);

        let missing: Vec<u32> = plan.warnings.iter().map(|w| w.disc).collect();
        assert_eq!(missing, vec![2, 3]);
        assert_eq!(episodes(&plan), vec![(1, 1, 1), (1, 2, 2), (1, 3, 3)]);
    }

    #[test]
    fn test_episode_files_count_as_disc_zero() {
        let plan = plan_series("Show", ["show_s01e01.mkv", "show_s01e02.mkv"]);
        assert_eq!(plan.warnings.iter().map(|w| w.disc).collect::<Vec<_>>(), vec![1]);
        assert_eq!(episodes(&plan), vec![(1, 1, 1), (1, 2, 2)]);
    }

    #[test]
    fn test_mixed_episode_and_disc_files_warn_per_disc() {
        let plan = plan_series("S", ["s_s01e01.mkv", "s_s01d01_t01.mkv"]);

        let missing: Vec<u32> = plan.warnings.iter().map(|w| w.disc).collect();
        assert_eq!(missing, vec![1, 2]);
        assert!(plan.warnings.iter().all(|w| w.season == 1 && w.series == "S"));
        // disc 0 first, then the running counter continues on disc 1
        assert_eq!(episodes(&plan), vec![(1, 1, 1), (1, 2, 2)]);
    }

    #[test]
    fn test_expected_disc_restarts_each_season() {
        let plan = plan_series("S", ["s_s01d01_t01.mkv", "s_s02d01_t01.mkv", "s_s02d02_t01.mkv"]);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_unrecognized_names_ignored() {
        let plan = plan_series("Show", ["notes.txt", "Completed", "show_s01d01_t01.mkv"]);
        assert_eq!(plan.assignments.len(), 1);
    }

    #[test]
    fn test_descriptor_extraction() {
        let plan = plan_series("Show", ["Show_-_The_Lost_Years_s01d01_t00.mkv"]);
        assert_eq!(plan.assignments[0].descriptor.as_deref(), Some("The Lost Years"));
        assert_eq!(plan.assignments[0].output_name(), "Show - s01e01 - The Lost Years.mkv");
    }

    #[test]
    fn test_descriptor_empty_when_only_separators() {
        assert_eq!(extract_descriptor("Show", "Show S01D01.mkv"), None);
        assert_eq!(extract_descriptor("Show", "Show - S01D01.mkv"), None);
        assert_eq!(extract_descriptor("Show", "Other Bonus S01D01.mkv"), None);
        assert_eq!(extract_descriptor("My Show (2004)", "My Show (2004) Extras S02D01.mkv"), Some("Extras".into()));
    }

    #[test]
    fn test_duplicate_title_last_name_wins() {
        let plan = plan_series("Show", ["b_s01d01_t01.mkv", "a_s01d01_t01.mkv"]);
        assert_eq!(plan.assignments.len(), 1);
        assert_eq!(plan.assignments[0].source_name, "b_s01d01_t01.mkv");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Contiguous discs: episode numbers follow the running qty sum
        #[test]
        fn test_numbering_matches_cumulative_qty(
            discs in prop::collection::vec(prop::collection::vec(1u32..4, 1..6), 1..5),
        ) {
            let mut names = Vec::new();
            for (d, titles) in discs.iter().enumerate() {
                for (t, qty) in titles.iter().enumerate() {
                    names.push(format!("series_s01d{:02}_t{:02}x{}.mkv", d + 1, t, qty));
                }
            }

            let plan = plan_series("Series", names.iter().map(String::as_str));
            prop_assert!(plan.warnings.is_empty());

            let qtys: Vec<u32> = discs.iter().flatten().copied().collect();
            prop_assert_eq!(plan.assignments.len(), qtys.len());

            let mut expected_first = 1;
            let mut previous_last = 0;
            for (assignment, qty) in plan.assignments.iter().zip(qtys) {
                prop_assert_eq!(assignment.first_episode, expected_first);
                prop_assert_eq!(assignment.last_episode, expected_first + qty - 1);
                prop_assert!(assignment.first_episode > previous_last);
                previous_last = assignment.last_episode;
                expected_first += qty;
            }
        }
    }
}
