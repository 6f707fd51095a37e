use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ArenaConfig;
use crate::constants::TEAM_COUNT;

/// Summary of one finished game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    pub side: f64,
    pub rats: usize,
    pub pipers: usize,
    pub groups: [String; TEAM_COUNT],
    pub scores: [u32; TEAM_COUNT],
    pub winner: String,
    pub total: u32,
    pub ticks: u64,
    pub finished_at: String,
}

/// First team index holding the maximum score.
pub fn winner_index(scores: &[u32; TEAM_COUNT]) -> usize {
    let mut winner = 0;
    for (idx, score) in scores.iter().enumerate() {
        if *score > scores[winner] {
            winner = idx;
        }
    }
    winner
}

impl GameResult {
    pub fn new(
        config: &ArenaConfig,
        groups: [String; TEAM_COUNT],
        scores: [u32; TEAM_COUNT],
        ticks: u64,
    ) -> Self {
        let winner = groups[winner_index(&scores)].clone();
        Self {
            side: config.inner_side,
            rats: config.rats,
            pipers: config.pipers_per_team,
            groups,
            scores,
            winner,
            total: scores.iter().sum(),
            ticks,
            finished_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// `side,rats,pipers,N,E,S,W,scoreN,scoreE,scoreS,scoreW,winner,total`
    pub fn to_csv_line(&self) -> String {
        let mut fields = vec![
            self.side.to_string(),
            self.rats.to_string(),
            self.pipers.to_string(),
        ];
        fields.extend(self.groups.iter().cloned());
        fields.extend(self.scores.iter().map(u32::to_string));
        fields.push(self.winner.clone());
        fields.push(self.total.to_string());
        fields.join(",")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GroupStanding {
    pub games: u32,
    pub wins: u32,
    pub points: u32,
}

/// Append-only CSV log of finished games.
pub struct ResultStore {
    file_path: PathBuf,
}

impl ResultStore {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn append(&self, result: &GameResult) -> io::Result<()> {
        let mut file = self.open_for_append()?;
        writeln!(file, "{}", result.to_csv_line())
    }

    /// Blank line closing a block of related games; `standings` skips it.
    pub fn append_separator(&self) -> io::Result<()> {
        let mut file = self.open_for_append()?;
        writeln!(file)
    }

    fn open_for_append(&self) -> io::Result<fs::File> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
    }

    /// Per-group totals over every well-formed line; blank or malformed
    /// lines are skipped.
    pub fn standings(&self) -> io::Result<BTreeMap<String, GroupStanding>> {
        let text = match fs::read_to_string(&self.file_path) {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => String::new(),
            Err(error) => return Err(error),
        };
        let mut standings: BTreeMap<String, GroupStanding> = BTreeMap::new();
        for line in text.lines() {
            let Some((groups, scores, winner)) = parse_line(line) else {
                continue;
            };
            for (group, score) in groups.iter().zip(scores) {
                let entry = standings.entry(group.to_string()).or_default();
                entry.games += 1;
                entry.points += score;
            }
            standings.entry(winner.to_string()).or_default().wins += 1;
        }
        Ok(standings)
    }
}

fn parse_line(line: &str) -> Option<([&str; TEAM_COUNT], [u32; TEAM_COUNT], &str)> {
    let fields: Vec<&str> = line.trim().split(',').collect();
    if fields.len() != 13 {
        return None;
    }
    let groups = [fields[3], fields[4], fields[5], fields[6]];
    let mut scores = [0u32; TEAM_COUNT];
    for (slot, raw) in scores.iter_mut().zip(&fields[7..11]) {
        *slot = raw.parse().ok()?;
    }
    Some((groups, scores, fields[11]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: [&str; 4]) -> [String; 4] {
        names.map(str::to_string)
    }

    fn temp_file(name: &str) -> PathBuf {
        let unique = format!(
            "{}-{}-{}",
            name,
            std::process::id(),
            rand::random::<u32>()
        );
        std::env::temp_dir().join(unique).join("result.csv")
    }

    #[test]
    fn winner_is_first_team_reaching_max() {
        assert_eq!(winner_index(&[0, 0, 0, 0]), 0);
        assert_eq!(winner_index(&[1, 3, 3, 2]), 1);
        assert_eq!(winner_index(&[1, 2, 3, 4]), 3);
    }

    #[test]
    fn csv_line_matches_record_layout() {
        let result = GameResult::new(
            &ArenaConfig::default(),
            groups(["g1", "g2", "g3", "g4"]),
            [2, 5, 5, 0],
            300,
        );
        assert_eq!(result.to_csv_line(), "100,10,2,g1,g2,g3,g4,2,5,5,0,g2,12");
        assert_eq!(result.total, 12);
    }

    #[test]
    fn append_creates_parent_and_standings_aggregate() {
        let path = temp_file("piper-arena-results");
        let store = ResultStore::new(path.clone());
        let config = ArenaConfig::default();
        store
            .append(&GameResult::new(
                &config,
                groups(["a", "b", "a", "c"]),
                [1, 0, 2, 0],
                10,
            ))
            .expect("first append");
        store
            .append(&GameResult::new(
                &config,
                groups(["a", "b", "c", "d"]),
                [0, 4, 0, 1],
                10,
            ))
            .expect("second append");

        let standings = store.standings().expect("standings load");
        let a = &standings["a"];
        assert_eq!((a.games, a.wins, a.points), (3, 1, 3));
        let b = &standings["b"];
        assert_eq!((b.games, b.wins, b.points), (2, 1, 4));
        assert_eq!(standings["d"].points, 1);

        let _ = fs::remove_dir_all(path.parent().expect("temp parent"));
    }

    #[test]
    fn separator_is_a_blank_line_between_blocks() {
        let path = temp_file("piper-arena-separator");
        let store = ResultStore::new(path.clone());
        let result = GameResult::new(
            &ArenaConfig::default(),
            groups(["a", "b", "c", "d"]),
            [0, 0, 1, 0],
            10,
        );
        store.append(&result).expect("append");
        store.append_separator().expect("separator");
        store.append(&result).expect("append");

        let text = fs::read_to_string(&path).expect("read back");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].is_empty());
        assert_eq!(store.standings().expect("standings load")["c"].wins, 2);
        let _ = fs::remove_dir_all(path.parent().expect("temp parent"));
    }

    #[test]
    fn missing_file_has_empty_standings_and_bad_lines_are_skipped() {
        let path = temp_file("piper-arena-missing");
        let store = ResultStore::new(path.clone());
        assert!(store.standings().expect("missing file is fine").is_empty());

        fs::create_dir_all(path.parent().expect("temp parent")).expect("mkdir");
        fs::write(&path, "\nnot,a,record\n100,10,2,x,y,z,w,1,0,0,0,x,1\n").expect("write");
        let standings = store.standings().expect("standings load");
        assert_eq!(standings.len(), 4);
        assert_eq!(standings["x"].wins, 1);
        let _ = fs::remove_dir_all(path.parent().expect("temp parent"));
    }
}
