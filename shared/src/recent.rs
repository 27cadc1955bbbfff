//! Recently opened files, most recent first.

use std::fmt;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEntry {
    pub name: String,
    /// Display date, e.g. `3/5/2024`.
    pub date: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentFiles {
    entries: Vec<RecentEntry>,
    cap: usize,
}

impl RecentFiles {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: Vec::new(),
            cap: cap.max(1),
        }
    }

    /// Rebuild from persisted entries, dropping duplicates and anything past `cap`.
    pub fn load(entries: Vec<RecentEntry>, cap: usize) -> Self {
        let mut recent = Self::new(cap);
        for entry in entries {
            if recent.entries.len() == recent.cap {
                break;
            }
            if !recent.entries.iter().any(|e| e.name == entry.name) {
                recent.entries.push(entry);
            }
        }
        recent
    }

    pub fn record<Tz>(&mut self, name: &str, now: &DateTime<Tz>)
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.entries.retain(|entry| entry.name != name);
        self.entries.insert(
            0,
            RecentEntry {
                name: name.to_string(),
                date: now.format("%-m/%-d/%Y").to_string(),
                timestamp: now.timestamp_millis(),
            },
        );
        self.entries.truncate(self.cap);
    }

    pub fn entries(&self) -> &[RecentEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn most_recent_first_and_deduplicated() {
        let mut recent = RecentFiles::new(10);
        recent.record("a.pdf", &at(1));
        recent.record("b.pdf", &at(2));
        recent.record("a.pdf", &at(3));

        let names: Vec<_> = recent.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a.pdf", "b.pdf"]);
        assert_eq!(recent.entries()[0].date, "3/3/2024");
        assert_eq!(recent.entries()[0].timestamp, at(3).timestamp_millis());
    }

    #[test]
    fn capped() {
        let mut recent = RecentFiles::new(5);
        for day in 1..=7 {
            recent.record(&format!("{day}.pdf"), &at(day));
        }
        assert_eq!(recent.entries().len(), 5);
        assert_eq!(recent.entries()[0].name, "7.pdf");
        assert_eq!(recent.entries()[4].name, "3.pdf");
    }

    #[test]
    fn load_trims_stored_list() {
        let stored: Vec<RecentEntry> = serde_json::from_str(
            r#"[
                {"name": "a.pdf", "date": "3/1/2024", "timestamp": 1},
                {"name": "a.pdf", "date": "2/1/2024", "timestamp": 0},
                {"name": "b.pdf", "date": "1/1/2024", "timestamp": 0},
                {"name": "c.pdf", "date": "1/1/2024", "timestamp": 0}
            ]"#,
        )
        .unwrap();
        let recent = RecentFiles::load(stored, 2);
        let names: Vec<_> = recent.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a.pdf", "b.pdf"]);
        assert_eq!(recent.entries()[0].timestamp, 1);
    }

    #[test]
    fn clear_empties() {
        let mut recent = RecentFiles::new(3);
        recent.record("a.pdf", &at(1));
        recent.clear();
        assert!(recent.is_empty());
    }
}
