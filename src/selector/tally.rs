use serde::Serialize;
use std::collections::BTreeMap;

/// Wins per candidate across independent repetitions.
///
/// Keys are fixed at construction to the initial candidate names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WinTally {
    wins: BTreeMap<String, u32>,
}

impl WinTally {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            wins: candidates.into_iter().map(|c| (c.into(), 0)).collect(),
        }
    }

    /// Credit one win to each survivor. Unknown names are ignored.
    pub fn record<'a>(&mut self, survivors: impl IntoIterator<Item = &'a str>) {
        for name in survivors {
            if let Some(count) = self.wins.get_mut(name) {
                *count += 1;
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.wins.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.wins.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.wins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wins.is_empty()
    }

    /// Candidates with the most wins. Empty when nobody won anything.
    pub fn winners(&self) -> Vec<String> {
        let best = self.wins.values().copied().max().unwrap_or(0);
        if best == 0 {
            return Vec::new();
        }
        self.wins
            .iter()
            .filter(|(_, &v)| v == best)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Entries sorted by wins, most first.
    pub fn ranked(&self) -> Vec<(&str, u32)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        entries
    }
}
