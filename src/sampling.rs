use crate::journal::Record;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Risk tier controlling sample size and composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Top 10 by amount.
    Rendah,
    /// Top 10 plus 10 drawn at random from the rest.
    Moderate,
    /// Top 15 plus 15 drawn at random from the rest.
    Tinggi,
}

impl Method {
    pub fn parse_tag(tag: &str) -> Option<Method> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "rendah" => Some(Method::Rendah),
            "moderate" => Some(Method::Moderate),
            "tinggi" => Some(Method::Tinggi),
            _ => None,
        }
    }

    /// Resolves a method tag; anything unrecognized samples like `rendah`.
    pub fn from_tag(tag: &str) -> Method {
        Self::parse_tag(tag).unwrap_or_else(|| {
            warn!(tag, "metode sampling tidak dikenal, memakai 'rendah'");
            Method::Rendah
        })
    }

    pub fn tag(self) -> &'static str {
        match self {
            Method::Rendah => "rendah",
            Method::Moderate => "moderate",
            Method::Tinggi => "tinggi",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Method::Rendah => "Rendah (Top 10)",
            Method::Moderate => "Moderate (Top 10 + 10 Acak)",
            Method::Tinggi => "Tinggi (Top 15 + 15 Acak)",
        }
    }

    pub fn top_n(self) -> usize {
        match self {
            Method::Rendah | Method::Moderate => 10,
            Method::Tinggi => 15,
        }
    }

    pub fn random_n(self) -> usize {
        match self {
            Method::Rendah => 0,
            Method::Moderate => 10,
            Method::Tinggi => 15,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Records chosen for testing: unique, ordered by amount descending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SampleSet {
    records: Vec<Record>,
}

impl SampleSet {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn sort_by_amount_desc(records: &mut [Record]) {
    // stable: equal amounts keep input order
    records.sort_by(|a, b| b.amount.cmp(&a.amount));
}

/// Uniform shuffle-and-take of `count` items.
fn random_items<R: Rng + ?Sized>(items: &[Record], count: usize, rng: &mut R) -> Vec<Record> {
    if count == 0 || items.is_empty() {
        return Vec::new();
    }
    let mut idxs: Vec<usize> = (0..items.len()).collect();
    idxs.shuffle(rng);
    idxs.truncate(count);
    idxs.into_iter().map(|i| items[i].clone()).collect()
}

/// Drops repeated records, keeping the first occurrence.
fn dedup_records(records: Vec<Record>) -> Vec<Record> {
    let mut seen: HashSet<Record> = HashSet::with_capacity(records.len());
    records.into_iter().filter(|r| seen.insert(r.clone())).collect()
}

/// Takes the `top_n` largest records by amount, then draws `random_n` more
/// uniformly from the remainder.
pub fn select_sample<R: Rng + ?Sized>(records: &[Record], method: Method, rng: &mut R) -> SampleSet {
    let mut sorted = records.to_vec();
    sort_by_amount_desc(&mut sorted);

    let top_len = method.top_n().min(sorted.len());
    let remainder = sorted.split_off(top_len);
    let mut picked = sorted;
    let supplement = random_items(&remainder, method.random_n(), rng);
    debug!(
        method = method.tag(),
        top = picked.len(),
        random = supplement.len(),
        remainder = remainder.len(),
        "sample drawn"
    );
    picked.extend(supplement);

    let mut unique = dedup_records(picked);
    sort_by_amount_desc(&mut unique);
    SampleSet { records: unique }
}

/// [`select_sample`] for a raw method tag.
pub fn select_sample_by_tag<R: Rng + ?Sized>(records: &[Record], tag: &str, rng: &mut R) -> SampleSet {
    select_sample(records, Method::from_tag(tag), rng)
}
