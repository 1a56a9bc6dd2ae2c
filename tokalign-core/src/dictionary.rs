//! Bilingual association dictionary built from co-occurrence counts.
//!
//! The dictionary is fed batches of aligned chunks (for instance verses),
//! then made once. Making turns the raw counts into significances with the
//! configured [`Measure`], keeps the best `limit` candidates per target
//! headword and, when bidirectional, reorders them by the geometric mean
//! of the forward and backward monolingual ranks. After that point the
//! dictionary is read-only and can be shared between aligners.

use std::fs;
use std::path::Path;

use hashbrown::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::error::{AlignError, Result};
use crate::measure::{ContingencyTable, Measure, MeasureCache};
use crate::types::{CALC_LIMIT, RANK_PENALTY};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DictionaryOptions {
    pub measure: Measure,
    pub bidirectional: bool,
    /// Candidates kept per headword.
    pub limit: usize,
    /// Added to `limit` to give the rank of unlisted pairs.
    pub penalty: usize,
}

impl Default for DictionaryOptions {
    fn default() -> Self {
        DictionaryOptions {
            measure: Measure::Custom,
            bidirectional: true,
            limit: CALC_LIMIT,
            penalty: RANK_PENALTY,
        }
    }
}

impl DictionaryOptions {
    pub fn validate(&self) -> Result<()> {
        self.measure.ensure_available()?;
        if self.limit == 0 {
            return Err(AlignError::Configuration("candidate limit must be at least 1".into()));
        }
        Ok(())
    }

    #[inline]
    pub fn missing_rank(&self) -> usize {
        self.limit + self.penalty
    }
}

/// One ranked equivalent of a target headword, as stored on disk.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub lemma: String,
    /// Combined rank score (or the significance when unidirectional).
    pub score: f64,
    pub significance: Option<f64>,
    pub cooccurs: Option<u64>,
    pub occurs: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DictionaryRow {
    pub lemma: String,
    pub frequency: u64,
    pub candidates: Vec<Candidate>,
}

#[derive(Clone, Debug)]
pub struct AssociationDictionary {
    options: DictionaryOptions,
    made: bool,
    has_counts: bool,
    chunk_count: u64,
    /// Target headword marginals.
    frequencies: HashMap<String, u64>,
    /// Original headword marginals.
    occurrences: HashMap<String, u64>,
    /// Joint counts, target → original → chunks.
    counts: HashMap<String, HashMap<String, u64>>,
    significance: HashMap<String, HashMap<String, f64>>,
    scores: HashMap<String, HashMap<String, f64>>,
    /// Top candidates by significance alone, target → originals.
    forward: HashMap<String, Vec<String>>,
    /// Final ranking used by `rank`.
    rankings: HashMap<String, Vec<String>>,
    cache: MeasureCache,
}

fn ranked_keys(entries: &HashMap<String, f64>, limit: usize) -> Vec<String> {
    let mut v: Vec<(&String, f64)> = entries.iter().map(|(k, &s)| (k, s)).collect();
    v.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    v.into_iter().take(limit).map(|(k, _)| k.clone()).collect()
}

fn position_rank(list: Option<&Vec<String>>, lemma: &str, missing: usize) -> usize {
    list.and_then(|l| l.iter().position(|x| x == lemma))
        .map(|i| i + 1)
        .unwrap_or(missing)
}

impl AssociationDictionary {
    pub fn new(options: DictionaryOptions) -> Result<Self> {
        options.validate()?;
        Ok(AssociationDictionary {
            options,
            made: false,
            has_counts: true,
            chunk_count: 0,
            frequencies: HashMap::new(),
            occurrences: HashMap::new(),
            counts: HashMap::new(),
            significance: HashMap::new(),
            scores: HashMap::new(),
            forward: HashMap::new(),
            rankings: HashMap::new(),
            cache: MeasureCache::new(),
        })
    }

    pub fn options(&self) -> &DictionaryOptions {
        &self.options
    }

    pub fn is_made(&self) -> bool {
        self.made
    }

    /// False for dictionaries loaded from rows without co-occurrence data.
    pub fn has_counts(&self) -> bool {
        self.has_counts
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    /// Number of target headwords.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Counts a batch of `(target, original)` chunks.
    ///
    /// Repeats within one side of a chunk count once. Chunks with an empty
    /// side are skipped but still count towards the chunk total. An empty
    /// headword anywhere in the batch rejects the whole batch before
    /// anything is counted.
    pub fn update<S: AsRef<str>>(&mut self, chunks: &[(Vec<S>, Vec<S>)]) -> Result<()> {
        if self.made {
            return Err(AlignError::Invariant("dictionary already made".into()));
        }
        for (i, (target, original)) in chunks.iter().enumerate() {
            if target.iter().chain(original.iter()).any(|w| w.as_ref().is_empty()) {
                return Err(AlignError::data(format!("chunk {i} contains an empty headword")));
            }
        }

        self.chunk_count += chunks.len() as u64;
        for (target, original) in chunks {
            if target.is_empty() || original.is_empty() {
                continue;
            }
            let originals: HashSet<&str> = original.iter().map(|w| w.as_ref()).collect();
            let targets: HashSet<&str> = target.iter().map(|w| w.as_ref()).collect();
            for t in targets {
                *self.frequencies.entry_ref(t).or_insert(0) += 1;
                let row = self.counts.entry_ref(t).or_default();
                for &o in &originals {
                    *row.entry_ref(o).or_insert(0) += 1;
                }
            }
            for o in originals {
                *self.occurrences.entry_ref(o).or_insert(0) += 1;
            }
        }
        Ok(())
    }

    /// Closes the dictionary, computes significances and ranks.
    pub fn make(&mut self) -> Result<()> {
        if self.made {
            return Err(AlignError::Invariant("dictionary already made".into()));
        }
        let measure = self.options.measure;
        let limit = self.options.limit;
        let missing = self.options.missing_rank();

        let mut backward_sig: HashMap<String, HashMap<String, f64>> = HashMap::new();
        for (t, row) in &self.counts {
            let t_freq = self.frequencies.get(t).copied().unwrap_or(0);
            let sig_row = self.significance.entry_ref(t.as_str()).or_default();
            for (o, &joint) in row {
                let o_freq = self.occurrences.get(o).copied().unwrap_or(0);
                let table = ContingencyTable::from_counts(joint, t_freq, o_freq, self.chunk_count);
                let sig = measure.evaluate(&table, &mut self.cache);
                sig_row.insert(o.clone(), sig);
                if self.options.bidirectional {
                    backward_sig.entry_ref(o.as_str()).or_default().insert(t.clone(), sig);
                }
            }
        }

        self.forward = self
            .significance
            .iter()
            .map(|(t, row)| (t.clone(), ranked_keys(row, limit)))
            .collect();
        let backward: HashMap<String, Vec<String>> = backward_sig
            .iter()
            .map(|(o, row)| (o.clone(), ranked_keys(row, limit)))
            .collect();

        for (t, list) in &self.forward {
            let mut scored: Vec<(String, f64)> = Vec::with_capacity(list.len());
            for (i, o) in list.iter().enumerate() {
                let score = if self.options.bidirectional {
                    let back = position_rank(backward.get(o), t, missing);
                    1.0 / (((i + 1) * back) as f64).sqrt()
                } else {
                    self.significance[t][o]
                };
                scored.push((o.clone(), score));
            }
            // Stable: ties keep significance order.
            scored.sort_by(|a, b| b.1.total_cmp(&a.1));
            self.rankings.insert(t.clone(), scored.iter().map(|(o, _)| o.clone()).collect());
            self.scores.insert(t.clone(), scored.into_iter().collect());
        }

        self.made = true;
        info!(
            lemmas = self.frequencies.len(),
            chunks = self.chunk_count,
            measure = %measure,
            bidirectional = self.options.bidirectional,
            cached = self.cache.len(),
            "association dictionary made"
        );
        Ok(())
    }

    fn ensure_made(&self) -> Result<()> {
        if self.made {
            Ok(())
        } else {
            Err(AlignError::Invariant("dictionary queried before it was made".into()))
        }
    }

    /// 1-based position of `original` among the equivalents of `target`,
    /// or `limit + penalty` when it is not listed.
    pub fn rank(&self, target: &str, original: &str) -> Result<usize> {
        self.ensure_made()?;
        Ok(position_rank(self.rankings.get(target), original, self.options.missing_rank()))
    }

    /// Rank by significance alone, ignoring the reverse direction.
    pub fn monolingual_rank(&self, target: &str, original: &str) -> Result<usize> {
        self.ensure_made()?;
        Ok(position_rank(self.forward.get(target), original, self.options.missing_rank()))
    }

    /// Number of chunks the target headword was seen in.
    pub fn frequency(&self, lemma: &str) -> Result<u64> {
        self.ensure_made()?;
        let n = self.frequencies.get(lemma).copied().unwrap_or(0);
        if n == 0 {
            warn!(lemma, "headword not found in dictionary");
        }
        Ok(n)
    }

    /// Number of chunks the original headword was seen in.
    pub fn occurrences(&self, lemma: &str) -> u64 {
        self.occurrences.get(lemma).copied().unwrap_or(0)
    }

    pub fn significance(&self, target: &str, original: &str) -> Result<Option<f64>> {
        if !self.has_counts {
            return Err(AlignError::MissingCounts);
        }
        Ok(self.significance.get(target).and_then(|r| r.get(original)).copied())
    }

    pub fn cooccurs(&self, target: &str, original: &str) -> Result<u64> {
        if !self.has_counts {
            return Err(AlignError::MissingCounts);
        }
        Ok(self.counts.get(target).and_then(|r| r.get(original)).copied().unwrap_or(0))
    }

    /// Ranked equivalents of `target`, best first.
    pub fn equivalents(&self, target: &str) -> Result<&[String]> {
        self.ensure_made()?;
        Ok(self.rankings.get(target).map(|v| v.as_slice()).unwrap_or(&[]))
    }

    /// Every observed pair with its significance, strongest first.
    pub fn ranked_pairs(&self) -> Vec<(String, String, f64)> {
        let mut list: Vec<(String, String, f64)> = self
            .significance
            .iter()
            .flat_map(|(t, row)| row.iter().map(move |(o, &s)| (t.clone(), o.clone(), s)))
            .collect();
        list.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| (&a.0, &a.1).cmp(&(&b.0, &b.1))));
        list
    }

    /// Rows in headword order with at most `limit` candidates each.
    pub fn rows(&self, limit: usize) -> Result<Vec<DictionaryRow>> {
        self.ensure_made()?;
        let mut lemmas: Vec<&String> = self.rankings.keys().collect();
        lemmas.sort();
        let rows = lemmas
            .into_iter()
            .map(|t| {
                let candidates = self.rankings[t]
                    .iter()
                    .take(limit)
                    .map(|o| Candidate {
                        lemma: o.clone(),
                        score: self.scores.get(t).and_then(|r| r.get(o)).copied().unwrap_or(0.0),
                        significance: self.significance.get(t).and_then(|r| r.get(o)).copied(),
                        cooccurs: self.counts.get(t).and_then(|r| r.get(o)).copied(),
                        occurs: self.occurrences.get(o).copied(),
                    })
                    .collect();
                DictionaryRow {
                    lemma: t.clone(),
                    frequency: self.frequencies.get(t).copied().unwrap_or(0),
                    candidates,
                }
            })
            .collect();
        Ok(rows)
    }

    /// Rebuilds a made dictionary from stored rows. Raw data is only
    /// available when every candidate carries its significance and counts.
    pub fn from_rows(options: DictionaryOptions, chunk_count: u64, rows: Vec<DictionaryRow>) -> Result<Self> {
        let mut d = AssociationDictionary::new(options)?;
        d.chunk_count = chunk_count;
        for row in rows {
            d.frequencies.insert(row.lemma.clone(), row.frequency);
            let mut ranking = Vec::with_capacity(row.candidates.len());
            let mut scores = HashMap::new();
            let mut sig = HashMap::new();
            let mut counts = HashMap::new();
            for c in row.candidates {
                match (c.significance, c.cooccurs, c.occurs) {
                    (Some(s), Some(n), Some(occ)) => {
                        sig.insert(c.lemma.clone(), s);
                        counts.insert(c.lemma.clone(), n);
                        d.occurrences.insert(c.lemma.clone(), occ);
                    }
                    _ => d.has_counts = false,
                }
                scores.insert(c.lemma.clone(), c.score);
                ranking.push(c.lemma);
            }
            let forward = if sig.len() == ranking.len() { ranked_keys(&sig, options.limit) } else { ranking.clone() };
            d.forward.insert(row.lemma.clone(), forward);
            d.rankings.insert(row.lemma.clone(), ranking);
            d.scores.insert(row.lemma.clone(), scores);
            d.significance.insert(row.lemma.clone(), sig);
            d.counts.insert(row.lemma, counts);
        }
        d.made = true;
        debug!(lemmas = d.frequencies.len(), chunks = chunk_count, "association dictionary loaded");
        Ok(d)
    }

    /// Reads a dictionary file written by [`save`](Self::save).
    pub fn load<P: AsRef<Path>>(path: P, options: DictionaryOptions) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        crate::text::parse_dictionary(&s, options)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P, limit: usize) -> Result<()> {
        let s = crate::text::write_dictionary(self, limit)?;
        fs::write(path, s)?;
        Ok(())
    }
}
