use core::fmt;

use tracing::{debug, trace};

use crate::dictionary::AssociationDictionary;
use crate::error::{AlignError, Result};
use crate::scorer::{pos_distance, AlignmentScorer, ScoringParams};
use crate::types::{Score, Token};
use crate::unit::AlignedUnit;

#[derive(Clone, Debug)]
pub struct AlignOptions {
    pub params: ScoringParams,
    /// Run the anchored pass before greedy refinement.
    pub initial_pass: bool,
    /// Upper bound on greedy iterations; `None` runs until the pool or the
    /// candidates are exhausted.
    pub max_iterations: Option<usize>,
}

impl Default for AlignOptions {
    fn default() -> Self {
        AlignOptions {
            params: ScoringParams::default(),
            initial_pass: true,
            max_iterations: None,
        }
    }
}

/// How a binding was made.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    /// Rank-1 neighbour found in the anchored pass.
    Anchored,
    /// Chosen by the greedy pass at the given cost.
    Scored(Score),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Link {
    pub original: usize,
    pub kind: LinkKind,
}

/// Result of aligning one unit: one entry per target token, in target
/// order, bound to an original token or explicitly unaligned.
#[derive(Clone, Debug)]
pub struct Alignment<'a> {
    pub unit: String,
    original: &'a [Token],
    target: &'a [Token],
    links: Vec<Option<Link>>,
}

impl<'a> Alignment<'a> {
    pub fn originals(&self) -> &'a [Token] {
        self.original
    }

    pub fn targets(&self) -> &'a [Token] {
        self.target
    }

    pub fn links(&self) -> &[Option<Link>] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Original index bound to target `j`.
    pub fn original_index(&self, j: usize) -> Option<usize> {
        self.links[j].map(|l| l.original)
    }

    /// Target tokens with their bound original, in target order.
    pub fn pairs(&self) -> impl Iterator<Item = (&'a Token, Option<&'a Token>)> + '_ {
        self.target
            .iter()
            .zip(self.links.iter())
            .map(|(t, l)| (t, l.map(|l| &self.original[l.original])))
    }

    pub fn bound_len(&self) -> usize {
        self.links.iter().filter(|l| l.is_some()).count()
    }

    /// Original tokens left without a counterpart, in sequence order.
    pub fn remaining(&self) -> Vec<(usize, &'a Token)> {
        let mut used = vec![false; self.original.len()];
        for l in self.links.iter().flatten() {
            used[l.original] = true;
        }
        self.original.iter().enumerate().filter(|(i, _)| !used[*i]).collect()
    }
}

/// Human-readable dump: target form, bound original with its index,
/// then the original tokens left over.
impl fmt::Display for Alignment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "****************************************";
        writeln!(f, "{rule}")?;
        writeln!(f, "Alignments for {}", self.unit)?;
        writeln!(f, "{rule}")?;
        for (j, (t, o)) in self.pairs().enumerate() {
            write!(f, "{:<24}({j})", t.form)?;
            if let Some(l) = self.links[j] {
                if let Some(o) = o {
                    write!(f, "\t{}({})", o.form, l.original)?;
                }
            }
            writeln!(f)?;
        }
        writeln!(f, "{rule}")?;
        let remaining = self.remaining();
        if remaining.is_empty() {
            writeln!(f, "Remaining original words: None")?;
        } else {
            let list: Vec<String> = remaining.iter().map(|(i, t)| format!("{}({i})", t.form)).collect();
            writeln!(f, "Remaining original words: {}", list.join(","))?;
        }
        writeln!(f, "{rule}")
    }
}

/// Two-phase aligner over a frozen dictionary. Holds no per-unit state and
/// can be shared across threads.
#[derive(Clone, Debug)]
pub struct AlignmentEngine<'d> {
    dictionary: &'d AssociationDictionary,
    options: AlignOptions,
}

impl<'d> AlignmentEngine<'d> {
    pub fn new(dictionary: &'d AssociationDictionary, options: AlignOptions) -> Result<Self> {
        if !dictionary.is_made() {
            return Err(AlignError::Invariant("aligning with a dictionary that was not made".into()));
        }
        Ok(AlignmentEngine { dictionary, options })
    }

    pub fn options(&self) -> &AlignOptions {
        &self.options
    }

    pub fn scorer(&self) -> AlignmentScorer<'d> {
        AlignmentScorer::new(self.dictionary, self.options.params)
    }

    /// Aligns one unit. Never fails for lack of matches; targets without a
    /// sub-threshold candidate stay unaligned.
    pub fn align<'a>(&self, unit_id: &str, original: &'a [Token], target: &'a [Token]) -> Result<Alignment<'a>> {
        let mut unit = AlignedUnit::new(original, target);
        let mut scorer = self.scorer();
        if self.options.initial_pass {
            self.initial_alignment(&mut unit, unit_id)?;
        }
        let anchored: Vec<bool> = unit.links().iter().map(Option::is_some).collect();
        let scores = self.refine(&mut unit, &mut scorer, unit_id)?;

        let links = (0..target.len())
            .map(|j| {
                unit.link(j).map(|i| Link {
                    original: i,
                    kind: if anchored[j] { LinkKind::Anchored } else { LinkKind::Scored(scores[j]) },
                })
            })
            .collect();
        debug!(unit = unit_id, bound = unit.bound_len(), targets = target.len(), "unit aligned");
        Ok(Alignment { unit: unit_id.to_string(), original, target, links })
    }

    /// Anchored pass: binds each target to a rank-1 original at its
    /// expected position or one slot either side.
    pub fn initial_alignment(&self, unit: &mut AlignedUnit<'_>, unit_id: &str) -> Result<()> {
        let n_original = unit.originals().len() as isize;
        for j in 0..unit.targets().len() {
            if unit.link(j).is_some() {
                continue;
            }
            let expected = match unit.nearest_anchor(j) {
                Some((at, ao)) => j as isize - at as isize + ao as isize,
                None => j as isize,
            };
            for i in [expected, expected + 1, expected - 1] {
                if i < 0 || i >= n_original || !unit.is_available(i as usize) {
                    continue;
                }
                let i = i as usize;
                if self.dictionary.rank(unit.target_key(j), unit.original_key(i))? != 1 {
                    continue;
                }
                let distance = pos_distance(unit.target(j).major(), unit.original(i).major());
                if distance >= self.options.params.anchor_pos_limit {
                    continue;
                }
                if unit.is_duplicated_target(j) || unit.is_duplicated_original(i) {
                    continue;
                }
                debug!(
                    unit = unit_id,
                    target = %unit.target(j),
                    original = %unit.original(i),
                    "anchored"
                );
                unit.bind(i, j);
                break;
            }
        }
        Ok(())
    }

    /// Greedy pass: repeatedly binds the globally cheapest pair until no
    /// candidate is at or under the threshold. Returns the cost of each
    /// binding it made, indexed by target.
    pub fn refine(&self, unit: &mut AlignedUnit<'_>, scorer: &mut AlignmentScorer<'_>, unit_id: &str) -> Result<Vec<Score>> {
        let threshold = self.options.params.threshold;
        let mut scores = vec![0; unit.targets().len()];
        let mut iterations = 0usize;
        loop {
            if let Some(max) = self.options.max_iterations {
                if iterations >= max {
                    debug!(unit = unit_id, max, "iteration bound reached");
                    break;
                }
            }
            iterations += 1;

            let mut best: Option<(Score, usize, usize)> = None;
            let unbound: Vec<usize> = unit.unbound().collect();
            let available: Vec<usize> = unit.available().collect();
            for &j in &unbound {
                for &i in &available {
                    let s = scorer.score(unit, i, j)?;
                    if best.map_or(true, |(b, _, _)| s < b) {
                        best = Some((s, i, j));
                    }
                }
            }
            let Some((score, i, j)) = best else { break };
            if score > threshold {
                trace!(unit = unit_id, score, "no candidate under threshold");
                break;
            }
            debug!(
                unit = unit_id,
                target = %unit.target(j),
                original = %unit.original(i),
                score,
                "aligned"
            );
            unit.bind(i, j);
            scores[j] = score;
        }
        Ok(scores)
    }
}

/// Aligns one unit with default options.
pub fn align_unit<'a>(
    unit_id: &str,
    original: &'a [Token],
    target: &'a [Token],
    dictionary: &AssociationDictionary,
) -> Result<Alignment<'a>> {
    AlignmentEngine::new(dictionary, AlignOptions::default())?.align(unit_id, original, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::DictionaryOptions;

    fn tok(id: u64, lemma: &str, pos: &str) -> Token {
        Token::new(id, lemma, lemma, pos).with_relation("obj")
    }

    fn dictionary(chunks: &[(Vec<&str>, Vec<&str>)]) -> AssociationDictionary {
        let mut d = AssociationDictionary::new(DictionaryOptions::default()).unwrap();
        d.update(chunks).unwrap();
        d.make().unwrap();
        d
    }

    fn parallel() -> AssociationDictionary {
        dictionary(&[
            (vec!["in:R-", "principio:Nb", "verbum:Nb"], vec!["en:R-", "arche:Nb", "logos:Nb"]),
            (vec!["in:R-", "mundo:Nb"], vec!["en:R-", "kosmos:Nb"]),
            (vec!["verbum:Nb", "deus:Nb"], vec!["logos:Nb", "theos:Nb"]),
            (vec!["principio:Nb"], vec!["arche:Nb"]),
            (vec!["deus:Nb"], vec!["theos:Nb"]),
            (vec!["mundo:Nb"], vec!["kosmos:Nb"]),
        ])
    }

    #[test]
    fn unmade_dictionary_is_rejected() {
        let d = AssociationDictionary::new(DictionaryOptions::default()).unwrap();
        assert!(matches!(AlignmentEngine::new(&d, AlignOptions::default()), Err(AlignError::Invariant(_))));
    }

    #[test]
    fn initial_pass_binds_rank_one_neighbours() {
        let d = parallel();
        let original = vec![tok(1, "en", "R-"), tok(2, "arche", "Nb"), tok(3, "logos", "Nb")];
        let target = vec![tok(11, "in", "R-"), tok(12, "principio", "Nb"), tok(13, "verbum", "Nb")];
        let engine = AlignmentEngine::new(&d, AlignOptions::default()).unwrap();
        let mut unit = AlignedUnit::new(&original, &target);
        engine.initial_alignment(&mut unit, "John 1.1").unwrap();
        assert_eq!(unit.links(), &[Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn greedy_pass_resolves_shifted_pairs() {
        let d = parallel();
        // Target drops the preposition, so positions are off by one.
        let original = vec![tok(1, "en", "R-"), tok(2, "arche", "Nb"), tok(3, "logos", "Nb")];
        let target = vec![tok(12, "principio", "Nb"), tok(13, "verbum", "Nb")];
        let a = align_unit("John 1.1", &original, &target, &d).unwrap();
        assert_eq!(a.original_index(0), Some(1));
        assert_eq!(a.original_index(1), Some(2));
        assert_eq!(a.remaining().len(), 1);
    }

    #[test]
    fn disabled_initial_pass_scores_every_link() {
        let d = parallel();
        let original = vec![tok(1, "en", "R-"), tok(2, "arche", "Nb")];
        let target = vec![tok(11, "in", "R-"), tok(12, "principio", "Nb")];
        let options = AlignOptions { initial_pass: false, ..Default::default() };
        let a = AlignmentEngine::new(&d, options).unwrap().align("u", &original, &target).unwrap();
        for link in a.links().iter().flatten() {
            assert!(matches!(link.kind, LinkKind::Scored(s) if s <= 36));
        }
        assert_eq!(a.bound_len(), 2);
    }

    #[test]
    fn iteration_bound_stops_refinement() {
        let d = parallel();
        let original = vec![tok(1, "en", "R-"), tok(2, "arche", "Nb")];
        let target = vec![tok(11, "in", "R-"), tok(12, "principio", "Nb")];
        let options = AlignOptions { initial_pass: false, max_iterations: Some(1), ..Default::default() };
        let a = AlignmentEngine::new(&d, options).unwrap().align("u", &original, &target).unwrap();
        assert_eq!(a.bound_len(), 1);
    }

    #[test]
    fn unrelated_tokens_stay_unaligned() {
        let d = parallel();
        let original = vec![tok(1, "kai", "C-")];
        let target = vec![tok(11, "mundo", "Nb")];
        let a = align_unit("u", &original, &target, &d).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a.bound_len(), 0);
        assert!(a.to_string().contains("Remaining original words: kai(0)"));
    }
}
