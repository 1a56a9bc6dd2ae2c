//! Cost of binding a target token to an original token.
//!
//! The cost has an invariant part (part of speech, relation, hapax,
//! dictionary rank) that is memoized per pair for the lifetime of one
//! unit, and a variable part (duplicate deferral, positional deviation
//! from the nearest anchor, crossing penalty) that depends on the bindings
//! made so far. Lower is better; anything above the threshold is a
//! non-match.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::dictionary::AssociationDictionary;
use crate::error::Result;
use crate::types::*;
use crate::unit::AlignedUnit;

/// Distance between major categories, indexed `[target][original]` in
/// [`PosCategory`] order. Not symmetric.
pub const POS_DISTANCES: [[Score; 12]; 12] = [
    //a   c   d   f   g   i   m   n   p   r   s   v
    [0, 50, 15, 50, 50, 30, 5, 5, 5, 30, 50, 20],       // a
    [50, 0, 5, 50, 20, 50, 50, 50, 50, 20, 50, 50],     // c
    [15, 5, 0, 50, 15, 50, 50, 50, 50, 5, 50, 30],      // d
    [50, 50, 50, 50, 50, 50, 50, 50, 50, 50, 50, 50],   // f
    [50, 20, 15, 50, 0, 50, 50, 50, 50, 15, 50, 50],    // g
    [30, 50, 20, 50, 50, 0, 50, 20, 50, 50, 50, 20],    // i
    [20, 50, 50, 50, 50, 50, 0, 20, 20, 50, 50, 50],    // m
    [10, 50, 20, 50, 50, 50, 20, 0, 20, 30, 50, 30],    // n
    [10, 50, 50, 50, 50, 50, 50, 20, 0, 50, 50, 20],    // p
    [30, 50, 20, 50, 50, 50, 50, 30, 50, 0, 50, 20],    // r
    [50, 50, 50, 50, 50, 50, 50, 50, 10, 50, 50, 50],   // s
    [20, 50, 30, 50, 50, 20, 50, 30, 20, 20, 50, 0],    // v
];

pub const UNKNOWN_POS_DISTANCE: Score = 50;

#[inline]
pub fn pos_distance(target: Option<PosCategory>, original: Option<PosCategory>) -> Score {
    match (target, original) {
        (Some(t), Some(o)) => POS_DISTANCES[t.index()][o.index()],
        _ => UNKNOWN_POS_DISTANCE,
    }
}

/// Tuning constants of the cost function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringParams {
    /// Highest cost still accepted as a match.
    pub threshold: Score,
    /// Returned for candidates rejected early.
    pub reject_score: Score,
    pub duplicate_penalty: Score,
    pub relation_penalty: Score,
    pub hapax_penalty: Score,
    /// Multiplies the raw index distance when no anchor exists.
    pub unanchored_distance_factor: Score,
    /// The positional penalty is scaled by `crossing_factor * crossings + 1`.
    pub crossing_factor: Score,
    /// Maximum POS distance for a binding in the anchored pass.
    pub anchor_pos_limit: Score,
}

impl Default for ScoringParams {
    fn default() -> Self {
        ScoringParams {
            threshold: ACCEPT_THRESHOLD,
            reject_score: REJECT_SCORE,
            duplicate_penalty: DUPLICATE_PENALTY,
            relation_penalty: RELATION_PENALTY,
            hapax_penalty: HAPAX_PENALTY,
            unanchored_distance_factor: UNANCHORED_DISTANCE_FACTOR,
            crossing_factor: CROSSING_FACTOR,
            anchor_pos_limit: ANCHOR_POS_LIMIT,
        }
    }
}

/// Per-unit scorer. Holds the memo of invariant pair costs, so one scorer
/// must not be reused across units.
pub struct AlignmentScorer<'d> {
    dictionary: &'d AssociationDictionary,
    params: ScoringParams,
    invariant: HashMap<(usize, usize), Score>,
}

impl<'d> AlignmentScorer<'d> {
    pub fn new(dictionary: &'d AssociationDictionary, params: ScoringParams) -> Self {
        AlignmentScorer { dictionary, params, invariant: HashMap::new() }
    }

    pub fn params(&self) -> &ScoringParams {
        &self.params
    }

    /// Cost components that do not depend on the bindings made so far.
    pub fn invariant_score(&mut self, unit: &AlignedUnit, original: usize, target: usize) -> Result<Score> {
        if let Some(&s) = self.invariant.get(&(original, target)) {
            return Ok(s);
        }
        let o = unit.original(original);
        let t = unit.target(target);
        let mut points = pos_distance(t.major(), o.major());
        if o.relation != t.relation {
            points = points.saturating_add(self.params.relation_penalty);
        }
        if self.dictionary.frequency(unit.target_key(target))? == 1 {
            points = points.saturating_add(self.params.hapax_penalty);
        }
        let rank = self.dictionary.rank(unit.target_key(target), unit.original_key(original))?;
        points = points.saturating_add(rank as Score);
        self.invariant.insert((original, target), points);
        Ok(points)
    }

    /// Index deviation from the nearest anchor, before the crossing
    /// multiplier.
    pub fn positional_penalty(&self, unit: &AlignedUnit, original: usize, target: usize) -> Score {
        let t = target as isize;
        let o = original as isize;
        match unit.nearest_anchor(target) {
            Some((at, ao)) => ((t - at as isize) - (o - ao as isize)).unsigned_abs() as Score,
            None => ((t - o).unsigned_abs() as Score).saturating_mul(self.params.unanchored_distance_factor),
        }
    }

    /// Full cost of binding `target` to `original` given the unit's state.
    pub fn score(&mut self, unit: &AlignedUnit, original: usize, target: usize) -> Result<Score> {
        let p = self.params;
        let mut points = self.invariant_score(unit, original, target)?;
        if unit.is_duplicated_target(target) || unit.is_duplicated_original(original) {
            points = points.saturating_add(p.duplicate_penalty);
        }
        if points > p.threshold {
            return Ok(p.reject_score);
        }
        let mut positional = self.positional_penalty(unit, original, target);
        if points.saturating_add(positional) > p.threshold {
            return Ok(p.reject_score);
        }
        let crossings = unit.crossings(original, target) as Score;
        positional = positional.saturating_mul(p.crossing_factor.saturating_mul(crossings).saturating_add(1));
        let total = points.saturating_add(positional);
        trace!(
            target = %unit.target(target),
            original = %unit.original(original),
            invariant = points,
            positional,
            crossings,
            total,
            "scored candidate"
        );
        Ok(total)
    }
}
