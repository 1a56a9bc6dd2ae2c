//! Alignment state of one aligned unit.
//!
//! Tokens are addressed by their index in the original or target sequence.
//! Original tokens leave the available pool when bound and never return;
//! each target token is bound at most once.

use hashbrown::{HashMap, HashSet};

use crate::types::Token;

#[derive(Clone, Debug)]
pub struct AlignedUnit<'a> {
    original: &'a [Token],
    target: &'a [Token],
    original_keys: Vec<String>,
    target_keys: Vec<String>,
    available: Vec<bool>,
    pool_len: usize,
    links: Vec<Option<usize>>,
    duplicated_original: HashSet<String>,
    duplicated_target: HashSet<String>,
}

fn repeated(keys: &[String]) -> HashSet<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for k in keys {
        *seen.entry(k.as_str()).or_insert(0) += 1;
    }
    seen.into_iter().filter(|&(_, n)| n > 1).map(|(k, _)| k.to_string()).collect()
}

impl<'a> AlignedUnit<'a> {
    pub fn new(original: &'a [Token], target: &'a [Token]) -> Self {
        let original_keys: Vec<String> = original.iter().map(Token::key).collect();
        let target_keys: Vec<String> = target.iter().map(Token::key).collect();
        AlignedUnit {
            original,
            target,
            duplicated_original: repeated(&original_keys),
            duplicated_target: repeated(&target_keys),
            original_keys,
            target_keys,
            available: vec![true; original.len()],
            pool_len: original.len(),
            links: vec![None; target.len()],
        }
    }

    #[inline]
    pub fn original(&self, i: usize) -> &'a Token {
        &self.original[i]
    }

    #[inline]
    pub fn target(&self, j: usize) -> &'a Token {
        &self.target[j]
    }

    pub fn originals(&self) -> &'a [Token] {
        self.original
    }

    pub fn targets(&self) -> &'a [Token] {
        self.target
    }

    #[inline]
    pub fn original_key(&self, i: usize) -> &str {
        &self.original_keys[i]
    }

    #[inline]
    pub fn target_key(&self, j: usize) -> &str {
        &self.target_keys[j]
    }

    #[inline]
    pub fn is_available(&self, i: usize) -> bool {
        self.available.get(i).copied().unwrap_or(false)
    }

    /// Indices of original tokens still in the pool, in sequence order.
    pub fn available(&self) -> impl Iterator<Item = usize> + '_ {
        self.available.iter().enumerate().filter(|&(_, &a)| a).map(|(i, _)| i)
    }

    pub fn pool_len(&self) -> usize {
        self.pool_len
    }

    #[inline]
    pub fn link(&self, j: usize) -> Option<usize> {
        self.links[j]
    }

    pub fn links(&self) -> &[Option<usize>] {
        &self.links
    }

    /// Indices of target tokens not bound yet.
    pub fn unbound(&self) -> impl Iterator<Item = usize> + '_ {
        self.links.iter().enumerate().filter(|(_, l)| l.is_none()).map(|(j, _)| j)
    }

    /// Bound pairs as `(target, original)`, in target order.
    pub fn bound(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.links.iter().enumerate().filter_map(|(j, l)| l.map(|i| (j, i)))
    }

    pub fn bound_len(&self) -> usize {
        self.links.iter().filter(|l| l.is_some()).count()
    }

    pub fn is_duplicated_original(&self, i: usize) -> bool {
        self.duplicated_original.contains(self.original_key(i))
    }

    pub fn is_duplicated_target(&self, j: usize) -> bool {
        self.duplicated_target.contains(self.target_key(j))
    }

    /// Binds `target` to `original`, removing the original from the pool
    /// and both headwords from the duplicate sets.
    pub fn bind(&mut self, original: usize, target: usize) {
        debug_assert!(self.available[original], "original {original} already bound");
        debug_assert!(self.links[target].is_none(), "target {target} already bound");
        self.links[target] = Some(original);
        self.available[original] = false;
        self.pool_len -= 1;
        self.duplicated_original.remove(self.original_keys[original].as_str());
        self.duplicated_target.remove(self.target_keys[target].as_str());
    }

    /// Nearest bound pair to `target` by target index, as
    /// `(target, original)`. Ties go to the earlier target.
    pub fn nearest_anchor(&self, target: usize) -> Option<(usize, usize)> {
        self.bound()
            .filter(|&(j, _)| j != target)
            .min_by_key(|&(j, _)| j.abs_diff(target))
    }

    /// Bound pairs whose relative order is inverted with respect to the
    /// candidate pair.
    pub fn crossings(&self, original: usize, target: usize) -> usize {
        self.bound()
            .filter(|&(j, i)| (j > target && i < original) || (j < target && i > original))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(lemmas: &[&str]) -> Vec<Token> {
        lemmas
            .iter()
            .enumerate()
            .map(|(i, l)| Token::new(i as u64, l, l, "Nb"))
            .collect()
    }

    #[test]
    fn duplicates_are_tracked_per_side() {
        let original = tokens(&["kai", "logos", "kai"]);
        let target = tokens(&["et", "verbum", "kai"]);
        let unit = AlignedUnit::new(&original, &target);
        assert!(unit.is_duplicated_original(0));
        assert!(unit.is_duplicated_original(2));
        assert!(!unit.is_duplicated_original(1));
        // A headword shared across sides is not a duplicate.
        assert!(!unit.is_duplicated_target(2));
    }

    #[test]
    fn binding_shrinks_the_pool_and_clears_duplicates() {
        let original = tokens(&["kai", "logos", "kai"]);
        let target = tokens(&["et", "verbum", "et"]);
        let mut unit = AlignedUnit::new(&original, &target);
        assert_eq!(unit.pool_len(), 3);
        unit.bind(0, 0);
        assert_eq!(unit.pool_len(), 2);
        assert!(!unit.is_available(0));
        assert!(!unit.is_duplicated_original(2));
        assert!(!unit.is_duplicated_target(2));
        assert_eq!(unit.available().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(unit.unbound().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(unit.bound_len(), 1);
    }

    #[test]
    fn nearest_anchor_prefers_earlier_on_ties() {
        let original = tokens(&["a", "b", "c", "d", "e"]);
        let target = tokens(&["a", "b", "c", "d", "e"]);
        let mut unit = AlignedUnit::new(&original, &target);
        assert_eq!(unit.nearest_anchor(2), None);
        unit.bind(4, 3);
        unit.bind(0, 1);
        assert_eq!(unit.nearest_anchor(2), Some((1, 0)));
        assert_eq!(unit.nearest_anchor(4), Some((3, 4)));
        assert_eq!(unit.nearest_anchor(1), Some((3, 4)));
    }

    #[test]
    fn counts_crossings_in_both_directions() {
        let original = tokens(&["a", "b", "c", "d"]);
        let target = tokens(&["a", "b", "c", "d"]);
        let mut unit = AlignedUnit::new(&original, &target);
        unit.bind(3, 0);
        unit.bind(0, 3);
        assert_eq!(unit.crossings(1, 1), 2);
        assert_eq!(unit.crossings(3, 2), 1);
    }
}
