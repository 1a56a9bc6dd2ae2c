//! Persistence of unit alignments into a token store.
//!
//! A unit is committed as one batch: every check runs before the store is
//! touched, and the store applies the batch completely or not at all.

use hashbrown::HashMap;
use tracing::info;

use crate::alignment::Alignment;
use crate::error::{AlignError, Result};
use crate::types::TokenId;

/// Alignment reference held by a target token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoredAlignment {
    pub alignment: Option<TokenId>,
    /// False for manual alignments, which are never overwritten.
    pub automatic: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlignmentUpdate {
    pub token: TokenId,
    pub alignment: Option<TokenId>,
}

pub trait AlignmentStore {
    fn get(&self, token: TokenId) -> Option<StoredAlignment>;

    /// Applies all updates, marking them automatic, or none of them.
    fn commit(&mut self, updates: &[AlignmentUpdate]) -> Result<()>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: HashMap<TokenId, StoredAlignment>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: TokenId, record: StoredAlignment) {
        self.records.insert(token, record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl AlignmentStore for MemoryStore {
    fn get(&self, token: TokenId) -> Option<StoredAlignment> {
        self.records.get(&token).copied()
    }

    fn commit(&mut self, updates: &[AlignmentUpdate]) -> Result<()> {
        if let Some(u) = updates.iter().find(|u| !self.records.contains_key(&u.token)) {
            return Err(AlignError::Invariant(format!("unknown token {}", u.token)));
        }
        for u in updates {
            self.records.insert(u.token, StoredAlignment { alignment: u.alignment, automatic: true });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub aligned: usize,
    pub unaligned: usize,
    pub changed: usize,
    pub manual: usize,
}

/// Writes the unit's alignment to `store`.
///
/// Target tokens tagged with `original_language`, or bound originals that
/// are not, abort the whole unit.
pub fn save_alignment<S: AlignmentStore + ?Sized>(
    alignment: &Alignment<'_>,
    original_language: &str,
    store: &mut S,
) -> Result<SaveReport> {
    let mut report = SaveReport::default();
    let mut updates = Vec::with_capacity(alignment.len());
    for (t, o) in alignment.pairs() {
        if t.language == original_language {
            return Err(AlignError::Invariant(format!(
                "{} in {} is an original-language token",
                t, alignment.unit
            )));
        }
        if let Some(o) = o {
            if o.language != original_language {
                return Err(AlignError::Invariant(format!(
                    "{} in {} is not an original-language token",
                    o, alignment.unit
                )));
            }
        }
        let stored = store
            .get(t.id)
            .ok_or_else(|| AlignError::Invariant(format!("unknown token {}", t.id)))?;
        if !stored.automatic && stored.alignment.is_some() {
            report.manual += 1;
            continue;
        }
        let new = o.map(|o| o.id);
        if new != stored.alignment {
            report.changed += 1;
            match (new, stored.alignment) {
                (None, Some(prev)) => info!(unit = %alignment.unit, token = %t, previous = prev, "now unaligned"),
                (Some(id), prev) => info!(unit = %alignment.unit, token = %t, original = id, previous = ?prev, "changed alignment"),
                (None, None) => {}
            }
        }
        match new {
            Some(_) => report.aligned += 1,
            None => report.unaligned += 1,
        }
        updates.push(AlignmentUpdate { token: t.id, alignment: new });
    }
    store.commit(&updates)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{AlignOptions, AlignmentEngine};
    use crate::dictionary::{AssociationDictionary, DictionaryOptions};
    use crate::types::Token;

    fn dictionary() -> AssociationDictionary {
        let mut d = AssociationDictionary::new(DictionaryOptions::default()).unwrap();
        d.update(&[(vec!["deus:Nb"], vec!["theos:Nb"]), (vec!["deus:Nb"], vec!["theos:Nb"])]).unwrap();
        d.make().unwrap();
        d
    }

    fn tok(id: u64, lemma: &str, pos: &str, lang: &str) -> Token {
        Token::new(id, lemma, lemma, pos).with_language(lang)
    }

    fn store_for(ids: &[u64]) -> MemoryStore {
        let mut s = MemoryStore::new();
        for &id in ids {
            s.insert(id, StoredAlignment { alignment: None, automatic: true });
        }
        s
    }

    #[test]
    fn commits_bound_and_unbound_tokens() {
        let d = dictionary();
        let original = vec![tok(1, "theos", "Nb", "grc")];
        let target = vec![tok(10, "deus", "Nb", "lat"), tok(11, "et", "C-", "lat")];
        let engine = AlignmentEngine::new(&d, AlignOptions::default()).unwrap();
        let a = engine.align("u", &original, &target).unwrap();
        let mut store = store_for(&[10, 11]);
        store.insert(11, StoredAlignment { alignment: Some(99), automatic: true });
        let report = save_alignment(&a, "grc", &mut store).unwrap();
        assert_eq!(report, SaveReport { aligned: 1, unaligned: 1, changed: 2, manual: 0 });
        assert_eq!(store.get(10), Some(StoredAlignment { alignment: Some(1), automatic: true }));
        assert_eq!(store.get(11), Some(StoredAlignment { alignment: None, automatic: true }));
    }

    #[test]
    fn manual_alignments_are_kept() {
        let d = dictionary();
        let original = vec![tok(1, "theos", "Nb", "grc")];
        let target = vec![tok(10, "deus", "Nb", "lat")];
        let a = AlignmentEngine::new(&d, AlignOptions::default()).unwrap().align("u", &original, &target).unwrap();
        let mut store = MemoryStore::new();
        store.insert(10, StoredAlignment { alignment: Some(5), automatic: false });
        let report = save_alignment(&a, "grc", &mut store).unwrap();
        assert_eq!(report.manual, 1);
        assert_eq!(store.get(10), Some(StoredAlignment { alignment: Some(5), automatic: false }));
    }

    #[test]
    fn language_mismatch_aborts_the_unit() {
        let d = dictionary();
        let original = vec![tok(1, "theos", "Nb", "grc")];
        let target = vec![tok(10, "deus", "Nb", "lat"), tok(11, "kai", "C-", "grc")];
        let a = AlignmentEngine::new(&d, AlignOptions::default()).unwrap().align("u", &original, &target).unwrap();
        let mut store = store_for(&[10, 11]);
        let err = save_alignment(&a, "grc", &mut store).unwrap_err();
        assert!(matches!(err, AlignError::Invariant(_)));
        // Nothing was written, including the valid first token.
        assert_eq!(store.get(10), Some(StoredAlignment { alignment: None, automatic: true }));
    }

    #[test]
    fn original_side_must_be_original_language() {
        let d = dictionary();
        let original = vec![tok(1, "theos", "Nb", "lat")];
        let target = vec![tok(10, "deus", "Nb", "lat")];
        let a = AlignmentEngine::new(&d, AlignOptions::default()).unwrap().align("u", &original, &target).unwrap();
        assert_eq!(a.bound_len(), 1);
        let mut store = store_for(&[10]);
        assert!(matches!(save_alignment(&a, "grc", &mut store), Err(AlignError::Invariant(_))));
    }

    #[test]
    fn unknown_tokens_abort_the_commit() {
        let mut store = store_for(&[1]);
        let updates = [
            AlignmentUpdate { token: 1, alignment: Some(7) },
            AlignmentUpdate { token: 2, alignment: None },
        ];
        assert!(store.commit(&updates).is_err());
        assert_eq!(store.get(1), Some(StoredAlignment { alignment: None, automatic: true }));
    }
}
