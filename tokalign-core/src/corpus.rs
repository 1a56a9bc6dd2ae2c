//! Grouping of token streams into verse-sized units.

use std::collections::BTreeMap;

use crate::error::{AlignError, Result};
use crate::types::Token;

/// Position of a verse: the citation up to its last `.` (book and
/// chapter) and the verse number after it.
pub type VerseKey = (String, u32);

/// Tokens of one verse on both sides.
#[derive(Clone, Debug, PartialEq)]
pub struct VerseUnit {
    /// Book and chapter, e.g. `JOHN 1`.
    pub division: String,
    pub verse: u32,
    /// Citation of the first target token, used to label the unit.
    pub reference: String,
    pub original: Vec<Token>,
    pub target: Vec<Token>,
}

/// Splits a citation such as `JOHN 1.14` into `("JOHN 1", 14)`.
pub fn verse_key(citation: &str) -> Option<VerseKey> {
    let (division, tail) = citation.rsplit_once('.')?;
    if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((division.trim().to_string(), tail.parse().ok()?))
}

/// Verse number of a citation: the digits after its last `.`.
pub fn verse_of(citation: &str) -> Option<u32> {
    verse_key(citation).map(|(_, v)| v)
}

/// Lemmatized tokens grouped by chapter and verse, in key order.
pub fn group_by_verse(tokens: &[Token]) -> Result<BTreeMap<VerseKey, Vec<Token>>> {
    let mut verses: BTreeMap<VerseKey, Vec<Token>> = BTreeMap::new();
    for t in tokens.iter().filter(|t| t.has_lemma()) {
        let citation = t
            .citation
            .as_deref()
            .ok_or_else(|| AlignError::data(format!("token {} has no citation", t.id)))?;
        let key = verse_key(citation)
            .ok_or_else(|| AlignError::data(format!("token {} has citation `{citation}` without a verse", t.id)))?;
        verses.entry(key).or_default().push(t.clone());
    }
    Ok(verses)
}

/// Dictionary chunks of `(target, original)` headwords for every verse
/// present on both sides.
pub fn collect_chunks(target: &[Token], original: &[Token]) -> Result<Vec<(Vec<String>, Vec<String>)>> {
    let t = group_by_verse(target)?;
    let mut o = group_by_verse(original)?;
    let chunks = t
        .into_iter()
        .filter_map(|(key, ts)| {
            o.remove(&key).map(|os| {
                (ts.iter().map(Token::key).collect(), os.iter().map(Token::key).collect())
            })
        })
        .collect();
    Ok(chunks)
}

/// Aligned units for every verse present on both sides.
pub fn group_units(original: &[Token], target: &[Token]) -> Result<Vec<VerseUnit>> {
    let mut o = group_by_verse(original)?;
    let t = group_by_verse(target)?;
    let units = t
        .into_iter()
        .filter_map(|(key, target)| {
            let original = o.remove(&key)?;
            let (division, verse) = key;
            let reference = target
                .first()
                .and_then(|t| t.citation.clone())
                .unwrap_or_else(|| format!("{division}.{verse}"));
            Some(VerseUnit { division, verse, reference, original, target })
        })
        .collect();
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(id: u64, lemma: &str, citation: &str) -> Token {
        Token::new(id, lemma, lemma, "Nb").with_citation(citation)
    }

    #[test]
    fn verse_numbers_from_citations() {
        assert_eq!(verse_of("JOHN 1.14"), Some(14));
        assert_eq!(verse_of("MATT 5.3"), Some(3));
        assert_eq!(verse_of("MATT 5"), None);
        assert_eq!(verse_of("MATT 5.3a"), None);
        assert_eq!(verse_of("MATT 5."), None);
        assert_eq!(verse_key("JOHN 1.14"), Some(("JOHN 1".to_string(), 14)));
    }

    #[test]
    fn chunks_cover_shared_verses_in_order() {
        let target = vec![
            tok(1, "verbum", "JOHN 1.10"),
            tok(2, "deus", "JOHN 1.2"),
            tok(3, "lux", "JOHN 1.4"),
            Token::new(4, ",", "", "X-"),
        ];
        let original = vec![tok(11, "theos", "JOHN 1.2"), tok(12, "logos", "JOHN 1.10")];
        let chunks = collect_chunks(&target, &original).unwrap();
        assert_eq!(
            chunks,
            vec![
                (vec!["deus:Nb".to_string()], vec!["theos:Nb".to_string()]),
                (vec!["verbum:Nb".to_string()], vec!["logos:Nb".to_string()]),
            ]
        );
    }

    #[test]
    fn lemmatized_tokens_need_a_verse() {
        let target = vec![tok(1, "verbum", "JOHN 1")];
        assert!(matches!(collect_chunks(&target, &[]), Err(AlignError::Data { .. })));
        let uncited = vec![Token::new(2, "deus", "deus", "Nb")];
        assert!(group_by_verse(&uncited).is_err());
    }

    #[test]
    fn units_carry_reference_and_tokens() {
        let target = vec![tok(1, "in", "JOHN 1.1"), tok(2, "verbum", "JOHN 1.1"), tok(3, "lux", "JOHN 1.5")];
        let original = vec![tok(11, "en", "JOHN 1.1"), tok(12, "logos", "JOHN 1.1")];
        let units = group_units(&original, &target).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].division, "JOHN 1");
        assert_eq!(units[0].verse, 1);
        assert_eq!(units[0].reference, "JOHN 1.1");
        assert_eq!(units[0].target.len(), 2);
        assert_eq!(units[0].original.len(), 2);
    }

    #[test]
    fn chapters_sharing_a_verse_number_stay_apart() {
        let target = vec![tok(1, "verbum", "JOHN 1.1"), tok(2, "lux", "JOHN 2.1")];
        let original = vec![tok(11, "logos", "JOHN 1.1"), tok(12, "phos", "JOHN 2.1")];
        let chunks = collect_chunks(&target, &original).unwrap();
        assert_eq!(
            chunks,
            vec![
                (vec!["verbum:Nb".to_string()], vec!["logos:Nb".to_string()]),
                (vec!["lux:Nb".to_string()], vec!["phos:Nb".to_string()]),
            ]
        );
        let units = group_units(&original, &target).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].reference, "JOHN 1.1");
        assert_eq!(units[1].reference, "JOHN 2.1");
        assert!(units.iter().all(|u| u.target.len() == 1 && u.original.len() == 1));
        assert_eq!(units[1].original[0].id, 12);
    }
}
