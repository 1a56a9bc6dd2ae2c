use core::fmt;

pub type TokenId = u64;
pub type Score = u32;

/// Number of candidates kept per headword when ranking.
pub const CALC_LIMIT: usize = 30;
/// Added to `CALC_LIMIT` for pairs that are not among the ranked candidates.
pub const RANK_PENALTY: usize = 4;

pub const ACCEPT_THRESHOLD: Score = 36;
pub const REJECT_SCORE: Score = 37;

pub const DUPLICATE_PENALTY: Score = 10;
pub const RELATION_PENALTY: Score = 10;
pub const HAPAX_PENALTY: Score = 20;
pub const UNANCHORED_DISTANCE_FACTOR: Score = 3;
pub const CROSSING_FACTOR: Score = 1;
pub const ANCHOR_POS_LIMIT: Score = 45;

/// A treebank token as seen by the aligner.
///
/// `pos` is a two-character positional code: the first character is the
/// major category, the second the subtype (`"Nb"`, `"V-"`, `"R-"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    pub id: TokenId,
    pub form: String,
    pub lemma: String,
    pub pos: String,
    pub relation: String,
    pub language: String,
    pub citation: Option<String>,
}

impl Token {
    pub fn new(id: TokenId, form: &str, lemma: &str, pos: &str) -> Self {
        Token {
            id,
            form: form.to_string(),
            lemma: lemma.to_string(),
            pos: pos.to_string(),
            relation: String::new(),
            language: String::new(),
            citation: None,
        }
    }

    pub fn with_relation(mut self, relation: &str) -> Self {
        self.relation = relation.to_string();
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn with_citation(mut self, citation: &str) -> Self {
        self.citation = Some(citation.to_string());
        self
    }

    /// Dictionary headword: lemma and part of speech joined by `:`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.lemma, self.pos)
    }

    #[inline]
    pub fn has_lemma(&self) -> bool {
        !self.lemma.is_empty()
    }

    #[inline]
    pub fn major(&self) -> Option<PosCategory> {
        self.pos.chars().next().and_then(PosCategory::from_code)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.form, self.id)
    }
}

/// Major part-of-speech categories used by the distance table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PosCategory {
    Adjective,
    Conjunction,
    Adverb,
    Foreign,
    Subjunction,
    Interjection,
    Numeral,
    Noun,
    Pronoun,
    Preposition,
    Article,
    Verb,
}

impl PosCategory {
    /// Case-insensitive lookup of the major category character.
    pub fn from_code(c: char) -> Option<Self> {
        let cat = match c.to_ascii_lowercase() {
            'a' => PosCategory::Adjective,
            'c' => PosCategory::Conjunction,
            'd' => PosCategory::Adverb,
            'f' => PosCategory::Foreign,
            'g' => PosCategory::Subjunction,
            'i' => PosCategory::Interjection,
            'm' => PosCategory::Numeral,
            'n' => PosCategory::Noun,
            'p' => PosCategory::Pronoun,
            'r' => PosCategory::Preposition,
            's' => PosCategory::Article,
            'v' => PosCategory::Verb,
            _ => return None,
        };
        Some(cat)
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}
