pub mod types;
pub mod error;
pub mod measure;
pub mod dictionary;
pub mod text;
pub mod scorer;
pub mod unit;
pub mod alignment;
pub mod corpus;
pub mod store;

pub use alignment::{align_unit, AlignOptions, Alignment, AlignmentEngine, Link, LinkKind};
pub use corpus::{collect_chunks, group_units, VerseUnit};
pub use dictionary::{AssociationDictionary, Candidate, DictionaryOptions, DictionaryRow};
pub use error::{AlignError, Result};
pub use measure::{ContingencyTable, Measure};
pub use scorer::{AlignmentScorer, ScoringParams};
pub use store::{save_alignment, AlignmentStore, MemoryStore, SaveReport, StoredAlignment};
pub use text::{parse_dictionary, parse_tokens, write_csv, write_dictionary};
pub use types::{PosCategory, Score, Token, TokenId};
