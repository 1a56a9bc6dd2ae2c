//! Line-oriented text formats.
//!
//! Dictionary files:
//!
//! ```text
//! Number of chunks=<n>
//! <lemma>,freq=<n>,<cand>{cr=<score>;sign=<sig>;cooccurs=<n>;occurs=<n>},...
//! ```
//!
//! Token tables are tab-separated, one token per line:
//! `id form lemma pos relation language [citation]`, with `-` for an empty
//! lemma or citation. Blank lines and lines starting with `#` are skipped.

use crate::alignment::Alignment;
use crate::dictionary::{AssociationDictionary, Candidate, DictionaryOptions, DictionaryRow};
use crate::error::{AlignError, Result};
use crate::types::{Token, TokenId};

const HEADER: &str = "Number of chunks";
const RESERVED: [char; 5] = [',', '{', '}', '\n', '\r'];

fn check_lemma(lemma: &str) -> Result<()> {
    if lemma.is_empty() || lemma.contains(RESERVED) {
        return Err(AlignError::data(format!("headword `{lemma}` cannot be stored in a dictionary file")));
    }
    Ok(())
}

pub fn write_dictionary(d: &AssociationDictionary, limit: usize) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!("{HEADER}={}\n", d.chunk_count()));
    for row in d.rows(limit)? {
        check_lemma(&row.lemma)?;
        out.push_str(&format!("{},freq={}", row.lemma, row.frequency));
        for c in &row.candidates {
            check_lemma(&c.lemma)?;
            out.push_str(&format!(",{}{{cr={}", c.lemma, c.score));
            if let Some(s) = c.significance {
                out.push_str(&format!(";sign={s}"));
            }
            if let Some(n) = c.cooccurs {
                out.push_str(&format!(";cooccurs={n}"));
            }
            if let Some(n) = c.occurs {
                out.push_str(&format!(";occurs={n}"));
            }
            out.push('}');
        }
        out.push('\n');
    }
    Ok(out)
}

fn field<'s>(part: &'s str, key: &str, line: usize) -> Result<&'s str> {
    match part.split_once('=') {
        Some((k, v)) if k.trim() == key => Ok(v.trim()),
        _ => Err(AlignError::data_at(line, format!("expected `{key}=` in `{part}`"))),
    }
}

fn number<T: core::str::FromStr>(s: &str, line: usize) -> Result<T> {
    s.parse().map_err(|_| AlignError::data_at(line, format!("bad number `{s}`")))
}

fn parse_candidate(part: &str, line: usize) -> Result<Candidate> {
    let (lemma, rest) = part
        .split_once('{')
        .ok_or_else(|| AlignError::data_at(line, format!("candidate `{part}` has no details")))?;
    let details = rest
        .strip_suffix('}')
        .ok_or_else(|| AlignError::data_at(line, format!("unterminated candidate `{part}`")))?;
    if lemma.is_empty() {
        return Err(AlignError::data_at(line, "empty candidate headword"));
    }
    let mut c = Candidate { lemma: lemma.to_string(), score: 0.0, significance: None, cooccurs: None, occurs: None };
    let mut has_score = false;
    for kv in details.split(';') {
        let (k, v) = kv
            .split_once('=')
            .ok_or_else(|| AlignError::data_at(line, format!("bad detail `{kv}`")))?;
        match k.trim() {
            "cr" => {
                c.score = number(v.trim(), line)?;
                has_score = true;
            }
            "sign" => c.significance = Some(number(v.trim(), line)?),
            "cooccurs" => c.cooccurs = Some(number(v.trim(), line)?),
            "occurs" => c.occurs = Some(number(v.trim(), line)?),
            other => return Err(AlignError::data_at(line, format!("unknown detail `{other}`"))),
        }
    }
    if !has_score {
        return Err(AlignError::data_at(line, format!("candidate `{lemma}` has no score")));
    }
    Ok(c)
}

/// Parses a dictionary file. Any malformed row rejects the whole file.
pub fn parse_dictionary(s: &str, options: DictionaryOptions) -> Result<AssociationDictionary> {
    let mut chunk_count = None;
    let mut rows = Vec::new();
    for (n, raw) in s.lines().enumerate() {
        let line = n + 1;
        let l = raw.trim_end_matches('\r');
        if l.trim().is_empty() {
            continue;
        }
        if l.starts_with(HEADER) {
            let (_, v) = l
                .split_once('=')
                .ok_or_else(|| AlignError::data_at(line, "bad chunk count header"))?;
            chunk_count = Some(number::<u64>(v.trim(), line)?);
            continue;
        }
        let mut parts = l.split(',');
        let lemma = parts.next().unwrap_or_default();
        if lemma.is_empty() {
            return Err(AlignError::data_at(line, "empty headword"));
        }
        let freq = parts
            .next()
            .ok_or_else(|| AlignError::data_at(line, "missing frequency"))?;
        let frequency = number(field(freq, "freq", line)?, line)?;
        let candidates = parts.map(|p| parse_candidate(p, line)).collect::<Result<Vec<_>>>()?;
        rows.push(DictionaryRow { lemma: lemma.to_string(), frequency, candidates });
    }
    let chunk_count = chunk_count.ok_or_else(|| AlignError::data("missing chunk count header"))?;
    AssociationDictionary::from_rows(options, chunk_count, rows)
}

fn optional(s: &str) -> &str {
    if s == "-" {
        ""
    } else {
        s
    }
}

/// Reads a token table.
pub fn parse_tokens(s: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    for (n, raw) in s.lines().enumerate() {
        let line = n + 1;
        let l = raw.trim_end_matches('\r');
        if l.trim().is_empty() || l.starts_with('#') {
            continue;
        }
        let cols: Vec<&str> = l.split('\t').collect();
        if cols.len() < 6 || cols.len() > 7 {
            return Err(AlignError::data_at(line, format!("expected 6 or 7 columns, found {}", cols.len())));
        }
        let id: TokenId = number(cols[0].trim(), line)?;
        let mut token = Token::new(id, cols[1], optional(cols[2]), cols[3])
            .with_relation(optional(cols[4]))
            .with_language(cols[5]);
        if let Some(c) = cols.get(6).map(|c| optional(c)).filter(|c| !c.is_empty()) {
            token = token.with_citation(c);
        }
        tokens.push(token);
    }
    Ok(tokens)
}

/// One line per target token: `target_id,original_id` or `target_id,nil`.
pub fn write_csv(alignment: &Alignment<'_>) -> String {
    let mut out = String::new();
    for (t, o) in alignment.pairs() {
        match o {
            Some(o) => out.push_str(&format!("{},{}\n", t.id, o.id)),
            None => out.push_str(&format!("{},nil\n", t.id)),
        }
    }
    out
}
