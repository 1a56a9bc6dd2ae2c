//! Association measures over 2×2 contingency tables.
//!
//! Rows are the target headword (present/absent), columns the original
//! headword (present/absent), counted over aligned chunks.

use core::fmt;
use core::str::FromStr;

use hashbrown::HashMap;

use crate::error::{AlignError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContingencyTable {
    pub o11: u64,
    pub o12: u64,
    pub o21: u64,
    pub o22: u64,
}

impl ContingencyTable {
    /// Builds the table from a joint count, the two marginals and the
    /// number of chunks observed.
    pub fn from_counts(joint: u64, target_marginal: u64, original_marginal: u64, chunks: u64) -> Self {
        ContingencyTable {
            o11: joint,
            o12: target_marginal.saturating_sub(joint),
            o21: original_marginal.saturating_sub(joint),
            o22: (chunks + joint).saturating_sub(target_marginal + original_marginal),
        }
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.o11 + self.o12 + self.o21 + self.o22
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Measure {
    /// Poisson-based collocation significance (Cysouw, Biemann & Ongyerth 2007).
    #[default]
    Custom,
    /// Dunning's binomial log-likelihood ratio.
    LogLikelihood,
    /// One-sided ("greater") Fisher exact test, reported as `1 - p`.
    FisherExact,
}

impl Measure {
    pub fn name(self) -> &'static str {
        match self {
            Measure::Custom => "zvtuuf",
            Measure::LogLikelihood => "dunning",
            Measure::FisherExact => "fisher",
        }
    }

    /// Whether this build can compute the measure.
    pub fn is_available(self) -> bool {
        match self {
            Measure::FisherExact => cfg!(feature = "fisher"),
            _ => true,
        }
    }

    pub fn ensure_available(self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(AlignError::Configuration(format!(
                "measure `{}` requires the `fisher` feature",
                self.name()
            )))
        }
    }

    /// Significance of the association, higher is stronger. Results are
    /// memoized in `cache`.
    pub fn evaluate(self, table: &ContingencyTable, cache: &mut MeasureCache) -> f64 {
        if let Some(&v) = cache.scores.get(&(self, *table)) {
            return v;
        }
        let v = match self {
            Measure::Custom => zvtuuf(table, cache),
            Measure::LogLikelihood => dunning(table),
            Measure::FisherExact => fisher(table),
        };
        cache.scores.insert((self, *table), v);
        v
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Measure {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self> {
        let m = match s.trim().to_ascii_lowercase().as_str() {
            "zvtuuf" | "custom" => Measure::Custom,
            "dunning" | "log-likelihood" | "loglikelihood" | "g2" => Measure::LogLikelihood,
            "fisher" | "fisher-exact" => Measure::FisherExact,
            other => {
                return Err(AlignError::Configuration(format!("unknown measure `{other}`")));
            }
        };
        m.ensure_available()?;
        Ok(m)
    }
}

/// Memo tables owned by one dictionary. Entries are pure functions of
/// their keys and are never invalidated.
#[derive(Clone, Debug, Default)]
pub struct MeasureCache {
    log_fact: Vec<f64>,
    scores: HashMap<(Measure, ContingencyTable), f64>,
}

impl MeasureCache {
    pub fn new() -> Self {
        MeasureCache { log_fact: vec![0.0], scores: HashMap::new() }
    }

    /// ln(k!) as a running sum of logarithms.
    pub fn log_factorial(&mut self, k: u64) -> f64 {
        if self.log_fact.is_empty() {
            self.log_fact.push(0.0);
        }
        let k = k as usize;
        while self.log_fact.len() <= k {
            let n = self.log_fact.len();
            let prev = self.log_fact[n - 1];
            self.log_fact.push(prev + (n as f64).ln());
        }
        self.log_fact[k]
    }

    pub(crate) fn len(&self) -> usize {
        self.scores.len()
    }
}

fn zvtuuf(t: &ContingencyTable, cache: &mut MeasureCache) -> f64 {
    let n = t.total() as f64;
    let x = ((t.o11 + t.o12) as f64 * (t.o11 + t.o21) as f64) / n;
    (x - (t.o11 as f64) * x.ln() + cache.log_factorial(t.o11)) / n.ln()
}

// ln(r^k * (1-r)^(n-k)); zero counts contribute nothing, as 0^0 = 1.
fn log_binomial_term(k: u64, n: u64, r: f64) -> f64 {
    let mut v = 0.0;
    if k > 0 {
        v += k as f64 * r.ln();
    }
    if n > k {
        v += (n - k) as f64 * (1.0 - r).ln();
    }
    v
}

fn dunning(t: &ContingencyTable) -> f64 {
    if t.o12 == 0 || t.o21 == 0 {
        return 0.0;
    }
    let r1 = t.o11 + t.o12;
    let c1 = t.o11 + t.o21;
    let c2 = t.o12 + t.o22;
    let n = t.total();
    if c1 == 0 || c2 == 0 || n == 0 {
        return 0.0;
    }
    let alt = log_binomial_term(t.o11, c1, t.o11 as f64 / c1 as f64)
        + log_binomial_term(t.o12, c2, t.o12 as f64 / c2 as f64);
    if !alt.is_finite() {
        return 0.0;
    }
    let p = r1 as f64 / n as f64;
    let null = log_binomial_term(t.o11, c1, p) + log_binomial_term(t.o12, c2, p);
    -2.0 * (null - alt)
}

#[cfg(feature = "fisher")]
fn fisher(t: &ContingencyTable) -> f64 {
    use statrs::distribution::{DiscreteCDF, Hypergeometric};

    let population = t.total();
    let successes = t.o11 + t.o12;
    let draws = t.o11 + t.o21;
    let p_greater = match Hypergeometric::new(population, successes, draws) {
        Ok(_) if t.o11 == 0 => 1.0,
        Ok(h) => h.sf(t.o11 - 1),
        Err(_) => 1.0,
    };
    1.0 - p_greater
}

#[cfg(not(feature = "fisher"))]
fn fisher(_t: &ContingencyTable) -> f64 {
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(o11: u64, o12: u64, o21: u64, o22: u64) -> ContingencyTable {
        ContingencyTable { o11, o12, o21, o22 }
    }

    #[test]
    fn table_from_marginals() {
        let t = ContingencyTable::from_counts(2, 3, 4, 10);
        assert_eq!(t, table(2, 1, 2, 5));
        assert_eq!(t.total(), 10);
    }

    #[test]
    fn log_factorial_is_cumulative() {
        let mut cache = MeasureCache::new();
        assert_eq!(cache.log_factorial(0), 0.0);
        assert_eq!(cache.log_factorial(1), 0.0);
        let expected = (1..=5).map(|x| (x as f64).ln()).sum::<f64>();
        assert!((cache.log_factorial(5) - expected).abs() < 1e-12);
    }

    #[test]
    fn zvtuuf_prefers_stronger_association() {
        let mut cache = MeasureCache::new();
        let strong = Measure::Custom.evaluate(&table(2, 0, 0, 0), &mut cache);
        let weak = Measure::Custom.evaluate(&table(1, 1, 0, 0), &mut cache);
        assert!((strong - (2.0 - 2f64.ln()) / 2f64.ln()).abs() < 1e-12);
        assert!((weak - 1.0 / 2f64.ln()).abs() < 1e-12);
        assert!(strong > weak);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn dunning_zero_when_a_cell_is_empty() {
        let mut cache = MeasureCache::new();
        assert_eq!(Measure::LogLikelihood.evaluate(&table(3, 0, 2, 5), &mut cache), 0.0);
        assert_eq!(Measure::LogLikelihood.evaluate(&table(3, 2, 0, 5), &mut cache), 0.0);
    }

    #[test]
    fn dunning_grows_with_association() {
        let mut cache = MeasureCache::new();
        let strong = Measure::LogLikelihood.evaluate(&table(20, 1, 1, 78), &mut cache);
        let weak = Measure::LogLikelihood.evaluate(&table(5, 15, 15, 65), &mut cache);
        assert!(strong > weak);
        assert!(strong > 0.0);
    }

    #[cfg(feature = "fisher")]
    #[test]
    fn fisher_complement_of_p_value() {
        let mut cache = MeasureCache::new();
        // Perfect association of 3 in 6: p = 1 / C(6,3) = 0.05
        let v = Measure::FisherExact.evaluate(&table(3, 0, 0, 3), &mut cache);
        assert!((v - 0.95).abs() < 1e-9);
        let none = Measure::FisherExact.evaluate(&table(0, 3, 3, 0), &mut cache);
        assert!(none.abs() < 1e-12);
    }

    #[test]
    fn parses_measure_names() {
        assert_eq!("zvtuuf".parse::<Measure>().unwrap(), Measure::Custom);
        assert_eq!("Dunning".parse::<Measure>().unwrap(), Measure::LogLikelihood);
        assert_eq!("g2".parse::<Measure>().unwrap(), Measure::LogLikelihood);
        assert!(matches!("chi2".parse::<Measure>(), Err(AlignError::Configuration(_))));
    }

    #[cfg(not(feature = "fisher"))]
    #[test]
    fn fisher_fails_closed() {
        assert!(matches!("fisher".parse::<Measure>(), Err(AlignError::Configuration(_))));
    }
}
