use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::Write as _;
use tokalign_core::{
    collect_chunks, group_units, parse_tokens, save_alignment, write_csv, AlignOptions, AlignmentEngine,
    AlignmentStore, AssociationDictionary, DictionaryOptions, Measure, MemoryStore, ScoringParams, StoredAlignment,
    Token,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Log alignment decisions to stderr
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an association dictionary from two token tables
    Build {
        #[arg(short = 't', long = "target")]
        target: String,
        #[arg(short = 'o', long = "original")]
        original: String,
        #[arg(long = "output", default_value = "-")]
        output: String,
        #[arg(short = 'm', long = "measure", default_value = "zvtuuf")]
        measure: Measure,
        #[arg(long, default_value_t = false)]
        unidirectional: bool,
        #[arg(short = 'l', long = "limit", default_value_t = 30)]
        limit: usize,
    },
    /// Align every verse shared by two token tables
    Align {
        #[arg(short = 'd', long = "dictionary")]
        dictionary: String,
        #[arg(short = 'o', long = "original")]
        original: String,
        #[arg(short = 't', long = "target")]
        target: String,
        #[arg(short = 'f', long = "format", value_enum, default_value_t = Format::Human)]
        format: Format,
        /// TOML file overriding scoring parameters
        #[arg(short = 'p', long = "params")]
        params: Option<String>,
        #[arg(long = "no-initial-pass", default_value_t = false)]
        no_initial_pass: bool,
        #[arg(long = "max-iterations")]
        max_iterations: Option<usize>,
        /// Language tag of the original side; defaults to that of the first original token
        #[arg(long = "original-language")]
        original_language: Option<String>,
        #[arg(long = "output", default_value = "-")]
        output: String,
    },
    /// Print the ranked equivalents of a target headword
    Equivalents {
        #[arg(short = 'd', long = "dictionary")]
        dictionary: String,
        lemma: String,
    },
    /// Print every pair in the dictionary, strongest first
    Pairs {
        #[arg(short = 'd', long = "dictionary")]
        dictionary: String,
        #[arg(short = 'n', long = "limit")]
        limit: Option<usize>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Human,
    Csv,
    Store,
}

fn read_all(path: &str) -> std::io::Result<String> {
    if path == "-" {
        use std::io::Read;
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s)?;
        Ok(s)
    } else {
        fs::read_to_string(path)
    }
}

fn write_all(path: &str, data: &str) -> std::io::Result<()> {
    if path == "-" {
        let mut out = std::io::stdout().lock();
        out.write_all(data.as_bytes())?;
        out.flush()
    } else {
        fs::write(path, data)
    }
}

fn read_tokens(path: &str, label: &str) -> Result<Vec<Token>, String> {
    let s = read_all(path).map_err(|e| format!("{label}: {e}"))?;
    parse_tokens(&s).map_err(|e| format!("{label}: {e}"))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load_dictionary(path: &str) -> Result<AssociationDictionary, Box<dyn std::error::Error>> {
    let s = read_all(path)?;
    Ok(tokalign_core::parse_dictionary(&s, DictionaryOptions::default())?)
}

fn build(
    target: &str,
    original: &str,
    output: &str,
    measure: Measure,
    unidirectional: bool,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = read_tokens(target, "target")?;
    let original = read_tokens(original, "original")?;
    let options = DictionaryOptions { measure, bidirectional: !unidirectional, limit, ..DictionaryOptions::default() };
    let mut dictionary = AssociationDictionary::new(options)?;
    dictionary.update(&collect_chunks(&target, &original)?)?;
    dictionary.make()?;
    write_all(output, &tokalign_core::write_dictionary(&dictionary, limit)?)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn align(
    dictionary: &str,
    original: &str,
    target: &str,
    format: Format,
    params: Option<&str>,
    no_initial_pass: bool,
    max_iterations: Option<usize>,
    original_language: Option<String>,
    output: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let dictionary = load_dictionary(dictionary)?;
    let original = read_tokens(original, "original")?;
    let target = read_tokens(target, "target")?;
    let params: ScoringParams = match params {
        Some(p) => toml::from_str(&read_all(p)?)?,
        None => ScoringParams::default(),
    };
    let options = AlignOptions { params, initial_pass: !no_initial_pass, max_iterations };
    let engine = AlignmentEngine::new(&dictionary, options)?;

    let language = original_language
        .or_else(|| original.first().map(|t| t.language.clone()))
        .unwrap_or_default();
    let mut store = MemoryStore::new();
    for t in &target {
        store.insert(t.id, StoredAlignment { alignment: None, automatic: true });
    }

    let mut out = String::new();
    let mut failed = 0usize;
    for unit in group_units(&original, &target)? {
        let alignment = engine.align(&unit.reference, &unit.original, &unit.target)?;
        match format {
            Format::Human => out.push_str(&alignment.to_string()),
            Format::Csv => out.push_str(&write_csv(&alignment)),
            Format::Store => match save_alignment(&alignment, &language, &mut store) {
                Ok(report) => out.push_str(&format!(
                    "{}\taligned={}\tunaligned={}\tchanged={}\tmanual={}\n",
                    unit.reference, report.aligned, report.unaligned, report.changed, report.manual
                )),
                Err(e) => {
                    error!(unit = %unit.reference, "{e}");
                    failed += 1;
                }
            },
        }
    }
    write_all(output, &out)?;
    if format == Format::Store {
        let aligned = target.iter().filter(|t| store.get(t.id).is_some_and(|r| r.alignment.is_some())).count();
        info!(aligned, tokens = target.len(), failed, "store updated");
    }
    if failed > 0 {
        return Err(format!("{failed} unit(s) were not committed").into());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Build { target, original, output, measure, unidirectional, limit } => {
            build(&target, &original, &output, measure, unidirectional, limit)?;
        }
        Command::Align {
            dictionary,
            original,
            target,
            format,
            params,
            no_initial_pass,
            max_iterations,
            original_language,
            output,
        } => {
            align(
                &dictionary,
                &original,
                &target,
                format,
                params.as_deref(),
                no_initial_pass,
                max_iterations,
                original_language,
                &output,
            )?;
        }
        Command::Equivalents { dictionary, lemma } => {
            let dictionary = load_dictionary(&dictionary)?;
            let mut out = String::new();
            for (n, o) in dictionary.equivalents(&lemma)?.iter().enumerate() {
                out.push_str(&format!("{}\t{o}\n", n + 1));
            }
            write_all("-", &out)?;
        }
        Command::Pairs { dictionary, limit } => {
            let dictionary = load_dictionary(&dictionary)?;
            let pairs = dictionary.ranked_pairs();
            let mut out = String::new();
            for (t, o, s) in pairs.iter().take(limit.unwrap_or(pairs.len())) {
                out.push_str(&format!("{t}\t{o}\t{s}\n"));
            }
            write_all("-", &out)?;
        }
    }

    Ok(())
}
