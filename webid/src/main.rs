//! webid: Command-line WebID-TLS verifier for relying parties.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;
use webid_lib::{
    FetchOptions, HttpProfileStore, MediaType, Mode, OntologyMetadata, ProfileStore,
    StaticProfileStore, TestCatalog, ValidateOptions, ValidationEngine,
};

#[derive(Parser)]
#[command(
    name = "webid",
    about = "Verify WebID-TLS client certificates against their identity documents",
    long_about = "webid checks that the public key of a client certificate is published,\n\
                  in the identity document at one of the certificate's subjectAltName\n\
                  URIs, as belonging to that URI.\n\n\
                  Input format (PEM vs DER) is auto-detected. All commands read the\n\
                  certificate from stdin when no file is given.",
    after_help = "EXAMPLES:\n\
                  \n  webid validate client.pem\
                  \n  webid validate --mode exhaustive --json client.pem\
                  \n  webid validate --document https://alice.example/card=card.rdf client.pem\
                  \n  webid inspect client.pem\
                  \n  webid catalog --json"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a client certificate (exit 0 = validated, 2 = not validated)
    #[command(after_help = "MODES:\n\
                      \n  firstmatch  Stop at the first identity URI that authenticates (default)\
                      \n  strict      Stop at the first failing mandatory check\
                      \n  exhaustive  Run every check for every URI and key\
                      \n\nDOCUMENTS:\n\
                      \n  --document URI=FILE serves FILE for URI instead of fetching it over\
                      \n  HTTP. The format is taken from the extension (.rdf/.xml/.owl for\
                      \n  RDF/XML, .html/.xhtml for XHTML+RDFa) or from --format.\
                      \n\nEXAMPLES:\n\
                      \n  webid validate client.pem\
                      \n  webid validate --mode strict --attime 1700000000 client.pem\
                      \n  webid validate --parallel --workers 8 --timeout 5s client.pem\
                      \n  cat client.pem | webid validate --json")]
    Validate {
        /// Certificate file (PEM or DER). Reads from stdin if omitted.
        file: Option<PathBuf>,
        /// Validation mode: firstmatch, strict, exhaustive
        #[arg(long, env = "WEBID_MODE", default_value = "firstmatch")]
        mode: Mode,
        /// Output the outcome in JSON format
        #[arg(long)]
        json: bool,
        /// Verify TLS certificates of profile servers (default off: INSECURE,
        /// profiles can be forged by a network attacker)
        #[arg(long, env = "WEBID_VERIFY_TLS")]
        verify_tls: bool,
        /// Preferred profile format: rdf, rdfa
        #[arg(long, value_name = "FORMAT")]
        format: Option<MediaType>,
        /// Evaluate the validity window at a specific Unix timestamp
        #[arg(long, value_name = "EPOCH")]
        attime: Option<i64>,
        /// Fetch all identity documents concurrently
        #[arg(long)]
        parallel: bool,
        /// Worker threads for --parallel
        #[arg(long, value_name = "N", default_value_t = 4)]
        workers: usize,
        /// Timeout per profile request (e.g. 10, 10s, 1m)
        #[arg(long, value_name = "DURATION")]
        timeout: Option<String>,
        /// Test metadata feed (JSON) replacing the bundled one
        #[arg(long, value_name = "FILE")]
        metadata: Option<PathBuf>,
        /// Serve a local file for a profile URI, as URI=FILE (repeatable)
        #[arg(long = "document", value_name = "URI=FILE")]
        documents: Vec<String>,
    },
    /// Show the certificate fields WebID verification uses
    #[command(after_help = "EXAMPLES:\n\
                      \n  webid inspect client.pem\
                      \n  webid inspect --json client.der")]
    Inspect {
        /// Certificate file (PEM or DER). Reads from stdin if omitted.
        file: Option<PathBuf>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// List the check catalog and its metadata coverage
    Catalog {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Test metadata feed (JSON) replacing the bundled one
        #[arg(long, value_name = "FILE")]
        metadata: Option<PathBuf>,
    },
}

/// Maximum file size for certificate and document inputs (10 MiB).
const MAX_INPUT_BYTES: u64 = 10 * 1024 * 1024;

fn read_input(file: Option<&PathBuf>) -> Result<Vec<u8>> {
    match file {
        Some(path) => read_file(path),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .take(MAX_INPUT_BYTES)
                .read_to_end(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat file: {}", path.display()))?;
    if meta.len() > MAX_INPUT_BYTES {
        anyhow::bail!(
            "File too large ({} bytes, max {} bytes): {}",
            meta.len(),
            MAX_INPUT_BYTES,
            path.display()
        );
    }
    std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Parse a duration string using humantime format.
///
/// Plain numbers (e.g. "30") default to seconds.
fn parse_duration(s: &str) -> Result<Duration> {
    if s.chars().all(|c| c.is_ascii_digit()) {
        let secs: u64 = s.parse().context("Invalid duration value")?;
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).with_context(|| format!("Invalid duration: '{s}'"))
}

/// Split a `URI=FILE` argument at the last '='.
fn parse_document_arg(arg: &str) -> Result<(&str, &Path)> {
    match arg.rsplit_once('=') {
        Some((uri, file)) if !uri.is_empty() && !file.is_empty() => Ok((uri, Path::new(file))),
        _ => anyhow::bail!("Invalid --document '{}': expected URI=FILE", arg),
    }
}

/// Media type of a local profile document, from its extension.
fn infer_media_type(path: &Path, fallback: Option<MediaType>) -> MediaType {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ["rdf", "xml", "owl"].iter().any(|x| ext.eq_ignore_ascii_case(x)) => {
            MediaType::RdfXml
        }
        Some(ext) if ["html", "xhtml", "htm"].iter().any(|x| ext.eq_ignore_ascii_case(x)) => {
            MediaType::XhtmlRdfa
        }
        _ => fallback.unwrap_or(MediaType::RdfXml),
    }
}

fn load_catalog(metadata: Option<&PathBuf>) -> Result<TestCatalog> {
    match metadata {
        Some(path) => {
            let text = String::from_utf8(read_file(path)?)
                .with_context(|| format!("Metadata is not UTF-8: {}", path.display()))?;
            let metadata = OntologyMetadata::from_json(&text)
                .with_context(|| format!("Invalid metadata feed: {}", path.display()))?;
            TestCatalog::from_metadata(&metadata)
                .with_context(|| format!("Metadata does not match the checks: {}", path.display()))
        }
        None => Ok(TestCatalog::bundled()?),
    }
}

fn build_store(
    documents: &[String],
    format: Option<MediaType>,
    fetch: &FetchOptions,
) -> Result<Box<dyn ProfileStore>> {
    if documents.is_empty() {
        return Ok(Box::new(HttpProfileStore::new(fetch)?));
    }
    let mut store = StaticProfileStore::new();
    for arg in documents {
        let (uri, path) = parse_document_arg(arg)?;
        let body = read_file(path)?;
        tracing::info!(uri, file = %path.display(), "serving local profile document");
        store.insert(uri, infer_media_type(path, format).mime(), body);
    }
    Ok(Box::new(store))
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "webid=warn,webid_lib=warn",
        1 => "webid=info,webid_lib=info",
        _ => "webid=debug,webid_lib=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Validate {
            file,
            mode,
            json,
            verify_tls,
            format,
            attime,
            parallel,
            workers,
            timeout,
            metadata,
            documents,
        } => {
            let input = read_input(file.as_ref())?;
            let catalog = Arc::new(load_catalog(metadata.as_ref())?);

            let fetch = FetchOptions {
                verify_tls: *verify_tls,
                timeout: timeout.as_deref().map(parse_duration).transpose()?,
                ..FetchOptions::default()
            };
            let store = build_store(documents, *format, &fetch)?;

            let options = ValidateOptions {
                mode: *mode,
                at_time: *attime,
                preferred_format: *format,
                parallel_fetch: *parallel,
                fetch_workers: *workers,
            };
            let engine = ValidationEngine::new(catalog, store, options);
            let outcome = engine.validate(Some(&input));

            if *json {
                println!("{}", webid_lib::to_json(&outcome)?);
            } else {
                print!("{}", webid_lib::display_outcome(&outcome));
            }
            if !outcome.validated {
                std::process::exit(2);
            }
        }
        Commands::Inspect { file, json } => {
            let input = read_input(file.as_ref())?;
            let cert = webid_lib::parse_cert(&input)?;
            if *json {
                println!("{}", webid_lib::to_json(&cert)?);
            } else {
                print!("{}", webid_lib::display_certificate(&cert, unix_now()));
            }
        }
        Commands::Catalog { json, metadata } => {
            let catalog = load_catalog(metadata.as_ref())?;
            if *json {
                println!("{}", webid_lib::to_json(&catalog)?);
            } else {
                println!("Catalog: {}", catalog.source());
                for spec in catalog.specs() {
                    println!(
                        "  {:>2} {:<34} {:<11} {:?}{}{}",
                        spec.order,
                        spec.name(),
                        spec.scope.to_string(),
                        spec.kind,
                        if spec.mandatory { "" } else { " (optional)" },
                        if spec.requirement { " [requirement]" } else { "" },
                    );
                }
                match catalog.coverage() {
                    Some(coverage) => println!("Coverage: {:.0}%", coverage * 100.0),
                    None => println!("Coverage: n/a (no metadata)"),
                }
                for id in catalog.unannotated() {
                    println!("Unannotated: {}", id);
                }
            }
        }
    }

    Ok(())
}
