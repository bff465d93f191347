use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use pawnsig::{
    DocumentKind, DocumentSource, EngineConfig, InkBlobDetector, IntakeDocuments,
    SignatureComparator, SignatureStampValidator, StagingArea,
};

#[derive(Parser)]
#[command(name = "pawnsig")]
#[command(about = "Extract and compare handwritten signatures on pawn intake documents")]
struct Cli {
    /// Path to a TOML configuration file (defaults are used if it does not exist)
    #[arg(short, long, value_name = "FILE", default_value = "pawnsig.toml", global = true)]
    config: PathBuf,

    /// Root directory for staging artifacts (overrides the config file)
    #[arg(long, value_name = "DIR", global = true)]
    staging: Option<PathBuf>,

    /// Minimum similarity score for a match (overrides the config file)
    #[arg(long, value_name = "SCORE", global = true)]
    threshold: Option<f64>,

    /// Save grayscale/binarized comparison panels next to the artifacts
    #[arg(long, global = true)]
    visualize: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare the ID card signature with the signature on one other document
    Compare {
        /// ID card capture; repeat to supply fallback captures in order
        #[arg(long = "id", value_name = "IMAGE", required = true)]
        id: Vec<PathBuf>,

        /// Document page to compare against
        #[arg(long, value_name = "IMAGE")]
        document: PathBuf,

        /// Kind of the document page
        #[arg(long, value_enum, default_value = "invoice-reverse")]
        kind: KindArg,
    },

    /// Run the signature and stamp checks for a full intake
    Report {
        /// ID card capture; repeat to supply fallback captures in order
        #[arg(long = "id", value_name = "IMAGE", required = true)]
        id: Vec<PathBuf>,

        /// Invoice reverse page
        #[arg(long, value_name = "IMAGE")]
        invoice: PathBuf,

        /// Vehicle registration card
        #[arg(long, value_name = "IMAGE")]
        registration: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    InvoiceReverse,
    RegistrationCard,
}

impl From<KindArg> for DocumentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::InvoiceReverse => DocumentKind::InvoiceReverse,
            KindArg::RegistrationCard => DocumentKind::RegistrationCard,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = EngineConfig::load_from_file(&args.config)?;
    if let Some(root) = args.staging {
        config.staging.root = root;
    }
    if let Some(threshold) = args.threshold {
        config.comparison.match_threshold = threshold;
    }
    if args.visualize {
        config.comparison.visualize = true;
    }
    config.validate()?;

    let staging = StagingArea::new(&config.staging.root);
    let staging_dir = staging.acquire_unique("signatures")?;

    let detector = Arc::new(InkBlobDetector::new(&config.ink));
    let comparator = SignatureComparator::from_config(detector, &config, &staging_dir);

    match args.command {
        Command::Compare { id, document, kind } => {
            let left = DocumentSource {
                kind: DocumentKind::IdCard,
                candidates: id,
            };
            let right = DocumentSource::single(kind.into(), document);
            let outcome = comparator.compare(&left, &right);

            println!("\n=== Signature Comparison ===");
            match &outcome.result {
                Ok(similarity) => {
                    println!("Score: {:.3} (threshold {:.2})", similarity.score, similarity.threshold);
                    println!("Match: {}", if similarity.is_match { "yes" } else { "no" });
                }
                Err(failure) => println!("Comparison failed: {}", failure),
            }
            if let Some(path) = &outcome.left_artifact {
                println!("ID card signature: {}", path.display());
            }
            if let Some(path) = &outcome.right_artifact {
                println!("{} signature: {}", right.kind.label(), path.display());
            }
        }
        Command::Report {
            id,
            invoice,
            registration,
            json,
        } => {
            let validator = SignatureStampValidator::new(comparator);
            let report = validator.run_validation_report(&IntakeDocuments::new(id, invoice, registration));

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("\n=== Signature & Stamp Validation ===");
                for (name, result) in &report.results {
                    let mark = if result.passed { "PASS" } else { "FAIL" };
                    println!("  [{}] {}: {}", mark, name, result.message);
                }
                if !report.artifact_paths.is_empty() {
                    println!("\nArtifacts:");
                    for (name, path) in &report.artifact_paths {
                        println!("  {}: {}", name, path.display());
                    }
                }
            }
        }
    }

    println!("\nStaging directory: {}", staging_dir.display());
    Ok(())
}
