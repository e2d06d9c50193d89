use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use pdftext::{ExtractionOptions, ParseOptions, PdfDocument, PdfError, Quality, TextExtractor};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "pdftext",
    about = "Count pages and extract text from PDF files",
    version,
    author
)]
struct Cli {
    /// Increase log verbosity (-v: debug, -vv: trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OpenArgs {
    /// Input PDF file, `-` for stdin
    input: PathBuf,

    /// Password for encrypted documents
    #[arg(long)]
    password: Option<String>,

    /// Refuse to rebuild damaged cross-reference data
    #[arg(long)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the number of pages
    Pages {
        #[command(flatten)]
        open: OpenArgs,
    },

    /// Extract text from a PDF file
    Extract {
        #[command(flatten)]
        open: OpenArgs,

        /// Output text file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Page number to extract (1-based, extracts all if not specified)
        #[arg(short = 'p', long)]
        page: Option<usize>,

        /// Text inserted between pages
        #[arg(long, default_value = "\n\n")]
        separator: String,

        /// Character emitted for glyphs without a Unicode mapping
        #[arg(long, default_value_t = '\u{FFFD}')]
        placeholder: char,

        /// Extract pages on worker threads
        #[arg(long)]
        parallel: bool,

        /// Worker threads for --parallel (0: available parallelism)
        #[arg(long, default_value_t = 0)]
        threads: usize,
    },

    /// Show document information
    Info {
        #[command(flatten)]
        open: OpenArgs,

        /// List every page with its size
        #[arg(short, long)]
        detailed: bool,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "pdftext=debug,warn",
        _ => "pdftext=trace,debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut data = Vec::new();
        std::io::stdin()
            .read_to_end(&mut data)
            .context("Failed to read PDF from stdin")?;
        return Ok(data);
    }
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn open(args: &OpenArgs) -> Result<PdfDocument> {
    let data = read_input(&args.input)?;
    tracing::debug!("read {} bytes from {}", data.len(), args.input.display());
    let mut options = if args.strict {
        ParseOptions::strict()
    } else {
        ParseOptions::lenient()
    };
    options.password = args.password.clone();

    PdfDocument::open(data, options)
        .map_err(PdfError::from)
        .with_context(|| format!("Failed to open {}", args.input.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Pages { open: args } => {
            let doc = open(&args)?;
            println!("{}", doc.page_count());
        }

        Commands::Extract {
            open: args,
            output,
            page,
            separator,
            placeholder,
            parallel,
            threads,
        } => {
            let doc = open(&args)?;
            let extractor = TextExtractor::with_options(ExtractionOptions {
                page_separator: separator,
                placeholder,
                parallel,
                threads,
                ..ExtractionOptions::default()
            });

            let text = match page {
                Some(number) => {
                    let parsed = number
                        .checked_sub(1)
                        .and_then(|index| doc.page(index))
                        .ok_or(PdfError::InvalidPageNumber(number))?;
                    extractor
                        .extract_page(&doc, parsed)
                        .map_err(PdfError::from)
                        .with_context(|| format!("Failed to extract text from page {number}"))?
                        .text
                }
                None => {
                    let result = extractor.extract_document(&doc);
                    let diagnostics = &result.diagnostics;
                    if !diagnostics.failed_pages.is_empty() {
                        let pages: Vec<String> = diagnostics
                            .failed_pages
                            .iter()
                            .map(|index| (index + 1).to_string())
                            .collect();
                        eprintln!("warning: no text extracted from page(s) {}", pages.join(", "));
                    }
                    if diagnostics.quality() == Quality::Recovered {
                        eprintln!("warning: document structure was damaged and has been recovered");
                    }
                    result.join(&extractor.options().page_separator)
                }
            };

            match output {
                Some(path) => {
                    std::fs::write(&path, &text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("✓ Text extracted to: {}", path.display());
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    writeln!(stdout, "{text}")?;
                }
            }
        }

        Commands::Info {
            open: args,
            detailed,
        } => {
            let doc = open(&args)?;
            let info = doc.info();

            println!("PDF Information");
            println!("===============");
            println!("File: {}", args.input.display());
            println!("Version: {}", doc.version());
            println!("Pages: {}", doc.page_count());
            println!("Objects: {}", doc.object_count());
            match doc.encryption_info() {
                Some(algorithm) => println!("Encrypted: yes ({algorithm})"),
                None => println!("Encrypted: no"),
            }
            let quality = match doc.quality() {
                Quality::Clean => "clean",
                Quality::Recovered => "recovered",
            };
            println!("Structure: {quality}");

            for (label, value) in [
                ("Title", &info.title),
                ("Author", &info.author),
                ("Subject", &info.subject),
                ("Keywords", &info.keywords),
                ("Creator", &info.creator),
                ("Producer", &info.producer),
            ] {
                if let Some(value) = value {
                    println!("{label}: {value}");
                }
            }

            if detailed {
                println!("\nPages:");
                for (i, page) in doc.pages().iter().enumerate() {
                    println!(
                        "  Page {}: {:.0}x{:.0} pts{}",
                        i + 1,
                        page.width(),
                        page.height(),
                        if page.rotation != 0 {
                            format!(", rotated {}°", page.rotation)
                        } else {
                            String::new()
                        }
                    );
                }
            }
        }
    }

    Ok(())
}
