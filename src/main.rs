//! # Folio CLI
//!
//! Command-line interface for rendering and checking page templates.
//!
//! ## Usage
//!
//! ```bash
//! # Render one document to HTML
//! folio render --template invoice.json --data order.json --out invoice.html
//!
//! # Render a batch, one HTML file per data file
//! folio render --template invoice.json --data a.json --data b.json --out out/
//!
//! # Lay out even when required fields are missing
//! folio render --template invoice.json --data draft.json --preview
//!
//! # Check a template
//! folio validate --template invoice.json
//!
//! # Show how data maps through the contract
//! folio contract --template invoice.json --data order.json
//!
//! # Align the contract with the template's bindings
//! folio sync --template invoice.json --write
//!
//! # Start the HTTP service
//! folio serve --listen 0.0.0.0:8080
//! ```

use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use folio::{
    contract::sync_contract,
    engine::{Engine, RenderOptions, RenderedDocument},
    render::{HtmlRasterizer, Rasterizer},
    server::{serve, ServerConfig},
    template::Template,
    validate::validate_value,
    FolioError,
};

/// Folio - template evaluation and pagination engine
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template against data to HTML
    Render {
        /// Template JSON file
        #[arg(long, value_name = "FILE")]
        template: PathBuf,

        /// Data JSON file; repeat for a batch
        #[arg(long, value_name = "FILE")]
        data: Vec<PathBuf>,

        /// Output file, or directory for a batch (stdout when omitted)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,

        /// Lay out even when required contract fields are missing
        #[arg(long)]
        preview: bool,
    },

    /// Validate a template document
    Validate {
        #[arg(long, value_name = "FILE")]
        template: PathBuf,
    },

    /// Evaluate the data contract and print the result
    Contract {
        #[arg(long, value_name = "FILE")]
        template: PathBuf,

        #[arg(long, value_name = "FILE")]
        data: Option<PathBuf>,
    },

    /// Sync the data contract with the bindings used in the template
    Sync {
        #[arg(long, value_name = "FILE")]
        template: PathBuf,

        /// Write the updated template back to its file
        #[arg(long)]
        write: bool,
    },

    /// Start the HTTP service
    Serve {
        /// Address to listen on
        #[arg(long, env = "FOLIO_LISTEN", default_value = "127.0.0.1:8080")]
        listen: String,

        /// Directory of templates to load at startup
        #[arg(long, env = "FOLIO_SEED_DIR", value_name = "DIR")]
        seed_dir: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "folio=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), FolioError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            template,
            data,
            out,
            preview,
        } => {
            let engine = Engine::new(read_template(&template)?);
            match data.as_slice() {
                [] => write_output(&render_one(&engine, None, preview)?, out.as_deref()),
                [single] => write_output(&render_one(&engine, Some(single), preview)?, out.as_deref()),
                batch => render_batch(&engine, batch, out.as_deref(), preview),
            }
        }

        Commands::Validate { template } => {
            let issues = validate_value(&read_json(&template)?);
            if issues.is_empty() {
                println!("Template is valid.");
                return Ok(());
            }
            eprintln!("Template is invalid:");
            for issue in &issues {
                eprintln!("- {}", issue);
            }
            Err(FolioError::InvalidTemplate(format!("{} issue(s) found", issues.len())))
        }

        Commands::Contract { template, data } => {
            let engine = Engine::new(read_template(&template)?);
            let data = match data {
                Some(path) => read_json(&path)?,
                None => Value::Object(Default::default()),
            };
            println!("{}", serde_json::to_string_pretty(&engine.evaluate(&data))?);
            Ok(())
        }

        Commands::Sync { template: path, write } => {
            let mut template = read_template(&path)?;
            let report = sync_contract(&mut template);
            for added in &report.added {
                println!("+ {}", added);
            }
            for removed in &report.removed {
                println!("- {}", removed);
            }
            if report.is_empty() {
                println!("Contract is up to date.");
            } else if write {
                std::fs::write(&path, serde_json::to_string_pretty(&template)? + "\n")?;
                println!("Updated {}", path.display());
            }
            Ok(())
        }

        Commands::Serve { listen, seed_dir } => {
            let config = ServerConfig {
                listen_addr: listen,
                seed_dir,
            };
            tokio::runtime::Runtime::new()?.block_on(serve(config))
        }
    }
}

fn read_json(path: &Path) -> Result<Value, FolioError> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| FolioError::Parse(format!("{}: {}", path.display(), e)))
}

fn read_template(path: &Path) -> Result<Template, FolioError> {
    Template::from_value(read_json(path)?)
}

/// Lay out one document and project it to HTML.
fn render_one(engine: &Engine, data: Option<&Path>, preview: bool) -> Result<Vec<u8>, FolioError> {
    let data = match data {
        Some(path) => read_json(path)?,
        None => Value::Object(Default::default()),
    };
    let doc = if preview {
        let doc = engine.preview(&data, RenderOptions::default())?;
        report_diagnostics(&doc);
        doc
    } else {
        engine.render(&data)?
    };
    HtmlRasterizer.rasterize(&doc)
}

fn report_diagnostics(doc: &RenderedDocument) {
    let d = &doc.diagnostics;
    if !d.missing_required.is_empty() {
        tracing::warn!(fields = ?d.missing_required, "missing required fields");
    }
    for error in &d.transform_errors {
        tracing::warn!(%error, "transform failed");
    }
    if !d.missing_bindings.is_empty() {
        tracing::info!(bindings = ?d.missing_bindings, "bindings without data");
    }
}

fn write_output(bytes: &[u8], out: Option<&Path>) -> Result<(), FolioError> {
    match out {
        Some(path) => {
            std::fs::write(path, bytes)?;
            println!("Wrote {}", path.display());
        }
        None => {
            use std::io::Write;
            std::io::stdout().write_all(bytes)?;
        }
    }
    Ok(())
}

/// Render every data file in parallel into `out_dir/<stem>.html`.
fn render_batch(
    engine: &Engine,
    data: &[PathBuf],
    out_dir: Option<&Path>,
    preview: bool,
) -> Result<(), FolioError> {
    let out_dir = out_dir.ok_or_else(|| {
        FolioError::InvalidTemplate("--out <DIR> is required when rendering several data files".into())
    })?;
    std::fs::create_dir_all(out_dir)?;

    let results: Vec<(PathBuf, Result<PathBuf, FolioError>)> = data
        .par_iter()
        .map(|path| {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());
            let target = out_dir.join(format!("{}.html", stem));
            let result = render_one(engine, Some(path), preview)
                .and_then(|bytes| std::fs::write(&target, bytes).map_err(FolioError::from))
                .map(|_| target);
            (path.clone(), result)
        })
        .collect();

    let mut failed = 0;
    for (path, result) in results {
        match result {
            Ok(target) => println!("{} -> {}", path.display(), target.display()),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {}", path.display(), e);
            }
        }
    }
    if failed > 0 {
        return Err(FolioError::Render(format!("{} of {} documents failed", failed, data.len())));
    }
    Ok(())
}
