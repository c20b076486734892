mod config;
mod contact;
mod doc_io;
mod docx_io;
mod search;
mod sortkey;
mod store;
mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use config::Config;
use contact::{parse_blocks, sort_contacts};

#[derive(Parser, Debug)]
#[command(name = "labeldex")]
struct Cli {
    /// Configuration file (defaults to the platform config dir)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory holding the contact store
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Address file to open on startup
    #[arg(long, value_name = "FILE")]
    open: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read contacts from a .doc or .docx address file into the store
    Import(ImportArgs),
    /// Write the store as a 30-per-page label sheet
    Export(ExportArgs),
    /// Print contacts whose address matches a term
    Query(QueryArgs),
}

#[derive(Args, Debug)]
struct ImportArgs {
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Replace the store instead of merging into it
    #[arg(long, default_value_t = false)]
    replace: bool,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Output path (defaults to export.default_output from the config)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Search term (matches any part of the address, accent-insensitive)
    term: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;
    let store_path = store::store_path(cli.data_dir.as_deref())?;

    if let Some(command) = cli.command {
        match command {
            Command::Import(args) => return handle_import(args, &store_path),
            Command::Export(args) => return handle_export(args, &config, &store_path),
            Command::Query(args) => return handle_query(args, &store_path),
        }
    }

    let open = cli.open.map(|p| config::expand_tilde(&p));
    let mut app = ui::app::App::new(&config, store_path, open)?;
    app.run()?;

    Ok(())
}

fn handle_import(args: ImportArgs, store_path: &std::path::Path) -> Result<()> {
    let blocks = docx_io::read_blocks(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let imported = parse_blocks(&blocks);
    if imported.is_empty() {
        anyhow::bail!("no contacts found in {}", args.input.display());
    }
    let imported_count = imported.len();

    let mut contacts = if args.replace {
        imported
    } else {
        let mut existing = store::load(store_path)?.unwrap_or_default();
        existing.extend(imported);
        existing
    };
    sort_contacts(&mut contacts);
    store::save(store_path, &contacts)?;

    println!(
        "Imported {} contact(s) from {} ({} in store)",
        imported_count,
        args.input.display(),
        contacts.len()
    );
    Ok(())
}

fn handle_export(args: ExportArgs, config: &Config, store_path: &std::path::Path) -> Result<()> {
    let mut contacts = store::load(store_path)?
        .filter(|c| !c.is_empty())
        .with_context(|| format!("no contacts in store at {}", store_path.display()))?;
    sort_contacts(&mut contacts);

    let output = args
        .output
        .map(|p| config::expand_tilde(&p))
        .unwrap_or_else(|| config.export.default_output.clone());
    docx_io::write_label_file(&output, &contacts)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "Wrote {} label(s) to {}",
        contacts.len(),
        output.display()
    );
    Ok(())
}

fn handle_query(args: QueryArgs, store_path: &std::path::Path) -> Result<()> {
    let contacts = store::load(store_path)?.unwrap_or_default();
    let results: Vec<_> = match search::normalize_query(&args.term) {
        Some(query) => contacts
            .iter()
            .filter(|c| search::matches(c, &query))
            .collect(),
        None => contacts.iter().collect(),
    };

    if results.is_empty() {
        println!("No matches for \"{}\"", args.term);
        return Ok(());
    }

    println!("Found {} contact(s) matching \"{}\"", results.len(), args.term);
    // Results: sortkey<TAB>address flattened to one line
    for contact in results {
        let flat = contact.full_address.lines().collect::<Vec<_>>().join(", ");
        println!("{}\t{}", contact.sort_key, flat);
    }
    Ok(())
}
