use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use wedding_site::{
    auth, filter_items, get_all_items, import_seed, insert_items, load_config, load_registry_csv,
    load_seed, logging, open_database, registry, CategoryFilter, PriceRange,
};

#[derive(Parser)]
#[command(name = "wedding-site")]
#[command(about = "Manage the wedding site database from the terminal", version)]
struct Cli {
    /// Path to wedding.toml (defaults to $WEDDING_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import registry items and wedding party from a JSON seed file
    Import { seed: PathBuf },

    /// Import registry items from a CSV export
    ImportCsv { csv: PathBuf },

    /// List registry items with their status
    List {
        /// Only these categories (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,

        #[arg(long, default_value_t = 0.0)]
        min: f64,

        #[arg(long, default_value_t = f64::INFINITY)]
        max: f64,
    },

    /// Print the SHA-256 digest to put in [admin].password_sha256
    HashPassword { password: String },
}

fn main() -> Result<()> {
    logging::init("wedding_site=warn");
    let cli = Cli::parse();

    match cli.command {
        Command::HashPassword { password } => {
            println!("{}", auth::sha256_hex(&password));
            Ok(())
        }
        Command::Import { seed } => run_import(cli.config, seed),
        Command::ImportCsv { csv } => run_import_csv(cli.config, csv),
        Command::List {
            categories,
            min,
            max,
        } => run_list(cli.config, categories, min, max),
    }
}

fn run_import(config: Option<PathBuf>, seed_path: PathBuf) -> Result<()> {
    let config = load_config(config.as_deref())?;

    println!("📂 Loading seed file {:?}...", seed_path);
    let seed = load_seed(&seed_path)?;
    println!(
        "✓ Found {} registry items, {} wedding party members",
        seed.registry.len(),
        seed.party.len()
    );

    let conn = open_database(&config.database.path)?;
    let (items, members) = import_seed(&conn, &seed)?;

    println!("\n💾 Database: {:?}", config.database.path);
    println!("✓ Inserted {} registry items", items);
    println!("✓ Inserted {} wedding party members", members);
    println!("✓ Skipped {} existing entries", seed.registry.len() + seed.party.len() - items - members);

    Ok(())
}

fn run_import_csv(config: Option<PathBuf>, csv_path: PathBuf) -> Result<()> {
    let config = load_config(config.as_deref())?;

    println!("📂 Loading CSV {:?}...", csv_path);
    let items = load_registry_csv(&csv_path)?;

    let conn = open_database(&config.database.path)?;
    let inserted = insert_items(&conn, &items, "csv_importer")?;

    println!("✓ Inserted {} of {} registry items", inserted, items.len());
    Ok(())
}

fn run_list(config: Option<PathBuf>, categories: Vec<String>, min: f64, max: f64) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let conn = open_database(&config.database.path)?;

    let items = get_all_items(&conn)?;
    let filter: CategoryFilter = categories.into_iter().collect();
    let shown = filter_items(&items, &filter, PriceRange::new(min, max));

    println!("🎁 Registry: {} of {} items", shown.len(), items.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for item in &shown {
        let funding = if item.is_group_gift {
            format!(" ({:.0}% funded)", item.funding_progress() * 100.0)
        } else {
            String::new()
        };
        println!(
            "{:<14} {:<28} {:>9.2}  {}{}",
            item.category,
            item.name,
            item.price,
            item.status().label(),
            funding
        );
    }

    if shown.is_empty() {
        println!("(no items match)");
        println!("Categories: {}", registry::categories(&items).join(", "));
    }

    Ok(())
}
