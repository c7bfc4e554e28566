//! Loads the ingredient and tag catalogs from CSV.
//!
//! ```bash
//! # DATABASE_URL (or POSTGRES_*) must be set
//! cargo run --bin import_catalog -- --ingredients data/ingredients.csv --tags data/tags.csv
//! ```

use std::{fs::File, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use foodgram_sdk::{
    import_ingredients, import_tags, invalidate_catalog_cache, parse_ingredients_csv,
    parse_tags_csv, run_migrations, Config,
};

#[derive(Parser)]
#[command(
    name = "import_catalog",
    about = "Import ingredients and tags into the Foodgram database"
)]
struct ImportArgs {
    /// Headerless `name,measurement_unit` CSV
    #[arg(long)]
    ingredients: Option<PathBuf>,

    /// `name,color,slug` CSV with a header line
    #[arg(long)]
    tags: Option<PathBuf>,

    /// Don't apply pending migrations first
    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = ImportArgs::parse();
    if args.ingredients.is_none() && args.tags.is_none() {
        bail!("Nothing to import: pass --ingredients and/or --tags");
    }

    let config = Config::from_env()?;
    let pool = config.connect().await?;

    if !args.skip_migrations {
        run_migrations(&pool).await?;
    }

    let mut imported = 0;

    if let Some(path) = &args.ingredients {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let records = parse_ingredients_csv(file)?;
        let count = import_ingredients(&records, &pool).await?;
        info!("{}: {count} new ingredients", path.display());
        imported += count;
    }

    if let Some(path) = &args.tags {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let records = parse_tags_csv(file)?;
        let count = import_tags(&records, &pool).await?;
        info!("{}: {count} new tags", path.display());
        imported += count;
    }

    if imported > 0 {
        match config.connect_cache().await {
            Ok(Some(mut cache)) => invalidate_catalog_cache(&mut cache).await?,
            Ok(None) => {}
            Err(e) => warn!("Catalog cache not invalidated: {e}"),
        }
    }

    Ok(())
}
