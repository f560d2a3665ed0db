#![forbid(unsafe_code)]
//! Print a page of recorded wallet lookups straight from the history database.

use clap::Parser;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use tronwatch::config::database_path_from_url;
use tronwatch::persistence::{Database, QueryHistory};

#[derive(Parser, Debug)]
#[command(name = "tronwatch-history", about = "Show recorded wallet lookups")]
struct Args {
    /// History database (same value the server reads)
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Rows to skip from the oldest entry
    #[arg(long, default_value_t = 0)]
    skip: u64,

    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=100))]
    limit: u64,

    /// Only show lookups of this address
    #[arg(long)]
    address: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let db = Database::open(&database_path_from_url(&args.database_url)?)?;
    let total = db.count()?;

    let rows = match &args.address {
        Some(address) => db
            .find_by_address(address)?
            .into_iter()
            .skip(args.skip as usize)
            .take(args.limit as usize)
            .collect(),
        None => db.list(args.skip, args.limit)?,
    };

    if rows.is_empty() {
        println!("No lookups recorded ({} total).", total);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Address")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
            Cell::new("Timestamp (UTC)")
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold),
        ]);

    for row in &rows {
        table.add_row(vec![
            Cell::new(row.id).fg(TableColor::White),
            Cell::new(&row.wallet_address).fg(TableColor::Green),
            Cell::new(row.timestamp.format("%Y-%m-%d %H:%M:%S")).fg(TableColor::Grey),
        ]);
    }

    println!("{table}");
    println!("Showing {} of {} lookups.", rows.len(), total);

    Ok(())
}
