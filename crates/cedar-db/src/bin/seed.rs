//! # Seed Data Generator
//!
//! Populates a database with demo ledger activity for development: a batch
//! of goods receipts, a run of sales with COGS at moving average, balanced
//! journals for each document and a reversal, then prints the resulting
//! valuation and trial balance. Doubles as an end-to-end smoke run of the
//! whole posting pipeline.
//!
//! ## Usage
//! ```bash
//! # Seed 30 days of activity (default)
//! cargo run -p cedar-db --bin seed
//!
//! # Custom volume and database path
//! cargo run -p cedar-db --bin seed -- --days 90 --db ./data/cedar.db
//! ```

use chrono::{Duration, NaiveDate, Utc};
use std::env;

use cedar_core::{
    JournalLine, Lbp, MoveDirection, NewJournal, NewStockMove, Qty, RateType, SourceType, Usd,
};
use cedar_db::{Database, DbConfig, DbResult};

const COMPANY_ID: &str = "demo-co";
const WAREHOUSE_ID: &str = "wh-main";

/// Demo catalog: (item_id, unit cost USD cents×100 at 4dp, sale price).
const ITEMS: &[(&str, i64, i64)] = &[
    ("item-olive-oil-1l", 8_5000, 12_0000),
    ("item-zaatar-500g", 3_2500, 5_0000),
    ("item-rosewater-250ml", 2_1000, 3_5000),
    ("item-coffee-1kg", 11_0000, 16_0000),
    ("item-tahini-900g", 6_7500, 9_5000),
];

/// Market rate used for the LBP leg: 89,500 LL per USD.
const RATE_LBP_PER_USD: i64 = 89_500;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut days: i64 = 30;
    let mut db_path = String::from("./cedar_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--days" | "-n" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(30);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Cedar Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --days <N>     Days of activity to generate (default: 30)");
                println!("  -d, --db <PATH>    Database file path (default: ./cedar_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Cedar Ledger Seed Data Generator");
    println!("===================================");
    println!("Database: {}", db_path);
    println!("Days:     {}", days);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.costs().list(COMPANY_ID).await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} costing aggregates", existing.len());
        println!("  Skipping seed to avoid stacking demo data.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start_date = Utc::now().date_naive() - Duration::days(days);

    println!();
    println!("Generating activity...");
    let started = std::time::Instant::now();

    let mut receipts = 0usize;
    let mut sales = 0usize;
    let mut last_invoice_no = None;

    for day in 0..days {
        let date = start_date + Duration::days(day);

        // Restock every item once a week.
        if day % 7 == 0 {
            for (item_id, unit_cost, _) in ITEMS {
                seed_receipt(&db, date, item_id, 50, Usd::from_raw(*unit_cost)).await?;
                receipts += 1;
            }
        }

        // A couple of sales per day, cycling through the catalog.
        for sale in 0..2usize {
            let (item_id, _, price) = ITEMS[(day as usize * 2 + sale) % ITEMS.len()];
            last_invoice_no =
                Some(seed_sale(&db, date, item_id, 3 + (day % 5), Usd::from_raw(price)).await?);
            sales += 1;
        }
    }

    // Demonstrate the sanctioned undo path: void the last sale's journal.
    if let Some(invoice_no) = last_invoice_no {
        if let Some(journal) = db
            .gl()
            .journal_for_source(COMPANY_ID, SourceType::SalesInvoice, &invoice_no)
            .await?
        {
            let reversal = db
                .gl()
                .reverse_journal(
                    COMPANY_ID,
                    &journal.id,
                    Utc::now().date_naive(),
                    "demo void",
                )
                .await?;
            println!("✓ Reversed journal {} as {}", journal.journal_no, reversal.journal_no);
        }
    }

    println!("✓ Recorded {} receipts, {} sales in {:?}", receipts, sales, started.elapsed());

    println!();
    println!("Inventory valuation");
    println!("-------------------");
    for line in db.costs().valuation(COMPANY_ID).await? {
        println!(
            "  {:24} {:>12} on hand   avg {}  value {}",
            line.item_id, line.aggregate.on_hand_qty, line.aggregate.avg_cost_usd, line.value_usd
        );
    }

    println!();
    println!("Trial balance");
    println!("-------------");
    let mut net_debit = Usd::zero();
    let mut net_credit = Usd::zero();
    for line in db.gl().trial_balance(COMPANY_ID).await? {
        net_debit += line.debit_usd;
        net_credit += line.credit_usd;
        println!(
            "  {:24} debit {:>14}  credit {:>14}",
            line.account_id,
            line.debit_usd.to_string(),
            line.credit_usd.to_string()
        );
    }
    println!("  books balanced: {}", net_debit == net_credit);

    db.close().await;
    Ok(())
}

fn lbp_leg(usd: Usd) -> Lbp {
    // 4dp USD → 2dp LBP at the demo rate.
    Lbp::from_raw(usd.raw() * RATE_LBP_PER_USD / 100)
}

/// Goods receipt: inbound movement plus its inventory/payable journal.
async fn seed_receipt(
    db: &Database,
    date: NaiveDate,
    item_id: &str,
    qty: i64,
    unit_cost: Usd,
) -> DbResult<()> {
    let grn_no = db.sequences().next_number(COMPANY_ID, "GR").await?;

    db.movements()
        .record_move(NewStockMove {
            company_id: COMPANY_ID.into(),
            item_id: item_id.into(),
            warehouse_id: WAREHOUSE_ID.into(),
            batch_no: None,
            direction: MoveDirection::Inbound,
            qty: Qty::from_whole(qty),
            unit_cost_usd: Some(unit_cost),
            unit_cost_lbp: Some(lbp_leg(unit_cost)),
            source_type: SourceType::GoodsReceipt,
            source_id: grn_no.clone(),
        })
        .await?;

    let total = unit_cost.extend(Qty::from_whole(qty));
    db.gl()
        .post_journal(NewJournal {
            company_id: COMPANY_ID.into(),
            journal_date: date,
            source_type: SourceType::GoodsReceipt,
            source_id: grn_no,
            rate_type: RateType::Market,
            exchange_rate: RATE_LBP_PER_USD * 10_000,
            memo: Some(format!("receipt {item_id}")),
            lines: vec![
                journal_line("inventory", total, Usd::zero()),
                journal_line("accounts-payable", Usd::zero(), total),
            ],
        })
        .await?;

    Ok(())
}

/// Cash sale: outbound movement at moving average plus a four-line journal
/// (cash/revenue and COGS/inventory). Returns the allocated invoice number.
async fn seed_sale(
    db: &Database,
    date: NaiveDate,
    item_id: &str,
    qty: i64,
    unit_price: Usd,
) -> DbResult<String> {
    let invoice_no = db.sequences().next_number(COMPANY_ID, "SI").await?;
    let qty = Qty::from_whole(qty);

    let recorded = db
        .movements()
        .record_move(NewStockMove {
            company_id: COMPANY_ID.into(),
            item_id: item_id.into(),
            warehouse_id: WAREHOUSE_ID.into(),
            batch_no: None,
            direction: MoveDirection::Outbound,
            qty,
            unit_cost_usd: None,
            unit_cost_lbp: None,
            source_type: SourceType::SalesInvoice,
            source_id: invoice_no.clone(),
        })
        .await?;

    let revenue = unit_price.extend(qty);
    let cogs = recorded.movement.unit_cost_usd.extend(qty);

    db.gl()
        .post_journal(NewJournal {
            company_id: COMPANY_ID.into(),
            journal_date: date,
            source_type: SourceType::SalesInvoice,
            source_id: invoice_no.clone(),
            rate_type: RateType::Market,
            exchange_rate: RATE_LBP_PER_USD * 10_000,
            memo: Some(format!("sale {item_id}")),
            lines: vec![
                journal_line("cash", revenue, Usd::zero()),
                journal_line("sales", Usd::zero(), revenue),
                journal_line("cogs", cogs, Usd::zero()),
                journal_line("inventory", Usd::zero(), cogs),
            ],
        })
        .await?;

    Ok(invoice_no)
}

fn journal_line(account: &str, debit: Usd, credit: Usd) -> JournalLine {
    JournalLine {
        account_id: account.to_string(),
        debit_usd: debit,
        credit_usd: credit,
        debit_lbp: lbp_leg(debit),
        credit_lbp: lbp_leg(credit),
        memo: None,
    }
}
