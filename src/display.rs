use comtrade_prices::app::{ClassifyReport, GroupPriceTable};
use comtrade_prices::domain::{display_description, AggregateResult, TradeRecord};
use comtrade_prices::infra::output::WriteOutcome;

fn price_cell(price: Option<f64>) -> String {
    price.map(|p| format!("{p:.1}")).unwrap_or_else(|| "-".to_string())
}

pub fn display_records(records: &[TradeRecord], limit: usize) {
    if records.is_empty() {
        println!("No records");
        return;
    }

    println!("{:<28} {:>8} {:>10} {:>10} {:>10}  {}", "Reporter", "Code", "MUSD", "Mt", "USD/t", "Commodity");
    println!("{}", "-".repeat(110));
    for record in records.iter().take(limit) {
        println!(
            "{:<28} {:>8} {:>10.1} {:>10.1} {:>10}  {}",
            record.reporter,
            record.code,
            record.value_musd(),
            record.weight_mton(),
            price_cell(record.unit_price()),
            display_description(&record.description)
        );
    }
    if records.len() > limit {
        println!("... {} more", records.len() - limit);
    }
}

pub fn display_aggregates(rows: &[(String, AggregateResult)]) {
    println!("{:<28} {:>10} {:>10} {:>10}", "Reporter", "MUSD", "Mt", "USD/t");
    println!("{}", "-".repeat(62));
    for (name, result) in rows {
        println!(
            "{:<28} {:>10.1} {:>10.1} {:>10.1}",
            name, result.total_value_musd, result.total_weight_mton, result.price_usd_per_ton
        );
    }
}

pub fn display_group_prices(table: &GroupPriceTable) {
    println!("{:<12} {:>10}  {}", "Group", "USD/t", "Codes");
    println!("{}", "-".repeat(60));
    for group in &table.prices {
        let codes: Vec<&str> = group.codes.iter().map(|code| code.as_str()).collect();
        println!("{:<12} {:>10}  {}", group.label, price_cell(group.price), codes.join(", "));
    }
    for (label, e) in &table.failures {
        println!("{label:<12} {:>10}  {e}", "failed");
    }
}

pub fn display_classified(report: &ClassifyReport) {
    for row in &report.rows {
        println!(
            "{:<10} {:>8} {:>8.1} {:>8.1} {:>10}  {}",
            row.group.as_deref().unwrap_or(""),
            row.record.code,
            row.record.weight_mton(),
            row.record.value_musd(),
            price_cell(row.record.unit_price()),
            display_description(&row.record.description)
        );
    }
    match report.outcome {
        WriteOutcome::Written => println!("Wrote {}", report.output.display()),
        WriteOutcome::Skipped => println!("{} already exists, left unchanged", report.output.display()),
    }
}
