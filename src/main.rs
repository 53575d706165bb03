mod cli;
mod display;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Args, Command};
use comtrade_prices::app::App;
use comtrade_prices::domain::{apparent_volume, Classifier};
use comtrade_prices::infra::comtrade::TradeQuery;
use comtrade_prices::util::{
    persistence::load_classification,
    version::{version_label, APP_NAME},
};
use display::{display_aggregates, display_classified, display_group_prices, display_records};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("{} {}", APP_NAME, version_label());

    let classifier = Classifier::new(load_classification(args.config.as_deref())?)?;
    let app = App::new(args.client()?, classifier);
    let year = args.year;

    match args.command {
        Command::Fetch {
            code,
            flow,
            reporter,
            partner,
            top,
        } => {
            let query = TradeQuery {
                reporter,
                partner,
                ..TradeQuery::commodity(code.as_str(), flow, year)
            };
            let records = app.client().fetch(&query).await?.sorted_by_value();
            display_records(&records, top);
        }
        Command::Country { reporter, top } => {
            let records = app.client().country_exports(reporter, year).await?;
            display_records(&records, top);
        }
        Command::Price {
            codes,
            top,
            min_value,
        } => {
            let table = app.exporters_by_list(&codes, year, min_value).await?;
            display_aggregates(&table);

            for (code, description) in codes.iter().zip(app.describe(&codes, year).await?) {
                println!("{code}: {}", description.unwrap_or_default());
            }

            let total_musd: f64 = table.iter().map(|(_, result)| result.total_value_musd).sum();
            match app.average_price(&codes, top, year).await? {
                Some(price) => {
                    let volume = apparent_volume(total_musd, price).unwrap_or_default();
                    println!(
                        "Total: apparent {volume:.1} Mt worth {:.1} bn USD at {price:.1} USD/t",
                        total_musd / 1000.0
                    );
                }
                None => println!("No priced exporters"),
            }
        }
        Command::Groups { top } => {
            let table = app.group_prices(top, year).await;
            display_group_prices(&table);
        }
        Command::Classify {
            country,
            data_dir,
            out_dir,
        } => {
            let report = app.classify_extract(&data_dir, &country, &out_dir)?;
            display_classified(&report);
        }
    }

    Ok(())
}
