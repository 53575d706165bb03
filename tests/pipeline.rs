use std::{fs, sync::Arc};

use async_trait::async_trait;
use reqwest::Url;
use serde_json::{json, Value};

use comtrade_prices::app::App;
use comtrade_prices::domain::{
    aggregate_by, normalize, AggregateKey, ClassificationConfig, Classifier, CommodityCode, RawRow,
    API_COLUMNS,
};
use comtrade_prices::infra::{
    comtrade::{ClientError, ComtradeClient, Transport},
    output::WriteOutcome,
};

/// Serves the same body for every request.
struct StaticTransport(Value);

#[async_trait]
impl Transport for StaticTransport {
    async fn get_json(&self, _url: &Url) -> Result<Value, ClientError> {
        Ok(self.0.clone())
    }
}

fn api_row(reporter: &str, code: &str, weight_kg: u64, value_usd: u64) -> Value {
    json!({
        "yr": 2018,
        "rgDesc": "Export",
        "rtTitle": reporter,
        "ptTitle": "World",
        "cmdCode": code,
        "NetWeight": weight_kg,
        "TradeValue": value_usd,
        "cmdDescE": "Food preparations"
    })
}

fn api_body(count: u64, rows: Vec<Value>) -> Value {
    json!({
        "validation": {"status": {"name": "Ok", "value": 0}, "count": {"value": count}},
        "dataset": rows
    })
}

fn infant_classifier() -> Classifier {
    let config = ClassificationConfig::from_json(
        r#"{
            "groups": [{"label": "infant", "codes": ["190110"]}],
            "include": ["19"],
            "exclude": ["1905"]
        }"#,
    )
    .unwrap();
    Classifier::new(config).unwrap()
}

#[test]
fn single_record_round_trip() {
    let rows: Vec<RawRow> = vec![serde_json::from_value(api_row("Canada", "100199", 1_000_000, 500_000)).unwrap()];
    let records = normalize(&rows, &API_COLUMNS).unwrap();

    let totals = aggregate_by(&records, AggregateKey::Reporter);
    let canada = &totals["Canada"];
    assert_eq!(canada.total_weight_mton, 1.0);
    assert_eq!(canada.total_value_musd, 0.5);
    assert_eq!(canada.price_usd_per_ton, 500.0);
}

#[test]
fn classified_records_aggregate_by_group() {
    let rows: Vec<RawRow> = [
        api_row("Germany", "190110", 2_000_000, 1_000_000),
        api_row("Germany", "190531", 1_000_000, 2_000_000),
    ]
    .into_iter()
    .map(|row| serde_json::from_value(row).unwrap())
    .collect();
    let records = normalize(&rows, &API_COLUMNS).unwrap();

    let classifier = infant_classifier();
    assert_eq!(classifier.select(&records), [true, false]);

    let labeled = classifier.apply(&records);
    assert_eq!(labeled.len(), 1);
    assert_eq!(labeled[0].group.as_deref(), Some("infant"));

    let totals = aggregate_by(&labeled, AggregateKey::Group);
    assert_eq!(totals.len(), 1);
    let infant = &totals["infant"];
    assert_eq!(infant.total_weight_mton, 2.0);
    assert_eq!(infant.total_value_musd, 1.0);
    assert_eq!(infant.price_usd_per_ton, 500.0);
}

#[test]
fn extract_pipeline_writes_labelled_table() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    fs::write(
        data.path().join("germany.csv"),
        "\
Classification,Year,Period,Trade Flow,Reporter,Partner,Commodity Code,Commodity,Netweight (kg),Trade Value (US$)
H5,2018,2018,Export,Germany,World,190110,Food preparations for infant use,2000000,1000000
H5,2018,2018,Export,Germany,World,190531,Sweet biscuits,1000000,2000000
H5,2018,2018,Export,Germany,World,190190,Malt extract,500000,400000
",
    )
    .unwrap();

    let client = ComtradeClient::new(Arc::new(StaticTransport(Value::Null))).unwrap();
    let app = App::new(client, infant_classifier());
    let report = app.classify_extract(data.path(), "germany", out.path()).unwrap();
    assert_eq!(report.outcome, WriteOutcome::Written);

    let written = fs::read_to_string(out.path().join("germany.csv")).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "infant,190110,2.0,1.0,500.0,Food preparations for infant use");
    assert_eq!(lines[2], ",190190,0.5,0.4,800.0,Malt extract");
}

#[tokio::test]
async fn truncated_fetch_yields_no_price() {
    let rows = (0..100).map(|i| api_row(&format!("Reporter {i}"), "190110", 1_000, 1_000)).collect();
    let client = ComtradeClient::new(Arc::new(StaticTransport(api_body(120, rows)))).unwrap();
    let app = App::new(client.clone(), infant_classifier());

    let err = client.exporters("190110", 2018).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation { reported: 120, received: 100, .. }));

    let codes: Vec<CommodityCode> = vec!["190110".parse().unwrap()];
    assert!(matches!(
        app.average_price(&codes, 10, 2018).await,
        Err(ClientError::Validation { .. })
    ));
}
