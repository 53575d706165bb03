use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};

use comtrade_prices::domain::{CommodityCode, Flow, DEFAULT_MIN_VALUE_MUSD, DEFAULT_TOP_N};
use comtrade_prices::infra::{
    cache::{default_cache_dir, CachedTransport, ResponseCache},
    comtrade::{Area, ComtradeClient, HttpTransport, Transport, DEFAULT_BASE_URL, DEFAULT_YEAR},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory for cached API responses.
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Always go to the network.
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Classification table to use instead of the built-in one.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, global = true, default_value_t = DEFAULT_YEAR)]
    pub year: i32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reporters trading one commodity with the world.
    Fetch {
        code: CommodityCode,
        #[arg(long, default_value = "export")]
        flow: Flow,
        /// `all` or a numeric UN area code.
        #[arg(long, default_value = "all")]
        reporter: Area,
        /// Numeric UN area code; 0 is the world.
        #[arg(long, default_value = "0")]
        partner: Area,
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,
    },
    /// All six-digit exports of one reporter.
    Country {
        /// Numeric UN area code, e.g. 276 for Germany.
        reporter: u32,
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,
    },
    /// Export price of a list of codes across the largest exporters.
    Price {
        #[arg(required = true)]
        codes: Vec<CommodityCode>,
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,
        #[arg(long, default_value_t = DEFAULT_MIN_VALUE_MUSD)]
        min_value: f64,
    },
    /// Price of every group in the classification table.
    Groups {
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,
    },
    /// Classify a bulk CSV extract and write the labelled table.
    Classify {
        country: String,
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

impl Args {
    pub fn client(&self) -> Result<ComtradeClient> {
        let http = HttpTransport::new()?;
        let transport: Arc<dyn Transport> = if self.no_cache {
            Arc::new(http)
        } else {
            let dir = self.cache_dir.clone().unwrap_or_else(default_cache_dir);
            Arc::new(CachedTransport::new(http, ResponseCache::new(dir)?))
        };
        Ok(ComtradeClient::with_base_url(transport, &self.base_url)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_accepts_area_options() {
        let args = Args::try_parse_from(["comtrade-prices", "fetch", "1001", "--reporter", "276", "--partner", "0"]).unwrap();
        match args.command {
            Command::Fetch { reporter, partner, .. } => {
                assert_eq!(reporter, Area::Code(276));
                assert_eq!(partner, Area::WORLD);
            }
            other => panic!("expected fetch, got {other:?}"),
        }
    }

    #[test]
    fn fetch_defaults_to_all_reporters() {
        let args = Args::try_parse_from(["comtrade-prices", "fetch", "1001"]).unwrap();
        assert!(matches!(args.command, Command::Fetch { reporter: Area::All, .. }));
        assert!(Args::try_parse_from(["comtrade-prices", "fetch", "1001", "--reporter", "Germany"]).is_err());
    }
}
