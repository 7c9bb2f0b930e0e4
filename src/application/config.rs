use crate::domain::ReportSettings;
use clap::Parser;
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Terminal catalog manager for categories, tags, products and their technical details.
#[derive(Debug, Clone, Parser)]
#[command(name = "tcatalog", version, about)]
pub struct AppConfig {
    /// Catalog snapshot file (JSON). Created on first save if missing.
    #[arg(short, long, env = "TCATALOG_DATA", default_value = "catalog.json")]
    pub data: PathBuf,

    /// Only write the catalog file on explicit save (Ctrl+S).
    #[arg(long)]
    pub no_autosave: bool,

    /// Browse without permission to create, edit or delete.
    #[arg(long, env = "TCATALOG_READ_ONLY")]
    pub read_only: bool,

    /// Log file. The terminal itself is used by the interface.
    #[arg(long, env = "TCATALOG_LOG", default_value = "tcatalog.log")]
    pub log_file: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Threshold for the "priced above" and "priced below" reports.
    #[arg(long, default_value = "50")]
    pub price_threshold: Decimal,

    /// Category left out of the exclusion report.
    #[arg(long, default_value = "Hogar")]
    pub excluded_category: String,
}

impl AppConfig {
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    pub fn report_settings(&self) -> ReportSettings {
        ReportSettings {
            price_threshold: self.price_threshold,
            excluded_category: self.excluded_category.clone(),
        }
    }

    pub fn autosave(&self) -> bool {
        !self.no_autosave
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::try_parse_from(["tcatalog"]).unwrap();
        assert!(config.autosave());
        assert!(!config.read_only);
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.report_settings(), ReportSettings::default());
    }

    #[test]
    fn test_flags() {
        let config = AppConfig::try_parse_from([
            "tcatalog",
            "--data",
            "tienda.json",
            "--no-autosave",
            "--read-only",
            "-vv",
            "--price-threshold",
            "99.50",
            "--excluded-category",
            "Jardin",
        ])
        .unwrap();

        assert_eq!(config.data, PathBuf::from("tienda.json"));
        assert!(!config.autosave());
        assert!(config.read_only);
        assert_eq!(config.log_level(), "trace");
        assert_eq!(config.report_settings().price_threshold, Decimal::new(9950, 2));
        assert_eq!(config.report_settings().excluded_category, "Jardin");
    }

    #[test]
    fn test_rejects_bad_threshold() {
        assert!(AppConfig::try_parse_from(["tcatalog", "--price-threshold", "cheap"]).is_err());
    }
}
