//! # View configuration (`ledgerbook.toml`)
//!
//! Presentation defaults read from the `[view]` table of `ledgerbook.toml`:
//!
//! ```toml
//! [view]
//! page_size = 5          # records per page on the month screen
//! currency_symbol = "R$" # prefix used by format_currency
//! ```
//!
//! Every field has a default, so a missing or empty file is equivalent to
//! [`LedgerConfig::default`]. Connection and session settings live next to the
//! HTTP client in the `api` crate.

use serde::{Deserialize, Serialize};

use crate::view::{format_currency_with, DEFAULT_PAGE_SIZE};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub view: ViewConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Records per page. Zero is treated as one.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_currency_symbol() -> String {
    "R$".to_string()
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

impl LedgerConfig {
    /// Builder method to set the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.view.page_size = page_size;
        self
    }

    pub fn page_size(&self) -> usize {
        self.view.page_size.max(1)
    }

    /// Format money with the configured symbol.
    pub fn format_currency(&self, value: f64) -> String {
        format_currency_with(&self.view.currency_symbol, value)
    }

    /// The well-known filename for the config file.
    pub fn filename() -> &'static str {
        "ledgerbook.toml"
    }
}
