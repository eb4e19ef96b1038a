//! Pushes closed trades into a Notion database, one page per trade.
//!
//! The journal is an output sink only: the matcher never depends on it, and a
//! page that fails to post is logged and counted rather than aborting the run.
//!
//! ## Page layout
//!
//! | Property        | Notion type | Value                              |
//! |-----------------|-------------|------------------------------------|
//! | `Name`          | title       | `"{symbol} - {entry date}"`        |
//! | `Date`          | date        | entry time, ISO-8601               |
//! | `Symbol`        | rich_text   | instrument code                    |
//! | `Direction`     | select      | `Long` / `Short`                   |
//! | `Entry Price`   | number      | weighted entry price               |
//! | `Exit Price`    | number      | weighted exit price                |
//! | `Position Size` | number      | matched size                       |
//! | `P/L ($)`       | number      | rounded to 2 dp                    |
//! | `P/L (%)`       | number      | rounded to 2 dp                    |
//! | `Result`        | select      | `Win` / `Loss` / `Breakeven`       |

use reqwest::Client;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Serialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{errors::JournalError, trade::Trade};

pub const NOTION_VERSION: &str = "2022-06-28";
pub const DEFAULT_BASE_URL: &str = "https://api.notion.com";

/// Validated credentials and endpoint for the journal database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalConfig {
    pub api_key: String,
    pub database_id: String,
    /// Scheme and host only, e.g. `https://api.notion.com`.
    pub base_url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
    /// Trades never sent because the run was cancelled.
    pub skipped: usize,
}

fn number(d: Decimal) -> Value {
    d.normalize().to_f64().map_or(Value::Null, |f| json!(f))
}

/// Builds the `POST /v1/pages` body for one trade.
pub fn page_payload(database_id: &str, trade: &Trade) -> Value {
    let entry_date = trade.entry_time.format("%Y-%m-%d").to_string();
    json!({
        "parent": { "database_id": database_id },
        "properties": {
            "Name": {
                "title": [{ "text": { "content": format!("{} - {}", trade.instrument, entry_date) } }]
            },
            "Date": {
                "date": { "start": trade.entry_time.format("%Y-%m-%dT%H:%M:%S").to_string() }
            },
            "Symbol": {
                "rich_text": [{ "text": { "content": trade.instrument.code() } }]
            },
            "Direction": { "select": { "name": trade.direction.to_string() } },
            "Entry Price": { "number": number(trade.entry_price) },
            "Exit Price": { "number": number(trade.exit_price) },
            "Position Size": { "number": number(trade.size) },
            "P/L ($)": { "number": number(trade.pnl_display()) },
            "P/L (%)": { "number": number(trade.pnl_percent_display()) },
            "Result": { "select": { "name": trade.result.to_string() } }
        }
    })
}

/// Thin async client over the Notion pages endpoint.
pub struct JournalClient {
    http: Client,
    config: JournalConfig,
}

impl JournalClient {
    pub fn new(config: JournalConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Creates one page. Any non-2xx answer is a [`JournalError::Rejected`]
    /// carrying the response body.
    pub async fn create_page(&self, trade: &Trade) -> Result<(), JournalError> {
        let url = format!("{}/v1/pages", self.config.base_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(&page_payload(&self.config.database_id, trade))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = match resp.text().await {
            Ok(body) => body,
            Err(err) => {
                warn!(status = status.as_u16(), "cannot read rejection body: {}", err);
                format!("<unreadable body: {err}>")
            }
        };
        Err(JournalError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    /// Posts every trade in order. Failures are logged and counted; the
    /// remaining trades are still attempted. Stops between requests once
    /// `cancel` fires.
    pub async fn sync_trades(&self, trades: &[Trade], cancel: &CancellationToken) -> SyncSummary {
        let mut summary = SyncSummary::default();
        for (i, trade) in trades.iter().enumerate() {
            if cancel.is_cancelled() {
                summary.skipped = trades.len() - i;
                warn!("sync cancelled, {} trades not sent", summary.skipped);
                break;
            }
            summary.attempted += 1;
            match self.create_page(trade).await {
                Ok(()) => {
                    summary.synced += 1;
                    info!(
                        "synced: {} | P/L: ${}",
                        trade.instrument,
                        trade.pnl_display()
                    );
                }
                Err(err) => {
                    summary.failed += 1;
                    warn!("failed: {} | {}", trade.instrument, err);
                }
            }
        }
        info!("synced {}/{} trades", summary.synced, trades.len());
        summary
    }
}
