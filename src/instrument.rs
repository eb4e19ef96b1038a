use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A traded instrument as the broker export names it, e.g. `BINANCE:BTCUSDT`.
///
/// The code is kept verbatim (trimmed) so trades can be traced back to the
/// export; `exchange()`/`symbol()` split it on the first `:` when present.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Instrument(String);

impl Instrument {
    /// Returns the full code, e.g. "NASDAQ:AAPL".
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Exchange prefix, if the code carries one.
    pub fn exchange(&self) -> Option<&str> {
        self.0.split_once(':').map(|(exchange, _)| exchange)
    }

    /// Ticker without the exchange prefix.
    pub fn symbol(&self) -> &str {
        self.0
            .split_once(':')
            .map(|(_, symbol)| symbol)
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Instrument {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.is_empty() {
            return Err("empty instrument code".to_string());
        }
        if code.split_once(':').is_some_and(|(ex, sym)| ex.is_empty() || sym.is_empty()) {
            return Err(format!("malformed instrument code: `{}`", code));
        }
        Ok(Instrument(code.to_string()))
    }
}

impl TryFrom<String> for Instrument {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Instrument> for String {
    fn from(value: Instrument) -> Self {
        value.0
    }
}
