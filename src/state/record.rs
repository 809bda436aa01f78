//! Addresses and the records extracted from them

use serde::{Deserialize, Serialize};
use std::fmt;

/// An absolute location the crawler can navigate to
///
/// Addresses compare by exact string. No normalization happens anywhere in the
/// crawler, so `https://a.com/x` and `https://a.com/x/` are two different nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<url::Url> for Address {
    fn from(value: url::Url) -> Self {
        Self(value.into())
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One extracted result: a page title and the page's canonical address
///
/// The canonical address is whatever the document reports after loading, which can
/// differ from the address used to navigate to it (redirects).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,

    #[serde(rename = "url")]
    pub address: Address,
}

impl Record {
    /// Column names of the tabular output, in field order
    pub const HEADERS: [&'static str; 2] = ["title", "url"];

    pub fn new(title: impl Into<String>, address: impl Into<Address>) -> Self {
        Self {
            title: title.into(),
            address: address.into(),
        }
    }
}
