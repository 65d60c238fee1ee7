use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier such as `stock_sz_000338`.
pub type EntityId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Stock,
    Etf,
    Index,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Stock => "stock",
            EntityType::Etf => "etf",
            EntityType::Index => "index",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price adjustment applied to bar data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustType {
    /// Unadjusted
    Bfq,
    /// Forward adjusted
    Qfq,
    /// Backward adjusted
    Hfq,
}

impl AdjustType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustType::Bfq => "bfq",
            AdjustType::Qfq => "qfq",
            AdjustType::Hfq => "hfq",
        }
    }
}

/// Reference data for a tradable instrument. Owned by the data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub entity_type: EntityType,
    pub exchange: String,
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industries: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_date: Option<NaiveDate>,
}

impl Entity {
    pub fn new(
        entity_type: EntityType,
        exchange: impl Into<String>,
        code: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let exchange = exchange.into();
        let code = code.into();
        Self {
            id: format!("{}_{}_{}", entity_type, exchange, code),
            entity_type,
            exchange,
            code,
            name: name.into(),
            industries: None,
            list_date: None,
        }
    }

    pub fn with_industries(mut self, industries: impl Into<String>) -> Self {
        self.industries = Some(industries.into());
        self
    }

    pub fn with_list_date(mut self, list_date: NaiveDate) -> Self {
        self.list_date = Some(list_date);
        self
    }
}
