//! Sock types - the stock positions tracked by the warehouse
//!
//! A position is identified by the pair `(color, cotton_percentage)`;
//! `quantity` is the number of pairs currently in stock.

use serde::{Deserialize, Serialize};

/// Lowest accepted cotton percentage
pub const MIN_COTTON: i64 = 0;
/// Highest accepted cotton percentage
pub const MAX_COTTON: i64 = 100;
/// Smallest quantity a single movement may carry
pub const MIN_MOVEMENT: i64 = 1;
/// Largest quantity a position (or a single movement) may hold
pub const MAX_QUANTITY: i64 = i32::MAX as i64;

/// A persisted stock position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sock {
    /// Database identifier
    pub id: i64,
    pub color: String,
    pub cotton_percentage: i64,
    /// Pairs in stock, never negative
    pub quantity: i64,
}

/// Body of income, outcome and update requests.
///
/// Fields are optional so that a missing value is reported as a validation
/// message instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SockRequest {
    pub color: Option<String>,
    pub cotton_percentage: Option<i64>,
    pub quantity: Option<i64>,
}

/// A validated stock movement (income, outcome, import row or update).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SockMovement {
    pub color: String,
    pub cotton_percentage: i64,
    pub quantity: i64,
}

impl SockRequest {
    pub fn new(color: impl Into<String>, cotton_percentage: i64, quantity: i64) -> Self {
        Self {
            color: Some(color.into()),
            cotton_percentage: Some(cotton_percentage),
            quantity: Some(quantity),
        }
    }

    /// Check every constraint and collect all violations.
    pub fn validate(&self) -> crate::Result<SockMovement> {
        let mut violations = Vec::new();

        let color = self.color.as_deref().map(str::trim).unwrap_or("");
        if let Err(msg) = validate_color(color) {
            violations.push(msg);
        }

        let cotton = match self.cotton_percentage {
            Some(c) => {
                if let Err(msg) = validate_cotton(c) {
                    violations.push(msg);
                }
                c
            }
            None => {
                violations.push("Cotton percentage must not be empty".to_string());
                0
            }
        };

        let quantity = match self.quantity {
            Some(q) => {
                if let Err(msg) = validate_quantity(q) {
                    violations.push(msg);
                }
                q
            }
            None => {
                violations.push("Quantity must not be empty".to_string());
                0
            }
        };

        if !violations.is_empty() {
            return Err(crate::Error::Validation(violations));
        }

        Ok(SockMovement {
            color: color.to_string(),
            cotton_percentage: cotton,
            quantity,
        })
    }
}

pub fn validate_color(color: &str) -> std::result::Result<(), String> {
    if color.trim().is_empty() {
        return Err("Color must not be empty".to_string());
    }
    Ok(())
}

pub fn validate_cotton(cotton: i64) -> std::result::Result<(), String> {
    if cotton < MIN_COTTON {
        return Err(format!("Cotton percentage must not be less than {}", MIN_COTTON));
    }
    if cotton > MAX_COTTON {
        return Err(format!("Cotton percentage must not be greater than {}", MAX_COTTON));
    }
    Ok(())
}

pub fn validate_quantity(quantity: i64) -> std::result::Result<(), String> {
    if quantity < MIN_MOVEMENT {
        return Err("Quantity must be greater than 0".to_string());
    }
    if quantity > MAX_QUANTITY {
        return Err(format!("Quantity must not be greater than {}", MAX_QUANTITY));
    }
    Ok(())
}

/// Message for a movement that would push a position past [`MAX_QUANTITY`]
pub fn stock_limit_exceeded(color: &str, cotton_percentage: i64) -> String {
    format!(
        "Quantity in stock of {} socks with {}% cotton must not exceed {}",
        color, cotton_percentage, MAX_QUANTITY
    )
}

/// Parameters of the filtered stock query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockFilter {
    pub color: String,
    #[serde(default = "default_min_cotton")]
    pub min_cotton_percentage: i64,
    #[serde(default = "default_max_cotton")]
    pub max_cotton_percentage: i64,
}

fn default_min_cotton() -> i64 {
    MIN_COTTON
}

fn default_max_cotton() -> i64 {
    MAX_COTTON
}

impl StockFilter {
    pub fn new(color: impl Into<String>, min: Option<i64>, max: Option<i64>) -> Self {
        Self {
            color: color.into(),
            min_cotton_percentage: min.unwrap_or(MIN_COTTON),
            max_cotton_percentage: max.unwrap_or(MAX_COTTON),
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.min_cotton_percentage > self.max_cotton_percentage
            || self.max_cotton_percentage > MAX_COTTON
            || self.min_cotton_percentage < MIN_COTTON
        {
            return Err(crate::Error::InvalidArgument(format!(
                "Invalid cotton range [{}, {}]",
                self.min_cotton_percentage, self.max_cotton_percentage
            )));
        }
        Ok(())
    }
}
