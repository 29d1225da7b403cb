//! Structured receipt model produced by the extraction pipeline.
//!
//! Field names match the JSON schema sent to the LLM provider. Decoding is
//! strict: an unknown field at any level is an error, never silently dropped.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::warn;

/// Fallback layout for `opened` when the value is not RFC 3339.
const OPENED_FALLBACK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A type that can be requested from a schema-constrained LLM.
pub trait StructuredOutput: Serialize + DeserializeOwned + Send {
    /// Name the schema is registered under with the provider.
    const SCHEMA_NAME: &'static str;

    /// JSON schema describing `Self`.
    ///
    /// Every object in the schema must set `additionalProperties: false` and
    /// list all of its properties as required, as strict mode demands.
    fn json_schema() -> Value;
}

/// One ordered line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderItem {
    /// Item description as printed.
    pub name: String,
    /// Line price.
    pub price: f64,
    /// Number of units.
    pub quantity: i64,
}

/// How the bill was settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentDetails {
    /// Payment method, e.g. `VISA` or `cash`.
    pub method: String,
    /// Amount charged.
    pub amount_paid: f64,
    /// Tip added on top.
    pub tip: f64,
}

/// Any surcharge that is neither tax nor an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OtherFee {
    /// Fee label.
    pub name: String,
    /// Fee amount.
    pub price: f64,
}

/// Receipt fields as extracted from OCR text.
///
/// Numbers are stored as extracted; negative values are not rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Receipt {
    /// Restaurant name.
    pub restaurant: String,
    /// Restaurant address.
    pub address: String,
    /// Opening time exactly as printed.
    pub opened: String,
    /// Order or check number.
    pub order_number: String,
    /// Dine-in, takeaway, delivery and so on.
    pub order_type: String,
    /// Table identifier.
    pub table: String,
    /// Server name.
    pub server: String,
    /// Line items in printed order.
    pub items: Vec<OrderItem>,
    /// Sum before tax and fees.
    pub subtotal: f64,
    /// Sales tax.
    pub sales_tax: f64,
    /// Grand total.
    pub total: f64,
    /// Settlement details.
    pub payment: PaymentDetails,
    /// Copy label such as `Customer Copy`.
    pub copy: String,
    /// Additional fees in printed order.
    pub other_fees: Vec<OtherFee>,
}

impl StructuredOutput for Receipt {
    const SCHEMA_NAME: &'static str = "receipt_info";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "restaurant": field("string", "Name of the restaurant"),
                "address": field("string", "Address of the restaurant"),
                "opened": field("string", "Date and time the order was opened"),
                "order_number": field("string", "Unique order number"),
                "order_type": field("string", "Type of the order (e.g., dine-in, takeout)"),
                "table": field("string", "Table number or identifier"),
                "server": field("string", "Name or ID of the server"),
                "items": {
                    "type": "array",
                    "description": "List of items ordered",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": field("string", "Name of the ordered item"),
                            "price": field("number", "Price of the ordered item"),
                            "quantity": field("integer", "Quantity of the ordered item"),
                        },
                        "required": ["name", "price", "quantity"],
                        "additionalProperties": false,
                    },
                },
                "subtotal": field("number", "Subtotal before tax"),
                "sales_tax": field("number", "Sales tax amount"),
                "total": field("number", "Total amount of the order"),
                "payment": {
                    "type": "object",
                    "description": "Payment information",
                    "properties": {
                        "method": field("string", "Payment method (e.g., cash, credit card)"),
                        "amount_paid": field("number", "Total amount paid"),
                        "tip": field("number", "Tip amount given"),
                    },
                    "required": ["method", "amount_paid", "tip"],
                    "additionalProperties": false,
                },
                "copy": field("string", "Receipt copy type (e.g., customer, merchant)"),
                "other_fees": {
                    "type": "array",
                    "description": "List of additional fees applied to the order",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": field("string", "Name of the additional fee"),
                            "price": field("number", "Price of the additional fee"),
                        },
                        "required": ["name", "price"],
                        "additionalProperties": false,
                    },
                },
            },
            "required": [
                "restaurant", "address", "opened", "order_number", "order_type",
                "table", "server", "items", "subtotal", "sales_tax", "total",
                "payment", "copy", "other_fees",
            ],
            "additionalProperties": false,
        })
    }
}

/// Scalar schema property with its model-facing description.
fn field(kind: &str, description: &str) -> Value {
    json!({"type": kind, "description": description})
}

/// A receipt with its opening time resolved to UTC where possible.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReceipt {
    /// Extracted fields, including the raw `opened` string.
    pub receipt: Receipt,
    /// Parsed `opened`; `None` when the raw value is empty or unparseable.
    pub opened_at: Option<DateTime<Utc>>,
}

impl From<Receipt> for ParsedReceipt {
    fn from(receipt: Receipt) -> Self {
        let opened_at = parse_opened(&receipt.opened);
        Self { receipt, opened_at }
    }
}

/// Parse a printed opening time.
///
/// RFC 3339 is tried first, then `YYYY-MM-DD HH:MM:SS` read as UTC. A value
/// matching neither logs a warning and yields `None`; an empty value yields
/// `None` quietly.
pub fn parse_opened(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(trimmed, OPENED_FALLBACK_FORMAT) {
        Ok(naive) => Some(naive.and_utc()),
        Err(err) => {
            warn!(opened = %raw, error = %err, "unparseable receipt opening time");
            None
        }
    }
}
