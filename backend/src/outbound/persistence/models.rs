//! Internal Diesel row types. Never exposed outside the persistence module.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{Float8, Json, Nullable, Text, Timestamptz, Uuid as SqlUuid};
use serde_json::Value;
use uuid::Uuid;

use super::schema::{order_items, other_fees, receipt_images, receipts};

#[derive(Debug, Insertable)]
#[diesel(table_name = receipt_images)]
pub(super) struct NewReceiptImageRow<'a> {
    pub(super) hash: &'a str,
    pub(super) bucket: &'a str,
    pub(super) key: &'a str,
    pub(super) raw_text: &'a str,
    pub(super) file_name: &'a str,
    pub(super) outing_id: Uuid,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = receipts)]
pub(super) struct NewReceiptRow<'a> {
    pub(super) receipt_image_id: Uuid,
    pub(super) restaurant: &'a str,
    pub(super) address: &'a str,
    pub(super) opened: Option<DateTime<Utc>>,
    pub(super) opened_raw: &'a str,
    pub(super) order_number: &'a str,
    pub(super) order_type: &'a str,
    pub(super) table_number: &'a str,
    pub(super) server: &'a str,
    pub(super) subtotal: f64,
    pub(super) sales_tax: f64,
    pub(super) total: f64,
    pub(super) payment_method: &'a str,
    pub(super) payment_amount_paid: f64,
    pub(super) payment_tip: f64,
    pub(super) copy: &'a str,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub(super) struct NewOrderItemRow<'a> {
    pub(super) receipt_id: Uuid,
    pub(super) position: i32,
    pub(super) name: &'a str,
    pub(super) price: f64,
    pub(super) quantity: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = other_fees)]
pub(super) struct NewOtherFeeRow<'a> {
    pub(super) receipt_id: Uuid,
    pub(super) position: i32,
    pub(super) name: &'a str,
    pub(super) price: f64,
}

/// Header row joined with its image and aggregated children.
#[derive(Debug, QueryableByName)]
pub(super) struct ReceiptAggregateRow {
    #[diesel(sql_type = SqlUuid)]
    pub(super) image_id: Uuid,
    #[diesel(sql_type = Text)]
    pub(super) hash: String,
    #[diesel(sql_type = Text)]
    pub(super) bucket: String,
    #[diesel(sql_type = Text)]
    pub(super) key: String,
    #[diesel(sql_type = Text)]
    pub(super) raw_text: String,
    #[diesel(sql_type = Text)]
    pub(super) file_name: String,
    #[diesel(sql_type = SqlUuid)]
    pub(super) outing_id: Uuid,
    #[diesel(sql_type = Timestamptz)]
    pub(super) created_at: DateTime<Utc>,
    #[diesel(sql_type = SqlUuid)]
    pub(super) receipt_id: Uuid,
    #[diesel(sql_type = Text)]
    pub(super) restaurant: String,
    #[diesel(sql_type = Text)]
    pub(super) address: String,
    #[diesel(sql_type = Nullable<Timestamptz>)]
    pub(super) opened: Option<DateTime<Utc>>,
    #[diesel(sql_type = Text)]
    pub(super) opened_raw: String,
    #[diesel(sql_type = Text)]
    pub(super) order_number: String,
    #[diesel(sql_type = Text)]
    pub(super) order_type: String,
    #[diesel(sql_type = Text)]
    pub(super) table_number: String,
    #[diesel(sql_type = Text)]
    pub(super) server: String,
    #[diesel(sql_type = Float8)]
    pub(super) subtotal: f64,
    #[diesel(sql_type = Float8)]
    pub(super) sales_tax: f64,
    #[diesel(sql_type = Float8)]
    pub(super) total: f64,
    #[diesel(sql_type = Text)]
    pub(super) payment_method: String,
    #[diesel(sql_type = Float8)]
    pub(super) payment_amount_paid: f64,
    #[diesel(sql_type = Float8)]
    pub(super) payment_tip: f64,
    #[diesel(sql_type = Text)]
    pub(super) copy: String,
    #[diesel(sql_type = Json)]
    pub(super) items: Value,
    #[diesel(sql_type = Json)]
    pub(super) other_fees: Value,
}
