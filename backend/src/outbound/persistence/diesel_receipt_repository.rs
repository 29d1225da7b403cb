//! PostgreSQL-backed `ReceiptRepository` implementation using Diesel ORM.
//!
//! Writes happen in one transaction: image, header, every item, every fee.
//! Reads reassemble a receipt with a single statement that aggregates items
//! and fees as JSON arrays ordered by their source position.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_query;
use diesel::sql_types::{Text, Uuid as SqlUuid};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{
    NewReceiptRecord, PersistedReceiptIds, ReceiptOwner, ReceiptRepository,
    ReceiptRepositoryError, StoredReceipt,
};
use crate::domain::{
    ImageFingerprint, OrderItem, OtherFee, ParsedReceipt, PaymentDetails, Receipt,
};

use super::models::{
    NewOrderItemRow, NewOtherFeeRow, NewReceiptImageRow, NewReceiptRow, ReceiptAggregateRow,
};
use super::pool::{DbPool, PoolError};
use super::schema::{order_items, other_fees, receipt_images, receipts};

macro_rules! select_receipt_sql {
    ($filter:literal) => {
        concat!(
            "SELECT ri.id AS image_id, ri.hash, ri.bucket, ri.key, ri.raw_text, ri.file_name, ",
            "ri.outing_id, ri.created_at, r.id AS receipt_id, r.restaurant, r.address, ",
            "r.opened, r.opened_raw, r.order_number, r.order_type, r.table_number, r.server, ",
            "r.subtotal, r.sales_tax, r.total, r.payment_method, r.payment_amount_paid, ",
            "r.payment_tip, r.copy, ",
            "COALESCE((SELECT json_agg(json_build_object(",
            "'name', oi.name, 'price', oi.price, 'quantity', oi.quantity) ORDER BY oi.position) ",
            "FROM order_items oi WHERE oi.receipt_id = r.id), '[]'::json) AS items, ",
            "COALESCE((SELECT json_agg(json_build_object(",
            "'name', f.name, 'price', f.price) ORDER BY f.position) ",
            "FROM other_fees f WHERE f.receipt_id = r.id), '[]'::json) AS other_fees ",
            "FROM receipt_images ri JOIN receipts r ON r.receipt_image_id = ri.id ",
            $filter
        )
    };
}

const FIND_BY_HASH_SQL: &str = select_receipt_sql!("WHERE ri.hash = $1");
const FIND_BY_ID_SQL: &str = select_receipt_sql!("WHERE r.id = $1");

/// Diesel-backed implementation of the `ReceiptRepository` port.
#[derive(Clone)]
pub struct DieselReceiptRepository {
    pool: DbPool,
}

impl DieselReceiptRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure inside the write transaction.
#[derive(Debug)]
enum PersistError {
    Diesel(DieselError),
    QuantityOutOfRange { position: usize, quantity: i64 },
    TooManyRows { count: usize },
}

impl From<DieselError> for PersistError {
    fn from(error: DieselError) -> Self {
        Self::Diesel(error)
    }
}

fn map_pool_error(error: PoolError) -> ReceiptRepositoryError {
    ReceiptRepositoryError::connection(error.message())
}

fn map_diesel_error(error: DieselError, fingerprint: &str) -> ReceiptRepositoryError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => ReceiptRepositoryError::query("record not found"),
        DieselError::QueryBuilderError(_) => ReceiptRepositoryError::query("database query error"),
        DieselError::DeserializationError(err) => {
            ReceiptRepositoryError::decode(format!("row decode failed: {err}"))
        }
        DieselError::DatabaseError(kind, info) => match kind {
            DatabaseErrorKind::UniqueViolation => {
                ReceiptRepositoryError::duplicate_image(fingerprint)
            }
            DatabaseErrorKind::ClosedConnection => {
                ReceiptRepositoryError::connection("database connection error")
            }
            _ => ReceiptRepositoryError::query(format!("database error: {}", info.message())),
        },
        _ => ReceiptRepositoryError::query("database error"),
    }
}

fn map_persist_error(error: PersistError, fingerprint: &str) -> ReceiptRepositoryError {
    match error {
        PersistError::Diesel(err) => map_diesel_error(err, fingerprint),
        PersistError::QuantityOutOfRange { position, quantity } => ReceiptRepositoryError::query(
            format!("item {position} quantity {quantity} does not fit a 32-bit column"),
        ),
        PersistError::TooManyRows { count } => {
            ReceiptRepositoryError::query(format!("{count} rows exceed the position range"))
        }
    }
}

fn position(index: usize) -> Result<i32, PersistError> {
    i32::try_from(index).map_err(|_| PersistError::TooManyRows { count: index })
}

async fn write_receipt(
    conn: &mut AsyncPgConnection,
    record: &NewReceiptRecord,
) -> Result<PersistedReceiptIds, PersistError> {
    let receipt = &record.receipt.receipt;

    let image_id: Uuid = diesel::insert_into(receipt_images::table)
        .values(&NewReceiptImageRow {
            hash: record.fingerprint.as_str(),
            bucket: &record.bucket,
            key: &record.key,
            raw_text: &record.raw_text,
            file_name: &record.file_name,
            outing_id: record.owner.outing_id,
        })
        .returning(receipt_images::id)
        .get_result(conn)
        .await?;

    let receipt_id: Uuid = diesel::insert_into(receipts::table)
        .values(&NewReceiptRow {
            receipt_image_id: image_id,
            restaurant: &receipt.restaurant,
            address: &receipt.address,
            opened: record.receipt.opened_at,
            opened_raw: &receipt.opened,
            order_number: &receipt.order_number,
            order_type: &receipt.order_type,
            table_number: &receipt.table,
            server: &receipt.server,
            subtotal: receipt.subtotal,
            sales_tax: receipt.sales_tax,
            total: receipt.total,
            payment_method: &receipt.payment.method,
            payment_amount_paid: receipt.payment.amount_paid,
            payment_tip: receipt.payment.tip,
            copy: &receipt.copy,
        })
        .returning(receipts::id)
        .get_result(conn)
        .await?;

    for (index, item) in receipt.items.iter().enumerate() {
        let quantity = i32::try_from(item.quantity).map_err(|_| {
            PersistError::QuantityOutOfRange {
                position: index,
                quantity: item.quantity,
            }
        })?;
        diesel::insert_into(order_items::table)
            .values(&NewOrderItemRow {
                receipt_id,
                position: position(index)?,
                name: &item.name,
                price: item.price,
                quantity,
            })
            .execute(conn)
            .await?;
    }

    for (index, fee) in receipt.other_fees.iter().enumerate() {
        diesel::insert_into(other_fees::table)
            .values(&NewOtherFeeRow {
                receipt_id,
                position: position(index)?,
                name: &fee.name,
                price: fee.price,
            })
            .execute(conn)
            .await?;
    }

    Ok(PersistedReceiptIds {
        image_id,
        receipt_id,
    })
}

fn row_to_stored(row: ReceiptAggregateRow) -> Result<StoredReceipt, ReceiptRepositoryError> {
    let fingerprint = ImageFingerprint::parse(&row.hash).map_err(|err| {
        ReceiptRepositoryError::decode(format!("stored image hash is invalid: {err}"))
    })?;
    let items: Vec<OrderItem> = serde_json::from_value(row.items).map_err(|err| {
        ReceiptRepositoryError::decode(format!("order items for receipt {}: {err}", row.receipt_id))
    })?;
    let other_fees: Vec<OtherFee> = serde_json::from_value(row.other_fees).map_err(|err| {
        ReceiptRepositoryError::decode(format!("other fees for receipt {}: {err}", row.receipt_id))
    })?;

    Ok(StoredReceipt {
        ids: PersistedReceiptIds {
            image_id: row.image_id,
            receipt_id: row.receipt_id,
        },
        fingerprint,
        bucket: row.bucket,
        key: row.key,
        raw_text: row.raw_text,
        file_name: row.file_name,
        owner: ReceiptOwner {
            outing_id: row.outing_id,
        },
        receipt: ParsedReceipt {
            receipt: Receipt {
                restaurant: row.restaurant,
                address: row.address,
                opened: row.opened_raw,
                order_number: row.order_number,
                order_type: row.order_type,
                table: row.table_number,
                server: row.server,
                items,
                subtotal: row.subtotal,
                sales_tax: row.sales_tax,
                total: row.total,
                payment: PaymentDetails {
                    method: row.payment_method,
                    amount_paid: row.payment_amount_paid,
                    tip: row.payment_tip,
                },
                copy: row.copy,
                other_fees,
            },
            opened_at: row.opened,
        },
        created_at: row.created_at,
    })
}

#[async_trait]
impl ReceiptRepository for DieselReceiptRepository {
    async fn find_by_hash(
        &self,
        fingerprint: &ImageFingerprint,
    ) -> Result<Option<StoredReceipt>, ReceiptRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ReceiptAggregateRow> = sql_query(FIND_BY_HASH_SQL)
            .bind::<Text, _>(fingerprint.as_str())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, fingerprint.as_str()))?;
        row.map(row_to_stored).transpose()
    }

    async fn find_by_id(
        &self,
        receipt_id: Uuid,
    ) -> Result<Option<StoredReceipt>, ReceiptRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ReceiptAggregateRow> = sql_query(FIND_BY_ID_SQL)
            .bind::<SqlUuid, _>(receipt_id)
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, ""))?;
        row.map(row_to_stored).transpose()
    }

    async fn persist(
        &self,
        record: &NewReceiptRecord,
    ) -> Result<PersistedReceiptIds, ReceiptRepositoryError> {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let ids = conn
            .transaction(|conn| async move { write_receipt(conn, record).await }.scope_boxed())
            .await
            .map_err(|err| map_persist_error(err, record.fingerprint.as_str()))?;
        debug!(
            fingerprint = %record.fingerprint,
            receipt_id = %ids.receipt_id,
            items = record.receipt.receipt.items.len(),
            fees = record.receipt.receipt.other_fees.len(),
            "receipt rows committed"
        );
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for receipt repository mapping helpers.
    use super::*;
    use chrono::Utc;
    use rstest::rstest;
    use serde_json::json;

    fn aggregate_row(items: serde_json::Value, fees: serde_json::Value) -> ReceiptAggregateRow {
        ReceiptAggregateRow {
            image_id: Uuid::new_v4(),
            hash: ImageFingerprint::of(b"img").to_string(),
            bucket: "receipts".to_owned(),
            key: "k.jpg".to_owned(),
            raw_text: "Coffee $3.50".to_owned(),
            file_name: "k.jpg".to_owned(),
            outing_id: Uuid::new_v4(),
            created_at: Utc::now(),
            receipt_id: Uuid::new_v4(),
            restaurant: "Blue Door".to_owned(),
            address: "12 High St".to_owned(),
            opened: None,
            opened_raw: "yesterday".to_owned(),
            order_number: "17".to_owned(),
            order_type: "Dine In".to_owned(),
            table_number: "4".to_owned(),
            server: "Sam".to_owned(),
            subtotal: 3.5,
            sales_tax: 0.0,
            total: 3.5,
            payment_method: "cash".to_owned(),
            payment_amount_paid: 3.5,
            payment_tip: 0.0,
            copy: "Customer Copy".to_owned(),
            items,
            other_fees: fees,
        }
    }

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let err = map_pool_error(PoolError::checkout("connection refused"));
        assert_eq!(err, ReceiptRepositoryError::connection("connection refused"));
    }

    #[rstest]
    fn unique_violation_maps_to_duplicate_image() {
        let diesel_err = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key".to_string()),
        );
        let err = map_diesel_error(diesel_err, "abc");
        assert_eq!(err, ReceiptRepositoryError::duplicate_image("abc"));
    }

    #[rstest]
    fn closed_connection_maps_to_connection_error() {
        let diesel_err = DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection,
            Box::new("server closed the connection".to_string()),
        );
        let err = map_diesel_error(diesel_err, "abc");
        assert!(matches!(err, ReceiptRepositoryError::Connection { .. }));
    }

    #[rstest]
    fn quantity_overflow_maps_to_query_error() {
        let err = map_persist_error(
            PersistError::QuantityOutOfRange {
                position: 3,
                quantity: i64::MAX,
            },
            "abc",
        );
        assert!(matches!(err, ReceiptRepositoryError::Query { .. }));
        assert!(err.to_string().contains("item 3"));
    }

    #[rstest]
    fn aggregate_row_reassembles_receipt_in_order() {
        let row = aggregate_row(
            json!([
                {"name": "Coffee", "price": 3.5, "quantity": 1},
                {"name": "Bagel", "price": 2.0, "quantity": 2}
            ]),
            json!([{"name": "Service", "price": 0.5}]),
        );
        let stored = row_to_stored(row).expect("decoded");
        let names: Vec<_> = stored
            .receipt
            .receipt
            .items
            .iter()
            .map(|item| item.name.as_str())
            .collect();
        assert_eq!(names, vec!["Coffee", "Bagel"]);
        assert_eq!(stored.receipt.receipt.other_fees.len(), 1);
        assert_eq!(stored.receipt.receipt.opened, "yesterday");
        assert_eq!(stored.receipt.receipt.table, "4");
        assert_eq!(stored.receipt.opened_at, None);
    }

    #[rstest]
    #[case::items_not_array(json!({"name": "x"}), json!([]))]
    #[case::item_missing_field(json!([{"name": "x", "price": 1.0}]), json!([]))]
    #[case::fee_extra_field(json!([]), json!([{"name": "x", "price": 1.0, "extra": true}]))]
    fn malformed_aggregates_are_decode_errors(
        #[case] items: serde_json::Value,
        #[case] fees: serde_json::Value,
    ) {
        let err = row_to_stored(aggregate_row(items, fees)).expect_err("decode failure");
        assert!(matches!(err, ReceiptRepositoryError::Decode { .. }));
    }

    #[rstest]
    fn corrupt_hash_is_a_decode_error() {
        let mut row = aggregate_row(json!([]), json!([]));
        row.hash = "not-a-hash".to_owned();
        let err = row_to_stored(row).expect_err("decode failure");
        assert!(matches!(err, ReceiptRepositoryError::Decode { .. }));
    }
}
