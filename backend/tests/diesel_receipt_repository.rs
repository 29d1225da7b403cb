//! Integration tests for `DieselReceiptRepository` against embedded PostgreSQL.
//!
//! Each test runs in its own database cloned from a migrated template. A
//! cluster that cannot start fails the suite unless `SKIP_TEST_CLUSTER` is set.
use chrono::{TimeZone, Utc};
use civet_backend::domain::ports::{
    NewReceiptRecord, ReceiptOwner, ReceiptRepository, ReceiptRepositoryError,
};
use civet_backend::domain::{
    ImageFingerprint, OrderItem, OtherFee, ParsedReceipt, PaymentDetails, Receipt,
};
use civet_backend::outbound::persistence::{DbPool, DieselReceiptRepository, PoolConfig};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use pg_embedded_setup_unpriv::TemporaryDatabase;
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;
use uuid::Uuid;

mod support;

use support::{handle_cluster_setup_failure, provision_template_database, shared_cluster};

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

struct TestContext {
    runtime: Runtime,
    repository: DieselReceiptRepository,
    database_url: String,
    _database: TemporaryDatabase,
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = shared_cluster()?;
    let database = provision_template_database(cluster)?;
    let database_url = database.url().to_owned();

    let config = PoolConfig::new(&database_url)
        .with_max_size(2)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(DbPool::new(config))
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        runtime,
        repository: DieselReceiptRepository::new(pool),
        database_url,
        _database: database,
    })
}

#[fixture]
fn repo_context() -> Option<TestContext> {
    match setup_context() {
        Ok(context) => Some(context),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

/// Rows across all four receipt tables reachable from `hash`.
fn rows_for_hash(url: &str, hash: &str) -> i64 {
    let mut conn = PgConnection::establish(url).expect("connect");
    diesel::sql_query(
        "SELECT \
           (SELECT count(*) FROM receipt_images WHERE hash = $1) + \
           (SELECT count(*) FROM receipts r JOIN receipt_images ri \
              ON ri.id = r.receipt_image_id WHERE ri.hash = $1) + \
           (SELECT count(*) FROM order_items oi JOIN receipts r ON r.id = oi.receipt_id \
              JOIN receipt_images ri ON ri.id = r.receipt_image_id WHERE ri.hash = $1) + \
           (SELECT count(*) FROM other_fees f JOIN receipts r ON r.id = f.receipt_id \
              JOIN receipt_images ri ON ri.id = r.receipt_image_id WHERE ri.hash = $1) \
         AS count",
    )
    .bind::<Text, _>(hash)
    .get_result::<CountRow>(&mut conn)
    .expect("count rows")
    .count
}

fn item(name: &str, price: f64, quantity: i64) -> OrderItem {
    OrderItem {
        name: name.to_owned(),
        price,
        quantity,
    }
}

#[fixture]
fn record() -> NewReceiptRecord {
    let image = Uuid::new_v4();
    let fingerprint = ImageFingerprint::of(image.as_bytes());
    let receipt = Receipt {
        restaurant: "Blue Door Cafe".to_owned(),
        address: "12 High Street".to_owned(),
        opened: "2024-03-01 10:00:00".to_owned(),
        order_number: "17".to_owned(),
        order_type: "Dine In".to_owned(),
        table: "4".to_owned(),
        server: "Sam".to_owned(),
        items: vec![
            item("Coffee", 3.5, 1),
            item("Bagel", 2.25, 2),
            item("Apple", 1.0, 3),
        ],
        subtotal: 11.0,
        sales_tax: 0.9,
        total: 11.9,
        payment: PaymentDetails {
            method: "card".to_owned(),
            amount_paid: 13.0,
            tip: 1.1,
        },
        copy: "Customer Copy".to_owned(),
        other_fees: vec![
            OtherFee {
                name: "Service".to_owned(),
                price: 0.5,
            },
            OtherFee {
                name: "Bag".to_owned(),
                price: 0.1,
            },
        ],
    };
    NewReceiptRecord {
        key: format!("{fingerprint}.jpg"),
        fingerprint,
        bucket: "receipts".to_owned(),
        raw_text: "Coffee $3.50\nBagel $4.50".to_owned(),
        file_name: "lunch.jpg".to_owned(),
        owner: ReceiptOwner {
            outing_id: Uuid::new_v4(),
        },
        receipt: ParsedReceipt {
            receipt,
            opened_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).single(),
        },
    }
}

#[rstest]
fn persisted_receipt_reads_back_in_source_order(
    repo_context: Option<TestContext>,
    record: NewReceiptRecord,
) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: persisted_receipt_reads_back_in_source_order skipped");
        return;
    };
    let repo = &context.repository;

    let (ids, by_hash, by_id) = context.runtime.block_on(async {
        let ids = repo.persist(&record).await.expect("persist");
        let by_hash = repo
            .find_by_hash(&record.fingerprint)
            .await
            .expect("find by hash")
            .expect("stored receipt");
        let by_id = repo
            .find_by_id(ids.receipt_id)
            .await
            .expect("find by id")
            .expect("stored receipt");
        (ids, by_hash, by_id)
    });

    assert_eq!(by_hash, by_id);
    assert_eq!(by_hash.ids, ids);
    assert_eq!(by_hash.fingerprint, record.fingerprint);
    assert_eq!(by_hash.key, record.key);
    assert_eq!(by_hash.owner, record.owner);
    assert_eq!(by_hash.raw_text, record.raw_text);
    assert_eq!(by_hash.receipt, record.receipt);
}

#[rstest]
fn missing_receipts_are_none(repo_context: Option<TestContext>, record: NewReceiptRecord) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: missing_receipts_are_none skipped");
        return;
    };
    let repo = &context.repository;

    let (by_hash, by_id) = context.runtime.block_on(async {
        (
            repo.find_by_hash(&record.fingerprint).await.expect("find by hash"),
            repo.find_by_id(Uuid::new_v4()).await.expect("find by id"),
        )
    });

    assert!(by_hash.is_none());
    assert!(by_id.is_none());
}

#[rstest]
fn second_insert_of_same_image_is_a_duplicate(
    repo_context: Option<TestContext>,
    record: NewReceiptRecord,
) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: second_insert_of_same_image_is_a_duplicate skipped");
        return;
    };
    let repo = &context.repository;

    let err = context.runtime.block_on(async {
        repo.persist(&record).await.expect("first persist");
        repo.persist(&record).await.expect_err("duplicate image")
    });

    assert_eq!(
        err,
        ReceiptRepositoryError::duplicate_image(record.fingerprint.as_str())
    );
    assert_eq!(
        rows_for_hash(&context.database_url, record.fingerprint.as_str()),
        7
    );
}

#[rstest]
fn failure_on_last_item_rolls_back_every_table(
    repo_context: Option<TestContext>,
    mut record: NewReceiptRecord,
) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: failure_on_last_item_rolls_back_every_table skipped");
        return;
    };
    let repo = &context.repository;
    record.receipt.receipt.items.push(item("Overflow", 1.0, i64::MAX));

    let (err, stored) = context.runtime.block_on(async {
        let err = repo.persist(&record).await.expect_err("quantity overflow");
        let stored = repo
            .find_by_hash(&record.fingerprint)
            .await
            .expect("find by hash");
        (err, stored)
    });

    assert!(matches!(err, ReceiptRepositoryError::Query { .. }));
    assert!(stored.is_none());
    assert_eq!(
        rows_for_hash(&context.database_url, record.fingerprint.as_str()),
        0
    );
}

#[rstest]
fn unparsed_opened_time_round_trips_as_none(
    repo_context: Option<TestContext>,
    mut record: NewReceiptRecord,
) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: unparsed_opened_time_round_trips_as_none skipped");
        return;
    };
    let repo = &context.repository;
    record.receipt.receipt.opened = "not-a-date".to_owned();
    record.receipt.opened_at = None;
    record.receipt.receipt.items.clear();
    record.receipt.receipt.other_fees.clear();

    let stored = context.runtime.block_on(async {
        repo.persist(&record).await.expect("persist");
        repo.find_by_hash(&record.fingerprint)
            .await
            .expect("find by hash")
            .expect("stored receipt")
    });

    assert_eq!(stored.receipt.opened_at, None);
    assert_eq!(stored.receipt.receipt.opened, "not-a-date");
    assert!(stored.receipt.receipt.items.is_empty());
    assert!(stored.receipt.receipt.other_fees.is_empty());
}
