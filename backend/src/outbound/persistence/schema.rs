//! Diesel table definitions for the receipt schema.
//!
//! Mirrors `migrations/2025-05-20-000000_create_receipt_tables/up.sql`.

diesel::table! {
    receipt_images (id) {
        id -> Uuid,
        #[max_length = 64]
        hash -> Varchar,
        bucket -> Text,
        key -> Text,
        raw_text -> Text,
        file_name -> Text,
        outing_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    receipts (id) {
        id -> Uuid,
        receipt_image_id -> Uuid,
        restaurant -> Text,
        address -> Text,
        opened -> Nullable<Timestamptz>,
        opened_raw -> Text,
        order_number -> Text,
        order_type -> Text,
        table_number -> Text,
        server -> Text,
        subtotal -> Float8,
        sales_tax -> Float8,
        total -> Float8,
        payment_method -> Text,
        payment_amount_paid -> Float8,
        payment_tip -> Float8,
        copy -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    order_items (id) {
        id -> Uuid,
        receipt_id -> Uuid,
        position -> Int4,
        name -> Text,
        price -> Float8,
        quantity -> Int4,
    }
}

diesel::table! {
    other_fees (id) {
        id -> Uuid,
        receipt_id -> Uuid,
        position -> Int4,
        name -> Text,
        price -> Float8,
    }
}

diesel::joinable!(receipts -> receipt_images (receipt_image_id));
diesel::joinable!(order_items -> receipts (receipt_id));
diesel::joinable!(other_fees -> receipts (receipt_id));

diesel::allow_tables_to_appear_in_same_query!(receipt_images, receipts, order_items, other_fees);
