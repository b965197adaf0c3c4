use proptest::prelude::*;
use resilient_records::models::{Database, Record, RemoteErrorCode};

/// Strategy for generating record batches of 0..=max records with unique ids
pub fn record_batch_strategy(max: usize) -> impl Strategy<Value = Vec<Record>> {
    (0..=max).prop_map(|count| {
        (0..count)
            .map(|i| Record::new(format!("rec-{i}"), "Note"))
            .collect()
    })
}

pub fn database_strategy() -> impl Strategy<Value = Database> {
    prop_oneof![
        Just(Database::Public),
        Just(Database::Private),
        Just(Database::Shared),
    ]
}

/// Any numeric code, defined or not
pub fn error_code_strategy() -> impl Strategy<Value = RemoteErrorCode> {
    prop_oneof![
        (1i64..=34).prop_map(RemoteErrorCode::from_code),
        any::<i64>().prop_map(RemoteErrorCode::from_code),
    ]
}
