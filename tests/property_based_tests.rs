mod common;

use common::strategies::*;
use proptest::prelude::*;
use resilient_records::events::{names_for, NotificationName};
use resilient_records::models::RemoteErrorCode;
use resilient_records::operation::{Operation, OperationState};
use resilient_records::orchestration::{
    category_for, halved_limit, split_batch, ErrorCategory, OperationReplicator,
    StandardReplicator,
};

proptest! {
    /// Property: the two halves concatenate back to the batch, in order
    #[test]
    fn split_never_drops_or_duplicates(records in record_batch_strategy(200)) {
        let (first, second) = split_batch(&records);
        let mut joined = first.clone();
        joined.extend(second.clone());
        prop_assert_eq!(joined, records.clone());
    }

    /// Property: the second half is never smaller and at most one larger
    #[test]
    fn split_halves_are_balanced(records in record_batch_strategy(200)) {
        let (first, second) = split_batch(&records);
        prop_assert_eq!(first.len(), records.len() / 2);
        prop_assert!(second.len() - first.len() <= 1);
        if !records.is_empty() {
            prop_assert!(!second.is_empty());
        }
    }

    /// Property: a halved limit never grows and an unset one gets the default
    #[test]
    fn halved_limit_shrinks(limit in prop::option::of(0usize..10_000), default in 1usize..100) {
        let halved = halved_limit(limit, default);
        match limit {
            Some(limit) => prop_assert!(halved * 2 <= limit),
            None => prop_assert_eq!(halved, default),
        }
    }

    /// Property: classification is total and unknown codes fail closed
    #[test]
    fn every_code_classifies(code in error_code_strategy()) {
        let category = category_for(code);
        prop_assert!(ErrorCategory::ALL.contains(&category));
        if matches!(code, RemoteErrorCode::Unrecognized(_)) {
            prop_assert_eq!(category, ErrorCategory::Fatal);
        }
    }

    /// Property: every announcement starts with the generic name and uses catalogued names
    #[test]
    fn announcements_are_cumulative(code in error_code_strategy()) {
        let names = names_for(category_for(code));
        prop_assert_eq!(&names[0], &NotificationName::CLOUD_ERROR);
        prop_assert!(names.iter().all(NotificationName::is_catalogued));
    }

    /// Property: replicas preserve payload and start fresh
    #[test]
    fn replicas_preserve_batch(records in record_batch_strategy(50), database in database_strategy()) {
        let source = Operation::upload(records.clone(), database).with_name("batch");
        source.cancel();
        let replica = StandardReplicator::new().replicate(&source).unwrap();

        prop_assert_eq!(replica.spec().records(), records.as_slice());
        prop_assert_eq!(replica.spec().database(), Some(database));
        prop_assert_eq!(replica.state(), OperationState::Pending);
        prop_assert!(!replica.is_cancelled());
        prop_assert_ne!(replica.id(), source.id());
    }
}
