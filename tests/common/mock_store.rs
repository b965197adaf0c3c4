use async_trait::async_trait;
use parking_lot::Mutex;
use resilient_records::models::{Database, Query, Record, RecordId, RemoteError, RemoteErrorCode};
use resilient_records::remote::RemoteStore;

/// One remote call seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Save { ids: Vec<RecordId> },
    Delete { ids: Vec<RecordId> },
    Query { limit: Option<usize> },
}

/// Remote store double with scripted capacity limits.
///
/// Writes larger than `max_batch` and queries asking for more than
/// `max_results` (or for an unlimited result set) fail with
/// `LimitExceeded`. A forced error code fails every call.
#[derive(Debug, Default)]
pub struct ScriptedStore {
    pub max_batch: Option<usize>,
    pub max_results: Option<usize>,
    forced_error: Mutex<Option<RemoteErrorCode>>,
    stored: Mutex<Vec<Record>>,
    calls: Mutex<Vec<StoreCall>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = Some(max_batch);
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_records(self, records: Vec<Record>) -> Self {
        self.stored.lock().extend(records);
        self
    }

    pub fn failing_with(self, code: RemoteErrorCode) -> Self {
        *self.forced_error.lock() = Some(code);
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Sizes of every save call, in call order
    pub fn save_sizes(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Save { ids } => Some(ids.len()),
                _ => None,
            })
            .collect()
    }

    pub fn query_limits(&self) -> Vec<Option<usize>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Query { limit } => Some(limit),
                _ => None,
            })
            .collect()
    }

    pub fn stored(&self) -> Vec<Record> {
        self.stored.lock().clone()
    }

    fn forced(&self) -> Result<(), RemoteError> {
        match *self.forced_error.lock() {
            Some(code) => Err(RemoteError::new(code, "scripted failure")),
            None => Ok(()),
        }
    }

    fn check_batch(&self, size: usize) -> Result<(), RemoteError> {
        match self.max_batch {
            Some(max) if size > max => Err(RemoteError::new(
                RemoteErrorCode::LimitExceeded,
                format!("batch of {size} exceeds {max}"),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for ScriptedStore {
    async fn save(&self, _database: Database, records: &[Record]) -> Result<Vec<Record>, RemoteError> {
        self.calls.lock().push(StoreCall::Save {
            ids: records.iter().map(|record| record.id.clone()).collect(),
        });
        self.forced()?;
        self.check_batch(records.len())?;
        self.stored.lock().extend(records.iter().cloned());
        Ok(records.to_vec())
    }

    async fn delete(&self, _database: Database, ids: &[RecordId]) -> Result<Vec<RecordId>, RemoteError> {
        self.calls.lock().push(StoreCall::Delete { ids: ids.to_vec() });
        self.forced()?;
        self.check_batch(ids.len())?;
        self.stored.lock().retain(|record| !ids.contains(&record.id));
        Ok(ids.to_vec())
    }

    async fn query(
        &self,
        _database: Database,
        query: &Query,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, RemoteError> {
        self.calls.lock().push(StoreCall::Query { limit });
        self.forced()?;
        if let Some(max) = self.max_results {
            if limit.map_or(true, |limit| limit > max) {
                return Err(RemoteError::new(
                    RemoteErrorCode::LimitExceeded,
                    format!("query limit {limit:?} exceeds {max}"),
                ));
            }
        }

        let matching = self
            .stored
            .lock()
            .iter()
            .filter(|record| query.matches(record))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(matching)
    }

    fn store_name(&self) -> &'static str {
        "scripted_store"
    }
}
