//! Persistence collaborator for completed records.
//!
//! The pipeline treats storage as fire-and-forget with acknowledgment: a
//! completed record is handed over keyed by its image id and can be fetched
//! back later. The in-memory implementation backs the HTTP surface; a
//! durable backend implements the same trait.

use medbox_ocr::RecordResponse;
use std::collections::HashMap;
use std::sync::RwLock;

/// Store of completed records keyed by image id.
pub trait RecordStore: Send + Sync {
    /// Saves a record, replacing any earlier record with the same image id.
    fn save(&self, record: RecordResponse);

    /// Fetches a record by image id.
    fn get(&self, image_id: &str) -> Option<RecordResponse>;
}

/// Process-local [`RecordStore`].
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, RecordResponse>>,
}

impl MemoryRecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn save(&self, record: RecordResponse) {
        let mut records = self.records.write().expect("record store lock poisoned");
        records.insert(record.image_id.clone(), record);
    }

    fn get(&self, image_id: &str) -> Option<RecordResponse> {
        let records = self.records.read().expect("record store lock poisoned");
        records.get(image_id).cloned()
    }
}
