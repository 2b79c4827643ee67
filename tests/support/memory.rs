use agora::agent::{MemoryRecord, MemorySink};
use agora::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Memory sink that keeps every record, or fails every write.
#[derive(Default)]
pub struct RecordingMemory {
    records: Mutex<Vec<MemoryRecord>>,
    fail: bool,
}

impl RecordingMemory {
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn records(&self) -> Vec<MemoryRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl MemorySink for RecordingMemory {
    async fn record_outcome(&self, record: &MemoryRecord) -> Result<()> {
        if self.fail {
            return Err(Error::Io(std::io::Error::other("memory store offline")));
        }
        self.records.lock().push(record.clone());
        Ok(())
    }
}
