use super::QueryMessage;
use parking_lot::RwLock;

/// Append-only record of every submitted query. Used for status reporting
/// only; coordination never reads it.
#[derive(Debug, Default)]
pub struct MessageHistory {
    entries: RwLock<Vec<QueryMessage>>,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, message: QueryMessage) {
        self.entries.write().push(message);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
