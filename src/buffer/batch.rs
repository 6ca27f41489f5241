use bytes::Bytes;
use std::time::Instant;
use uuid::Uuid;

/// One pre-encoded unit of bulk work, usually a newline-terminated
/// action line plus its document line. Never inspected by the buffer.
pub type Item = Bytes;

/// Immutable snapshot of everything buffered between two emissions.
#[derive(Debug, Clone)]
pub struct Batch {
    id: String,
    sequence: u64,
    items: Vec<Item>,
    byte_len: usize,
    created_at: Instant,
}

impl Batch {
    pub(crate) fn new(sequence: u64, items: Vec<Item>, byte_len: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sequence,
            items,
            byte_len,
            created_at: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Position of this batch in emission order, starting at 0.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items
    }

    /// Sum of the item lengths, i.e. the size of the rendered payload.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}
