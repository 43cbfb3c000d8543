//! Shared daemon state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use uuid::Uuid;

use crate::store::OrderStore;

/// A submission currently streaming in over the evaluation channel.
#[derive(Debug, Clone)]
pub struct ActiveTransfer {
    pub source_file_name: String,
    pub chunks_received: u32,
    pub total_chunk_count: u32,
}

/// Live transfers keyed by correlation id — shared across all tasks.
pub type TransferTable = Arc<DashMap<Uuid, ActiveTransfer>>;

/// Create a new empty transfer table.
pub fn new_transfer_table() -> TransferTable {
    Arc::new(DashMap::new())
}

#[derive(Clone)]
pub struct AppState {
    pub store: OrderStore,
    pub transfers: TransferTable,
    /// Directory where received job files are reassembled.
    pub received_dir: PathBuf,
    /// Price per estimated minute of print time.
    pub rate_per_minute: f64,
    pub started_at: Instant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transfer_table_creates_empty() {
        let table = new_transfer_table();
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
    }
}
