//! Order store — sqlite-backed persistence for placed orders.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use platen_core::order::{Material, Order, OrderStatus, Process};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("no order exists with created_at {0}")]
    NoSuchOrder(String),

    #[error("stored order row is corrupt: {0}")]
    CorruptRow(String),
}

/// Handle to the orders table. Cheap to clone; the connection is shared.
#[derive(Clone)]
pub struct OrderStore {
    conn: Arc<Mutex<Connection>>,
}

impl OrderStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        Self::init(Connection::open(path)?)
    }

    /// Fresh store that vanishes on drop. Test use.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS orders (
                created_at    TEXT NOT NULL PRIMARY KEY,
                name          TEXT NOT NULL,
                email         TEXT NOT NULL,
                copies_nbr    INTEGER NOT NULL,
                file_name     TEXT NOT NULL,
                price         REAL NOT NULL,
                material_type TEXT NOT NULL,
                process_type  TEXT NOT NULL,
                status        TEXT NOT NULL,
                content_hash  TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn insert(&self, order: &Order) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO orders (created_at, name, email, copies_nbr, file_name, price,
                                 material_type, process_type, status, content_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                order.created_at.to_rfc3339(),
                order.submitter_name,
                order.submitter_email,
                order.copies_requested,
                order.source_file_name,
                order.computed_price,
                order.material_type.as_str(),
                order.process_type.as_str(),
                order.status.as_str(),
                order.content_hash,
            ],
        )?;
        Ok(())
    }

    /// All orders, oldest first.
    pub fn list(&self) -> Result<Vec<Order>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT created_at, name, email, copies_nbr, file_name, price,
                    material_type, process_type, status, content_hash
             FROM orders ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
                row.get::<_, String>(9)?,
            ))
        })?;

        let mut orders = Vec::new();
        for row in rows {
            let (created_at, name, email, copies, file_name, price, material, process, status, hash) =
                row?;
            orders.push(Order {
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| StoreError::CorruptRow(format!("created_at: {e}")))?
                    .with_timezone(&Utc),
                submitter_name: name,
                submitter_email: email,
                copies_requested: copies,
                source_file_name: file_name,
                computed_price: price,
                material_type: Material::from_name(&material)
                    .ok_or_else(|| StoreError::CorruptRow(format!("material_type: {material}")))?,
                process_type: Process::from_name(&process)
                    .ok_or_else(|| StoreError::CorruptRow(format!("process_type: {process}")))?,
                status: OrderStatus::from_name(&status)
                    .ok_or_else(|| StoreError::CorruptRow(format!("status: {status}")))?,
                content_hash: hash,
            });
        }
        Ok(orders)
    }

    /// Flip one order's status, addressed by its creation timestamp.
    /// Touches nothing else on the row.
    pub fn modify_status(
        &self,
        datetime: &DateTime<Utc>,
        new_status: OrderStatus,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE orders SET status = ?1 WHERE created_at = ?2",
            params![new_status.as_str(), datetime.to_rfc3339()],
        )?;
        if changed == 0 {
            return Err(StoreError::NoSuchOrder(datetime.to_rfc3339()));
        }
        Ok(())
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
