//! Best-effort background writes
//!
//! Price updates and quote history rows are not worth blocking a monitor
//! tick on. They are pushed onto a bounded channel and applied by a single
//! worker task. A full or closed queue drops the write with a warning and
//! a failed write is logged; neither is reported back to the submitter.

use crate::db::sqlite::SqliteDb;
use crate::quotes::QuoteRecord;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

const QUEUE_CAPACITY: usize = 1024;

/// A pending write
#[derive(Debug)]
pub enum WriteOp {
    /// Store the last observed price of a followed stock
    FollowPrice { code: String, price: f64 },
    /// Insert or replace the latest snapshot of a code
    QuoteHistory(Box<QuoteRecord>),
    /// Acknowledged once every op submitted before it has been applied
    Barrier(oneshot::Sender<()>),
}

impl WriteOp {
    fn label(&self) -> &'static str {
        match self {
            WriteOp::FollowPrice { .. } => "follow_price",
            WriteOp::QuoteHistory(_) => "quote_history",
            WriteOp::Barrier(_) => "barrier",
        }
    }
}

/// Handle for submitting writes
#[derive(Clone)]
pub struct WriteQueue {
    tx: mpsc::Sender<WriteOp>,
}

impl WriteQueue {
    /// Spawn the worker on the current runtime
    pub fn start(db: Arc<SqliteDb>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let handle = tokio::spawn(run_worker(db, rx));
        (Self { tx }, handle)
    }

    /// Queue a write without waiting
    pub fn submit(&self, op: WriteOp) {
        let label = op.label();
        if let Err(e) = self.tx.try_send(op) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    warn!("Write queue full, dropping {} write", label)
                }
                mpsc::error::TrySendError::Closed(_) => {
                    warn!("Write queue closed, dropping {} write", label)
                }
            }
        }
    }

    pub fn update_follow_price(&self, code: &str, price: f64) {
        self.submit(WriteOp::FollowPrice {
            code: code.to_string(),
            price,
        });
    }

    pub fn record_quote(&self, quote: QuoteRecord) {
        self.submit(WriteOp::QuoteHistory(Box::new(quote)));
    }

    /// Wait until everything queued so far has been applied.
    ///
    /// Returns false if the worker is gone.
    pub async fn flush(&self) -> bool {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(WriteOp::Barrier(ack_tx)).await.is_err() {
            return false;
        }
        ack_rx.await.is_ok()
    }
}

async fn run_worker(db: Arc<SqliteDb>, mut rx: mpsc::Receiver<WriteOp>) {
    debug!("Write queue worker started");

    while let Some(op) = rx.recv().await {
        let label = op.label();
        let result = match op {
            WriteOp::FollowPrice { code, price } => {
                db.update_follow_price(&code, price).map(|updated| {
                    if !updated {
                        debug!("No active follow for {}, price {} not stored", code, price);
                    }
                })
            }
            WriteOp::QuoteHistory(quote) => db.upsert_quote_history(&quote),
            WriteOp::Barrier(ack) => {
                let _ = ack.send(());
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("Background {} write failed: {}", label, e);
        }
    }

    debug!("Write queue worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_follow_price_applied_after_flush() {
        let db = Arc::new(SqliteDb::new_in_memory().unwrap());
        db.insert_follow("sh600000", "浦发银行", 10.0, 999).unwrap();

        let (queue, _worker) = WriteQueue::start(db.clone());
        queue.update_follow_price("sh600000", 10.5);
        assert!(queue.flush().await);

        let follow = db.get_follow("sh600000").unwrap().unwrap();
        assert_eq!(follow.price, 10.5);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_worker() {
        let db = Arc::new(SqliteDb::new_in_memory().unwrap());
        db.insert_follow("sz000001", "平安银行", 11.0, 999).unwrap();

        let (queue, _worker) = WriteQueue::start(db.clone());
        // unknown code updates nothing and the next write still lands
        queue.update_follow_price("sz999999", 1.0);
        queue.update_follow_price("sz000001", 11.2);
        assert!(queue.flush().await);

        assert_eq!(db.get_follow("sz000001").unwrap().unwrap().price, 11.2);
    }
}
