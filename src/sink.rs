//! Opportunity Sink — delivers qualifying evaluations profit-descending
//! (spec §6 outbound interface).
//!
//! A bounded `tokio::sync::mpsc` channel, same as the teacher's
//! `gap_tx`/broadcast channels used to move events off a hot path. When
//! a tick produces more qualifying cycles than the channel has room
//! for, the lowest-profit records are dropped first rather than the
//! channel applying FIFO backpressure — a consumer reading this stream
//! cares about the best opportunities, not the oldest.

use tokio::sync::mpsc;

use crate::models::EvaluationRecord;

pub struct OpportunitySink {
    tx: mpsc::Sender<EvaluationRecord>,
}

impl OpportunitySink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<EvaluationRecord>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Sorts a tick's qualifying records profit-descending and pushes as
    /// many as fit without blocking; excess is dropped starting with the
    /// least profitable, counted by the caller via `ScanStats`.
    pub fn deliver(&self, mut records: Vec<EvaluationRecord>) -> usize {
        records.sort_by(|a, b| b.risk_adjusted_return.cmp(&a.risk_adjusted_return));
        let mut delivered = 0;
        for record in records {
            if self.tx.try_send(record).is_err() {
                break;
            }
            delivered += 1;
        }
        delivered
    }
}
