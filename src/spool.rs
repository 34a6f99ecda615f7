//! Spool blocks and the ordering a device writer hands to [`OrderedQueue`].
//!
//! Writers produce blocks out of order; the device wants them by offset, and
//! a block rewritten before it reached the device only needs to be written
//! once with its latest contents.
//!
//! [`OrderedQueue`]: crate::queue::OrderedQueue

use crate::queue::{ItemOrder, QueueItem};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpoolBlock {
    Data { offset: u64, bytes: Vec<u8> },
    EndOfFile { offset: u64 },
}

impl SpoolBlock {
    pub fn data(offset: u64, bytes: impl Into<Vec<u8>>) -> Self {
        SpoolBlock::Data {
            offset,
            bytes: bytes.into(),
        }
    }

    pub fn end_of_file(offset: u64) -> Self {
        SpoolBlock::EndOfFile { offset }
    }

    pub fn offset(&self) -> u64 {
        match self {
            SpoolBlock::Data { offset, .. } | SpoolBlock::EndOfFile { offset } => *offset,
        }
    }

    /// Bytes the block occupies on the device.
    pub fn len(&self) -> usize {
        match self {
            SpoolBlock::Data { bytes, .. } => bytes.len(),
            SpoolBlock::EndOfFile { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_item(self) -> QueueItem<SpoolBlock> {
        let size = self.len();
        QueueItem::new(self, size)
    }

    // End-of-file markers sort after data sharing their offset.
    fn rank(&self) -> (u64, u8) {
        match self {
            SpoolBlock::Data { offset, .. } => (*offset, 0),
            SpoolBlock::EndOfFile { offset } => (*offset, 1),
        }
    }
}

/// Offset order; a data block rewritten at a queued offset replaces the
/// queued contents, and duplicate end-of-file markers collapse into one.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpoolOrder;

impl ItemOrder<SpoolBlock> for SpoolOrder {
    fn compare(&self, incoming: &SpoolBlock, queued: &SpoolBlock) -> Ordering {
        incoming.rank().cmp(&queued.rank())
    }

    fn merge(
        &self,
        queued: &mut QueueItem<SpoolBlock>,
        incoming: QueueItem<SpoolBlock>,
    ) -> Result<(), QueueItem<SpoolBlock>> {
        match (&mut queued.payload, incoming.payload) {
            (SpoolBlock::Data { bytes, .. }, SpoolBlock::Data { bytes: latest, .. }) => {
                *bytes = latest;
                queued.payload_size = incoming.payload_size;
                Ok(())
            }
            (SpoolBlock::EndOfFile { .. }, SpoolBlock::EndOfFile { .. }) => Ok(()),
            (_, payload) => Err(QueueItem::new(payload, incoming.payload_size)),
        }
    }
}
