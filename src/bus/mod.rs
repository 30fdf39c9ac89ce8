//! Producer-to-summarizer hand-off queue.

pub mod segment_bus;

pub use segment_bus::SegmentBus;
