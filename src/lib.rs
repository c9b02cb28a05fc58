//! # Tickbook
//!
//! Price-level bookkeeping core for a limit order book.
//!
//! One [`OrderBook`] per instrument maintains four sorted ladders of price
//! levels (bids, asks, buy-stops, sell-stops), each level holding a FIFO
//! queue of resting orders plus aggregated volume counters, and reports
//! how the top of each side evolves with every event. Matching, stop
//! triggering, and market-data fan-out live upstream; the book is the data
//! structure they drive.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: one thread owns a book exclusively (no locks)
//! - **Index Handles**: 32-bit slot indices instead of pointers; stable
//!   across storage growth
//! - **Intrusive Layout**: a level slot is simultaneously a ladder tree
//!   node, a FIFO list head, and the aggregate record; orders carry their
//!   own queue links
//! - **Arena Allocation**: orders and levels recycle through free lists,
//!   no heap traffic in the hot path
//!
//! ## Architecture
//!
//! ```text
//! [Matching Engine] --> add/reduce/delete --> [OrderBook]
//!                                             bids/asks ladders (+ stops)
//!                                                   |
//!                                             [LevelUpdate] --> market data
//! ```

pub mod arena;
pub mod book;
pub mod events;
pub mod ladder;
pub mod level;
pub mod pool;

// Re-exports for convenience
pub use arena::{Order, OrderArena, OrderIndex, OrderKind, LevelIndex, Side, NULL_INDEX};
pub use book::OrderBook;
pub use events::{LevelUpdate, UpdateKind};
pub use ladder::{Ladder, LadderIter, SortOrder};
pub use level::{Level, LevelNode, LevelType, QueueIter};
pub use pool::LevelPool;
