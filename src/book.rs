//! Order book - four level ladders with incremental top-of-book tracking.
//!
//! Bids and asks carry the limit orders; two further ladders store resting
//! stop orders (triggering is external). Every limit-side mutation returns
//! a [`LevelUpdate`] describing the change at level granularity.
//!
//! The book owns the [`LevelPool`]; orders live in the engine-owned
//! [`OrderArena`] and are passed in by index, so each call borrows the
//! arena exactly for its duration.

use crate::arena::{LevelIndex, OrderArena, OrderIndex, OrderKind, Side, NULL_INDEX};
use crate::events::{LevelUpdate, UpdateKind};
use crate::ladder::{Ladder, LadderIter, SortOrder};
use crate::level::{LevelNode, LevelType};
use crate::pool::LevelPool;

/// Limit order book for a single instrument.
///
/// Single-threaded by design: one book is owned by exactly one thread, no
/// operation suspends, and every call completes in O(log n) of the ladder
/// size. Shard books by instrument upstream.
pub struct OrderBook {
    /// Shared storage for all four ladders
    levels: LevelPool,

    /// Buy limit levels, highest price first
    bids: Ladder,

    /// Sell limit levels, lowest price first
    asks: Ladder,

    /// Buy stop levels, lowest trigger first
    buy_stops: Ladder,

    /// Sell stop levels, highest trigger first
    sell_stops: Ladder,

    /// Cached best bid level (`NULL_INDEX` when bids are empty)
    best_bid: LevelIndex,

    /// Cached best ask level (`NULL_INDEX` when asks are empty)
    best_ask: LevelIndex,
}

impl OrderBook {
    /// Create an empty book with a default level pool size.
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create an empty book with `levels` pre-allocated level slots.
    pub fn with_capacity(levels: u32) -> Self {
        Self {
            levels: LevelPool::new(levels),
            bids: Ladder::new(SortOrder::Descending),
            asks: Ladder::new(SortOrder::Ascending),
            buy_stops: Ladder::new(SortOrder::Ascending),
            sell_stops: Ladder::new(SortOrder::Descending),
            best_bid: NULL_INDEX,
            best_ask: NULL_INDEX,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Best bid level (highest buy price), if any.
    #[inline]
    pub fn best_bid(&self) -> Option<&LevelNode> {
        if self.best_bid == NULL_INDEX {
            None
        } else {
            Some(self.levels.get(self.best_bid))
        }
    }

    /// Best ask level (lowest sell price), if any.
    #[inline]
    pub fn best_ask(&self) -> Option<&LevelNode> {
        if self.best_ask == NULL_INDEX {
            None
        } else {
            Some(self.levels.get(self.best_ask))
        }
    }

    /// Spread between best ask and best bid, if both sides are populated.
    #[inline]
    pub fn spread(&self) -> Option<u64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) if ask.level.price > bid.level.price => {
                Some(ask.level.price - bid.level.price)
            }
            _ => None,
        }
    }

    /// Bid level at an exact price.
    #[inline]
    pub fn get_bid(&self, price: u64) -> Option<&LevelNode> {
        self.lookup(&self.bids, price)
    }

    /// Ask level at an exact price.
    #[inline]
    pub fn get_ask(&self, price: u64) -> Option<&LevelNode> {
        self.lookup(&self.asks, price)
    }

    /// Buy-stop level at an exact trigger price.
    #[inline]
    pub fn get_buy_stop(&self, price: u64) -> Option<&LevelNode> {
        self.lookup(&self.buy_stops, price)
    }

    /// Sell-stop level at an exact trigger price.
    #[inline]
    pub fn get_sell_stop(&self, price: u64) -> Option<&LevelNode> {
        self.lookup(&self.sell_stops, price)
    }

    /// Bid levels in order, best (highest) first.
    #[inline]
    pub fn bids(&self) -> LadderIter<'_> {
        self.bids.iter(&self.levels)
    }

    /// Ask levels in order, best (lowest) first.
    #[inline]
    pub fn asks(&self) -> LadderIter<'_> {
        self.asks.iter(&self.levels)
    }

    /// Buy-stop levels in order, lowest trigger first.
    #[inline]
    pub fn buy_stops(&self) -> LadderIter<'_> {
        self.buy_stops.iter(&self.levels)
    }

    /// Sell-stop levels in order, highest trigger first.
    #[inline]
    pub fn sell_stops(&self) -> LadderIter<'_> {
        self.sell_stops.iter(&self.levels)
    }

    /// Number of live levels across all four ladders.
    #[inline]
    pub fn level_count(&self) -> u32 {
        self.levels.allocated()
    }

    #[inline]
    fn lookup<'a>(&'a self, ladder: &Ladder, price: u64) -> Option<&'a LevelNode> {
        let index = ladder.find(&self.levels, price);
        if index == NULL_INDEX {
            None
        } else {
            Some(self.levels.get(index))
        }
    }

    // ========================================================================
    // Limit orders
    // ========================================================================

    /// Add a limit order to its side's ladder.
    ///
    /// The order's own fields must be initialized; the book links it into
    /// the level queue and sets its `level` back-reference.
    pub fn add_order(&mut self, orders: &mut OrderArena, index: OrderIndex) -> LevelUpdate {
        let (side, price) = {
            let order = orders.get(index);
            debug_assert!(order.kind == OrderKind::Limit, "stop order on a limit ladder");
            debug_assert!(!order.is_linked(), "order already linked");
            (order.side, order.price)
        };

        // Find the price level, creating one if absent
        let found = match side {
            Side::Buy => self.bids.find(&self.levels, price),
            Side::Sell => self.asks.find(&self.levels, price),
        };
        let (level_index, kind) = if found == NULL_INDEX {
            (self.add_level(side, price), UpdateKind::Add)
        } else {
            (found, UpdateKind::Update)
        };

        self.link_order(orders, index, level_index);

        let best = match side {
            Side::Buy => self.best_bid,
            Side::Sell => self.best_ask,
        };
        LevelUpdate::new(kind, self.levels.get(level_index).level, level_index == best)
    }

    /// Apply an already-performed reduction to the order's level.
    ///
    /// The caller has decremented the order's own counters; the deltas are
    /// the amounts just removed. A fully reduced order is unlinked, and a
    /// level whose total volume reaches zero is deleted.
    pub fn reduce_order(
        &mut self,
        orders: &mut OrderArena,
        index: OrderIndex,
        quantity: u64,
        hidden: u64,
        visible: u64,
    ) -> LevelUpdate {
        let (side, remaining, level_index) = {
            let order = orders.get(index);
            (order.side, order.quantity, order.level)
        };
        debug_assert!(level_index != NULL_INDEX, "reduce of an unlinked order");

        let node = self.levels.get_mut(level_index);
        node.level.subtract_volumes(quantity, hidden, visible);

        if remaining == 0 {
            node.unlink(orders, index);
            node.level.orders -= 1;
            orders.get_mut(index).level = NULL_INDEX;
        }

        self.finish_limit_update(side, level_index)
    }

    /// Remove an order outright, whatever quantity remains.
    pub fn delete_order(&mut self, orders: &mut OrderArena, index: OrderIndex) -> LevelUpdate {
        let (side, quantity, hidden, visible, level_index) = {
            let order = orders.get(index);
            (
                order.side,
                order.quantity,
                order.hidden_quantity(),
                order.visible_quantity(),
                order.level,
            )
        };
        debug_assert!(level_index != NULL_INDEX, "delete of an unlinked order");

        let node = self.levels.get_mut(level_index);
        node.level.subtract_volumes(quantity, hidden, visible);
        node.unlink(orders, index);
        node.level.orders -= 1;
        orders.get_mut(index).level = NULL_INDEX;

        self.finish_limit_update(side, level_index)
    }

    /// Snapshot, top flag, and level teardown shared by reduce and delete.
    fn finish_limit_update(&mut self, side: Side, level_index: LevelIndex) -> LevelUpdate {
        let snapshot = self.levels.get(level_index).level;
        let best = match side {
            Side::Buy => self.best_bid,
            Side::Sell => self.best_ask,
        };
        let top = level_index == best;

        let kind = if snapshot.total_volume == 0 {
            debug_assert!(snapshot.orders == 0, "empty level still holds orders");
            self.delete_level(side, level_index);
            UpdateKind::Delete
        } else {
            UpdateKind::Update
        };

        LevelUpdate::new(kind, snapshot, top)
    }

    // ========================================================================
    // Stop orders
    // ========================================================================

    /// Add a stop order to its stop ladder.
    ///
    /// Stops carry no market-data surface: no update is returned and the
    /// best bid/ask pointers are untouched.
    pub fn add_stop_order(&mut self, orders: &mut OrderArena, index: OrderIndex) {
        let (side, price) = {
            let order = orders.get(index);
            debug_assert!(order.kind == OrderKind::Stop, "limit order on a stop ladder");
            debug_assert!(!order.is_linked(), "order already linked");
            (order.side, order.price)
        };

        let found = match side {
            Side::Buy => self.buy_stops.find(&self.levels, price),
            Side::Sell => self.sell_stops.find(&self.levels, price),
        };
        let level_index = if found == NULL_INDEX {
            self.add_stop_level(side, price)
        } else {
            found
        };

        self.link_order(orders, index, level_index);
    }

    /// Apply an already-performed reduction to a stop order's level.
    pub fn reduce_stop_order(
        &mut self,
        orders: &mut OrderArena,
        index: OrderIndex,
        quantity: u64,
        hidden: u64,
        visible: u64,
    ) {
        let (side, remaining, level_index) = {
            let order = orders.get(index);
            (order.side, order.quantity, order.level)
        };
        debug_assert!(level_index != NULL_INDEX, "reduce of an unlinked order");

        let node = self.levels.get_mut(level_index);
        node.level.subtract_volumes(quantity, hidden, visible);

        if remaining == 0 {
            node.unlink(orders, index);
            node.level.orders -= 1;
            orders.get_mut(index).level = NULL_INDEX;
        }

        if self.levels.get(level_index).level.total_volume == 0 {
            self.delete_stop_level(side, level_index);
        }
    }

    /// Remove a stop order outright.
    pub fn delete_stop_order(&mut self, orders: &mut OrderArena, index: OrderIndex) {
        let (side, quantity, hidden, visible, level_index) = {
            let order = orders.get(index);
            (
                order.side,
                order.quantity,
                order.hidden_quantity(),
                order.visible_quantity(),
                order.level,
            )
        };
        debug_assert!(level_index != NULL_INDEX, "delete of an unlinked order");

        let node = self.levels.get_mut(level_index);
        node.level.subtract_volumes(quantity, hidden, visible);
        node.unlink(orders, index);
        node.level.orders -= 1;
        orders.get_mut(index).level = NULL_INDEX;

        if self.levels.get(level_index).level.total_volume == 0 {
            self.delete_stop_level(side, level_index);
        }
    }

    // ========================================================================
    // Level lifecycle
    // ========================================================================

    /// Create a limit level and advance the side's best pointer if the new
    /// price improves on it.
    fn add_level(&mut self, side: Side, price: u64) -> LevelIndex {
        match side {
            Side::Buy => {
                let index = self.levels.create(LevelType::Bid, price);
                self.bids.insert(&mut self.levels, index);
                if self.best_bid == NULL_INDEX
                    || price > self.levels.get(self.best_bid).level.price
                {
                    self.best_bid = index;
                }
                index
            }
            Side::Sell => {
                let index = self.levels.create(LevelType::Ask, price);
                self.asks.insert(&mut self.levels, index);
                if self.best_ask == NULL_INDEX
                    || price < self.levels.get(self.best_ask).level.price
                {
                    self.best_ask = index;
                }
                index
            }
        }
    }

    /// Erase a limit level. When it is the side's best, the best pointer
    /// advances to the in-order successor (next-lower bid / next-higher
    /// ask) before the node leaves the ladder.
    fn delete_level(&mut self, side: Side, index: LevelIndex) {
        match side {
            Side::Buy => {
                if index == self.best_bid {
                    self.best_bid = self.bids.next(&self.levels, index);
                }
                self.bids.remove(&mut self.levels, index);
            }
            Side::Sell => {
                if index == self.best_ask {
                    self.best_ask = self.asks.next(&self.levels, index);
                }
                self.asks.remove(&mut self.levels, index);
            }
        }
        self.levels.release(index);
    }

    /// Create a stop level. The level type is inverted relative to the
    /// order side: it names the limit ladder the stop enters on trigger.
    fn add_stop_level(&mut self, side: Side, price: u64) -> LevelIndex {
        match side {
            Side::Buy => {
                let index = self.levels.create(LevelType::Ask, price);
                self.buy_stops.insert(&mut self.levels, index);
                index
            }
            Side::Sell => {
                let index = self.levels.create(LevelType::Bid, price);
                self.sell_stops.insert(&mut self.levels, index);
                index
            }
        }
    }

    /// Erase a stop level. Best pointers are untouched.
    fn delete_stop_level(&mut self, side: Side, index: LevelIndex) {
        match side {
            Side::Buy => self.buy_stops.remove(&mut self.levels, index),
            Side::Sell => self.sell_stops.remove(&mut self.levels, index),
        }
        self.levels.release(index);
    }

    /// Link an order to a level: aggregates, queue tail, back-reference.
    fn link_order(&mut self, orders: &mut OrderArena, index: OrderIndex, level_index: LevelIndex) {
        let node = self.levels.get_mut(level_index);
        node.level.add_volumes(orders.get(index));
        node.push_back(orders, index);
        node.level.orders += 1;
        orders.get_mut(index).level = level_index;
    }

    // ========================================================================
    // Structural self-check
    // ========================================================================

    /// Verify ladder structure and best-pointer consistency across all
    /// four ladders. Intended for tests and debugging; panics on violation.
    pub fn validate(&self) {
        self.bids.validate(&self.levels);
        self.asks.validate(&self.levels);
        self.buy_stops.validate(&self.levels);
        self.sell_stops.validate(&self.levels);
        assert_eq!(
            self.best_bid,
            self.bids.first(&self.levels),
            "best bid is not the front of the bid ladder"
        );
        assert_eq!(
            self.best_ask,
            self.asks.first(&self.levels),
            "best ask is not the front of the ask ladder"
        );
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Release every level in all four ladders back to the pool and reset
    /// the best pointers. Orders are not freed; their back-references are
    /// left to the owning arena's lifecycle.
    pub fn clear(&mut self) {
        self.bids.clear(&mut self.levels);
        self.asks.clear(&mut self.levels);
        self.buy_stops.clear(&mut self.levels);
        self.sell_stops.clear(&mut self.levels);
        self.best_bid = NULL_INDEX;
        self.best_ask = NULL_INDEX;
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("best_bid", &self.best_bid().map(|n| n.level.price))
            .field("best_ask", &self.best_ask().map(|n| n.level.price))
            .field("bid_levels", &self.bids.len())
            .field("ask_levels", &self.asks.len())
            .field("buy_stop_levels", &self.buy_stops.len())
            .field("sell_stop_levels", &self.sell_stops.len())
            .finish()
    }
}
