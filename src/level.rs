//! Price level - aggregated bucket plus a FIFO queue of orders.
//!
//! [`Level`] is the plain value record published in level updates.
//! [`LevelNode`] embeds it together with the ladder tree linkage and the
//! intrusive doubly-linked order queue, so one pool slot serves as tree
//! node, list head, and statistics bucket at once.

use crate::arena::{LevelIndex, Order, OrderArena, OrderIndex, NULL_INDEX};

/// Side tag of a level.
///
/// On the bid/ask ladders this matches the orders' side. On the stop
/// ladders the tag is inverted: a buy-stop level is tagged `Ask` and a
/// sell-stop level `Bid`, naming the limit ladder the stop enters once
/// triggered. The trigger subsystem relies on this.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum LevelType {
    /// Bid (buy) side
    Bid = 0,
    /// Ask (sell) side
    Ask = 1,
}

/// Aggregated state of a single price level.
///
/// This is the by-value snapshot embedded in
/// [`LevelUpdate`](crate::events::LevelUpdate); the live copy sits inside
/// a [`LevelNode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Level {
    /// Price of the bucket (unique within its ladder)
    pub price: u64,

    /// Sum of remaining quantity over all orders in the queue
    pub total_volume: u64,

    /// Sum of hidden quantity
    pub hidden_volume: u64,

    /// Sum of displayed quantity
    pub visible_volume: u64,

    /// Number of orders in the queue
    pub orders: u32,

    /// Side tag (see [`LevelType`] for the stop-ladder inversion)
    pub kind: LevelType,
}

impl Level {
    /// Create an empty level record.
    #[inline]
    pub const fn new(kind: LevelType, price: u64) -> Self {
        Self {
            price,
            total_volume: 0,
            hidden_volume: 0,
            visible_volume: 0,
            orders: 0,
            kind,
        }
    }

    /// Returns true for bid-tagged levels
    #[inline]
    pub const fn is_bid(&self) -> bool {
        matches!(self.kind, LevelType::Bid)
    }

    /// Returns true for ask-tagged levels
    #[inline]
    pub const fn is_ask(&self) -> bool {
        matches!(self.kind, LevelType::Ask)
    }

    /// Add an order's quantities to the aggregates.
    #[inline]
    pub fn add_volumes(&mut self, order: &Order) {
        self.total_volume += order.quantity;
        self.hidden_volume += order.hidden_quantity();
        self.visible_volume += order.visible_quantity();
    }

    /// Subtract already-removed quantities from the aggregates.
    #[inline]
    pub fn subtract_volumes(&mut self, quantity: u64, hidden: u64, visible: u64) {
        debug_assert!(self.total_volume >= quantity, "total volume underflow");
        debug_assert!(self.hidden_volume >= hidden, "hidden volume underflow");
        debug_assert!(self.visible_volume >= visible, "visible volume underflow");
        self.total_volume -= quantity;
        self.hidden_volume -= hidden;
        self.visible_volume -= visible;
    }
}

/// A level slot: the aggregate record plus ladder and queue linkage.
///
/// Tree links (`parent`/`left`/`right`/`height`) belong to the owning
/// [`Ladder`](crate::ladder::Ladder); queue ends (`head`/`tail`) point at
/// order slots in the engine's [`OrderArena`]. While a slot sits on the
/// pool free list, `left` threads the list.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
#[repr(align(64))]
pub struct LevelNode {
    /// The aggregated level record
    pub level: Level,

    /// Parent node in the ladder tree
    pub(crate) parent: LevelIndex,

    /// Left child in the ladder tree
    pub(crate) left: LevelIndex,

    /// Right child in the ladder tree
    pub(crate) right: LevelIndex,

    /// Oldest order at this price (next to match)
    pub(crate) head: OrderIndex,

    /// Newest order at this price
    pub(crate) tail: OrderIndex,

    /// AVL subtree height (1 for a leaf)
    pub(crate) height: u8,
}

const _: () = assert!(
    std::mem::size_of::<LevelNode>() == 64,
    "LevelNode must be exactly 64 bytes (one cache line)"
);

impl LevelNode {
    /// Create an empty/uninitialized node (for free-list slots)
    #[inline]
    pub(crate) const fn empty() -> Self {
        Self {
            level: Level::new(LevelType::Bid, 0),
            parent: NULL_INDEX,
            left: NULL_INDEX,
            right: NULL_INDEX,
            head: NULL_INDEX,
            tail: NULL_INDEX,
            height: 0,
        }
    }

    /// Re-initialize a recycled slot for a fresh level.
    #[inline]
    pub(crate) fn reset(&mut self, kind: LevelType, price: u64) {
        self.level = Level::new(kind, price);
        self.parent = NULL_INDEX;
        self.left = NULL_INDEX;
        self.right = NULL_INDEX;
        self.head = NULL_INDEX;
        self.tail = NULL_INDEX;
        self.height = 0;
    }

    /// Returns true if the order queue is empty
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.head == NULL_INDEX
    }

    /// Index of the oldest order (highest time priority), or `NULL_INDEX`.
    #[inline]
    pub const fn front(&self) -> OrderIndex {
        self.head
    }

    /// Append an order to the tail of the queue (newest order).
    ///
    /// Only the linkage is touched; the caller adjusts the aggregates.
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub(crate) fn push_back(&mut self, orders: &mut OrderArena, index: OrderIndex) {
        if self.tail == NULL_INDEX {
            debug_assert!(self.head == NULL_INDEX);
            self.head = index;
            self.tail = index;
            let order = orders.get_mut(index);
            order.prev = NULL_INDEX;
            order.next = NULL_INDEX;
        } else {
            orders.get_mut(self.tail).next = index;
            let order = orders.get_mut(index);
            order.prev = self.tail;
            order.next = NULL_INDEX;
            self.tail = index;
        }
    }

    /// Remove an order from anywhere in the queue.
    ///
    /// Handles all edge cases: only node, head, tail, middle. Only the
    /// linkage is touched; the caller adjusts the aggregates.
    ///
    /// # Complexity
    /// O(1)
    #[inline]
    pub(crate) fn unlink(&mut self, orders: &mut OrderArena, index: OrderIndex) {
        let (prev_idx, next_idx) = {
            let order = orders.get(index);
            (order.prev, order.next)
        };

        if prev_idx == NULL_INDEX && next_idx == NULL_INDEX {
            debug_assert!(self.head == index && self.tail == index);
            self.head = NULL_INDEX;
            self.tail = NULL_INDEX;
        } else if prev_idx == NULL_INDEX {
            debug_assert!(self.head == index);
            self.head = next_idx;
            orders.get_mut(next_idx).prev = NULL_INDEX;
        } else if next_idx == NULL_INDEX {
            debug_assert!(self.tail == index);
            self.tail = prev_idx;
            orders.get_mut(prev_idx).next = NULL_INDEX;
        } else {
            orders.get_mut(prev_idx).next = next_idx;
            orders.get_mut(next_idx).prev = prev_idx;
        }

        let order = orders.get_mut(index);
        order.prev = NULL_INDEX;
        order.next = NULL_INDEX;
    }

    /// Iterate the queue in FIFO (time-priority) order.
    #[inline]
    pub fn queue<'a>(&self, orders: &'a OrderArena) -> QueueIter<'a> {
        QueueIter {
            orders,
            current: self.head,
        }
    }
}

/// FIFO iterator over the orders resting at one level.
pub struct QueueIter<'a> {
    orders: &'a OrderArena,
    current: OrderIndex,
}

impl<'a> Iterator for QueueIter<'a> {
    type Item = &'a Order;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == NULL_INDEX {
            return None;
        }
        let order = self.orders.get(self.current);
        self.current = order.next;
        Some(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Side;

    fn arena_with_orders(count: u64) -> (OrderArena, Vec<OrderIndex>) {
        let mut arena = OrderArena::new(16);
        let indices = (0..count)
            .map(|i| {
                arena
                    .alloc(Order::limit(i, Side::Buy, 10000, 100))
                    .unwrap()
            })
            .collect();
        (arena, indices)
    }

    #[test]
    fn test_node_size() {
        assert_eq!(std::mem::size_of::<LevelNode>(), 64);
    }

    #[test]
    fn test_empty_level() {
        let node = LevelNode::empty();
        assert!(node.is_empty());
        assert_eq!(node.front(), NULL_INDEX);
        assert_eq!(node.level.orders, 0);
        assert_eq!(node.level.total_volume, 0);
    }

    #[test]
    fn test_push_back_fifo_linkage() {
        let (mut arena, indices) = arena_with_orders(3);
        let mut node = LevelNode::empty();
        node.reset(LevelType::Bid, 10000);

        for &idx in &indices {
            node.push_back(&mut arena, idx);
        }

        assert_eq!(node.head, indices[0]);
        assert_eq!(node.tail, indices[2]);
        assert_eq!(arena.get(indices[0]).next, indices[1]);
        assert_eq!(arena.get(indices[1]).prev, indices[0]);
        assert_eq!(arena.get(indices[1]).next, indices[2]);
        assert_eq!(arena.get(indices[2]).prev, indices[1]);

        let ids: Vec<u64> = node.queue(&arena).map(|o| o.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_unlink_only_node() {
        let (mut arena, indices) = arena_with_orders(1);
        let mut node = LevelNode::empty();
        node.reset(LevelType::Bid, 10000);

        node.push_back(&mut arena, indices[0]);
        node.unlink(&mut arena, indices[0]);

        assert!(node.is_empty());
        assert_eq!(node.head, NULL_INDEX);
        assert_eq!(node.tail, NULL_INDEX);
    }

    #[test]
    fn test_unlink_head() {
        let (mut arena, indices) = arena_with_orders(3);
        let mut node = LevelNode::empty();
        node.reset(LevelType::Bid, 10000);
        for &idx in &indices {
            node.push_back(&mut arena, idx);
        }

        node.unlink(&mut arena, indices[0]);

        assert_eq!(node.head, indices[1]);
        assert_eq!(arena.get(indices[1]).prev, NULL_INDEX);
        let ids: Vec<u64> = node.queue(&arena).map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_unlink_tail() {
        let (mut arena, indices) = arena_with_orders(3);
        let mut node = LevelNode::empty();
        node.reset(LevelType::Bid, 10000);
        for &idx in &indices {
            node.push_back(&mut arena, idx);
        }

        node.unlink(&mut arena, indices[2]);

        assert_eq!(node.tail, indices[1]);
        assert_eq!(arena.get(indices[1]).next, NULL_INDEX);
    }

    #[test]
    fn test_unlink_middle() {
        let (mut arena, indices) = arena_with_orders(3);
        let mut node = LevelNode::empty();
        node.reset(LevelType::Bid, 10000);
        for &idx in &indices {
            node.push_back(&mut arena, idx);
        }

        node.unlink(&mut arena, indices[1]);

        assert_eq!(arena.get(indices[0]).next, indices[2]);
        assert_eq!(arena.get(indices[2]).prev, indices[0]);
        let ids: Vec<u64> = node.queue(&arena).map(|o| o.id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn test_volume_bookkeeping() {
        let mut level = Level::new(LevelType::Ask, 5000);
        let order = Order::iceberg(1, Side::Sell, 5000, 500, 100);

        level.add_volumes(&order);
        assert_eq!(level.total_volume, 500);
        assert_eq!(level.hidden_volume, 400);
        assert_eq!(level.visible_volume, 100);
        assert_eq!(level.total_volume, level.hidden_volume + level.visible_volume);

        level.subtract_volumes(200, 200, 0);
        assert_eq!(level.total_volume, 300);
        assert_eq!(level.hidden_volume, 200);
        assert_eq!(level.visible_volume, 100);
    }
}
