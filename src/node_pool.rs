//! The node arena and its loosely-sorted doubly-linked list.
//!
//! The original design keeps packet slots on an intrusive, pointer-based
//! doubly-linked list so a hidden slot can be found and reused in O(1) and
//! so a batch of hides can be re-sorted without an auxiliary array. This is
//! exactly the case the design notes call out for a safe-Rust rendition:
//! an arena (`Vec<Node>`) addressed by integer index stands in for the
//! pointer graph, giving the same O(1) remove/promote property without
//! unsafe code.

use crate::packet::StoredPacket;
use crate::types::RtpTimestamp;

pub type NodeIdx = usize;

#[derive(Debug)]
pub struct Node {
    packet: Option<StoredPacket>,
    visible: bool,
    prev: Option<NodeIdx>,
    next: Option<NodeIdx>,
}

/// The arena of packet slots plus the list that threads through them.
#[derive(Debug, Default)]
pub struct NodePool {
    nodes: Vec<Node>,
    head: Option<NodeIdx>,
    visible_nodes: u32,
}

impl NodePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible_nodes(&self) -> u32 {
        self.visible_nodes
    }

    /// Reuse the first hidden slot found walking from the head, or extend
    /// the arena with a fresh slot inserted at the head. Either way the
    /// returned slot is marked visible.
    pub fn allocate(&mut self) -> NodeIdx {
        let mut cur = self.head;
        while let Some(idx) = cur {
            if !self.nodes[idx].visible {
                self.nodes[idx].visible = true;
                self.visible_nodes += 1;
                return idx;
            }
            cur = self.nodes[idx].next;
        }

        let idx = self.nodes.len();
        self.nodes.push(Node {
            packet: None,
            visible: true,
            prev: None,
            next: self.head,
        });
        if let Some(old_head) = self.head {
            self.nodes[old_head].prev = Some(idx);
        }
        self.head = Some(idx);
        self.visible_nodes += 1;
        idx
    }

    pub fn set_packet(&mut self, idx: NodeIdx, packet: StoredPacket) {
        self.nodes[idx].packet = Some(packet);
    }

    pub fn packet(&self, idx: NodeIdx) -> &StoredPacket {
        self.nodes[idx]
            .packet
            .as_ref()
            .expect("node_pool invariant: a visible node always has a packet")
    }

    pub fn packet_mut(&mut self, idx: NodeIdx) -> &mut StoredPacket {
        self.nodes[idx]
            .packet
            .as_mut()
            .expect("node_pool invariant: a visible node always has a packet")
    }

    pub fn is_visible(&self, idx: NodeIdx) -> bool {
        self.nodes[idx].visible
    }

    /// Mark a node reusable and, if requested, move it to the list head so
    /// the next allocation finds it cheaply. Indexes should already have
    /// been updated by the caller before calling this.
    pub fn hide(&mut self, idx: NodeIdx, promote: bool) {
        if self.nodes[idx].visible {
            self.nodes[idx].visible = false;
            self.visible_nodes -= 1;
        }
        if promote {
            self.promote_to_head(idx);
        }
    }

    fn promote_to_head(&mut self, idx: NodeIdx) {
        if self.head == Some(idx) {
            return;
        }

        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => {}
        }
        if let Some(n) = next {
            self.nodes[n].prev = prev;
        }

        self.nodes[idx].next = self.head;
        self.nodes[idx].prev = None;
        if let Some(old_head) = self.head {
            self.nodes[old_head].prev = Some(idx);
        }
        self.head = Some(idx);
    }

    /// Visit nodes in current list order (hidden nodes included).
    pub fn iter_order(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        let mut cur = self.head;
        std::iter::from_fn(move || {
            let idx = cur?;
            cur = self.nodes[idx].next;
            Some(idx)
        })
    }

    /// The visible node with the lowest seq, optionally restricted to a
    /// single ts (used for rollover-at-zero and the ts-mode "first frame"
    /// lookup).
    pub fn find_lowest_seq(&self, ts_filter: Option<RtpTimestamp>) -> Option<NodeIdx> {
        self.iter_order()
            .filter(|&idx| self.nodes[idx].visible)
            .filter(|&idx| match ts_filter {
                Some(ts) => self.packet(idx).timestamp() == ts,
                None => true,
            })
            .min_by_key(|&idx| self.packet(idx).sequence().get())
    }

    /// The visible node with the lowest ts (ts-mode "first frame" lookup).
    pub fn find_lowest_ts_node(&self) -> Option<NodeIdx> {
        self.iter_order()
            .filter(|&idx| self.nodes[idx].visible)
            .min_by_key(|&idx| self.packet(idx).timestamp().get())
    }

    /// Re-sort the list so hidden nodes bubble to the head and visible
    /// nodes that remain follow in ascending seq order. A classic top-down
    /// mergesort on the linked list: stable, O(n log n), no auxiliary
    /// array beyond the index bookkeeping below. Only called after a batch
    /// of hides (thinning, drop-by-ts), so per-packet paths stay O(1).
    pub fn sort(&mut self) {
        let Some(start) = self.head else {
            return;
        };

        let mut list = Some(start);
        let mut insize = 1usize;

        loop {
            let mut p = list;
            list = None;
            let mut tail: Option<NodeIdx> = None;
            let mut nmerges = 0usize;

            while let Some(p_start) = p {
                nmerges += 1;

                let mut psize = 0usize;
                let mut q = Some(p_start);
                for _ in 0..insize {
                    psize += 1;
                    q = self.nodes[q.unwrap()].next;
                    if q.is_none() {
                        break;
                    }
                }

                let mut qsize = insize;
                let mut p_cur = Some(p_start);
                let mut q_cur = q;

                while psize > 0 || (qsize > 0 && q_cur.is_some()) {
                    let take_p = if psize == 0 {
                        false
                    } else if qsize == 0 || q_cur.is_none() {
                        true
                    } else {
                        self.node_order_lte(p_cur.unwrap(), q_cur.unwrap())
                    };

                    let e = if take_p {
                        let e = p_cur.unwrap();
                        p_cur = self.nodes[e].next;
                        psize -= 1;
                        e
                    } else {
                        let e = q_cur.unwrap();
                        q_cur = self.nodes[e].next;
                        qsize -= 1;
                        e
                    };

                    match tail {
                        Some(t) => self.nodes[t].next = Some(e),
                        None => list = Some(e),
                    }
                    self.nodes[e].prev = tail;
                    tail = Some(e);
                }

                p = q_cur;
            }

            if let Some(t) = tail {
                self.nodes[t].next = None;
            }

            if nmerges <= 1 {
                self.head = list;
                return;
            }

            insize *= 2;
        }
    }

    /// Sort key `(visible desc, seq asc)`: a hidden node always sorts
    /// before anything; between two visible nodes, the lower seq sorts
    /// first. Mirrors the original comparator exactly, including its
    /// "hidden nodes are mutually equal" shortcut.
    fn node_order_lte(&self, a: NodeIdx, b: NodeIdx) -> bool {
        if !self.nodes[a].visible {
            return true;
        }
        if !self.nodes[b].visible {
            return false;
        }
        self.packet(a).sequence().get() <= self.packet(b).sequence().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::StoredPacket;

    fn packet(seq: u16, ts: u32) -> StoredPacket {
        let mut buf = vec![0u8; 12];
        buf[0] = 0x80;
        buf[2..4].copy_from_slice(&seq.to_be_bytes());
        buf[4..8].copy_from_slice(&ts.to_be_bytes());
        StoredPacket::from_wire(&buf).unwrap()
    }

    #[test]
    fn allocate_reuses_hidden_slots() {
        let mut pool = NodePool::new();
        let a = pool.allocate();
        pool.set_packet(a, packet(1, 100));
        pool.hide(a, true);
        assert_eq!(pool.visible_nodes(), 0);

        let b = pool.allocate();
        assert_eq!(a, b, "hidden slot should be reused rather than extending the arena");
        assert_eq!(pool.visible_nodes(), 1);
    }

    #[test]
    fn sort_bubbles_hidden_to_head_and_orders_visible_by_seq() {
        let mut pool = NodePool::new();
        let n3 = pool.allocate();
        pool.set_packet(n3, packet(30, 0));
        let n1 = pool.allocate();
        pool.set_packet(n1, packet(10, 0));
        let n2 = pool.allocate();
        pool.set_packet(n2, packet(20, 0));
        pool.hide(n3, false);

        pool.sort();

        let order: Vec<NodeIdx> = pool.iter_order().collect();
        assert_eq!(order[0], n3, "hidden node should bubble to the head");
        assert_eq!(order[1], n1);
        assert_eq!(order[2], n2);
    }

    #[test]
    fn find_lowest_seq_ignores_hidden_nodes() {
        let mut pool = NodePool::new();
        let lowest = pool.allocate();
        pool.set_packet(lowest, packet(5, 0));
        let hidden_lower = pool.allocate();
        pool.set_packet(hidden_lower, packet(1, 0));
        pool.hide(hidden_lower, false);

        assert_eq!(pool.find_lowest_seq(None), Some(lowest));
    }
}
