//! Tree cells and the cross-linked neighbor graph.
//!
//! Cells live in one append-only arena and refer to each other by index.
//! Their adjacency lists are kept in a shared slab of link records with
//! explicit prev/next indices and a free list, so a link's handle stays valid
//! while unrelated links are inserted or erased in the same list. That
//! stability is what lets every link store a handle to its reverse twin in
//! the neighbor's opposite list.

use crate::CoordF;

use super::prism::Prism;

/// Index of a cell in the tree arena. Negative means "no cell".
pub type CellIndex = i64;

/// Sentinel for a missing cell reference.
pub const NO_CELL: CellIndex = -1;

/// Handle of a link record in the [`LinkPool`]. Negative means "no link".
pub type LinkId = i64;

/// Sentinel for a missing link handle.
pub const NO_LINK: LinkId = -1;

/// Neighbor direction of an adjacency list.
///
/// Left/Right neighbors touch across the curve's entry/exit edges; Up/Down
/// neighbors stack along Z with overlapping footprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Number of cardinal sides. Room is reserved for more (e.g. horizontal
    /// neighbors across non-curve edges), but only these four are linked.
    pub const COUNT: usize = 4;

    /// All sides, in adjacency-list order.
    pub const ALL: [Direction; Self::COUNT] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    /// The opposing side.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Position of this side in a cell's adjacency array.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Side for a given adjacency array position.
    #[inline]
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index]
    }
}

/// A directed edge of the adjacency graph.
///
/// Every link has an antiparallel twin in the target cell's opposite-side
/// list; `reverse` handles cross-point between the two.
#[derive(Debug, Clone, Copy)]
pub struct Link {
    /// The cell this link points at.
    pub to_index: CellIndex,
    /// Handle of the matching link in the target's opposite-direction list.
    pub reverse: LinkId,
    prev: LinkId,
    next: LinkId,
}

/// A node of the subdivision tree.
#[derive(Debug, Clone)]
pub struct Cell {
    pub prism: Prism,
    /// Position of this cell in the arena (self-reference).
    pub index: CellIndex,
    /// 0 at the synthetic root, 1 at the two real roots, +1 per subdivision.
    pub depth: i32,
    /// Arena indices of the children. Either slots 0..1 are valid (binary
    /// split) or all four are (quaternary split, slots 2..3 are the upper Z
    /// pair). `NO_CELL` marks an absent child.
    pub children: [CellIndex; 4],
    /// Flips to true exactly once, when the refinement loop subdivides this
    /// cell and hands its adjacency over to the children.
    pub is_subdivided: bool,
    /// Geometric volume in mm³.
    pub volume: CoordF,
    /// Volume the density target allows to be filled, in mm³. Leaves query
    /// the provider; internal cells carry the sum over their children.
    pub filled_volume_allowance: CoordF,
    /// Density target of the most demanding leaf below this cell.
    pub minimally_required_density: CoordF,
    /// Heads of the per-side adjacency lists, into the tree's [`LinkPool`].
    pub adjacent: [LinkId; Direction::COUNT],
}

impl Cell {
    /// Create a cell with no children and no neighbors.
    pub fn new(prism: Prism, index: CellIndex, depth: i32) -> Self {
        Self {
            prism,
            index,
            depth,
            children: [NO_CELL; 4],
            is_subdivided: false,
            volume: 0.0,
            filled_volume_allowance: 0.0,
            minimally_required_density: 0.0,
            adjacent: [NO_LINK; Direction::COUNT],
        }
    }

    /// Number of children this cell subdivides into: 2 for a binary split,
    /// 4 for a quaternary one.
    #[inline]
    pub fn child_count(&self) -> u8 {
        if self.children[2] < 0 {
            2
        } else {
            4
        }
    }

    /// Whether this cell has pre-built children in the arena.
    #[inline]
    pub fn has_children(&self) -> bool {
        self.children[0] >= 0
    }
}

/// Slab of link records with a free list.
///
/// Freed slots are reused before the slab grows; live handles are never
/// invalidated by unrelated insertions or erasures.
#[derive(Debug)]
pub struct LinkPool {
    links: Vec<Link>,
    free_head: LinkId,
}

impl Default for LinkPool {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            links: Vec::new(),
            free_head: NO_LINK,
        }
    }

    /// Read a link record.
    #[inline]
    pub fn get(&self, id: LinkId) -> &Link {
        &self.links[id as usize]
    }

    /// Handle of the link after `id` in its list.
    #[inline]
    pub fn next(&self, id: LinkId) -> LinkId {
        self.links[id as usize].next
    }

    /// Cross-set the reverse handles of an antiparallel pair.
    pub fn set_reverse_pair(&mut self, out: LinkId, incoming: LinkId) {
        self.links[out as usize].reverse = incoming;
        self.links[incoming as usize].reverse = out;
    }

    fn alloc(&mut self, to_index: CellIndex) -> LinkId {
        let link = Link {
            to_index,
            reverse: NO_LINK,
            prev: NO_LINK,
            next: NO_LINK,
        };
        if self.free_head != NO_LINK {
            let id = self.free_head;
            self.free_head = self.links[id as usize].next;
            self.links[id as usize] = link;
            id
        } else {
            self.links.push(link);
            (self.links.len() - 1) as LinkId
        }
    }

    fn release(&mut self, id: LinkId) {
        self.links[id as usize] = Link {
            to_index: NO_CELL,
            reverse: NO_LINK,
            prev: NO_LINK,
            next: self.free_head,
        };
        self.free_head = id;
    }

    /// Insert a new link at the head of a list.
    pub fn push_front(&mut self, head: &mut LinkId, to_index: CellIndex) -> LinkId {
        let id = self.alloc(to_index);
        self.links[id as usize].next = *head;
        if *head != NO_LINK {
            self.links[*head as usize].prev = id;
        }
        *head = id;
        id
    }

    /// Insert a new link immediately before `at`, which must be a member of
    /// the list that `head` points into.
    pub fn insert_before(&mut self, head: &mut LinkId, at: LinkId, to_index: CellIndex) -> LinkId {
        let id = self.alloc(to_index);
        let prev = self.links[at as usize].prev;
        self.links[id as usize].prev = prev;
        self.links[id as usize].next = at;
        self.links[at as usize].prev = id;
        if prev != NO_LINK {
            self.links[prev as usize].next = id;
        } else {
            *head = id;
        }
        id
    }

    /// Unlink `id` from its list and release its slot.
    pub fn remove(&mut self, head: &mut LinkId, id: LinkId) {
        let Link { prev, next, .. } = self.links[id as usize];
        if prev != NO_LINK {
            self.links[prev as usize].next = next;
        } else {
            debug_assert_eq!(*head, id);
            *head = next;
        }
        if next != NO_LINK {
            self.links[next as usize].prev = prev;
        }
        self.release(id);
    }

    /// Release every link of a list and empty it.
    pub fn clear(&mut self, head: &mut LinkId) {
        let mut id = *head;
        while id != NO_LINK {
            let next = self.links[id as usize].next;
            self.release(id);
            id = next;
        }
        *head = NO_LINK;
    }

    /// Iterate the link handles of a list, head first.
    pub fn iter(&self, head: LinkId) -> LinkIter<'_> {
        LinkIter {
            pool: self,
            current: head,
        }
    }

    /// Number of live links in a list.
    pub fn list_len(&self, head: LinkId) -> usize {
        self.iter(head).count()
    }
}

/// Iterator over the link handles of one adjacency list.
pub struct LinkIter<'a> {
    pool: &'a LinkPool,
    current: LinkId,
}

impl Iterator for LinkIter<'_> {
    type Item = LinkId;

    fn next(&mut self) -> Option<LinkId> {
        if self.current == NO_LINK {
            return None;
        }
        let id = self.current;
        self.current = self.pool.links[id as usize].next;
        Some(id)
    }
}
