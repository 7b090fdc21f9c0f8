use crate::body::Body;
use anyhow::{Result, ensure};
use ultraviolet::Vec2;

/// Axis-aligned rectangle described by its lower corner and extent.
/// Used to define the bounds of nodes and of range queries.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Margin added to the extent of the bodies before rounding up.
    pub const PADDING: f32 = 0.5;

    pub fn new(origin: Vec2, width: f32, height: f32) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    /// Creates a square of side `size` centered on `center`.
    pub fn square_around(center: Vec2, size: f32) -> Self {
        Self::new(center - Vec2::broadcast(size * 0.5), size, size)
    }

    /// Creates a square that encompasses all the given bodies.
    /// The side is the larger extent of the bodies, padded and rounded up,
    /// and the square is centered on the middle of their bounding box.
    pub fn new_containing(bodies: &[Body]) -> Self {
        if bodies.is_empty() {
            return Self::new(Vec2::zero(), 0.0, 0.0);
        }

        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;

        for body in bodies {
            min_x = min_x.min(body.pos.x);
            min_y = min_y.min(body.pos.y);
            max_x = max_x.max(body.pos.x);
            max_y = max_y.max(body.pos.y);
        }

        let middle = Vec2::new(min_x + max_x, min_y + max_y) * 0.5;
        let size = ((max_x - min_x).max(max_y - min_y) + Self::PADDING).ceil();

        Self::square_around(middle, size)
    }

    pub fn max(&self) -> Vec2 {
        self.origin + Vec2::new(self.width, self.height)
    }

    pub fn center(&self) -> Vec2 {
        self.origin + Vec2::new(self.width, self.height) * 0.5
    }

    /// Inclusive on every edge.
    pub fn contains(&self, pos: Vec2) -> bool {
        let max = self.max();
        pos.x >= self.origin.x && pos.x <= max.x && pos.y >= self.origin.y && pos.y <= max.y
    }

    /// Touching edges count as intersecting.
    pub fn intersects(&self, other: &Rect) -> bool {
        let max = self.max();
        let other_max = other.max();
        !(other.origin.x > max.x
            || other.origin.y > max.y
            || other_max.x < self.origin.x
            || other_max.y < self.origin.y)
    }

    /// Determines which quadrant a position falls into relative to the rect's center.
    /// Returns an index from 0 to 3:
    /// 0: lower-left, 1: lower-right, 2: upper-left, 3: upper-right
    pub fn find_quadrant(&self, pos: Vec2) -> usize {
        let center = self.center();
        ((pos.y > center.y) as usize) << 1 | (pos.x > center.x) as usize
    }

    /// Returns the sub-rectangle for the specified quadrant.
    pub fn into_quadrant(self, quadrant: usize) -> Self {
        let width = self.width * 0.5;
        let height = self.height * 0.5;
        let origin = Vec2::new(
            self.origin.x + (quadrant & 1) as f32 * width,
            self.origin.y + (quadrant >> 1) as f32 * height,
        );
        Self::new(origin, width, height)
    }

    /// Divides the rect into 4 equal sub-quadrants tiling it exactly.
    pub fn subdivide(&self) -> [Rect; 4] {
        [0, 1, 2, 3].map(|i| self.into_quadrant(i))
    }
}

/// A (mass, position) pair standing in for a region of the tree during
/// force computation.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VirtualBody {
    pub pos: Vec2,
    pub mass: f32,
}

impl VirtualBody {
    pub fn from_body(body: &Body) -> Self {
        Self {
            pos: body.pos,
            mass: body.mass(),
        }
    }

    /// Mass-weighted combination of the given parts.
    /// Returns `None` when there is nothing to combine.
    pub fn combine(parts: impl IntoIterator<Item = VirtualBody>) -> Option<Self> {
        let mut mass = 0.0;
        let mut weighted = Vec2::zero();
        for part in parts {
            mass += part.mass;
            weighted += part.pos * part.mass;
        }

        if mass > 0.0 {
            Some(Self {
                pos: weighted / mass,
                mass,
            })
        } else {
            None
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    /// Index of the first child in the nodes array (0 if leaf).
    pub children: u32,
    /// Index of the next sibling (or 0 if last child/root).
    pub next: u32,
    /// Index of the parent node (0 for the root).
    pub parent: u32,
    pub depth: u32,
    /// Spatial bounds of the node.
    pub boundary: Rect,
    /// Indices of the bodies held while the node is a leaf.
    pub bodies: Vec<u32>,
    /// Number of bodies in the subtree.
    pub count: u32,
    /// Total mass of the subtree.
    pub mass: f32,
    /// Center of mass of the subtree.
    pub pos: Vec2,
}

impl Node {
    pub fn new(next: u32, parent: u32, depth: u32, boundary: Rect) -> Self {
        Self {
            children: 0,
            next,
            parent,
            depth,
            boundary,
            bodies: Vec::new(),
            count: 0,
            mass: 0.0,
            pos: Vec2::zero(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children == 0
    }

    pub fn is_branch(&self) -> bool {
        self.children != 0
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Aggregate of the whole subtree, `None` for an empty region.
    pub fn aggregate(&self) -> Option<VirtualBody> {
        if self.is_empty() || self.mass <= 0.0 {
            return None;
        }
        Some(VirtualBody {
            pos: self.pos,
            mass: self.mass,
        })
    }
}

/// Aggregates recomputed without one body, for the nodes on the path from
/// that body's leaf up to the root. Every other node cannot contain the
/// body, so its build-time aggregate is already exclusive of it.
struct Exclusion {
    path: Vec<(usize, Option<VirtualBody>)>,
}

impl Exclusion {
    fn aggregate(&self, node: &Node, index: usize) -> Option<VirtualBody> {
        match self.path.iter().find(|(n, _)| *n == index) {
            Some((_, aggregate)) => *aggregate,
            None => node.aggregate(),
        }
    }
}

/// The Barnes-Hut quadtree.
/// Uses a flat vector `nodes` that is cleared and refilled every build.
#[derive(Debug)]
pub struct Quadtree {
    /// Maximum number of bodies a leaf holds before it subdivides.
    pub leaf_capacity: usize,
    /// Linearized tree nodes.
    pub nodes: Vec<Node>,
    /// Indices of parent nodes, used for bottom-up center of mass propagation.
    pub parents: Vec<usize>,
    /// Leaf holding each body, filled by `propagate`.
    leaf_of: Vec<u32>,
}

impl Default for Quadtree {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LEAF_CAPACITY)
    }
}

impl Quadtree {
    pub const ROOT: usize = 0;
    pub const DEFAULT_LEAF_CAPACITY: usize = 4;
    /// Leaves at this depth no longer split and may exceed their capacity (coincident bodies).
    pub const MAX_DEPTH: u32 = 32;

    const NO_LEAF: u32 = u32::MAX;

    pub fn new(leaf_capacity: usize) -> Self {
        Self {
            leaf_capacity: leaf_capacity.max(1),
            nodes: Vec::new(),
            parents: Vec::new(),
            leaf_of: Vec::new(),
        }
    }

    /// Resets the tree and initializes the root node with the given bounds.
    pub(crate) fn clear(&mut self, boundary: Rect) {
        self.nodes.clear();
        self.parents.clear();
        self.leaf_of.clear();
        self.nodes.push(Node::new(0, 0, 0, boundary));
    }

    /// Rebuilds the tree over `bodies`, rooted at a square containing all of them.
    pub fn build(&mut self, bodies: &[Body]) -> Result<()> {
        let boundary = Rect::new_containing(bodies);
        self.clear(boundary);

        for (index, body) in bodies.iter().enumerate() {
            ensure!(
                self.insert(bodies, index),
                "body {} at {:?} lies outside the tree boundary {:?}",
                index,
                body.pos,
                boundary,
            );
        }

        self.propagate(bodies);
        Ok(())
    }

    pub fn boundary(&self) -> Option<Rect> {
        self.nodes.first().map(|root| root.boundary)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Subdivides a full leaf into 4 children and moves its bodies into them.
    /// Returns the index of the first child.
    fn subdivide(&mut self, bodies: &[Body], node: usize) -> usize {
        self.parents.push(node);
        let children = self.nodes.len() as u32;
        self.nodes[node].children = children;

        // Link the children together and the last child to the parent's
        // 'next' to support linear traversal.
        let nexts = [
            children + 1,
            children + 2,
            children + 3,
            self.nodes[node].next,
        ];
        let depth = self.nodes[node].depth + 1;
        let boundary = self.nodes[node].boundary;
        let quads = boundary.subdivide();
        for i in 0..4 {
            self.nodes.push(Node::new(nexts[i], node as u32, depth, quads[i]));
        }

        for index in std::mem::take(&mut self.nodes[node].bodies) {
            let quadrant = boundary.find_quadrant(bodies[index as usize].pos);
            self.nodes[children as usize + quadrant].bodies.push(index);
        }

        children as usize
    }

    /// Inserts the body at `index` of `bodies` into the tree.
    /// Returns false if its position lies outside the root boundary.
    /// Aggregates stay stale until `propagate` runs; [`Quadtree::build`] does both.
    pub(crate) fn insert(&mut self, bodies: &[Body], index: usize) -> bool {
        let pos = bodies[index].pos;
        match self.nodes.first() {
            Some(root) if root.boundary.contains(pos) => {}
            _ => return false,
        }

        let mut node = Self::ROOT;
        loop {
            let n = &self.nodes[node];
            if n.is_branch() {
                node = n.children as usize + n.boundary.find_quadrant(pos);
                continue;
            }

            if n.bodies.len() < self.leaf_capacity || n.depth >= Self::MAX_DEPTH {
                self.nodes[node].bodies.push(index as u32);
                return true;
            }

            // Leaf is full: split it and descend into the matching child.
            self.subdivide(bodies, node);
        }
    }

    /// Calculates center of mass and total mass for all nodes (bottom-up).
    /// Should be called after all insertions are done.
    fn propagate(&mut self, bodies: &[Body]) {
        self.leaf_of.clear();
        self.leaf_of.resize(bodies.len(), Self::NO_LEAF);

        for (index, node) in self.nodes.iter_mut().enumerate() {
            if node.is_branch() {
                continue;
            }
            node.count = node.bodies.len() as u32;
            let aggregate = VirtualBody::combine(
                node.bodies
                    .iter()
                    .map(|&i| VirtualBody::from_body(&bodies[i as usize])),
            );
            (node.pos, node.mass) = aggregate.map_or((Vec2::zero(), 0.0), |a| (a.pos, a.mass));
            for &i in &node.bodies {
                self.leaf_of[i as usize] = index as u32;
            }
        }

        // Iterate parents in reverse insertion order (deepest first)
        for &node in self.parents.iter().rev() {
            let i = self.nodes[node].children as usize;
            let count: u32 = (i..i + 4).map(|c| self.nodes[c].count).sum();
            let aggregate = VirtualBody::combine((i..i + 4).filter_map(|c| self.nodes[c].aggregate()));

            let n = &mut self.nodes[node];
            n.count = count;
            (n.pos, n.mass) = aggregate.map_or((Vec2::zero(), 0.0), |a| (a.pos, a.mass));
        }
    }

    fn exclusion(&self, bodies: &[Body], exclude: usize) -> Exclusion {
        let mut path = Vec::new();
        let leaf = match self.leaf_of.get(exclude) {
            Some(&leaf) if leaf != Self::NO_LEAF => leaf as usize,
            _ => return Exclusion { path },
        };

        let aggregate = VirtualBody::combine(
            self.nodes[leaf]
                .bodies
                .iter()
                .filter(|&&i| i as usize != exclude)
                .map(|&i| VirtualBody::from_body(&bodies[i as usize])),
        );
        path.push((leaf, aggregate));

        let mut node = leaf;
        while node != Self::ROOT {
            let child = node;
            let below = aggregate_of(&path);
            node = self.nodes[node].parent as usize;
            let first = self.nodes[node].children as usize;
            let aggregate = VirtualBody::combine((first..first + 4).filter_map(|c| {
                if c == child {
                    below
                } else {
                    self.nodes[c].aggregate()
                }
            }));
            path.push((node, aggregate));
        }

        Exclusion { path }
    }

    /// Total mass and center of mass of a node's subtree without the body
    /// at `exclude`. `None` if nothing remains.
    pub fn aggregate_excluding(&self, bodies: &[Body], node: usize, exclude: usize) -> Option<VirtualBody> {
        self.exclusion(bodies, exclude).aggregate(&self.nodes[node], node)
    }

    /// Returns the indices of all bodies whose position lies within `range`.
    /// Subtrees whose boundary does not intersect `range` are skipped.
    pub fn range_query(&self, bodies: &[Body], range: &Rect) -> Vec<usize> {
        let mut found = Vec::new();
        if self.nodes.is_empty() {
            return found;
        }

        let mut node_idx = Self::ROOT;
        loop {
            let n = &self.nodes[node_idx];

            if n.boundary.intersects(range) && n.is_branch() {
                node_idx = n.children as usize;
                continue;
            }

            if n.boundary.intersects(range) {
                found.extend(
                    n.bodies
                        .iter()
                        .map(|&i| i as usize)
                        .filter(|&i| range.contains(bodies[i].pos)),
                );
            }

            if n.next == 0 {
                break;
            }
            node_idx = n.next as usize;
        }

        found
    }

    /// Collects the virtual bodies acting on the body at `target`.
    /// Uses the Barnes-Hut criterion: a branch is approximated by its
    /// aggregate when `width / distance < theta`, otherwise it is opened.
    /// Leaves are always emitted as one virtual body. The target itself is
    /// excluded from every aggregate.
    pub fn approximate_force_query(&self, bodies: &[Body], target: usize, theta: f32) -> Vec<VirtualBody> {
        let mut virtual_bodies = Vec::new();
        if self.nodes.is_empty() {
            return virtual_bodies;
        }

        let pos = bodies[target].pos;
        let exclusion = self.exclusion(bodies, target);

        let mut node_idx = Self::ROOT;
        loop {
            let n = &self.nodes[node_idx];

            match exclusion.aggregate(n, node_idx) {
                Some(aggregate) if n.is_branch() => {
                    let local_theta = n.boundary.width / (aggregate.pos - pos).mag();
                    if local_theta >= theta {
                        // Node is too close/large, recurse into children
                        node_idx = n.children as usize;
                        continue;
                    }
                    virtual_bodies.push(aggregate);
                }
                Some(aggregate) => virtual_bodies.push(aggregate),
                None => {}
            }

            // Skip children, go to next sibling/node
            if n.next == 0 {
                break;
            }
            node_idx = n.next as usize;
        }

        virtual_bodies
    }
}

fn aggregate_of(path: &[(usize, Option<VirtualBody>)]) -> Option<VirtualBody> {
    path.last().and_then(|(_, aggregate)| *aggregate)
}
