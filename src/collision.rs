use crate::{
    body::Body,
    quadtree::{Quadtree, Rect},
};
use ultraviolet::Vec2;

/// Union-find over body indices.
/// The root of every set is its lowest index, which is the merge survivor.
#[derive(Clone, Debug)]
pub struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // Path halving
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Joins the sets of `a` and `b`. Returns false if they were already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        let (low, high) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[high] = low;
        true
    }

    /// Sets with more than one member, each sorted so the survivor comes first.
    /// Groups are ordered by survivor index.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let len = self.parent.len();
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); len];
        for i in 0..len {
            let root = self.find(i);
            members[root].push(i);
        }
        members.into_iter().filter(|group| group.len() > 1).collect()
    }
}

/// Finds every group of mutually overlapping bodies.
///
/// Candidates for each body come from a range query over a square of side
/// `4 * max_radius` centered on it. Each overlapping pair is joined once,
/// keyed by its lower index, and overlap is transitive within a tick.
pub fn find_groups(bodies: &[Body], tree: &Quadtree, max_radius: f32) -> Vec<Vec<usize>> {
    let mut sets = DisjointSet::new(bodies.len());

    for (a, body) in bodies.iter().enumerate() {
        let range = Rect::square_around(body.pos, 4.0 * max_radius);
        for b in tree.range_query(bodies, &range) {
            if b <= a {
                continue;
            }
            if body.overlaps(&bodies[b]) {
                sets.union(a, b);
            }
        }
    }

    sets.groups()
}

/// Mass-weighted combination of the bodies in `group`.
/// Mass is the sum; position, velocity and acceleration are weighted averages.
pub fn merge(bodies: &[Body], group: &[usize]) -> Body {
    let mut mass = 0.0;
    let mut pos = Vec2::zero();
    let mut vel = Vec2::zero();
    let mut acc = Vec2::zero();

    for &i in group {
        let b = &bodies[i];
        mass += b.mass();
        pos += b.pos * b.mass();
        vel += b.vel * b.mass();
        acc += b.acc * b.mass();
    }

    Body::with_acceleration(pos / mass, vel / mass, acc / mass, mass)
}

/// Merges every group into its survivor and removes the absorbed bodies.
/// Returns the number of bodies removed.
pub fn resolve(bodies: &mut Vec<Body>, groups: &[Vec<usize>]) -> usize {
    let mut absorbed = vec![false; bodies.len()];

    for group in groups {
        let merged = merge(bodies, group);
        bodies[group[0]] = merged;
        for &i in &group[1..] {
            absorbed[i] = true;
        }
    }

    let before = bodies.len();
    let mut index = 0;
    bodies.retain(|_| {
        let keep = !absorbed[index];
        index += 1;
        keep
    });
    before - bodies.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_at(x: f32, y: f32, mass: f32) -> Body {
        Body::new(Vec2::new(x, y), Vec2::zero(), mass)
    }

    fn max_radius(bodies: &[Body]) -> f32 {
        bodies.iter().map(Body::radius).fold(0.0, f32::max)
    }

    #[test]
    fn union_keeps_lowest_index_as_root() {
        let mut sets = DisjointSet::new(5);
        assert!(sets.union(4, 2));
        assert!(sets.union(2, 3));
        assert!(!sets.union(3, 4));

        assert_eq!(sets.find(4), 2);
        assert_eq!(sets.groups(), vec![vec![2, 3, 4]]);
    }

    #[test]
    fn chain_of_overlaps_forms_one_group() {
        // Radius of a 1e12 body is about 1.24.
        let bodies = vec![
            body_at(0.0, 0.0, 1e12),
            body_at(2.0, 0.0, 1e12),
            body_at(4.0, 0.0, 1e12),
            body_at(40.0, 0.0, 1e12),
        ];
        let mut tree = Quadtree::default();
        tree.build(&bodies).unwrap();

        let groups = find_groups(&bodies, &tree, max_radius(&bodies));
        assert_eq!(groups, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn separated_bodies_do_not_group() {
        let bodies = vec![body_at(0.0, 0.0, 1e12), body_at(10.0, 0.0, 1e12)];
        let mut tree = Quadtree::default();
        tree.build(&bodies).unwrap();

        assert!(find_groups(&bodies, &tree, max_radius(&bodies)).is_empty());
    }

    #[test]
    fn merge_is_mass_weighted() {
        let bodies = vec![
            Body::with_acceleration(Vec2::new(0.0, 0.0), Vec2::new(3.0, 0.0), Vec2::new(1.0, 1.0), 1.0),
            Body::with_acceleration(Vec2::new(4.0, 0.0), Vec2::new(0.0, 3.0), Vec2::new(1.0, -1.0), 3.0),
        ];
        let merged = merge(&bodies, &[0, 1]);

        assert_eq!(merged.mass(), 4.0);
        assert_eq!(merged.radius(), Body::radius_for(4.0));
        assert_eq!(merged.pos, Vec2::new(3.0, 0.0));
        assert_eq!(merged.vel, Vec2::new(0.75, 2.25));
        assert_eq!(merged.acc, Vec2::new(1.0, -0.5));
    }

    #[test]
    fn resolve_removes_absorbed_bodies() {
        let mut bodies = vec![
            body_at(0.0, 0.0, 1.0),
            body_at(1.0, 0.0, 2.0),
            body_at(9.0, 9.0, 5.0),
            body_at(2.0, 0.0, 3.0),
        ];
        let removed = resolve(&mut bodies, &[vec![0, 1, 3]]);

        assert_eq!(removed, 2);
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0].mass(), 6.0);
        assert_eq!(bodies[1].pos, Vec2::new(9.0, 9.0));
    }
}
