//! A small directed graph over ordered vertices, used for state reachability, epsilon
//! closures and stay-chains.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph<T: Ord + Clone> {
    edges: BTreeMap<T, BTreeSet<T>>,
    vertices: BTreeSet<T>,
}

impl<T: Ord + Clone> Default for Graph<T> {
    fn default() -> Self {
        Self {
            edges: BTreeMap::new(),
            vertices: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Clone> Graph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertices(&self) -> &BTreeSet<T> {
        &self.vertices
    }

    pub fn add_vertex(&mut self, v: T) {
        self.vertices.insert(v);
    }

    pub fn add_edge(&mut self, from: T, to: T) {
        self.vertices.insert(from.clone());
        self.vertices.insert(to.clone());
        self.edges.entry(from).or_default().insert(to);
    }

    pub fn edges_from(&self, v: &T) -> impl Iterator<Item = &T> {
        self.edges.get(v).into_iter().flatten()
    }

    /// Adds an edge from every current vertex to `to`.
    pub fn join_with_all(&mut self, to: T) {
        let from: Vec<T> = self.vertices.iter().cloned().collect();
        for v in from {
            self.add_edge(v, to.clone());
        }
        self.vertices.insert(to);
    }

    /// Returns every vertex reachable from any of `from`, including the sources themselves.
    pub fn bfs<'a, I>(&'a self, from: I) -> BTreeSet<T>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let mut queue: VecDeque<&T> = from.into_iter().collect();
        let mut visited = BTreeSet::new();

        while let Some(cur) = queue.pop_front() {
            if !visited.insert(cur.clone()) {
                continue;
            }
            for to in self.edges_from(cur) {
                if !visited.contains(to) {
                    queue.push_back(to);
                }
            }
        }

        visited
    }

    /// Returns the graph with every edge reversed.
    pub fn inverse(&self) -> Self {
        let mut inv = Self {
            edges: BTreeMap::new(),
            vertices: self.vertices.clone(),
        };
        for (from, tos) in &self.edges {
            for to in tos {
                inv.add_edge(to.clone(), from.clone());
            }
        }
        inv
    }

    /// Returns the transitive closure, without reflexive edges.
    pub fn closure(&self) -> Self {
        let mut cl = Self {
            edges: BTreeMap::new(),
            vertices: self.vertices.clone(),
        };
        for v in &self.vertices {
            for u in self.bfs([v]) {
                if &u != v {
                    cl.add_edge(v.clone(), u);
                }
            }
        }
        cl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Graph<&'static str> {
        let mut g = Graph::new();
        g.add_edge("a", "b");
        g.add_edge("b", "c");
        g.add_vertex("d");
        g
    }

    #[test]
    fn test_bfs_reaches_transitively() {
        let g = chain();
        let reached = g.bfs([&"a"]);
        assert_eq!(reached, BTreeSet::from(["a", "b", "c"]));
        assert_eq!(g.bfs([&"d"]), BTreeSet::from(["d"]));
    }

    #[test]
    fn test_bfs_handles_cycles() {
        let mut g = chain();
        g.add_edge("c", "a");
        assert_eq!(g.bfs([&"b"]), BTreeSet::from(["a", "b", "c"]));
    }

    #[test]
    fn test_inverse_and_closure() {
        let g = chain();
        let inv = g.inverse();
        assert_eq!(inv.bfs([&"c"]), BTreeSet::from(["a", "b", "c"]));

        let cl = g.closure();
        let from_a: BTreeSet<_> = cl.edges_from(&"a").cloned().collect();
        assert_eq!(from_a, BTreeSet::from(["b", "c"]));
        assert_eq!(cl.edges_from(&"c").count(), 0);
    }

    #[test]
    fn test_join_with_all() {
        let mut g = chain();
        g.join_with_all("sink");
        for v in ["a", "b", "c", "d"] {
            assert!(g.edges_from(&v).any(|to| *to == "sink"));
        }
    }
}
