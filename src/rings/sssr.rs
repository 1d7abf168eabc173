//! Smallest set of smallest rings via path-included distance matrices.
//!
//! Ring systems are isolated by repeatedly stripping degree-one vertices.
//! For each connected ring system a Floyd-Warshall pass records, for every
//! vertex pair, the shortest paths and the paths exactly one bond longer.
//! Pairs of such paths form ring candidates, which are accepted smallest
//! first until the cycle rank is reached.

use std::collections::BTreeSet;

use petgraph::unionfind::UnionFind;
use tracing::trace;

use crate::graph::{Graph, VertexId};

const INF: usize = usize::MAX / 4;

type Bond = (usize, usize);
type Path = Vec<Bond>;

/// Returns every SSSR ring as a list of vertex ids in cycle order.
pub fn find_rings(graph: &Graph) -> Vec<Vec<VertexId>> {
    let mut rings = Vec::new();
    for component in ring_systems(graph) {
        let n = component.len();
        let mut adjacency = vec![vec![false; n]; n];
        for (li, &v) in component.iter().enumerate() {
            for &w in &graph.vertices[v].neighbours {
                if let Ok(lj) = component.binary_search(&w) {
                    adjacency[li][lj] = true;
                }
            }
        }
        let bond_counts: Vec<usize> = adjacency
            .iter()
            .map(|row| row.iter().filter(|&&b| b).count())
            .collect();
        let edge_count = bond_counts.iter().sum::<usize>() / 2;

        let mut expected = (edge_count + 1).saturating_sub(n);
        if bond_counts.iter().all(|&c| c == 3) {
            expected = (edge_count + 2).saturating_sub(n);
        }
        trace!(size = n, expected, "ring system");
        if expected == 0 {
            continue;
        }
        if expected == 1 {
            rings.push(cycle_order(graph, &component));
            continue;
        }

        let matrices = PathMatrices::new(&adjacency);
        let candidates = matrices.candidates();
        for local in extract(&matrices, &candidates, &adjacency, &bond_counts, expected) {
            let members: Vec<VertexId> = local.into_iter().map(|i| component[i]).collect();
            rings.push(cycle_order(graph, &members));
        }
    }
    rings
}

/// Vertex sets of the connected ring systems, each sorted ascending.
fn ring_systems(graph: &Graph) -> Vec<Vec<VertexId>> {
    let n = graph.vertices.len();
    let mut degree: Vec<usize> = graph.vertices.iter().map(|v| v.neighbours.len()).collect();
    let mut removed = vec![false; n];
    let mut queue: Vec<VertexId> = (0..n).filter(|&v| degree[v] <= 1).collect();
    while let Some(v) = queue.pop() {
        if removed[v] {
            continue;
        }
        removed[v] = true;
        for &w in &graph.vertices[v].neighbours {
            if !removed[w] {
                degree[w] -= 1;
                if degree[w] <= 1 {
                    queue.push(w);
                }
            }
        }
    }

    let mut uf = UnionFind::<usize>::new(n);
    for edge in &graph.edges {
        if !removed[edge.source] && !removed[edge.target] {
            uf.union(edge.source, edge.target);
        }
    }
    let mut systems: Vec<Vec<VertexId>> = Vec::new();
    let mut index_of_root = vec![usize::MAX; n];
    for v in (0..n).filter(|&v| !removed[v]) {
        let root = uf.find(v);
        if index_of_root[root] == usize::MAX {
            index_of_root[root] = systems.len();
            systems.push(Vec::new());
        }
        systems[index_of_root[root]].push(v);
    }
    systems.retain(|s| s.len() > 2);
    systems
}

struct PathMatrices {
    d: Vec<Vec<usize>>,
    /// Shortest paths between each pair, as bond lists.
    pe: Vec<Vec<Vec<Path>>>,
    /// Paths one bond longer than the shortest.
    pe_prime: Vec<Vec<Vec<Path>>>,
}

impl PathMatrices {
    fn new(adjacency: &[Vec<bool>]) -> Self {
        let n = adjacency.len();
        let mut d = vec![vec![INF; n]; n];
        let mut pe: Vec<Vec<Vec<Path>>> = vec![vec![Vec::new(); n]; n];
        let mut pe_prime: Vec<Vec<Vec<Path>>> = vec![vec![Vec::new(); n]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    d[i][j] = 0;
                } else if adjacency[i][j] {
                    d[i][j] = 1;
                    pe[i][j] = vec![vec![(i, j)]];
                }
            }
        }

        for k in (0..n).rev() {
            for i in (0..n).rev() {
                for j in (0..n).rev() {
                    let previous = d[i][j];
                    let through = d[i][k] + d[k][j];
                    if previous > through {
                        if previous == through + 1 {
                            pe_prime[i][j] = pe[i][j].clone();
                        } else {
                            pe_prime[i][j].clear();
                        }
                        d[i][j] = through;
                        pe[i][j] = vec![join(&pe[i][k], &pe[k][j])];
                    } else if previous == through {
                        if !pe[i][k].is_empty() && !pe[k][j].is_empty() {
                            let path = join(&pe[i][k], &pe[k][j]);
                            pe[i][j].push(path);
                        }
                    } else if previous + 1 == through
                        && !pe[i][k].is_empty()
                        && !pe[k][j].is_empty()
                    {
                        let path = join(&pe[i][k], &pe[k][j]);
                        pe_prime[i][j].push(path);
                    }
                }
            }
        }
        Self { d, pe, pe_prime }
    }

    /// `(ring size, i, j)` sorted by size; ties keep enumeration order.
    fn candidates(&self) -> Vec<(usize, usize, usize)> {
        let n = self.d.len();
        let mut out = Vec::new();
        for i in 0..n {
            for j in 0..n {
                let d = self.d[i][j];
                if d == 0 || d >= INF {
                    continue;
                }
                let size = if self.pe_prime[i][j].is_empty() {
                    2 * d
                } else {
                    2 * d + 1
                };
                out.push((size, i, j));
            }
        }
        out.sort_by_key(|&(size, _, _)| size);
        out
    }
}

fn join(a: &[Path], b: &[Path]) -> Path {
    let mut path = a.first().cloned().unwrap_or_default();
    path.extend(b.first().into_iter().flatten().copied());
    path
}

struct Accepted {
    rings: Vec<BTreeSet<usize>>,
    bonds: BTreeSet<Bond>,
    ring_counts: Vec<usize>,
}

fn extract(
    matrices: &PathMatrices,
    candidates: &[(usize, usize, usize)],
    adjacency: &[Vec<bool>],
    bond_counts: &[usize],
    expected: usize,
) -> Vec<BTreeSet<usize>> {
    let mut accepted = Accepted {
        rings: Vec::new(),
        bonds: BTreeSet::new(),
        ring_counts: vec![0; adjacency.len()],
    };

    for &(size, i, j) in candidates {
        let pe = &matrices.pe[i][j];
        let mut unions: Vec<Path> = Vec::new();
        if size % 2 == 1 {
            if let Some(shortest) = pe.first() {
                for longer in &matrices.pe_prime[i][j] {
                    unions.push(shortest.iter().chain(longer).copied().collect());
                }
            }
        } else {
            for pair in pe.windows(2) {
                unions.push(pair[0].iter().chain(&pair[1]).copied().collect());
            }
        }

        for bonds in unions {
            let atoms: BTreeSet<usize> = bonds.iter().flat_map(|&(a, b)| [a, b]).collect();
            if bond_count(&atoms, adjacency) == atoms.len()
                && !accepted.contains(&atoms, &bonds, bond_counts)
            {
                accepted.rings.push(atoms);
                accepted.bonds.extend(bonds.iter().map(|&(a, b)| (a.min(b), a.max(b))));
            }
            if accepted.rings.len() == expected {
                return accepted.rings;
            }
        }
    }
    accepted.rings
}

impl Accepted {
    /// Whether `atoms` adds nothing new. On `false` the ring counts of its
    /// atoms are bumped, since the caller is about to accept it.
    fn contains(&mut self, atoms: &BTreeSet<usize>, bonds: &[Bond], bond_counts: &[usize]) -> bool {
        if self
            .rings
            .iter()
            .any(|ring| atoms.is_superset(ring) || ring == atoms)
        {
            return true;
        }
        let all_contained = bonds
            .iter()
            .all(|&(a, b)| self.bonds.contains(&(a.min(b), a.max(b))));
        let special_case = atoms.iter().any(|&a| self.ring_counts[a] < bond_counts[a]);
        if all_contained && !special_case {
            return true;
        }
        for &a in atoms {
            self.ring_counts[a] += 1;
        }
        false
    }
}

fn bond_count(atoms: &BTreeSet<usize>, adjacency: &[Vec<bool>]) -> usize {
    let mut count = 0;
    for &a in atoms {
        for &b in atoms.range(a + 1..) {
            if adjacency[a][b] {
                count += 1;
            }
        }
    }
    count
}

/// Orders a chordless cycle by walking it from its smallest vertex.
fn cycle_order(graph: &Graph, members: &[VertexId]) -> Vec<VertexId> {
    let set: BTreeSet<VertexId> = members.iter().copied().collect();
    let Some(&start) = set.iter().next() else {
        return Vec::new();
    };
    let mut order = vec![start];
    let mut previous = None;
    let mut current = start;
    while order.len() < set.len() {
        let next = graph.vertices[current]
            .neighbours
            .iter()
            .copied()
            .filter(|n| set.contains(n) && Some(*n) != previous && !order.contains(n))
            .min();
        match next {
            Some(n) => {
                previous = Some(current);
                current = n;
                order.push(n);
            }
            None => return set.into_iter().collect(),
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_smiles;

    fn rings(smiles: &str) -> Vec<Vec<VertexId>> {
        let graph = Graph::from_tree(&parse_smiles(smiles).unwrap(), false).unwrap();
        let mut rings = find_rings(&graph);
        rings.sort_by_key(|r| (r.len(), r.clone()));
        rings
    }

    fn sizes(smiles: &str) -> Vec<usize> {
        rings(smiles).iter().map(Vec::len).collect()
    }

    #[test]
    fn acyclic() {
        assert!(rings("CCCC(C)O").is_empty());
    }

    #[test]
    fn cyclohexane() {
        assert_eq!(rings("C1CCCCC1"), vec![vec![0, 1, 2, 3, 4, 5]]);
    }

    #[test]
    fn ring_with_substituents() {
        assert_eq!(sizes("CC1CCC(O)CC1"), vec![6]);
    }

    #[test]
    fn naphthalene() {
        assert_eq!(sizes("c1ccc2ccccc2c1"), vec![6, 6]);
    }

    #[test]
    fn biphenyl() {
        assert_eq!(sizes("c1ccccc1-c1ccccc1"), vec![6, 6]);
    }

    #[test]
    fn spiro() {
        assert_eq!(sizes("C1CCC2(CC1)CCCC2"), vec![5, 6]);
    }

    #[test]
    fn norbornane() {
        assert_eq!(sizes("C1CC2CC1CC2"), vec![5, 5]);
    }

    #[test]
    fn cubane() {
        assert_eq!(sizes("C12C3C4C1C5C2C3C45"), vec![4, 4, 4, 4, 4, 4]);
    }

    #[test]
    fn odd_fused_system() {
        // indane: five fused to six
        assert_eq!(sizes("C1Cc2ccccc2C1"), vec![5, 6]);
    }

    #[test]
    fn cycle_order_walks_the_ring() {
        let ring = &rings("C1CCCCC1")[0];
        assert_eq!(ring, &vec![0, 1, 2, 3, 4, 5]);
        let ring = &rings("C1CC(C)CC1")[0];
        assert_eq!(ring, &vec![0, 1, 2, 4, 5]);
    }
}
