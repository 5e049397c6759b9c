//! Raster to vector tracing of validity masks.
//!
//! Regions are 4-connected. Boundaries run along pixel edges, vertices are
//! pixel corners in (col, row) space with the valid region kept to the right
//! of every directed edge.

use std::collections::{HashMap, VecDeque};

use geo::{Coord, LineString, Polygon};

use super::mask::ValidityMask;

type Vertex = (i64, i64);

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Vertex,
    to: Vertex,
}

impl Edge {
    fn direction(&self) -> Vertex {
        (self.to.0 - self.from.0, self.to.1 - self.from.1)
    }
}

/// Traces every valid region of `mask` into a polygon, exterior first.
pub fn trace_regions(mask: &ValidityMask) -> Vec<Polygon<f64>> {
    label_components(mask)
        .iter()
        .map(|cells| {
            let mut rings: Vec<Vec<Vertex>> = link_rings(&boundary_edges(mask, cells))
                .into_iter()
                .map(merge_collinear)
                .collect();
            rings.sort_by(|a, b| ring_area(b).total_cmp(&ring_area(a)));
            let mut rings = rings.into_iter().map(to_line_string);
            let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
            Polygon::new(exterior, rings.collect())
        })
        .collect()
}

fn label_components(mask: &ValidityMask) -> Vec<Vec<(usize, usize)>> {
    let mut seen = vec![false; mask.cells.len()];
    let mut components = Vec::new();

    for start in 0..mask.cells.len() {
        if seen[start] || mask.cells[start] == 0 {
            continue;
        }
        seen[start] = true;
        let mut queue = VecDeque::from([(start % mask.width, start / mask.width)]);
        let mut cells = Vec::new();

        while let Some((x, y)) = queue.pop_front() {
            cells.push((x, y));
            for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
                let (nx, ny) = (x as isize + dx, y as isize + dy);
                if !mask.is_valid(nx, ny) {
                    continue;
                }
                let idx = ny as usize * mask.width + nx as usize;
                if !seen[idx] {
                    seen[idx] = true;
                    queue.push_back((nx as usize, ny as usize));
                }
            }
        }
        components.push(cells);
    }
    components
}

fn boundary_edges(mask: &ValidityMask, cells: &[(usize, usize)]) -> Vec<Edge> {
    let mut edges = Vec::new();
    for &(x, y) in cells {
        let (cx, cy) = (x as isize, y as isize);
        let (x, y) = (x as i64, y as i64);
        if !mask.is_valid(cx, cy - 1) {
            edges.push(Edge { from: (x, y), to: (x + 1, y) });
        }
        if !mask.is_valid(cx + 1, cy) {
            edges.push(Edge { from: (x + 1, y), to: (x + 1, y + 1) });
        }
        if !mask.is_valid(cx, cy + 1) {
            edges.push(Edge { from: (x + 1, y + 1), to: (x, y + 1) });
        }
        if !mask.is_valid(cx - 1, cy) {
            edges.push(Edge { from: (x, y + 1), to: (x, y) });
        }
    }
    edges
}

/// Chains directed edges into closed rings.
///
/// Where two cells of a region touch only at a corner, the walk turns right
/// so each cell keeps its own boundary.
fn link_rings(edges: &[Edge]) -> Vec<Vec<Vertex>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (idx, edge) in edges.iter().enumerate() {
        outgoing.entry(edge.from).or_default().push(idx);
    }

    let successor = |current: usize| -> Option<usize> {
        let edge = edges[current];
        let (dx, dy) = edge.direction();
        let candidates = outgoing.get(&edge.to)?;
        [(-dy, dx), (dx, dy), (dy, -dx)].iter().find_map(|turn| {
            candidates
                .iter()
                .copied()
                .find(|&c| edges[c].direction() == *turn)
        })
    };

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();
    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        let mut ring = Vec::new();
        let mut current = start;
        loop {
            used[current] = true;
            ring.push(edges[current].from);
            match successor(current) {
                Some(next) if next != start && !used[next] => current = next,
                _ => break,
            }
        }
        rings.push(ring);
    }
    rings
}

fn merge_collinear(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len();
    if n < 3 {
        return ring;
    }
    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            let cross = (cur.0 - prev.0) * (next.1 - cur.1) - (cur.1 - prev.1) * (next.0 - cur.0);
            cross != 0
        })
        .map(|i| ring[i])
        .collect()
}

fn ring_area(ring: &[Vertex]) -> f64 {
    let n = ring.len();
    let twice: i64 = (0..n)
        .map(|i| {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            a.0 * b.1 - b.0 * a.1
        })
        .sum();
    (twice as f64 / 2.0).abs()
}

fn to_line_string(ring: Vec<Vertex>) -> LineString<f64> {
    LineString::new(
        ring.into_iter()
            .map(|(x, y)| Coord { x: x as f64, y: y as f64 })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn mask(rows: &[&str]) -> ValidityMask {
        let width = rows[0].len();
        ValidityMask {
            width,
            height: rows.len(),
            cells: rows
                .iter()
                .flat_map(|r| r.bytes().map(|b| u8::from(b == b'#')))
                .collect(),
        }
    }

    #[test]
    fn test_single_pixel() {
        let polygons = trace_regions(&mask(&["...", ".#.", "..."]));
        assert_eq!(polygons.len(), 1);
        let exterior = polygons[0].exterior();
        assert_eq!(exterior.0.len(), 5);
        assert_eq!(exterior.0[0], Coord { x: 1.0, y: 1.0 });
        assert_eq!(polygons[0].unsigned_area(), 1.0);
    }

    #[test]
    fn test_l_shape_corners_only() {
        let polygons = trace_regions(&mask(&["#..", "#..", "###"]));
        assert_eq!(polygons.len(), 1);
        // six corners plus the closing point
        assert_eq!(polygons[0].exterior().0.len(), 7);
        assert_eq!(polygons[0].unsigned_area(), 5.0);
    }

    #[test]
    fn test_hole_becomes_interior() {
        let polygons = trace_regions(&mask(&["###", "#.#", "###"]));
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].interiors().len(), 1);
        assert_eq!(polygons[0].unsigned_area(), 8.0);
    }

    #[test]
    fn test_corner_touch_is_not_connected() {
        let polygons = trace_regions(&mask(&["##.", "#.#", ".##"]));
        assert_eq!(polygons.len(), 2);
        assert!(polygons.iter().all(|p| p.unsigned_area() == 3.0));
    }

    #[test]
    fn test_holes_meeting_at_a_corner() {
        let polygons = trace_regions(&mask(&["####", "#..#", "#.##", "##.#", "####"]));
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].unsigned_area(), 16.0);
    }

    #[test]
    fn test_hole_pinched_against_outside() {
        let polygons = trace_regions(&mask(&["##.", "#.#", "###"]));
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].unsigned_area(), 7.0);
    }

    #[test]
    fn test_empty_mask() {
        assert!(trace_regions(&mask(&["...", "..."])).is_empty());
    }
}
