//! The level-geometry collaborator (§3, §4.C). Polygons with floor/ceiling
//! heights, an edge list, and back-polygon indices for portal edges. The
//! tessellations the renderer and map editor need are out of scope here
//! (§1) — only the footprint the tick needs to resolve collisions.

use serde::{Deserialize, Serialize};
use sim_math::Vec3;

/// One edge of a polygon's 2D footprint, in winding order. `back_polygon`
/// is `Some(index)` for a portal edge (the polygon you step into when you
/// cross it) or `None` for a solid wall.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Edge {
    pub a: (f64, f64),
    pub b: (f64, f64),
    pub back_polygon: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polygon {
    pub floor_height: f64,
    pub ceiling_height: f64,
    pub edges: Vec<Edge>,
}

impl Polygon {
    /// Ray-casting point-in-polygon test against the XY footprint.
    /// Works for arbitrary (not necessarily convex) simple polygons.
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        let mut inside = false;
        for edge in &self.edges {
            let (x1, y1) = edge.a;
            let (x2, y2) = edge.b;
            let crosses = (y1 > y) != (y2 > y);
            if crosses {
                let x_at_y = x1 + (y - y1) / (y2 - y1) * (x2 - x1);
                if x < x_at_y {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// The edge (if any) the point would be crossing, given it has left
    /// the footprint on the side of that edge's outward normal.
    fn edge_crossed(&self, x: f64, y: f64) -> Option<&Edge> {
        self.edges.iter().find(|edge| {
            let (x1, y1) = edge.a;
            let (x2, y2) = edge.b;
            let nx = y2 - y1;
            let ny = -(x2 - x1);
            let to_point = (x - x1, y - y1);
            nx * to_point.0 + ny * to_point.1 > 0.0
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub polygons: Vec<Polygon>,
    /// Spawn position plus the polygon index that contains it.
    pub spawn_points: Vec<(Vec3, usize)>,
}

impl Level {
    pub fn polygon(&self, index: usize) -> Option<&Polygon> {
        self.polygons.get(index)
    }

    pub fn spawn_point(&self, seed: u64) -> (Vec3, usize) {
        if self.spawn_points.is_empty() {
            return (Vec3::ZERO, 0);
        }
        let index = (seed as usize) % self.spawn_points.len();
        self.spawn_points[index]
    }

    /// Resolves one entity's position against the level after kinematic
    /// integration: clamps to floor/ceiling within the containing
    /// polygon, and walks portal edges when the footprint has been left.
    /// Bounded by the polygon count so a degenerate level can never loop
    /// forever — the result depends only on `self` and the entity state,
    /// as required by §4.C.
    pub fn resolve(&self, mut pos: Vec3, mut polygon_index: usize) -> (Vec3, usize) {
        let max_steps = self.polygons.len().max(1);
        for _ in 0..max_steps {
            let Some(poly) = self.polygon(polygon_index) else {
                break;
            };
            if poly.contains_xy(pos.x, pos.y) {
                pos.z = pos.z.clamp(poly.floor_height, poly.ceiling_height);
                return (pos, polygon_index);
            }
            match poly.edge_crossed(pos.x, pos.y) {
                Some(edge) => match edge.back_polygon {
                    Some(next) => polygon_index = next,
                    None => {
                        // solid wall: stop at the edge's midpoint, keep the polygon.
                        pos.x = (edge.a.0 + edge.b.0) / 2.0;
                        pos.y = (edge.a.1 + edge.b.1) / 2.0;
                        pos.z = pos.z.clamp(poly.floor_height, poly.ceiling_height);
                        return (pos, polygon_index);
                    }
                },
                None => {
                    pos.z = pos.z.clamp(poly.floor_height, poly.ceiling_height);
                    return (pos, polygon_index);
                }
            }
        }
        (pos, polygon_index)
    }
}
