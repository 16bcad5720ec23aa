use crate::glm;
use crate::utils::math::Real;

/// split axis of an internal tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn coord(self, v: &glm::DVec3) -> Real {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

#[derive(Debug)]
enum KdNode {
    Leaf {
        id: usize,
        pos: glm::DVec3,
    },
    // low holds coordinates <= coord, high holds the rest
    Split {
        axis: Axis,
        coord: Real,
        low: Box<KdNode>,
        high: Box<KdNode>,
    },
}

/// static 3-D tree over vertex positions, built once before the
/// contraction loop and queried for proximity pair candidates
#[derive(Debug)]
pub struct KdTree {
    root: Option<KdNode>,
}

impl KdTree {
    /// builds the tree from (vertex id, position) tuples; the input order
    /// is not preserved
    pub fn build(mut points: Vec<(usize, glm::DVec3)>) -> Self {
        let root = if points.is_empty() {
            None
        } else {
            Some(build_node(&mut points))
        };
        Self { root }
    }

    /// collects the ids of all points within `radius` of `center`
    /// (boundary included)
    pub fn radius_search(&self, center: &glm::DVec3, radius: Real, out: &mut Vec<usize>) {
        if let Some(root) = &self.root {
            search(root, center, radius, out);
        }
    }
}

fn search(node: &KdNode, center: &glm::DVec3, radius: Real, out: &mut Vec<usize>) {
    match node {
        KdNode::Leaf { id, pos } => {
            if glm::distance(center, pos) <= radius {
                out.push(*id);
            }
        }
        KdNode::Split {
            axis,
            coord,
            low,
            high,
        } => {
            // the asymmetric < and <= mirror the <= / > split of the build
            let refc = axis.coord(center);
            if refc <= *coord {
                search(low, center, radius, out);
                if coord - refc < radius {
                    search(high, center, radius, out);
                }
            } else {
                search(high, center, radius, out);
                if refc - coord <= radius {
                    search(low, center, radius, out);
                }
            }
        }
    }
}

fn build_node(points: &mut [(usize, glm::DVec3)]) -> KdNode {
    if let [(id, pos)] = points {
        return KdNode::Leaf { id: *id, pos: *pos };
    }
    let axis = widest_axis(points);
    let mut mid = partition_around_middle(points, axis);
    if mid == points.len() - 1 {
        mid -= 1;
    }
    let coord = axis.coord(&points[mid].1);
    let (low, high) = points.split_at_mut(mid + 1);
    KdNode::Split {
        axis,
        coord,
        low: Box::new(build_node(low)),
        high: Box::new(build_node(high)),
    }
}

/// the axis with the largest coordinate variance, ties resolved x, y, z
fn widest_axis(points: &[(usize, glm::DVec3)]) -> Axis {
    let var_x = variance(points, Axis::X);
    let var_y = variance(points, Axis::Y);
    let var_z = variance(points, Axis::Z);
    if var_x >= var_y {
        if var_x >= var_z {
            Axis::X
        } else {
            Axis::Z
        }
    } else if var_y >= var_z {
        Axis::Y
    } else {
        Axis::Z
    }
}

fn variance(points: &[(usize, glm::DVec3)], axis: Axis) -> Real {
    let mean = points.iter().map(|(_, p)| axis.coord(p)).sum::<Real>() / points.len() as Real;
    points
        .iter()
        .map(|(_, p)| {
            let diff = axis.coord(p) - mean;
            diff * diff
        })
        .sum()
}

/// partitions around the value of the middle element: everything at or
/// before the returned index is <= the pivot, everything after is greater
fn partition_around_middle(points: &mut [(usize, glm::DVec3)], axis: Axis) -> usize {
    points.swap(0, (points.len() - 1) / 2);
    let pivot = axis.coord(&points[0].1);
    let mut boundary = 1;
    for j in 1..points.len() {
        if axis.coord(&points[j].1) <= pivot {
            points.swap(boundary, j);
            boundary += 1;
        }
    }
    points.swap(0, boundary - 1);
    boundary - 1
}
