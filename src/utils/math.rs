use crate::glm;
use std::ops::{Add, AddAssign};

/// scalar type used throughout the simplifier
pub type Real = f64;

/// difference of products a*b - c*d, with the rounding error of the
/// rounded product folded back in via fma (pbrt's trick)
pub fn diff_prod(a: Real, b: Real, c: Real, d: Real) -> Real {
    let cd = c * d;
    let res = a.mul_add(b, -cd);
    let err = c.mul_add(d, -cd);
    res + err
}

/// splits a product into its rounded value and the rounding error
fn two_prod(a: Real, b: Real) -> (Real, Real) {
    let ab = a * b;
    (ab, a.mul_add(b, -ab))
}

/// splits a sum into its rounded value and the rounding error
fn two_sum(a: Real, b: Real) -> (Real, Real) {
    let s = a + b;
    let delta = s - a;
    (s, (a - (s - delta)) + (b - delta))
}

/// compensated inner product of the given factor pairs, after Graillat et
/// al., "Accurate summation, dot product and polynomial evaluation in
/// complex floating point arithmetic"
pub fn inner_product(terms: &[(Real, Real)]) -> Real {
    let (mut sum, mut comp) = two_prod(terms[0].0, terms[0].1);
    for &(a, b) in &terms[1..] {
        let (product, product_err) = two_prod(a, b);
        let (s, sum_err) = two_sum(sum, product);
        sum = s;
        comp += product_err + sum_err;
    }
    sum + comp
}

/// cross product built from compensated differences so that nearly
/// parallel edges do not cancel catastrophically
pub fn cross(v1: &glm::DVec3, v2: &glm::DVec3) -> glm::DVec3 {
    glm::vec3(
        diff_prod(v1.y, v2.z, v1.z, v2.y),
        diff_prod(v1.z, v2.x, v1.x, v2.z),
        diff_prod(v1.x, v2.y, v1.y, v2.x),
    )
}

/// inverts a 4x4 matrix through the adjugate, sharing the 2x2
/// subdeterminants across cofactors (Eberly's Laplace expansion layout,
/// via ion) and summing every cofactor with compensated inner products;
/// returns `None` when the determinant comes out exactly zero
pub fn inverse(m: &glm::DMat4) -> Option<glm::DMat4> {
    let s0 = diff_prod(m[(0, 0)], m[(1, 1)], m[(1, 0)], m[(0, 1)]);
    let s1 = diff_prod(m[(0, 0)], m[(1, 2)], m[(1, 0)], m[(0, 2)]);
    let s2 = diff_prod(m[(0, 0)], m[(1, 3)], m[(1, 0)], m[(0, 3)]);

    let s3 = diff_prod(m[(0, 1)], m[(1, 2)], m[(1, 1)], m[(0, 2)]);
    let s4 = diff_prod(m[(0, 1)], m[(1, 3)], m[(1, 1)], m[(0, 3)]);
    let s5 = diff_prod(m[(0, 2)], m[(1, 3)], m[(1, 2)], m[(0, 3)]);

    let c0 = diff_prod(m[(2, 0)], m[(3, 1)], m[(3, 0)], m[(2, 1)]);
    let c1 = diff_prod(m[(2, 0)], m[(3, 2)], m[(3, 0)], m[(2, 2)]);
    let c2 = diff_prod(m[(2, 0)], m[(3, 3)], m[(3, 0)], m[(2, 3)]);

    let c3 = diff_prod(m[(2, 1)], m[(3, 2)], m[(3, 1)], m[(2, 2)]);
    let c4 = diff_prod(m[(2, 1)], m[(3, 3)], m[(3, 1)], m[(2, 3)]);
    let c5 = diff_prod(m[(2, 2)], m[(3, 3)], m[(3, 2)], m[(2, 3)]);

    let determinant = inner_product(&[
        (s0, c5),
        (-s1, c4),
        (s2, c3),
        (s3, c2),
        (s5, c0),
        (-s4, c1),
    ]);
    if determinant == 0.0 {
        return None;
    }
    let s = 1.0 / determinant;

    #[rustfmt::skip]
    let inv = glm::mat4(
        s * inner_product(&[(m[(1, 1)], c5), (m[(1, 3)], c3), (-m[(1, 2)], c4)]),
        s * inner_product(&[(-m[(0, 1)], c5), (m[(0, 2)], c4), (-m[(0, 3)], c3)]),
        s * inner_product(&[(m[(3, 1)], s5), (m[(3, 3)], s3), (-m[(3, 2)], s4)]),
        s * inner_product(&[(-m[(2, 1)], s5), (m[(2, 2)], s4), (-m[(2, 3)], s3)]),

        s * inner_product(&[(-m[(1, 0)], c5), (m[(1, 2)], c2), (-m[(1, 3)], c1)]),
        s * inner_product(&[(m[(0, 0)], c5), (m[(0, 3)], c1), (-m[(0, 2)], c2)]),
        s * inner_product(&[(-m[(3, 0)], s5), (m[(3, 2)], s2), (-m[(3, 3)], s1)]),
        s * inner_product(&[(m[(2, 0)], s5), (m[(2, 3)], s1), (-m[(2, 2)], s2)]),

        s * inner_product(&[(m[(1, 0)], c4), (m[(1, 3)], c0), (-m[(1, 1)], c2)]),
        s * inner_product(&[(-m[(0, 0)], c4), (m[(0, 1)], c2), (-m[(0, 3)], c0)]),
        s * inner_product(&[(m[(3, 0)], s4), (m[(3, 3)], s0), (-m[(3, 1)], s2)]),
        s * inner_product(&[(-m[(2, 0)], s4), (m[(2, 1)], s2), (-m[(2, 3)], s0)]),

        s * inner_product(&[(-m[(1, 0)], c3), (m[(1, 1)], c1), (-m[(1, 2)], c0)]),
        s * inner_product(&[(m[(0, 0)], c3), (m[(0, 2)], c0), (-m[(0, 1)], c1)]),
        s * inner_product(&[(-m[(3, 0)], s3), (m[(3, 1)], s1), (-m[(3, 2)], s0)]),
        s * inner_product(&[(m[(2, 0)], s3), (m[(2, 2)], s0), (-m[(2, 1)], s1)]),
    );
    Some(inv)
}

/// symmetric 4x4 quadric form, stored as its 10 upper triangular entries;
/// the sum of squared distances to a set of planes, evaluated at
/// homogeneous points (x, y, z, 1)
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Quadric {
    pub q11: Real,
    pub q12: Real,
    pub q13: Real,
    pub q14: Real,
    pub q22: Real,
    pub q23: Real,
    pub q24: Real,
    pub q33: Real,
    pub q34: Real,
    pub q44: Real,
}

impl Quadric {
    /// rank-1 plane quadric p*p^T for the plane ax + by + cz + d = 0 with
    /// a unit normal (a, b, c)
    pub fn from_plane(a: Real, b: Real, c: Real, d: Real) -> Self {
        Self {
            q11: a * a,
            q12: a * b,
            q13: a * c,
            q14: a * d,
            q22: b * b,
            q23: b * c,
            q24: b * d,
            q33: c * c,
            q34: c * d,
            q44: d * d,
        }
    }

    /// evaluates the form at the homogeneous point (v.x, v.y, v.z, 1)
    pub fn apply(&self, v: &glm::DVec3) -> Real {
        self.q11 * v.x * v.x
            + 2.0 * self.q12 * v.x * v.y
            + 2.0 * self.q13 * v.x * v.z
            + 2.0 * self.q14 * v.x
            + self.q22 * v.y * v.y
            + 2.0 * self.q23 * v.y * v.z
            + 2.0 * self.q24 * v.y
            + self.q33 * v.z * v.z
            + 2.0 * self.q34 * v.z
            + self.q44
    }

    /// the linear system solved for the optimal contraction target: the
    /// quadric's partial derivatives in the first three rows, (0, 0, 0, 1)
    /// in the last
    #[rustfmt::skip]
    pub fn partial_derivative_matrix(&self) -> glm::DMat4 {
        glm::mat4(
            self.q11, self.q12, self.q13, self.q14,
            self.q12, self.q22, self.q23, self.q24,
            self.q13, self.q23, self.q33, self.q34,
            0.0, 0.0, 0.0, 1.0,
        )
    }
}

impl Add for Quadric {
    type Output = Quadric;

    fn add(mut self, rhs: Quadric) -> Quadric {
        self += rhs;
        self
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, rhs: Quadric) {
        self.q11 += rhs.q11;
        self.q12 += rhs.q12;
        self.q13 += rhs.q13;
        self.q14 += rhs.q14;
        self.q22 += rhs.q22;
        self.q23 += rhs.q23;
        self.q24 += rhs.q24;
        self.q33 += rhs.q33;
        self.q34 += rhs.q34;
        self.q44 += rhs.q44;
    }
}
