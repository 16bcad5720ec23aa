use crate::glm;

/// converts a glm::DVec3 to a glm::DVec4 by adding a 1.0 in the w slot
pub fn to_vec4(v: &glm::DVec3) -> glm::DVec4 {
    glm::vec4(v.x, v.y, v.z, 1.0)
}

/// midpoint of two points
pub fn midpoint(a: &glm::DVec3, b: &glm::DVec3) -> glm::DVec3 {
    (a + b) / 2.0
}
