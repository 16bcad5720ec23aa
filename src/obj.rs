use crate::glm;
use crate::mesh::Mesh;
use crate::utils::math::Real;
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use std::io::{BufRead, Write};
use thiserror::Error;

/// errors surfaced by the OBJ reader and writer
#[derive(Debug, Error)]
pub enum ObjError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected a number, found {token:?}")]
    Number { line: usize, token: String },
    #[error("line {line}: face references vertex {index}, but only {count} vertices are known")]
    Index {
        line: usize,
        index: usize,
        count: usize,
    },
    #[error("line {line}: a face needs at least 3 vertices")]
    ShortFace { line: usize },
}

/// reads the supported OBJ subset into a mesh
///
/// `v x y z` lines append vertices, `f` lines fan-triangulate their
/// polygon, texture and normal references are parsed and dropped, and any
/// other line is skipped
pub fn read_obj<R: BufRead>(input: R) -> Result<Mesh, ObjError> {
    let mut mesh = Mesh::new();
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let x = parse_real(tokens.next(), number)?;
                let y = parse_real(tokens.next(), number)?;
                let z = parse_real(tokens.next(), number)?;
                mesh.push_vertex(glm::vec3(x, y, z));
            }
            Some("f") => {
                let corners: Vec<usize> = tokens
                    .map(|token| parse_corner(token, number, mesh.vertex_count()))
                    .collect::<Result<_, _>>()?;
                if corners.len() < 3 {
                    return Err(ObjError::ShortFace { line: number });
                }
                for (b, c) in corners[1..].iter().copied().tuple_windows() {
                    mesh.push_face(corners[0], b, c);
                }
            }
            _ => {}
        }
    }
    Ok(mesh)
}

fn parse_real(token: Option<&str>, line: usize) -> Result<Real, ObjError> {
    let token = token.unwrap_or("");
    token.parse().map_err(|_| ObjError::Number {
        line,
        token: token.to_owned(),
    })
}

/// resolves a face corner like `7`, `7/2` or `7/2/5` to a zero-based
/// vertex index, dropping the texture and normal references
fn parse_corner(token: &str, line: usize, count: usize) -> Result<usize, ObjError> {
    let reference = token.split('/').next().unwrap_or("");
    let index: usize = reference.parse().map_err(|_| ObjError::Number {
        line,
        token: token.to_owned(),
    })?;
    if index == 0 || index > count {
        return Err(ObjError::Index { line, index, count });
    }
    Ok(index - 1)
}

/// writes the surviving mesh
///
/// a face survives when its corner representatives are pairwise distinct
/// and its unordered triple was not written before; a vertex is written
/// when it is incident to a surviving face. vertices keep their insertion
/// order and are renumbered from 1
pub fn write_obj<W: Write>(mesh: &Mesh, mut out: W, precision: usize) -> Result<(), ObjError> {
    let mut seen: AHashSet<(usize, usize, usize)> = AHashSet::new();
    let mut surviving: Vec<(usize, usize, usize)> = Vec::new();
    for face in mesh.faces() {
        let a = mesh.find(face.v1);
        let b = mesh.find(face.v2);
        let c = mesh.find(face.v3);
        if a == b || b == c || c == a {
            continue;
        }
        let mut key = [a, b, c];
        key.sort_unstable();
        if seen.insert((key[0], key[1], key[2])) {
            surviving.push((a, b, c));
        }
    }

    let useful: AHashSet<usize> = surviving
        .iter()
        .flat_map(|&(a, b, c)| [a, b, c])
        .collect();
    let mut numbering: AHashMap<usize, usize> = AHashMap::with_capacity(useful.len());
    for v in 0..mesh.vertex_count() {
        if !useful.contains(&v) {
            continue;
        }
        numbering.insert(v, numbering.len() + 1);
        let pos = mesh.position(v);
        writeln!(
            out,
            "v {} {} {}",
            format_real(pos.x, precision),
            format_real(pos.y, precision),
            format_real(pos.z, precision)
        )?;
    }
    for (a, b, c) in surviving {
        writeln!(out, "f {} {} {}", numbering[&a], numbering[&b], numbering[&c])?;
    }
    Ok(())
}

/// formats with the given number of significant decimal digits and trims
/// trailing zeros, like printf's %g
fn format_real(x: Real, precision: usize) -> String {
    let precision = precision.max(1);
    if x == 0.0 {
        return "0".to_owned();
    }
    let scientific = format!("{:.*e}", precision - 1, x);
    let split = scientific.find('e').unwrap();
    let exponent: i32 = scientific[split + 1..].parse().unwrap();
    if exponent < -4 || exponent >= precision as i32 {
        let mantissa = scientific[..split]
            .trim_end_matches('0')
            .trim_end_matches('.');
        format!("{mantissa}e{exponent}")
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        let fixed = format!("{x:.decimals$}");
        if fixed.contains('.') {
            fixed.trim_end_matches('0').trim_end_matches('.').to_owned()
        } else {
            fixed
        }
    }
}
