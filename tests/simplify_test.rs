use decimesh::mesh::Mesh;
use decimesh::obj::{read_obj, write_obj};
use std::convert::Infallible;
use std::fmt::Write as _;

const TETRAHEDRON: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
f 1 2 3
f 1 2 4
f 1 3 4
f 2 3 4
";

fn read(text: &str) -> Mesh {
    read_obj(text.as_bytes()).unwrap()
}

fn simplify(mesh: &mut Mesh, ratio: f64, epsilon: f64) {
    mesh.simplify(&[ratio], epsilon, |_, _| Ok::<_, Infallible>(()))
        .unwrap();
}

fn dump(mesh: &Mesh) -> String {
    let mut out = Vec::new();
    write_obj(mesh, &mut out, 8).unwrap();
    String::from_utf8(out).unwrap()
}

fn vertex_lines(text: &str) -> usize {
    text.lines().filter(|l| l.starts_with("v ")).count()
}

fn face_lines(text: &str) -> usize {
    text.lines().filter(|l| l.starts_with("f ")).count()
}

/// unordered triangle set of an OBJ document, for order-independent
/// comparisons
fn triangle_set(text: &str) -> Vec<[usize; 3]> {
    let mut triangles: Vec<[usize; 3]> = text
        .lines()
        .filter(|l| l.starts_with("f "))
        .map(|l| {
            let mut corners: Vec<usize> = l
                .split_whitespace()
                .skip(1)
                .map(|t| t.parse().unwrap())
                .collect();
            corners.sort_unstable();
            [corners[0], corners[1], corners[2]]
        })
        .collect();
    triangles.sort_unstable();
    triangles
}

/// a rectangular grid over a paraboloid so that most vertex quadrics are
/// well conditioned
fn bumpy_grid(n: usize) -> String {
    let mut text = String::new();
    for i in 0..n {
        for j in 0..n {
            let x = i as f64;
            let y = j as f64;
            let z = 0.05 * (x * x + y * y);
            writeln!(text, "v {x} {y} {z}").unwrap();
        }
    }
    for i in 0..n - 1 {
        for j in 0..n - 1 {
            let a = i * n + j + 1;
            let b = a + 1;
            let c = a + n;
            let d = c + 1;
            writeln!(text, "f {a} {b} {c}").unwrap();
            writeln!(text, "f {b} {d} {c}").unwrap();
        }
    }
    text
}

#[test]
fn tetrahedron_collapses_to_a_triangle() {
    let mut mesh = read(TETRAHEDRON);
    simplify(&mut mesh, 0.75, 0.0);
    assert_eq!(mesh.survivor_count(), 3);

    // the two faces left coincide after the merge, so one triangle remains
    let text = dump(&mesh);
    assert_eq!(vertex_lines(&text), 3);
    assert_eq!(face_lines(&text), 1);
}

#[test]
fn ratio_one_reproduces_the_input() {
    let mut mesh = read(TETRAHEDRON);
    simplify(&mut mesh, 1.0, 0.0);
    let text = dump(&mesh);
    assert_eq!(vertex_lines(&text), 4);
    assert_eq!(triangle_set(&text), triangle_set(TETRAHEDRON));
}

#[test]
fn repeating_a_reached_ratio_contracts_nothing() {
    let mut mesh = read(&bumpy_grid(8));
    simplify(&mut mesh, 0.5, 0.0);
    let after_first = mesh.survivor_count();
    assert!(after_first <= 32);

    simplify(&mut mesh, 0.5, 0.0);
    assert_eq!(mesh.survivor_count(), after_first);
}

#[test]
fn degenerate_face_is_dropped_and_contributes_nothing() {
    let text = "v 0 0 0\nv 1 0 0\nv 0 1 1\nf 1 2 3\nf 1 2 2\n";
    let mut mesh = read(text);
    assert_eq!(mesh.face_count(), 2);
    simplify(&mut mesh, 1.0, 0.0);
    let out = dump(&mesh);
    assert_eq!(face_lines(&out), 1);
    assert_eq!(vertex_lines(&out), 3);
}

#[test]
fn polygons_are_fanned_before_contraction() {
    let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0.5 1.5 0\nv 0 1 0\nf 1 2 3 4 5\n";
    let mesh = read(text);
    let triples: Vec<(usize, usize, usize)> = mesh
        .faces()
        .iter()
        .map(|f| (f.v1, f.v2, f.v3))
        .collect();
    assert_eq!(triples, vec![(0, 1, 2), (0, 2, 3), (0, 3, 4)]);
}

#[test]
fn proximity_pairs_fuse_disjoint_triangles() {
    // two triangles 0.01 apart, no shared edge
    let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 0.01
v 1 0 0.01
v 0 1 0.01
f 1 2 3
f 4 5 6
";
    let mut mesh = read(text);
    simplify(&mut mesh, 0.5, 0.05);
    assert_eq!(mesh.survivor_count(), 3);
}

#[test]
fn without_epsilon_disjoint_patches_stay_apart() {
    // the same two triangles cannot reach 3 vertices on edges alone:
    // each patch collapses to a point and the loop runs dry
    let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 0.01
v 1 0 0.01
v 0 1 0.01
f 1 2 3
f 4 5 6
";
    let mut mesh = read(text);
    simplify(&mut mesh, 0.2, 0.0);
    assert_eq!(mesh.survivor_count(), 2);
}

#[test]
fn multiple_ratios_emit_largest_first() {
    let mut mesh = read(&bumpy_grid(10));
    assert_eq!(mesh.vertex_count(), 100);

    let mut emitted: Vec<(f64, usize)> = Vec::new();
    mesh.simplify(&[0.5, 0.2, 0.8], 0.0, |ratio, mesh| {
        emitted.push((ratio, mesh.survivor_count()));
        Ok::<_, Infallible>(())
    })
    .unwrap();

    let ratios: Vec<f64> = emitted.iter().map(|&(r, _)| r).collect();
    assert_eq!(ratios, vec![0.8, 0.5, 0.2]);
    for &(ratio, survivors) in &emitted {
        assert!(survivors <= (100.0 * ratio) as usize);
    }
    assert!(emitted[0].1 >= emitted[1].1 && emitted[1].1 >= emitted[2].1);
}

#[test]
fn single_triangle_collapses_to_a_point() {
    let text = "v 0 0 0\nv 1 0 0\nv 0 1 1\nf 1 2 3\n";
    let mut mesh = read(text);
    simplify(&mut mesh, 0.3, 0.0);
    // the heap runs dry at one survivor; no face is left to write
    assert_eq!(mesh.survivor_count(), 1);
    let out = dump(&mesh);
    assert_eq!(vertex_lines(&out), 0);
    assert_eq!(face_lines(&out), 0);
}

#[test]
fn coplanar_mesh_progresses_on_the_fallback() {
    // a flat grid: every pair's quadric system is singular, so the solver
    // falls back on the endpoint and midpoint candidates throughout
    let mut text = String::new();
    for i in 0..4 {
        for j in 0..4 {
            writeln!(text, "v {} {} 0", i, j).unwrap();
        }
    }
    for i in 0..3 {
        for j in 0..3 {
            let a = i * 4 + j + 1;
            writeln!(text, "f {} {} {}", a, a + 1, a + 4).unwrap();
            writeln!(text, "f {} {} {}", a + 1, a + 5, a + 4).unwrap();
        }
    }
    let mut mesh = read(&text);
    simplify(&mut mesh, 0.5, 0.0);
    assert_eq!(mesh.survivor_count(), 8);
}

#[test]
fn huge_epsilon_links_everything_and_terminates() {
    let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 10 10 10
v 11 10 10
v 10 11 10
f 1 2 3
f 4 5 6
";
    let mut mesh = read(text);
    simplify(&mut mesh, 0.2, 1000.0);
    assert_eq!(mesh.survivor_count(), 1);
}

#[test]
fn written_output_reads_back() {
    let mut mesh = read(&bumpy_grid(6));
    simplify(&mut mesh, 0.5, 0.0);
    let text = dump(&mesh);

    let reread = read(&text);
    assert_eq!(reread.vertex_count(), vertex_lines(&text));
    assert_eq!(reread.face_count(), face_lines(&text));
    // the reread mesh is already at its target
    let mut reread = reread;
    simplify(&mut reread, 1.0, 0.0);
    assert_eq!(reread.survivor_count(), reread.vertex_count());
}
