//! End-to-end round trips through encode and decode.

use cutborder::prelude::*;

/// One region, one integer vertex list of the given dimension, one value
/// slot per vertex.
fn int_mesh(faces: Vec<Vec<usize>>, positions: &[Vec<i32>]) -> Mesh {
    let dim = positions[0].len();
    let mut attrs = AttributeStore::new();
    let l = attrs.add_list(AttrList::new(ScalarKind::I32, dim, 0.0));
    let r = attrs.add_region(Region::new(vec![l], vec![], vec![]));
    for p in positions {
        let idx = attrs.list_mut(l).push_value(Value::of_i32(p));
        attrs.push_vtx(r, &[idx]);
    }
    for _ in 0..faces.len() {
        attrs.push_face(r, &[], &[]);
    }
    Mesh::new(faces, attrs).unwrap()
}

fn encode_to_vec(mesh: &mut Mesh) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    encode::encode(mesh, &mut out, &encode::Config::default()).unwrap();
    out
}

fn faces_of(mesh: &Mesh) -> Vec<Vec<usize>> {
    (0..mesh.conn.num_faces())
        .map(|f| {
            (0..mesh.conn.num_edges(f))
                .map(|e| mesh.conn.org(FePair::new(f, e)))
                .collect()
        })
        .collect()
}

/// Decoding then re-encoding must reproduce the stream byte for byte.
fn assert_stream_fixed_point(mesh: &mut Mesh) -> Mesh {
    let stream = encode_to_vec(mesh);
    let mut decoded = decode::decode(&mut stream.clone().into_iter()).unwrap();
    let restream = encode_to_vec(&mut decoded);
    assert_eq!(stream, restream, "re-encoded stream must match");
    decoded
}

#[test]
fn single_triangle_bit_exact() {
    let mut mesh = int_mesh(
        vec![vec![0, 1, 2]],
        &[vec![10], vec![20], vec![30]],
    );
    let stream = encode_to_vec(&mut mesh);
    let decoded = decode::decode(&mut stream.into_iter()).unwrap();

    assert_eq!(faces_of(&decoded), vec![vec![0, 1, 2]]);
    assert_eq!(decoded.attrs.num_vtx(), 3);
    assert_eq!(decoded.attrs.list(0).len(), 3);
    for v in 0..3 {
        assert_eq!(decoded.attrs.vtx2reg(v), 0);
        assert_eq!(decoded.attrs.binding_vtx_attr(v, 0), v);
    }
    assert_eq!(decoded.attrs.list(0).value(0), &Value::of_i32(&[10]));
    assert_eq!(decoded.attrs.list(0).value(1), &Value::of_i32(&[20]));
    assert_eq!(decoded.attrs.list(0).value(2), &Value::of_i32(&[30]));
}

#[test]
fn two_triangles_bit_exact() {
    let faces = vec![vec![0, 1, 2], vec![2, 1, 3]];
    let mut mesh = int_mesh(
        faces.clone(),
        &[vec![10, -3], vec![20, 5], vec![30, 11], vec![45, 0]],
    );
    let stream = encode_to_vec(&mut mesh);
    let decoded = decode::decode(&mut stream.into_iter()).unwrap();

    assert_eq!(faces_of(&decoded), faces);
    for (v, expect) in [[10, -3], [20, 5], [30, 11], [45, 0]].iter().enumerate() {
        let idx = decoded.attrs.binding_vtx_attr(v, 0);
        assert_eq!(decoded.attrs.list(0).value(idx), &Value::of_i32(expect));
    }
}

#[test]
fn tetrahedron_bit_exact_with_all_channels() {
    let faces = vec![
        vec![0, 1, 2],
        vec![0, 2, 3],
        vec![0, 3, 1],
        vec![1, 3, 2],
    ];

    let mut attrs = AttributeStore::new();
    let pos = attrs.add_list(AttrList::new(ScalarKind::I32, 3, 0.0));
    let shade = attrs.add_list(AttrList::new(ScalarKind::I32, 1, 0.0));
    let uv = attrs.add_list(AttrList::new(ScalarKind::I32, 2, 0.0));
    let r = attrs.add_region(Region::new(vec![pos], vec![shade], vec![uv]));

    let positions = [[0, 0, 0], [100, 0, 0], [0, 100, 0], [0, 0, 100]];
    for p in &positions {
        let idx = attrs.list_mut(pos).push_value(Value::of_i32(p));
        attrs.push_vtx(r, &[idx]);
    }
    for f in 0..faces.len() {
        let s = attrs
            .list_mut(shade)
            .push_value(Value::of_i32(&[f as i32 * 7]));
        let corners: Vec<usize> = (0..3)
            .map(|c| {
                attrs
                    .list_mut(uv)
                    .push_value(Value::of_i32(&[f as i32, c as i32]))
            })
            .collect();
        attrs.push_face(r, &[s], &corners);
    }
    let mut mesh = Mesh::new(faces.clone(), attrs).unwrap();

    let stream = encode_to_vec(&mut mesh);
    let decoded = decode::decode(&mut stream.into_iter()).unwrap();

    assert_eq!(faces_of(&decoded), faces);
    for (v, p) in positions.iter().enumerate() {
        let idx = decoded.attrs.binding_vtx_attr(v, 0);
        assert_eq!(decoded.attrs.list(pos).value(idx), &Value::of_i32(p));
    }
    for f in 0..4 {
        let idx = decoded.attrs.binding_face_attr(f, 0);
        assert_eq!(
            decoded.attrs.list(shade).value(idx),
            &Value::of_i32(&[f as i32 * 7])
        );
        for c in 0..3 {
            let idx = decoded.attrs.binding_corner_attr(f, c, 0);
            assert_eq!(
                decoded.attrs.list(uv).value(idx),
                &Value::of_i32(&[f as i32, c as i32])
            );
        }
    }
}

#[test]
fn strip_rebuilds_identically() {
    let faces = vec![
        vec![0, 1, 2],
        vec![2, 1, 3],
        vec![2, 3, 4],
        vec![4, 3, 5],
    ];
    let positions: Vec<Vec<i32>> = (0..6).map(|v| vec![v * 3, v * v, -v]).collect();
    let mut mesh = int_mesh(faces.clone(), &positions);
    let decoded = assert_stream_fixed_point(&mut mesh);
    assert_eq!(faces_of(&decoded), faces);
}

#[test]
fn pinched_components_share_a_vertex() {
    let faces = vec![vec![0, 1, 2], vec![0, 3, 4]];
    let positions: Vec<Vec<i32>> = (0..5).map(|v| vec![v * 10]).collect();
    let mut mesh = int_mesh(faces.clone(), &positions);
    let decoded = assert_stream_fixed_point(&mut mesh);

    assert_eq!(faces_of(&decoded), faces);
    assert_eq!(decoded.attrs.num_vtx(), 5, "the pinch vertex is not duplicated");
    let idx = decoded.attrs.binding_vtx_attr(0, 0);
    assert_eq!(decoded.attrs.list(0).value(idx), &Value::of_i32(&[0]));
}

#[test]
fn octahedron_stream_fixed_point() {
    // closed surface: 6 vertices, 8 faces, every edge interior
    let faces = vec![
        vec![0, 1, 2],
        vec![0, 2, 3],
        vec![0, 3, 4],
        vec![0, 4, 1],
        vec![5, 2, 1],
        vec![5, 3, 2],
        vec![5, 4, 3],
        vec![5, 1, 4],
    ];
    let positions: Vec<Vec<i32>> = vec![
        vec![0, 0, 10],
        vec![10, 0, 0],
        vec![0, 10, 0],
        vec![-10, 0, 0],
        vec![0, -10, 0],
        vec![0, 0, -10],
    ];
    let mut mesh = int_mesh(faces, &positions);
    let decoded = assert_stream_fixed_point(&mut mesh);
    assert_eq!(decoded.conn.num_faces(), 8);
    assert_eq!(decoded.attrs.num_vtx(), 6);
}

#[test]
fn torus_stream_fixed_point() {
    // genus one: the traversal has to split and re-unite its border
    let n = 4usize;
    let m = 3usize;
    let idx = |i: usize, j: usize| (j % m) * n + (i % n);
    let mut faces = Vec::new();
    for j in 0..m {
        for i in 0..n {
            let a = idx(i, j);
            let b = idx(i + 1, j);
            let c = idx(i + 1, j + 1);
            let d = idx(i, j + 1);
            faces.push(vec![a, b, c]);
            faces.push(vec![a, c, d]);
        }
    }
    let positions: Vec<Vec<i32>> = (0..(n * m) as i32).map(|v| vec![v, v * 2, 7 - v]).collect();

    let mut mesh = int_mesh(faces, &positions);
    let decoded = assert_stream_fixed_point(&mut mesh);
    assert_eq!(decoded.conn.num_faces(), 2 * n * m);
    assert_eq!(decoded.attrs.num_vtx(), n * m);

    // lossless integers: the decoded value multiset matches the input
    let mut original: Vec<Vec<i32>> = positions;
    let mut roundtripped: Vec<Vec<i32>> = (0..decoded.attrs.num_vtx())
        .map(|v| {
            let idx = decoded.attrs.binding_vtx_attr(v, 0);
            let val = decoded.attrs.list(0).value(idx);
            (0..val.dim())
                .map(|c| match val.comp(c) {
                    Scalar::I32(x) => x,
                    _ => unreachable!(),
                })
                .collect()
        })
        .collect();
    original.sort();
    roundtripped.sort();
    assert_eq!(original, roundtripped);
}

#[test]
fn quantized_floats_stay_within_half_a_step() {
    let q = 0.25f64;
    let faces = vec![
        vec![0, 1, 2],
        vec![2, 1, 3],
        vec![2, 3, 4],
        vec![4, 3, 5],
    ];
    let values = [0.1f32, 0.9, 2.3, 3.14, -1.7, 0.5];

    let mut attrs = AttributeStore::new();
    let l = attrs.add_list(AttrList::new(ScalarKind::F32, 1, q));
    let r = attrs.add_region(Region::new(vec![l], vec![], vec![]));
    for &v in &values {
        let idx = attrs.list_mut(l).push_value(Value::of_f32(&[v]));
        attrs.push_vtx(r, &[idx]);
    }
    for _ in 0..faces.len() {
        attrs.push_face(r, &[], &[]);
    }
    let mut mesh = Mesh::new(faces, attrs).unwrap();

    let stream = encode_to_vec(&mut mesh);
    let decoded = decode::decode(&mut stream.clone().into_iter()).unwrap();

    // this strip emits its vertices in index order
    for (v, &orig) in values.iter().enumerate() {
        let idx = decoded.attrs.binding_vtx_attr(v, 0);
        let got = match decoded.attrs.list(l).value(idx).comp(0) {
            Scalar::F32(x) => x,
            _ => unreachable!(),
        };
        assert!(
            (got as f64 - orig as f64).abs() <= q / 2.0 + 1e-5,
            "vertex {v}: {got} vs {orig}"
        );
    }

    // and the decoded mesh re-encodes to the same stream
    let mut decoded = decoded;
    assert_eq!(encode_to_vec(&mut decoded), stream);
}

#[test]
fn shared_value_slots_survive_the_roundtrip() {
    let mut attrs = AttributeStore::new();
    let l = attrs.add_list(AttrList::new(ScalarKind::I32, 1, 0.0));
    let r = attrs.add_region(Region::new(vec![l], vec![], vec![]));
    let a = attrs.list_mut(l).push_value(Value::of_i32(&[10]));
    let b = attrs.list_mut(l).push_value(Value::of_i32(&[30]));
    // two vertices bind the same slot
    attrs.push_vtx(r, &[a]);
    attrs.push_vtx(r, &[a]);
    attrs.push_vtx(r, &[b]);
    attrs.push_face(r, &[], &[]);
    let mut mesh = Mesh::new(vec![vec![0, 1, 2]], attrs).unwrap();

    let stream = encode_to_vec(&mut mesh);
    let decoded = decode::decode(&mut stream.into_iter()).unwrap();

    assert_eq!(decoded.attrs.list(l).len(), 2, "only two values travel");
    assert_eq!(
        decoded.attrs.binding_vtx_attr(0, 0),
        decoded.attrs.binding_vtx_attr(1, 0),
        "the shared slot stays shared"
    );
    assert_eq!(decoded.attrs.list(l).value(0), &Value::of_i32(&[10]));
    assert_eq!(decoded.attrs.list(l).value(1), &Value::of_i32(&[30]));
}

#[test]
fn progress_is_reported_per_vertex() {
    struct Counting {
        started: Option<usize>,
        ticks: usize,
        ended: bool,
    }
    impl Progress for Counting {
        fn start(&mut self, total: usize) {
            self.started = Some(total);
        }
        fn tick(&mut self, _i: usize) {
            self.ticks += 1;
        }
        fn end(&mut self) {
            self.ended = true;
        }
    }

    let mut mesh = int_mesh(vec![vec![0, 1, 2]], &[vec![1], vec![2], vec![3]]);
    let mut out: Vec<u8> = Vec::new();
    let mut prog = Counting {
        started: None,
        ticks: 0,
        ended: false,
    };
    encode::encode_with_progress(&mut mesh, &mut out, &encode::Config::default(), &mut prog)
        .unwrap();
    assert_eq!(prog.started, Some(3));
    assert_eq!(prog.ticks, 3);
    assert!(prog.ended);
}

#[test]
fn garbage_input_is_rejected() {
    let mut rd = vec![1u8, 2, 3, 4, 5, 6].into_iter();
    assert!(decode::decode(&mut rd).is_err());

    // valid magic but truncated right after
    let mut rd = b"CBM1".to_vec().into_iter();
    assert!(decode::decode(&mut rd).is_err());
}

#[test]
fn truncated_stream_is_rejected() {
    let mut mesh = int_mesh(
        vec![vec![0, 1, 2], vec![2, 1, 3]],
        &[vec![1], vec![2], vec![3], vec![4]],
    );
    let stream = encode_to_vec(&mut mesh);
    for cut in 1..stream.len() {
        let mut rd = stream[..cut].to_vec().into_iter();
        assert!(decode::decode(&mut rd).is_err(), "cut at {cut} must fail");
    }
}
