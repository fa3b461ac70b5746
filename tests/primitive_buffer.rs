mod common;

use common::{position_layout, triangle_bytes, uv_bytes};
use tessera::*;

#[test]
fn element_count_comes_from_the_streams() {
    let mut dev = common::device();
    let indices: Vec<u8> = bytemuck::cast_slice(&[0u16, 1, 2, 2, 1, 0]).to_vec();
    let pb = dev
        .make_primitive_buffer(
            "quad",
            PrimitiveBufferInfo::new(vec![
                BufferLayout::from_data(triangle_bytes(), position_layout()),
                BufferLayout::from_data(uv_bytes(), BufferAttributes::new(1, &[GPUFormat::RG32f], false)),
            ])
            .with_indices(BufferLayout::from_data(
                indices,
                BufferAttributes::new(0, &[GPUFormat::R16u], false),
            )),
        )
        .unwrap();

    let pb = dev.get(pb).unwrap();
    assert_eq!(pb.elements(), 3);
    assert_eq!(pb.indices(), 6);
    assert_eq!(pb.index_format(), Some(GPUFormat::R16u));
    assert_eq!(dev.live_objects(ObjectKind::Buffer), 3);
}

#[test]
fn streams_must_agree_on_element_count() {
    let mut dev = common::device();
    let short_uvs = uv_bytes()[..16].to_vec();
    let err = dev
        .make_primitive_buffer(
            "broken",
            PrimitiveBufferInfo::new(vec![
                BufferLayout::from_data(triangle_bytes(), position_layout()),
                BufferLayout::from_data(short_uvs, BufferAttributes::new(1, &[GPUFormat::RG32f], false)),
            ]),
        )
        .unwrap_err();
    assert!(matches!(err, GPUError::InvalidInfo(_)));
    assert_eq!(dev.live_objects(ObjectKind::Buffer), 0);
}

#[test]
fn index_layout_needs_an_integer_format() {
    let mut dev = common::device();
    let err = dev
        .make_primitive_buffer(
            "bad indices",
            PrimitiveBufferInfo::new(vec![BufferLayout::from_data(triangle_bytes(), position_layout())])
                .with_indices(BufferLayout::from_data(
                    vec![0; 12],
                    BufferAttributes::new(0, &[GPUFormat::R32f], false),
                )),
        )
        .unwrap_err();
    assert!(err.is_contract_violation());
}

#[test]
fn shared_buffer_is_refcounted() {
    let mut dev = common::device();
    let vertices = dev
        .make_buffer(&BufferInfo {
            debug_name: "shared vertices",
            byte_size: 36 * 8,
            kind: BufferKind::Vertex,
            ..Default::default()
        })
        .unwrap();

    let info = || {
        PrimitiveBufferInfo::new(vec![BufferLayout::from_buffer(
            vertices,
            position_layout(),
            0,
        )])
    };
    let a = dev.make_primitive_buffer("a", info()).unwrap();
    let b = dev.make_primitive_buffer("b", info()).unwrap();
    assert_eq!(dev.ref_count(vertices).unwrap(), 3);
    assert_eq!(dev.get(a).unwrap().elements(), 24);

    dev.destroy(a).unwrap();
    assert_eq!(dev.ref_count(vertices).unwrap(), 2);
    dev.destroy(vertices).unwrap();
    assert_eq!(dev.ref_count(vertices).unwrap(), 1);

    let native = dev.get(vertices).unwrap().native();
    dev.destroy(b).unwrap();
    assert!(!dev.is_alive(vertices));
    assert!(dev.driver().is_destroyed(NativeObject::Buffer(native)));
}

#[test]
fn adopted_buffer_must_be_a_vertex_buffer() {
    let mut dev = common::device();
    let ubo = dev
        .make_buffer(&BufferInfo {
            debug_name: "ubo",
            byte_size: 64,
            kind: BufferKind::Uniform,
            ..Default::default()
        })
        .unwrap();

    let err = dev
        .make_primitive_buffer(
            "wrong",
            PrimitiveBufferInfo::new(vec![BufferLayout::from_buffer(ubo, position_layout(), 0)]),
        )
        .unwrap_err();
    assert!(matches!(err, GPUError::InvalidInfo(_)));
    assert_eq!(dev.ref_count(ubo).unwrap(), 1);
}

#[test]
fn layout_match_compares_formats() {
    let mut dev = common::device();
    let pb = common::triangle(&mut dev);
    let pb = dev.get(pb).unwrap();
    assert!(pb.match_layout(&[position_layout()]));
    assert!(!pb.match_layout(&[BufferAttributes::new(0, &[GPUFormat::RGBA32f], false)]));
    assert!(!pb.match_layout(&[]));
}

#[test]
fn failed_stream_releases_earlier_streams() {
    let mut dev = common::device();
    let vertices = dev
        .make_buffer(&BufferInfo {
            debug_name: "shared vertices",
            byte_size: 36,
            kind: BufferKind::Vertex,
            ..Default::default()
        })
        .unwrap();

    // Exhaust the buffer arena so the second stream cannot allocate.
    loop {
        let filler = dev.make_buffer(&BufferInfo {
            debug_name: "filler",
            byte_size: 4,
            ..Default::default()
        });
        if let Err(err) = filler {
            assert!(matches!(err, GPUError::SlotError));
            break;
        }
    }
    let natives = dev.driver().created().len();

    let err = dev
        .make_primitive_buffer(
            "mesh",
            PrimitiveBufferInfo::new(vec![
                BufferLayout::from_buffer(vertices, position_layout(), 0),
                BufferLayout::from_data(uv_bytes(), BufferAttributes::new(1, &[GPUFormat::RG32f], false)),
            ]),
        )
        .unwrap_err();
    assert!(matches!(err, GPUError::SlotError));
    assert_eq!(dev.ref_count(vertices).unwrap(), 1);
    assert_eq!(dev.live_objects(ObjectKind::PrimitiveBuffer), 0);
    let orphans = dev.driver().created()[natives..].to_vec();
    assert!(orphans.iter().all(|o| dev.driver().is_destroyed(*o)));
}
