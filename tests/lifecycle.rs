mod common;

use serial_test::serial;
use tessera::*;

fn vertex_arrays(dev: &Device<NullDriver>) -> Vec<NativeObject> {
    dev.driver()
        .created()
        .iter()
        .copied()
        .filter(|o| matches!(o, NativeObject::VertexArray(_)))
        .collect()
}

#[test]
fn vertex_array_deletion_waits_for_the_next_execute() {
    let mut dev = common::device();
    let pb = common::triangle(&mut dev);
    let ctx = dev.current_context().unwrap();

    let mut list = CommandList::new();
    list.bind_primitive_buffer(pb);
    dev.execute(ctx, &[&list]).unwrap();

    let vao = vertex_arrays(&dev)[0];
    dev.destroy(pb).unwrap();
    assert_eq!(dev.context(ctx).unwrap().pending_deletions(), 1);
    assert!(!dev.driver().is_destroyed(vao));

    dev.execute(ctx, &[]).unwrap();
    assert_eq!(dev.context(ctx).unwrap().pending_deletions(), 0);
    assert!(dev.driver().is_destroyed(vao));
}

#[test]
fn reused_slot_gets_a_fresh_vertex_array() {
    let mut dev = common::device();
    let ctx = dev.current_context().unwrap();

    let first = common::triangle(&mut dev);
    let mut list = CommandList::new();
    list.bind_primitive_buffer(first);
    dev.execute(ctx, &[&list]).unwrap();
    dev.destroy(first).unwrap();

    let second = common::triangle(&mut dev);
    assert_eq!(first.slot, second.slot);
    assert_ne!(first, second);

    let mut list = CommandList::new();
    list.bind_primitive_buffer(second);
    dev.execute(ctx, &[&list]).unwrap();

    assert_eq!(vertex_arrays(&dev).len(), 2);
    assert_eq!(
        dev.driver()
            .count(|c| matches!(c, NativeCall::BindVertexArray(_))),
        2
    );
}

#[test]
fn stale_handles_are_rejected() {
    let mut dev = common::device();
    let pb = common::triangle(&mut dev);
    dev.destroy(pb).unwrap();

    assert!(matches!(dev.get(pb), Err(GPUError::StaleHandle(_))));
    let ctx = dev.current_context().unwrap();
    let mut list = CommandList::new();
    list.bind_primitive_buffer(pb);
    assert!(matches!(
        dev.execute(ctx, &[&list]),
        Err(GPUError::StaleHandle(_))
    ));
}

#[test]
fn destroying_a_context_deletes_its_objects() {
    let mut dev = common::device();
    let pb = common::triangle(&mut dev);
    let ctx = dev.current_context().unwrap();

    let mut list = CommandList::new();
    list.bind_primitive_buffer(pb);
    dev.execute(ctx, &[&list]).unwrap();
    let vao = vertex_arrays(&dev)[0];

    dev.destroy_context(ctx).unwrap();
    assert!(dev.driver().is_destroyed(vao));
    assert!(matches!(
        dev.execute(ctx, &[&list]),
        Err(GPUError::StaleHandle(_))
    ));
}

#[test]
fn contexts_are_bound_to_their_thread() {
    let dev = std::sync::Arc::new(std::sync::Mutex::new(common::device()));

    let ctx = {
        let dev = dev.clone();
        std::thread::spawn(move || dev.lock().unwrap().current_context().unwrap())
            .join()
            .unwrap()
    };

    let mut dev = dev.lock().unwrap();
    let err = dev.execute(ctx, &[]).unwrap_err();
    assert!(matches!(err, GPUError::WrongThread));
    assert!(matches!(dev.destroy_context(ctx), Err(GPUError::WrongThread)));
    assert_ne!(dev.current_context().unwrap(), ctx);
}

#[test]
fn over_release_is_an_error() {
    let mut dev = common::device();
    let q = dev.make_query("occlusion", QueryKind::Occlusion).unwrap();
    dev.add_ref(q).unwrap();
    dev.destroy(q).unwrap();
    dev.destroy(q).unwrap();
    assert!(matches!(dev.destroy(q), Err(GPUError::StaleHandle(_))));
}

#[test]
fn descriptors_hold_their_resources() {
    let mut dev = common::device();
    let ssbo = dev
        .make_buffer(&BufferInfo {
            debug_name: "lights",
            byte_size: 1024,
            kind: BufferKind::Storage,
            ..Default::default()
        })
        .unwrap();
    let layout =
        PipelineLayout::new(vec![RegisterLayout::new("lights", 4, 0, ResourceType::Buffer).writable()])
            .unwrap();
    let d = dev
        .make_descriptors("lighting", DescriptorsInfo::new(layout).with(4, Subresource::buffer(ssbo)))
        .unwrap();
    assert_eq!(dev.ref_count(ssbo).unwrap(), 2);

    dev.destroy(ssbo).unwrap();
    assert!(dev.is_alive(ssbo));
    dev.destroy(d).unwrap();
    assert!(!dev.is_alive(ssbo));
}

#[test]
fn queries_nest_at_most_once() {
    let mut dev = common::device();
    let q = dev.make_query("timer", QueryKind::TimeElapsed).unwrap();
    let ctx = dev.current_context().unwrap();

    let mut list = CommandList::new();
    list.begin_query(q);
    list.end_query();
    dev.execute(ctx, &[&list]).unwrap();

    let native = dev.get(q).unwrap().native();
    dev.driver_mut().set_query_result(native, 1200);
    assert_eq!(dev.query_result(q).unwrap(), Some(1200));

    let mut nested = CommandList::new();
    nested.begin_query(q);
    nested.begin_query(q);
    assert!(matches!(
        dev.execute(ctx, &[&nested]),
        Err(GPUError::InvalidInfo(_))
    ));
}

#[test]
#[serial]
fn validation_can_be_disabled_from_the_environment() {
    std::env::set_var(VALIDATION_ENV, "0");
    let mut dev = common::device();
    std::env::remove_var(VALIDATION_ENV);
    assert!(!dev.info().validate_layouts);

    let surface = common::color_surface(&mut dev, [16, 16]);
    let p = common::graphics_pipeline(&mut dev);
    let pb = dev
        .make_primitive_buffer(
            "colors",
            PrimitiveBufferInfo::new(vec![BufferLayout::from_data(
                vec![0; 48],
                BufferAttributes::new(0, &[GPUFormat::RGBA32f], false),
            )]),
        )
        .unwrap();
    let ctx = dev.current_context().unwrap();

    let mut list = CommandList::new();
    list.begin_framebuffer(surface);
    list.bind_pipeline(p);
    list.bind_primitive_buffer(pb);
    list.draw(DrawInstanced::new(3));
    list.end_framebuffer();
    dev.execute(ctx, &[&list]).unwrap();
}

#[test]
fn destroying_an_active_query_ends_it() {
    let mut dev = common::device();
    let q = dev.make_query("occlusion", QueryKind::Occlusion).unwrap();
    let native = dev.get(q).unwrap().native();
    let ctx = dev.current_context().unwrap();

    let mut list = CommandList::new();
    list.begin_query(q);
    dev.execute(ctx, &[&list]).unwrap();
    dev.destroy(q).unwrap();

    let calls = dev.driver().calls();
    assert!(matches!(calls.last(), Some(NativeCall::EndQuery { .. })));
    assert!(dev.driver().is_destroyed(NativeObject::Query(native)));

    // The context no longer considers a query open.
    let other = dev.make_query("timer", QueryKind::TimeElapsed).unwrap();
    let mut list = CommandList::new();
    list.begin_query(other);
    list.end_query();
    dev.execute(ctx, &[&list]).unwrap();
}
