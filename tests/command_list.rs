mod common;

use tessera::*;

#[test]
fn records_replay_in_order() {
    let p = Handle::<Pipeline>::new(1, 1);
    let pb = Handle::<PrimitiveBuffer>::new(2, 5);

    let mut list = CommandList::new();
    list.bind_pipeline(p);
    list.bind_primitive_buffer(pb);
    list.draw(DrawInstanced::indexed(36, 4).with_instances(2, 1));
    list.debug_start_region("shadow").unwrap();
    list.debug_end_region();

    let ops: Vec<_> = list.iter().filter_map(|c| c.op()).collect();
    assert_eq!(
        ops,
        [
            Op::BindPipeline,
            Op::BindPrimitiveBuffer,
            Op::DrawInstanced,
            Op::DebugStartRegion,
            Op::DebugEndRegion,
        ]
    );

    let draw = list.iter().nth(2).unwrap().payload::<DrawInstanced>().unwrap();
    assert!(draw.is_indexed());
    assert_eq!(draw.count, 36);
    assert_eq!(draw.vertex_start, 4);
    assert_eq!(draw.instance_count, 2);
    assert_eq!(draw.instance_start, 1);
}

#[test]
fn non_indexed_draw_defaults() {
    let draw = DrawInstanced::new(3);
    assert!(!draw.is_indexed());
    assert_eq!(draw.instance_count, 1);
    assert_eq!(draw.vertex_start, 0);
}

#[test]
fn lists_built_on_another_thread_execute_here() {
    let mut dev = common::device();
    let surface = common::color_surface(&mut dev, [64, 64]);

    let list = std::thread::spawn(move || {
        let mut list = CommandList::new();
        list.begin_framebuffer(surface);
        list.end_framebuffer();
        list
    })
    .join()
    .unwrap();

    let ctx = dev.current_context().unwrap();
    dev.execute(ctx, &[&list]).unwrap();
    assert_eq!(dev.context(ctx).unwrap().render_pass(), RenderPass::Idle);
}

#[test]
fn truncated_stream_is_rejected() {
    let mut list = CommandList::new();
    list.set_clear_depth(0.5);
    let mut bytes = list.as_bytes().to_vec();
    bytes.pop();
    assert!(matches!(
        CommandList::from_bytes(bytes),
        Err(GPUError::MalformedCommand { offset: 0 })
    ));
}

#[test]
fn long_debug_labels_are_rejected() {
    let mut list = CommandList::new();
    let label = "x".repeat(DEBUG_LABEL_CAPACITY + 1);
    let err = list.debug_insert_marker(&label).unwrap_err();
    assert!(matches!(err, GPUError::LabelTooLong { .. }));
    assert!(err.is_contract_violation());
    assert!(list.is_empty());
}

#[test]
fn unknown_records_are_skipped_on_execute() {
    let mut dev = common::device();
    let ctx = dev.current_context().unwrap();

    let mut list = CommandList::new();
    list.record_raw(0x00ff_0001, &[0; 8]);
    list.set_blend_constants([1.0, 0.0, 0.0, 1.0]);
    dev.execute(ctx, &[&list]).unwrap();

    assert_eq!(
        dev.driver().calls(),
        &[NativeCall::BlendColor([1.0, 0.0, 0.0, 1.0])]
    );
}
