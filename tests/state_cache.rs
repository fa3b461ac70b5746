mod common;

use tessera::*;

fn uniform(dev: &mut Device<NullDriver>, name: &str, size: u64) -> Handle<GPUBuffer> {
    dev.make_buffer(&BufferInfo {
        debug_name: name,
        byte_size: size,
        kind: BufferKind::Uniform,
        usage: MemoryUsage::CPU_WRITE,
        ..Default::default()
    })
    .unwrap()
}

fn camera_layout() -> PipelineLayout {
    PipelineLayout::new(vec![RegisterLayout::new("camera", 0, 2, ResourceType::CBuffer)]).unwrap()
}

fn bind_ranges(dev: &Device<NullDriver>) -> usize {
    dev.driver()
        .count(|c| matches!(c, NativeCall::BindBufferRange { .. }))
}

#[test]
fn same_range_is_bound_once() {
    let mut dev = common::device();
    let ubo = uniform(&mut dev, "camera", 256);
    let descriptors = dev
        .make_descriptors(
            "frame",
            DescriptorsInfo::new(camera_layout()).with(0, Subresource::buffer_range(ubo, 0, 128)),
        )
        .unwrap();
    let ctx = dev.current_context().unwrap();

    let mut list = CommandList::new();
    list.bind_descriptors(descriptors);
    list.bind_descriptors(descriptors);
    dev.execute(ctx, &[&list]).unwrap();
    dev.execute(ctx, &[&list]).unwrap();

    assert_eq!(bind_ranges(&dev), 1);
    let native = dev.get(ubo).unwrap().native();
    assert_eq!(
        dev.context(ctx).unwrap().bound_range(2, BindCategory::UniformBuffer),
        Some(BoundRange {
            handle: native,
            offset: 0,
            size: 128,
        })
    );
}

#[test]
fn different_range_rebinds() {
    let mut dev = common::device();
    let ubo = uniform(&mut dev, "camera", 256);
    let first = dev
        .make_descriptors(
            "first",
            DescriptorsInfo::new(camera_layout()).with(0, Subresource::buffer_range(ubo, 0, 128)),
        )
        .unwrap();
    let second = dev
        .make_descriptors(
            "second",
            DescriptorsInfo::new(camera_layout()).with(0, Subresource::buffer_range(ubo, 128, 128)),
        )
        .unwrap();
    let ctx = dev.current_context().unwrap();

    let mut list = CommandList::new();
    list.bind_descriptors(first);
    list.bind_descriptors(second);
    list.bind_descriptors(second);
    dev.execute(ctx, &[&list]).unwrap();

    assert_eq!(bind_ranges(&dev), 2);
}

#[test]
fn unbound_slots_are_skipped() {
    let mut dev = common::device();
    let ubo = uniform(&mut dev, "camera", 64);
    let layout = PipelineLayout::new(vec![
        RegisterLayout::new("camera", 0, 0, ResourceType::CBuffer),
        RegisterLayout::new("albedo", 1, 0, ResourceType::Texture),
        RegisterLayout::new("lights", 2, 1, ResourceType::Buffer),
    ])
    .unwrap();
    let descriptors = dev
        .make_descriptors(
            "partial",
            DescriptorsInfo::new(layout).with(0, Subresource::buffer(ubo)),
        )
        .unwrap();
    let ctx = dev.current_context().unwrap();

    let mut list = CommandList::new();
    list.bind_descriptors(descriptors);
    dev.execute(ctx, &[&list]).unwrap();

    assert_eq!(
        dev.driver().calls(),
        &[NativeCall::BindBufferRange {
            target: BufferTarget::Uniform,
            index: 0,
            buffer: dev.get(ubo).unwrap().native(),
            offset: 0,
            size: 64,
        }]
    );
}

#[test]
fn sampled_textures_get_a_cached_view() {
    let mut dev = common::device();
    let texture = dev
        .make_texture(&TextureInfo {
            debug_name: "albedo",
            size: [256, 256, 1],
            mips: 4,
            ..Default::default()
        })
        .unwrap();
    let sampler = dev.make_sampler("linear", &SamplerInfo::default()).unwrap();
    let layout =
        PipelineLayout::new(vec![RegisterLayout::new("albedo", 0, 3, ResourceType::Texture)]).unwrap();
    let descriptors = dev
        .make_descriptors(
            "material",
            DescriptorsInfo::new(layout).with(0, Subresource::texture(texture, Some(sampler))),
        )
        .unwrap();
    let ctx = dev.current_context().unwrap();

    let mut list = CommandList::new();
    list.bind_descriptors(descriptors);
    dev.execute(ctx, &[&list]).unwrap();
    dev.execute(ctx, &[&list]).unwrap();

    let views = dev
        .driver()
        .created()
        .iter()
        .filter(|o| matches!(o, NativeObject::TextureView(_)))
        .count();
    assert_eq!(views, 1);
    assert_eq!(
        dev.driver()
            .count(|c| matches!(c, NativeCall::BindTextureUnit { unit: 3, .. })),
        1
    );
    assert_eq!(
        dev.driver()
            .count(|c| matches!(c, NativeCall::BindSampler { unit: 3, .. })),
        1
    );
}

#[test]
fn writable_textures_bind_as_images() {
    let mut dev = common::device();
    let texture = dev
        .make_texture(&TextureInfo {
            debug_name: "lightmap",
            size: [128, 128, 1],
            usage: MemoryUsage::GPU_WRITE,
            ..Default::default()
        })
        .unwrap();
    let layout = PipelineLayout::new(vec![
        RegisterLayout::new("lightmap", 2, 5, ResourceType::Texture).writable(),
    ])
    .unwrap();
    let descriptors = dev
        .make_descriptors(
            "bake",
            DescriptorsInfo::new(layout).with(2, Subresource::texture(texture, None)),
        )
        .unwrap();
    let ctx = dev.current_context().unwrap();

    let mut list = CommandList::new();
    list.bind_descriptors(descriptors);
    list.bind_descriptors(descriptors);
    dev.execute(ctx, &[&list]).unwrap();

    let d = dev.driver();
    assert_eq!(d.count(|c| matches!(c, NativeCall::BindImageTexture { unit: 5, .. })), 1);
    assert_eq!(d.count(|c| matches!(c, NativeCall::BindSampler { .. })), 0);
    assert_eq!(d.count(|c| matches!(c, NativeCall::BindTextureUnit { .. })), 0);
}

#[test]
fn viewport_and_scissor_dedup() {
    let mut dev = common::device();
    let surface = common::color_surface(&mut dev, [320, 240]);
    let ctx = dev.current_context().unwrap();

    let mut list = CommandList::new();
    list.begin_framebuffer(surface);
    list.set_viewport(ViewRegion::full());
    list.set_scissor(ViewRegion::new([100, 100], [10, 10]));
    list.set_scissor(ViewRegion::new([100, 100], [10, 10]));
    list.set_viewport_and_scissor(ViewRegion::full());
    list.end_framebuffer();
    dev.execute(ctx, &[&list]).unwrap();

    let d = dev.driver();
    // The full viewport was already set by BeginFramebuffer.
    assert_eq!(d.count(|c| matches!(c, NativeCall::Viewport { .. })), 1);
    assert_eq!(d.count(|c| matches!(c, NativeCall::Scissor { .. })), 2);
    assert_eq!(
        d.count(|c| matches!(c, NativeCall::Enable(Capability::ScissorTest))),
        1
    );
    assert_eq!(
        d.count(|c| matches!(c, NativeCall::Disable(Capability::ScissorTest))),
        1
    );
}

#[test]
fn full_region_needs_a_framebuffer() {
    let mut dev = common::device();
    let ctx = dev.current_context().unwrap();

    let mut list = CommandList::new();
    list.set_viewport(ViewRegion::full());
    let err = dev.execute(ctx, &[&list]).unwrap_err();
    assert!(matches!(err, GPUError::NothingBound("framebuffer")));
}
