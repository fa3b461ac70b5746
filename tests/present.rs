mod common;

use tessera::*;

#[test]
fn intermediate_must_match_the_backbuffer() {
    let mut dev = common::device();
    let small = common::color_surface(&mut dev, [640, 360]);
    let ctx = dev.current_context().unwrap();

    let err = dev.present(ctx, Some(small), &[]).unwrap_err();
    assert!(matches!(
        err,
        GPUError::SizeMismatch {
            intermediate: [640, 360],
            target: [1280, 720],
        }
    ));
    assert_eq!(dev.driver().presents(), 0);
}

#[test]
fn present_flips_into_the_backbuffer() {
    let mut dev = common::device();
    let scene = common::color_surface(&mut dev, [1280, 720]);
    let src = dev.get(scene).unwrap().framebuffer().unwrap();
    let ctx = dev.current_context().unwrap();

    let mut ui = CommandList::new();
    ui.debug_insert_marker("ui").unwrap();
    dev.present(ctx, Some(scene), &[&ui]).unwrap();

    let calls = dev.driver().calls();
    assert_eq!(
        calls.first(),
        Some(&NativeCall::BindFramebuffer {
            target: FramebufferTarget::Draw,
            framebuffer: 0,
        })
    );
    assert!(calls.contains(&NativeCall::InsertDebugMarker("ui".to_string())));
    assert!(calls.contains(&NativeCall::BindFramebuffer {
        target: FramebufferTarget::Read,
        framebuffer: src,
    }));
    assert_eq!(
        calls.last(),
        Some(&NativeCall::BlitFramebuffer {
            src: [0, 0, 1280, 720],
            dst: [0, 720, 1280, 0],
            mask: BlitMask::COLOR,
            filter: 0x2601,
        })
    );
    assert_eq!(dev.driver().presents(), 1);
    assert_eq!(dev.context(ctx).unwrap().frame_id(), 1);
}

#[test]
fn present_without_intermediate_still_advances() {
    let mut dev = common::device();
    let ctx = dev.current_context().unwrap();
    dev.present(ctx, None, &[]).unwrap();
    dev.present(ctx, None, &[]).unwrap();

    assert_eq!(dev.context(ctx).unwrap().frame_id(), 2);
    assert_eq!(dev.driver().presents(), 2);
    assert_eq!(
        dev.driver()
            .count(|c| matches!(c, NativeCall::BlitFramebuffer { .. })),
        0
    );
    // The backbuffer binding is cached across frames.
    assert_eq!(
        dev.driver()
            .count(|c| matches!(c, NativeCall::BindFramebuffer { .. })),
        1
    );
}

#[test]
fn present_rejects_an_open_render_pass() {
    let mut dev = common::device();
    let scene = common::color_surface(&mut dev, [1280, 720]);
    let ctx = dev.current_context().unwrap();

    let mut open = CommandList::new();
    open.begin_framebuffer(scene);
    dev.execute(ctx, &[&open]).unwrap();

    assert!(matches!(
        dev.present(ctx, Some(scene), &[]),
        Err(GPUError::RenderPassActive)
    ));
}

#[test]
fn present_rejects_a_pass_left_open_by_its_lists() {
    let mut dev = common::device();
    let scene = common::color_surface(&mut dev, [1280, 720]);
    let ctx = dev.current_context().unwrap();

    let mut open = CommandList::new();
    open.begin_framebuffer(scene);
    assert!(matches!(
        dev.present(ctx, Some(scene), &[&open]),
        Err(GPUError::RenderPassActive)
    ));
    assert_eq!(dev.driver().presents(), 0);
    assert_eq!(
        dev.driver()
            .count(|c| matches!(c, NativeCall::BlitFramebuffer { .. })),
        0
    );
    assert_eq!(dev.context(ctx).unwrap().frame_id(), 0);
}

#[test]
fn blit_area_outside_the_surface_is_rejected() {
    let mut dev = common::device();
    let scene = common::color_surface(&mut dev, [256, 256]);
    let ctx = dev.current_context().unwrap();

    let mut list = CommandList::new();
    list.blit(
        BlitFramebuffer::new(
            scene,
            Handle::default(),
            [u32::MAX, 0, 2, 2],
            [0; 4],
            BlitMask::COLOR,
            Filter::Nearest,
        )
        .unwrap(),
    );
    assert!(matches!(
        dev.execute(ctx, &[&list]),
        Err(GPUError::InvalidInfo(_))
    ));
}

#[test]
fn blit_to_backbuffer_uses_an_invalid_destination() {
    let mut dev = common::device();
    let scene = common::color_surface(&mut dev, [256, 256]);
    let ctx = dev.current_context().unwrap();

    let mut list = CommandList::new();
    list.blit(
        BlitFramebuffer::new(
            scene,
            Handle::default(),
            [0; 4],
            [0, 0, 128, 128],
            BlitMask::COLOR,
            Filter::Nearest,
        )
        .unwrap(),
    );
    dev.execute(ctx, &[&list]).unwrap();

    assert_eq!(
        dev.driver().calls().last(),
        Some(&NativeCall::BlitFramebuffer {
            src: [0, 0, 256, 256],
            dst: [0, 0, 128, 128],
            mask: BlitMask::COLOR,
            filter: 0x2600,
        })
    );
}

#[test]
fn depth_blits_need_nearest() {
    let err = BlitFramebuffer::new(
        Handle::new(0, 1),
        Handle::default(),
        [0; 4],
        [0; 4],
        BlitMask::DEPTH,
        Filter::Linear,
    )
    .unwrap_err();
    assert!(err.is_contract_violation());
}

#[test]
fn clear_touches_only_present_planes() {
    let mut dev = common::device();
    let color_only = dev
        .make_surface("ui", SurfaceInfo::fixed([64, 64], &[GPUFormat::RGBA8], DepthFormat::None))
        .unwrap();
    let ctx = dev.current_context().unwrap();

    let mut list = CommandList::new();
    list.set_clear_color(ClearColor::Float([0.1, 0.2, 0.3, 1.0]));
    list.clear(color_only, ClearFlags::ALL);
    list.clear(color_only, ClearFlags::DEPTH);
    dev.execute(ctx, &[&list]).unwrap();

    let d = dev.driver();
    assert_eq!(d.count(|c| matches!(c, NativeCall::Clear(f) if *f == ClearFlags::COLOR)), 1);
    assert_eq!(d.count(|c| matches!(c, NativeCall::ClearColor(_))), 1);
    assert_eq!(d.count(|c| matches!(c, NativeCall::ClearDepth(_))), 0);
}
