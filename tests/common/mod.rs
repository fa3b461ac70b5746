#![allow(dead_code)]

use glam::{Vec2, Vec3};
use tessera::*;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn device() -> Device<NullDriver> {
    init_logging();
    Device::new(DeviceInfo::default(), NullDriver::new())
}

pub fn device_with(driver: NullDriver) -> Device<NullDriver> {
    init_logging();
    Device::new(DeviceInfo::default(), driver)
}

pub fn position_layout() -> BufferAttributes {
    BufferAttributes::new(0, &[GPUFormat::RGB32f], false)
}

pub fn triangle_bytes() -> Vec<u8> {
    let positions = [
        Vec3::new(-0.5, -0.5, 0.0),
        Vec3::new(0.5, -0.5, 0.0),
        Vec3::new(0.0, 0.5, 0.0),
    ];
    bytemuck::cast_slice(&positions).to_vec()
}

pub fn uv_bytes() -> Vec<u8> {
    let uvs = [Vec2::ZERO, Vec2::X, Vec2::Y];
    bytemuck::cast_slice(&uvs).to_vec()
}

pub fn triangle(dev: &mut Device<NullDriver>) -> Handle<PrimitiveBuffer> {
    dev.make_primitive_buffer(
        "triangle",
        PrimitiveBufferInfo::new(vec![BufferLayout::from_data(
            triangle_bytes(),
            position_layout(),
        )]),
    )
    .unwrap()
}

pub fn graphics_info(layout: PipelineLayout) -> PipelineInfo {
    PipelineInfo::graphics(
        PipelineFlags::empty(),
        vec![vec![0; 16], vec![1; 16]],
        vec![
            ShaderEntry::main(ShaderStage::Vertex, 0),
            ShaderEntry::main(ShaderStage::Fragment, 1),
        ],
        layout,
        vec![position_layout()],
    )
    .unwrap()
}

pub fn graphics_pipeline(dev: &mut Device<NullDriver>) -> Handle<Pipeline> {
    dev.make_pipeline("opaque", graphics_info(PipelineLayout::default()))
        .unwrap()
}

pub fn color_surface(dev: &mut Device<NullDriver>, size: [u32; 2]) -> Handle<Surface> {
    dev.make_surface(
        "color",
        SurfaceInfo::fixed(size, &[GPUFormat::RGBA8], DepthFormat::D24S8),
    )
    .unwrap()
}
