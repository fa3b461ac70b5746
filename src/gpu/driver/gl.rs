//! OpenGL 4.6 constants for every [`Abstract`] value.
//!
//! Values with no core GL equivalent map to `None`: 64-bit integer formats,
//! task/mesh stages and every raytracing stage.

use super::types::{Abstract, NativeEnum};
use crate::gpu::structs::*;

pub fn translate(value: Abstract) -> Option<NativeEnum> {
    match value {
        Abstract::Format(f) => format(f),
        Abstract::AttributeType(f) => attribute_type(f),
        Abstract::DepthFormat(f) => depth_format(f),
        Abstract::BufferKind(k) => Some(match k {
            BufferKind::Vertex => 0x8892,
            BufferKind::Index => 0x8893,
            BufferKind::Uniform => 0x8A11,
            BufferKind::Storage => 0x90D2,
            BufferKind::Indirect => 0x8F3F,
        }),
        Abstract::TextureType(t) => Some(match t {
            TextureType::Tex1D => 0x0DE0,
            TextureType::Tex2D => 0x0DE1,
            TextureType::Tex3D => 0x806F,
            TextureType::Cube => 0x8513,
            TextureType::Tex1DArray => 0x8C18,
            TextureType::Tex2DArray => 0x8C1A,
            TextureType::CubeArray => 0x9009,
            TextureType::Tex2DMS => 0x9100,
            TextureType::Tex2DMSArray => 0x9102,
        }),
        Abstract::ShaderStage(s) => match s {
            ShaderStage::Vertex => Some(0x8B31),
            ShaderStage::TessCtrl => Some(0x8E88),
            ShaderStage::TessEval => Some(0x8E87),
            ShaderStage::Geometry => Some(0x8DD9),
            ShaderStage::Fragment => Some(0x8B30),
            ShaderStage::Compute => Some(0x91B9),
            ShaderStage::Task
            | ShaderStage::Mesh
            | ShaderStage::RayGen
            | ShaderStage::AnyHit
            | ShaderStage::ClosestHit
            | ShaderStage::Miss
            | ShaderStage::Intersection
            | ShaderStage::Callable => None,
        },
        Abstract::Topology(t) => Some(match t {
            TopologyMode::PointList => 0x0000,
            TopologyMode::LineList => 0x0001,
            TopologyMode::LineStrip => 0x0003,
            TopologyMode::TriangleList => 0x0004,
            TopologyMode::TriangleStrip => 0x0005,
            TopologyMode::LineListAdj => 0x000A,
            TopologyMode::LineStripAdj => 0x000B,
            TopologyMode::TriangleListAdj => 0x000C,
            TopologyMode::TriangleStripAdj => 0x000D,
        }),
        Abstract::Cull(c) => Some(match c {
            CullMode::None => 0,
            CullMode::Front => 0x0404,
            CullMode::Back => 0x0405,
            CullMode::All => 0x0408,
        }),
        Abstract::Fill(f) => Some(match f {
            FillMode::Point => 0x1B00,
            FillMode::Line => 0x1B01,
            FillMode::Fill => 0x1B02,
        }),
        Abstract::Winding(w) => Some(match w {
            WindingOrder::CW => 0x0900,
            WindingOrder::CCW => 0x0901,
        }),
        Abstract::Compare(c) => Some(match c {
            CompareOp::Never => 0x0200,
            CompareOp::Less => 0x0201,
            CompareOp::Equal => 0x0202,
            CompareOp::LessEqual => 0x0203,
            CompareOp::Greater => 0x0204,
            CompareOp::NotEqual => 0x0205,
            CompareOp::GreaterEqual => 0x0206,
            CompareOp::Always => 0x0207,
        }),
        Abstract::StencilOp(s) => Some(match s {
            StencilOp::Zero => 0,
            StencilOp::Keep => 0x1E00,
            StencilOp::Replace => 0x1E01,
            StencilOp::IncrClamp => 0x1E02,
            StencilOp::DecrClamp => 0x1E03,
            StencilOp::Invert => 0x150A,
            StencilOp::IncrWrap => 0x8507,
            StencilOp::DecrWrap => 0x8508,
        }),
        Abstract::BlendFactor(b) => Some(match b {
            BlendFactor::Zero => 0,
            BlendFactor::One => 1,
            BlendFactor::SrcColor => 0x0300,
            BlendFactor::InvSrcColor => 0x0301,
            BlendFactor::SrcAlpha => 0x0302,
            BlendFactor::InvSrcAlpha => 0x0303,
            BlendFactor::DstAlpha => 0x0304,
            BlendFactor::InvDstAlpha => 0x0305,
            BlendFactor::DstColor => 0x0306,
            BlendFactor::InvDstColor => 0x0307,
            BlendFactor::SrcAlphaSaturate => 0x0308,
            BlendFactor::ConstantColor => 0x8001,
            BlendFactor::InvConstantColor => 0x8002,
            BlendFactor::ConstantAlpha => 0x8003,
            BlendFactor::InvConstantAlpha => 0x8004,
            BlendFactor::Src1Alpha => 0x8589,
            BlendFactor::Src1Color => 0x88F9,
            BlendFactor::InvSrc1Color => 0x88FA,
            BlendFactor::InvSrc1Alpha => 0x88FB,
        }),
        Abstract::BlendOp(b) => Some(match b {
            BlendOp::Add => 0x8006,
            BlendOp::Min => 0x8007,
            BlendOp::Max => 0x8008,
            BlendOp::Subtract => 0x800A,
            BlendOp::ReverseSubtract => 0x800B,
        }),
        Abstract::LogicOp(l) => Some(match l {
            LogicOp::Clear => 0x1500,
            LogicOp::And => 0x1501,
            LogicOp::AndReverse => 0x1502,
            LogicOp::Copy => 0x1503,
            LogicOp::AndInverted => 0x1504,
            LogicOp::NoOp => 0x1505,
            LogicOp::Xor => 0x1506,
            LogicOp::Or => 0x1507,
            LogicOp::Nor => 0x1508,
            LogicOp::Equivalent => 0x1509,
            LogicOp::Invert => 0x150A,
            LogicOp::OrReverse => 0x150B,
            LogicOp::CopyInverted => 0x150C,
            LogicOp::OrInverted => 0x150D,
            LogicOp::Nand => 0x150E,
            LogicOp::Set => 0x150F,
        }),
        Abstract::SamplerFilter(f) => Some(match f {
            SamplerFilter::Nearest => 0x2600,
            SamplerFilter::Linear => 0x2601,
        }),
        Abstract::Filter(f) => Some(match f {
            Filter::Nearest => 0x2600,
            Filter::Linear => 0x2601,
        }),
        Abstract::AddressMode(a) => Some(match a {
            AddressMode::Repeat => 0x2901,
            AddressMode::MirroredRepeat => 0x8370,
            AddressMode::ClampEdge => 0x812F,
            AddressMode::ClampBorder => 0x812D,
            AddressMode::MirrorClampEdge => 0x8743,
        }),
        Abstract::Query(q) => Some(match q {
            QueryKind::Occlusion => 0x8914,
            QueryKind::PrimitivesGenerated => 0x8C87,
            QueryKind::TimeElapsed => 0x88BF,
        }),
    }
}

fn format(f: GPUFormat) -> Option<NativeEnum> {
    use GPUFormat::*;
    Some(match f {
        R8 => 0x8229,
        RG8 => 0x822B,
        RGB8 => 0x8051,
        RGBA8 | BGRA8 => 0x8058,
        R8s => 0x8F94,
        RG8s => 0x8F95,
        RGB8s => 0x8F96,
        RGBA8s => 0x8F97,
        R8u => 0x8232,
        RG8u => 0x8238,
        RGB8u => 0x8D7D,
        RGBA8u => 0x8D7C,
        R8i => 0x8231,
        RG8i => 0x8237,
        RGB8i => 0x8D8F,
        RGBA8i => 0x8D8E,
        SRGBA8 => 0x8C43,
        R16 => 0x822A,
        RG16 => 0x822C,
        RGBA16 => 0x805B,
        R16u => 0x8234,
        RG16u => 0x823A,
        RGBA16u => 0x8D76,
        R16i => 0x8233,
        RG16i => 0x8239,
        RGBA16i => 0x8D88,
        R16f => 0x822D,
        RG16f => 0x822F,
        RGBA16f => 0x881A,
        R32u => 0x8236,
        RG32u => 0x823C,
        RGB32u => 0x8D71,
        RGBA32u => 0x8D70,
        R32i => 0x8235,
        RG32i => 0x823B,
        RGB32i => 0x8D83,
        RGBA32i => 0x8D82,
        R32f => 0x822E,
        RG32f => 0x8230,
        RGB32f => 0x8815,
        RGBA32f => 0x8814,
        RGB10A2 => 0x8059,
        R64u | R64i | R64f => return None,
    })
}

fn attribute_type(f: GPUFormat) -> Option<NativeEnum> {
    use GPUFormat::*;
    match f {
        RGB10A2 => return Some(0x8368),
        R64f => return Some(0x140A),
        R64u | R64i => return None,
        _ => {}
    }

    Some(match (f.component_type(), f.component_size()) {
        (ComponentType::Snorm | ComponentType::Sint, 1) => 0x1400,
        (_, 1) => 0x1401,
        (ComponentType::Snorm | ComponentType::Sint, 2) => 0x1402,
        (ComponentType::Float, 2) => 0x140B,
        (_, 2) => 0x1403,
        (ComponentType::Sint, 4) => 0x1404,
        (ComponentType::Float, 4) => 0x1406,
        _ => 0x1405,
    })
}

fn depth_format(f: DepthFormat) -> Option<NativeEnum> {
    Some(match f {
        DepthFormat::None => return None,
        DepthFormat::D16 => 0x81A5,
        DepthFormat::D24 => 0x81A6,
        DepthFormat::D32 => 0x81A7,
        DepthFormat::D32F => 0x8CAC,
        DepthFormat::D24S8 => 0x88F0,
        DepthFormat::D32FS8 => 0x8CAD,
    })
}
