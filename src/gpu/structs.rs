use bitflags::bitflags;

#[cfg(feature = "tessera-serde")]
use serde::{Deserialize, Serialize};

//===----------------------------------------------------------------------===//
// Formats
//===----------------------------------------------------------------------===//

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum ComponentType {
    Unorm,
    Snorm,
    Uint,
    Sint,
    Float,
    Srgb,
}

/// Color and vertex attribute formats.
#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum GPUFormat {
    R8,
    RG8,
    RGB8,
    #[default]
    RGBA8,
    R8s,
    RG8s,
    RGB8s,
    RGBA8s,
    R8u,
    RG8u,
    RGB8u,
    RGBA8u,
    R8i,
    RG8i,
    RGB8i,
    RGBA8i,
    SRGBA8,
    BGRA8,
    R16,
    RG16,
    RGBA16,
    R16u,
    RG16u,
    RGBA16u,
    R16i,
    RG16i,
    RGBA16i,
    R16f,
    RG16f,
    RGBA16f,
    R32u,
    RG32u,
    RGB32u,
    RGBA32u,
    R32i,
    RG32i,
    RGB32i,
    RGBA32i,
    R32f,
    RG32f,
    RGB32f,
    RGBA32f,
    RGB10A2,
    R64u,
    R64i,
    R64f,
}

impl GPUFormat {
    pub fn channels(&self) -> u32 {
        use GPUFormat::*;
        match self {
            R8 | R8s | R8u | R8i | R16 | R16u | R16i | R16f | R32u | R32i | R32f | R64u
            | R64i | R64f => 1,
            RG8 | RG8s | RG8u | RG8i | RG16 | RG16u | RG16i | RG16f | RG32u | RG32i | RG32f => 2,
            RGB8 | RGB8s | RGB8u | RGB8i | RGB32u | RGB32i | RGB32f => 3,
            RGBA8 | RGBA8s | RGBA8u | RGBA8i | SRGBA8 | BGRA8 | RGBA16 | RGBA16u | RGBA16i
            | RGBA16f | RGBA32u | RGBA32i | RGBA32f | RGB10A2 => 4,
        }
    }

    /// Bytes per element. Packed formats report their full size here.
    pub fn stride(&self) -> u32 {
        use GPUFormat::*;
        match self {
            RGB10A2 => 4,
            R64u | R64i | R64f => 8,
            _ => self.channels() * self.component_size(),
        }
    }

    pub fn component_size(&self) -> u32 {
        use GPUFormat::*;
        match self {
            R8 | RG8 | RGB8 | RGBA8 | R8s | RG8s | RGB8s | RGBA8s | R8u | RG8u | RGB8u
            | RGBA8u | R8i | RG8i | RGB8i | RGBA8i | SRGBA8 | BGRA8 => 1,
            R16 | RG16 | RGBA16 | R16u | RG16u | RGBA16u | R16i | RG16i | RGBA16i | R16f
            | RG16f | RGBA16f => 2,
            R32u | RG32u | RGB32u | RGBA32u | R32i | RG32i | RGB32i | RGBA32i | R32f | RG32f
            | RGB32f | RGBA32f => 4,
            RGB10A2 => 1,
            R64u | R64i | R64f => 8,
        }
    }

    pub fn component_type(&self) -> ComponentType {
        use GPUFormat::*;
        match self {
            R8 | RG8 | RGB8 | RGBA8 | BGRA8 | R16 | RG16 | RGBA16 | RGB10A2 => ComponentType::Unorm,
            R8s | RG8s | RGB8s | RGBA8s => ComponentType::Snorm,
            R8u | RG8u | RGB8u | RGBA8u | R16u | RG16u | RGBA16u | R32u | RG32u | RGB32u
            | RGBA32u | R64u => ComponentType::Uint,
            R8i | RG8i | RGB8i | RGBA8i | R16i | RG16i | RGBA16i | R32i | RG32i | RGB32i
            | RGBA32i | R64i => ComponentType::Sint,
            R16f | RG16f | RGBA16f | R32f | RG32f | RGB32f | RGBA32f | R64f => ComponentType::Float,
            SRGBA8 => ComponentType::Srgb,
        }
    }

    /// True for the only formats an index buffer may use.
    #[inline]
    pub fn is_index_format(&self) -> bool {
        matches!(
            self,
            GPUFormat::R16u | GPUFormat::R16i | GPUFormat::R32u | GPUFormat::R32i
        )
    }
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum DepthFormat {
    #[default]
    None,
    D16,
    D24,
    D32,
    D32F,
    D24S8,
    D32FS8,
}

impl DepthFormat {
    #[inline]
    pub fn has_stencil(&self) -> bool {
        matches!(self, DepthFormat::D24S8 | DepthFormat::D32FS8)
    }
}

//===----------------------------------------------------------------------===//
// Buffers & textures
//===----------------------------------------------------------------------===//

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum BufferKind {
    #[default]
    Vertex,
    Index,
    Uniform,
    Storage,
    Indirect,
}

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
    pub struct MemoryUsage: u8 {
        const CPU_WRITE = 1 << 0;
        const GPU_WRITE = 1 << 1;
        const SHARED = 1 << 2;
    }
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum TextureType {
    Tex1D,
    #[default]
    Tex2D,
    Tex3D,
    Cube,
    Tex1DArray,
    Tex2DArray,
    CubeArray,
    Tex2DMS,
    Tex2DMSArray,
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum SamplerFilter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum AddressMode {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampEdge,
    ClampBorder,
    MirrorClampEdge,
}

//===----------------------------------------------------------------------===//
// Shader stages
//===----------------------------------------------------------------------===//

/// Raytracing stages carry this bit in their discriminant.
pub const RAYTRACING_STAGE_BIT: u8 = 0x40;

#[repr(u8)]
#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum ShaderStage {
    Vertex = 0,
    TessCtrl = 1,
    TessEval = 2,
    Geometry = 3,
    Fragment = 4,
    Compute = 5,
    Task = 6,
    Mesh = 7,
    RayGen = RAYTRACING_STAGE_BIT,
    AnyHit = RAYTRACING_STAGE_BIT | 1,
    ClosestHit = RAYTRACING_STAGE_BIT | 2,
    Miss = RAYTRACING_STAGE_BIT | 3,
    Intersection = RAYTRACING_STAGE_BIT | 4,
    Callable = RAYTRACING_STAGE_BIT | 5,
}

impl ShaderStage {
    #[inline]
    pub fn is_raytracing(&self) -> bool {
        (*self as u8) & RAYTRACING_STAGE_BIT != 0
    }

    /// Vertex through fragment.
    #[inline]
    pub fn is_graphics(&self) -> bool {
        *self <= ShaderStage::Fragment
    }
}

//===----------------------------------------------------------------------===//
// Fixed function state
//===----------------------------------------------------------------------===//

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum TopologyMode {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    LineListAdj,
    LineStripAdj,
    TriangleListAdj,
    TriangleStripAdj,
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
    All,
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum FillMode {
    #[default]
    Fill,
    Line,
    Point,
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum WindingOrder {
    #[default]
    CCW,
    CW,
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub struct Rasterizer {
    pub fill: FillMode,
    pub cull: CullMode,
    pub winding: WindingOrder,
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    #[default]
    Always,
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    IncrClamp,
    DecrClamp,
    Invert,
    IncrWrap,
    DecrWrap,
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub struct Stencil {
    pub fail: StencilOp,
    pub pass: StencilOp,
    pub depth_fail: StencilOp,
    pub compare: CompareOp,
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub struct DepthStencil {
    pub front: Stencil,
    pub back: Stencil,
    pub stencil_compare_mask: u8,
    pub stencil_write_mask: u8,
    pub stencil_reference: u8,
    pub depth_compare: CompareOp,
    pub enable_depth_read: bool,
    pub enable_depth_write: bool,
    pub enable_stencil: bool,
}

impl Default for DepthStencil {
    fn default() -> Self {
        Self {
            front: Default::default(),
            back: Default::default(),
            stencil_compare_mask: 0xFF,
            stencil_write_mask: 0xFF,
            stencil_reference: 0,
            depth_compare: CompareOp::Greater,
            enable_depth_read: false,
            enable_depth_write: false,
            enable_stencil: false,
        }
    }
}

impl DepthStencil {
    /// Depth only state for a reversed depth range.
    ///
    /// Write-only depth still needs the test enabled natively; the compare
    /// is forced to `Never` in that case.
    pub fn depth(compare: CompareOp, depth_write: bool, depth_read: bool) -> Self {
        let write_only = depth_write && !depth_read;
        Self {
            depth_compare: if write_only { CompareOp::Never } else { compare },
            enable_depth_read: write_only || depth_read,
            enable_depth_write: depth_write,
            ..Default::default()
        }
    }

    /// Same as [`DepthStencil::depth`] with the stencil test enabled for both faces.
    pub fn depth_stencil(
        compare: CompareOp,
        depth_write: bool,
        depth_read: bool,
        front_and_back: Stencil,
        compare_mask: u8,
        write_mask: u8,
        reference: u8,
    ) -> Self {
        Self {
            front: front_and_back,
            back: front_and_back,
            stencil_compare_mask: compare_mask,
            stencil_write_mask: write_mask,
            stencil_reference: reference,
            enable_stencil: true,
            ..Self::depth(compare, depth_write, depth_read)
        }
    }
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum BlendFactor {
    Zero,
    #[default]
    One,
    SrcColor,
    InvSrcColor,
    SrcAlpha,
    InvSrcAlpha,
    DstAlpha,
    InvDstAlpha,
    DstColor,
    InvDstColor,
    ConstantColor,
    InvConstantColor,
    ConstantAlpha,
    InvConstantAlpha,
    SrcAlphaSaturate,
    Src1Color,
    InvSrc1Color,
    Src1Alpha,
    InvSrc1Alpha,
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum BlendOp {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum LogicOp {
    Clear,
    And,
    AndReverse,
    Copy,
    AndInverted,
    /// Leaves the destination alone; disables logic ops natively.
    #[default]
    NoOp,
    Xor,
    Or,
    Nor,
    Equivalent,
    Invert,
    OrReverse,
    CopyInverted,
    OrInverted,
    Nand,
    Set,
}

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
    pub struct WriteMask: u8 {
        const R = 1 << 0;
        const G = 1 << 1;
        const B = 1 << 2;
        const A = 1 << 3;
        const RGB = Self::R.bits() | Self::G.bits() | Self::B.bits();
        const ALL = Self::RGB.bits() | Self::A.bits();
    }
}

impl Default for WriteMask {
    fn default() -> Self {
        WriteMask::ALL
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub struct BlendState {
    pub blend_factor: [f32; 4],
    pub logic_op: LogicOp,
    pub write_mask: WriteMask,
    pub blend_op: BlendOp,
    pub alpha_blend_op: BlendOp,
    pub src_blend: BlendFactor,
    pub dst_blend: BlendFactor,
    pub alpha_src_blend: BlendFactor,
    pub alpha_dst_blend: BlendFactor,
    pub blend_enable: bool,
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            blend_factor: [0.0; 4],
            logic_op: LogicOp::NoOp,
            write_mask: WriteMask::ALL,
            blend_op: BlendOp::Add,
            alpha_blend_op: BlendOp::Add,
            src_blend: BlendFactor::Zero,
            dst_blend: BlendFactor::One,
            alpha_src_blend: BlendFactor::Zero,
            alpha_dst_blend: BlendFactor::One,
            blend_enable: false,
        }
    }
}

impl BlendState {
    /// Premultiplied alpha: `src + dst * (1 - src.a)`.
    pub fn alpha_blend() -> Self {
        Self {
            src_blend: BlendFactor::One,
            dst_blend: BlendFactor::InvSrcAlpha,
            alpha_src_blend: BlendFactor::One,
            alpha_dst_blend: BlendFactor::InvSrcAlpha,
            blend_enable: true,
            ..Default::default()
        }
    }

    #[inline]
    pub fn logic_op_enabled(&self) -> bool {
        self.logic_op != LogicOp::NoOp
    }

    /// Dual source blending for subpixel text.
    pub fn subpixel_alpha_blend() -> Self {
        Self {
            src_blend: BlendFactor::Src1Color,
            dst_blend: BlendFactor::InvSrc1Color,
            alpha_src_blend: BlendFactor::Src1Alpha,
            alpha_dst_blend: BlendFactor::InvSrc1Alpha,
            blend_enable: true,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub struct Msaa {
    pub samples: u32,
    pub min_sample_shading: f32,
}

impl Default for Msaa {
    fn default() -> Self {
        Self {
            samples: 1,
            min_sample_shading: 0.0,
        }
    }
}

//===----------------------------------------------------------------------===//
// Surface operations
//===----------------------------------------------------------------------===//

#[repr(u8)]
#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum Filter {
    #[default]
    Nearest = 0,
    Linear = 1,
}

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
    pub struct ClearFlags: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
        const ALL = Self::COLOR.bits() | Self::DEPTH.bits() | Self::STENCIL.bits();
    }
}

/// Blits select the same attachment planes a clear does.
pub type BlitMask = ClearFlags;

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub enum QueryKind {
    #[default]
    Occlusion,
    PrimitivesGenerated,
    TimeElapsed,
}

bitflags! {
    /// Optional feature sets a backend may expose.
    #[repr(transparent)]
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
    pub struct Techniques: u8 {
        const RAYTRACING = 1 << 0;
        const MESH_SHADING = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_strides() {
        assert_eq!(GPUFormat::RGB32f.stride(), 12);
        assert_eq!(GPUFormat::RGBA8.stride(), 4);
        assert_eq!(GPUFormat::RG16f.stride(), 4);
        assert_eq!(GPUFormat::RGB10A2.stride(), 4);
        assert!(GPUFormat::R16u.is_index_format());
        assert!(!GPUFormat::R16f.is_index_format());
    }

    #[test]
    fn stage_ranges() {
        assert!(ShaderStage::Fragment.is_graphics());
        assert!(!ShaderStage::Compute.is_graphics());
        assert!(!ShaderStage::Mesh.is_graphics());
        assert!(ShaderStage::Miss.is_raytracing());
        assert!(!ShaderStage::Task.is_raytracing());
    }

    #[test]
    fn write_only_depth_forces_never() {
        let ds = DepthStencil::depth(CompareOp::Less, true, false);
        assert_eq!(ds.depth_compare, CompareOp::Never);
        assert!(ds.enable_depth_read);

        let rw = DepthStencil::depth(CompareOp::Less, true, true);
        assert_eq!(rw.depth_compare, CompareOp::Less);
        assert!(!rw.enable_stencil);

        let st = DepthStencil::depth_stencil(CompareOp::Greater, true, true, Stencil::default(), 0x0F, 0xF0, 1);
        assert!(st.enable_stencil);
        assert_eq!(st.stencil_write_mask, 0xF0);
    }
}
