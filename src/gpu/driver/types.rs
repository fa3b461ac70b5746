use crate::gpu::driver::command::ClearColor;
use crate::gpu::structs::*;

/// Name of an object owned by the native driver. `0` is "none".
pub type NativeHandle = u32;

/// A driver constant produced by [`crate::gpu::driver::Driver::translate`].
pub type NativeEnum = u32;

/// Every backend-neutral value that has to be translated before it reaches
/// a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Abstract {
    /// Storage format of a texture or attachment.
    Format(GPUFormat),
    /// Component type of a vertex attribute or index.
    AttributeType(GPUFormat),
    DepthFormat(DepthFormat),
    BufferKind(BufferKind),
    TextureType(TextureType),
    ShaderStage(ShaderStage),
    Topology(TopologyMode),
    Cull(CullMode),
    Fill(FillMode),
    Winding(WindingOrder),
    Compare(CompareOp),
    StencilOp(StencilOp),
    BlendFactor(BlendFactor),
    BlendOp(BlendOp),
    LogicOp(LogicOp),
    SamplerFilter(SamplerFilter),
    AddressMode(AddressMode),
    Query(QueryKind),
    Filter(Filter),
}

macro_rules! into_abstract {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Abstract {
            fn from(v: $ty) -> Self {
                Abstract::$variant(v)
            }
        })*
    };
}

into_abstract! {
    GPUFormat => Format,
    DepthFormat => DepthFormat,
    BufferKind => BufferKind,
    TextureType => TextureType,
    ShaderStage => ShaderStage,
    TopologyMode => Topology,
    CullMode => Cull,
    FillMode => Fill,
    WindingOrder => Winding,
    CompareOp => Compare,
    StencilOp => StencilOp,
    BlendFactor => BlendFactor,
    BlendOp => BlendOp,
    LogicOp => LogicOp,
    SamplerFilter => SamplerFilter,
    AddressMode => AddressMode,
    QueryKind => Query,
    Filter => Filter,
}

/// Objects a driver can be asked to delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeObject {
    Buffer(NativeHandle),
    Texture(NativeHandle),
    TextureView(NativeHandle),
    Sampler(NativeHandle),
    Query(NativeHandle),
    Program(NativeHandle),
    VertexArray(NativeHandle),
    Framebuffer(NativeHandle),
    Renderbuffer(NativeHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferTarget {
    Draw,
    Read,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Uniform,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilFace {
    Front,
    Back,
}

/// Toggleable fixed function features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    CullFace,
    Blend,
    ColorLogicOp,
    DepthTest,
    StencilTest,
    ScissorTest,
    SampleShading,
}

/// State changes and work submitted to the driver. Creation and deletion of
/// objects go through dedicated [`crate::gpu::driver::Driver`] methods.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    UseProgram(NativeHandle),
    BindVertexArray(NativeHandle),
    BindFramebuffer {
        target: FramebufferTarget,
        framebuffer: NativeHandle,
    },
    BindBufferRange {
        target: BufferTarget,
        index: u32,
        buffer: NativeHandle,
        offset: u64,
        size: u64,
    },
    BindSampler {
        unit: u32,
        sampler: NativeHandle,
    },
    BindTextureUnit {
        unit: u32,
        texture: NativeHandle,
    },
    BindImageTexture {
        unit: u32,
        texture: NativeHandle,
        format: NativeEnum,
    },
    Enable(Capability),
    Disable(Capability),
    CullFace(NativeEnum),
    FrontFace(NativeEnum),
    PolygonMode(NativeEnum),
    ColorMask(WriteMask),
    MinSampleShading(f32),
    BlendColor([f32; 4]),
    LogicOp(NativeEnum),
    BlendEquation {
        color: NativeEnum,
        alpha: NativeEnum,
    },
    BlendFunc {
        src_color: NativeEnum,
        dst_color: NativeEnum,
        src_alpha: NativeEnum,
        dst_alpha: NativeEnum,
    },
    DepthFunc(NativeEnum),
    DepthMask(bool),
    StencilFunc {
        face: StencilFace,
        func: NativeEnum,
        reference: u32,
        mask: u32,
    },
    StencilOp {
        face: StencilFace,
        fail: NativeEnum,
        depth_fail: NativeEnum,
        pass: NativeEnum,
    },
    StencilMask(u32),
    Viewport {
        offset: [i32; 2],
        size: [u32; 2],
    },
    Scissor {
        offset: [i32; 2],
        size: [u32; 2],
    },
    ClearColor(ClearColor),
    ClearDepth(f32),
    ClearStencil(u32),
    /// Clears the selected planes of the bound draw framebuffer.
    Clear(ClearFlags),
    DrawArrays {
        mode: NativeEnum,
        first: u32,
        count: u32,
        instances: u32,
        base_instance: u32,
    },
    DrawElements {
        mode: NativeEnum,
        count: u32,
        index_type: NativeEnum,
        offset: u64,
        instances: u32,
        base_vertex: u32,
        base_instance: u32,
    },
    DispatchCompute([u32; 3]),
    TraceRays([u32; 3]),
    /// Copies from the bound read framebuffer to the bound draw framebuffer.
    /// Areas are `[x0, y0, x1, y1]`.
    BlitFramebuffer {
        src: [i32; 4],
        dst: [i32; 4],
        mask: BlitMask,
        filter: NativeEnum,
    },
    BeginQuery {
        target: NativeEnum,
        query: NativeHandle,
    },
    EndQuery {
        target: NativeEnum,
    },
    PushDebugGroup(String),
    InsertDebugMarker(String),
    PopDebugGroup,
}

//===----------------------------------------------------------------------===//
// Creation descriptors
//===----------------------------------------------------------------------===//

#[derive(Debug, Clone)]
pub struct NativeBufferDesc<'a> {
    pub label: &'a str,
    pub target: NativeEnum,
    pub size: u64,
    pub usage: MemoryUsage,
    pub data: Option<&'a [u8]>,
}

#[derive(Debug, Clone)]
pub struct NativeTextureDesc<'a> {
    pub label: &'a str,
    pub target: NativeEnum,
    pub format: NativeEnum,
    pub size: [u32; 3],
    pub mips: u32,
    pub layers: u32,
    pub samples: u32,
    pub data: Option<&'a [u8]>,
}

#[derive(Debug, Clone)]
pub struct NativeSamplerDesc<'a> {
    pub label: &'a str,
    pub min_filter: NativeEnum,
    pub mag_filter: NativeEnum,
    pub mip_filter: NativeEnum,
    pub address: [NativeEnum; 3],
    pub anisotropy: f32,
    pub compare: Option<NativeEnum>,
    pub lod: [f32; 2],
}

#[derive(Debug, Clone)]
pub struct NativeStage<'a> {
    pub stage: NativeEnum,
    pub binary: &'a [u8],
    pub entry: &'a str,
}

#[derive(Debug, Clone)]
pub struct NativeProgramDesc<'a> {
    pub label: &'a str,
    pub stages: Vec<NativeStage<'a>>,
    /// Program of a parent pipeline the driver may derive from.
    pub parent: Option<NativeHandle>,
    pub optimize: bool,
}

#[derive(Debug, Clone)]
pub struct NativeViewDesc<'a> {
    pub label: &'a str,
    pub texture: NativeHandle,
    pub target: NativeEnum,
    pub format: NativeEnum,
    pub min_level: u32,
    pub levels: u32,
    pub min_layer: u32,
    pub layers: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeAttribute {
    pub location: u32,
    pub components: u32,
    pub kind: NativeEnum,
    pub normalized: bool,
    pub integer: bool,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeVertexBinding {
    pub buffer: NativeHandle,
    pub offset: u64,
    pub stride: u32,
    pub instanced: bool,
    pub attributes: Vec<NativeAttribute>,
}

#[derive(Debug, Clone)]
pub struct NativeVertexArrayDesc<'a> {
    pub label: &'a str,
    pub bindings: Vec<NativeVertexBinding>,
    pub index_buffer: Option<NativeHandle>,
}

#[derive(Debug, Clone, Copy)]
pub struct NativeDepthAttachment {
    pub format: NativeEnum,
    /// Sampled texture when true, renderbuffer otherwise.
    pub as_texture: bool,
    pub has_stencil: bool,
}

#[derive(Debug, Clone)]
pub struct NativeFramebufferDesc<'a> {
    pub label: &'a str,
    pub size: [u32; 2],
    pub samples: u32,
    pub colors: Vec<NativeEnum>,
    pub depth: Option<NativeDepthAttachment>,
}

/// Attachments allocated for one framebuffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NativeFramebuffer {
    pub framebuffer: NativeHandle,
    pub colors: Vec<NativeHandle>,
    pub depth: Option<NativeObject>,
}
