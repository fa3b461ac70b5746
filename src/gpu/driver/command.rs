use bytemuck::{Pod, Zeroable};
use core::mem::size_of;

use crate::gpu::error::{GPUError, Result};
use crate::gpu::resources::{Descriptors, Pipeline, PrimitiveBuffer, Query, Surface};
use crate::gpu::structs::{BlitMask, ClearFlags, Filter, Techniques};
use crate::utils::Handle;

//===----------------------------------------------------------------------===//
// Opcodes
//===----------------------------------------------------------------------===//

/// Bits above this shift name the [`Techniques`] an opcode depends on.
pub const TECHNIQUE_SHIFT: u32 = 24;

const RAYTRACING: u32 = (Techniques::RAYTRACING.bits() as u32) << TECHNIQUE_SHIFT;

#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    BindPipeline = 0x01,
    BindDescriptors = 0x02,
    BindPrimitiveBuffer = 0x03,
    BeginQuery = 0x04,
    EndQuery = 0x05,
    BeginFramebuffer = 0x06,
    EndFramebuffer = 0x07,
    DrawInstanced = 0x10,
    Dispatch = 0x11,
    SetClearStencil = 0x20,
    SetClearDepth = 0x21,
    SetBlendConstants = 0x22,
    SetStencilCompareMask = 0x23,
    SetStencilWriteMask = 0x24,
    SetClearColor = 0x25,
    SetScissor = 0x26,
    SetViewport = 0x27,
    SetViewportAndScissor = 0x28,
    BlitFramebuffer = 0x30,
    ClearFramebuffer = 0x31,
    DebugStartRegion = 0x40,
    DebugInsertMarker = 0x41,
    DebugEndRegion = 0x42,
    TraceRays = RAYTRACING | 0x50,
}

impl Op {
    const ALL: [Op; 24] = [
        Op::BindPipeline,
        Op::BindDescriptors,
        Op::BindPrimitiveBuffer,
        Op::BeginQuery,
        Op::EndQuery,
        Op::BeginFramebuffer,
        Op::EndFramebuffer,
        Op::DrawInstanced,
        Op::Dispatch,
        Op::SetClearStencil,
        Op::SetClearDepth,
        Op::SetBlendConstants,
        Op::SetStencilCompareMask,
        Op::SetStencilWriteMask,
        Op::SetClearColor,
        Op::SetScissor,
        Op::SetViewport,
        Op::SetViewportAndScissor,
        Op::BlitFramebuffer,
        Op::ClearFramebuffer,
        Op::DebugStartRegion,
        Op::DebugInsertMarker,
        Op::DebugEndRegion,
        Op::TraceRays,
    ];

    pub fn from_u32(x: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| *op as u32 == x)
    }

    /// Techniques a backend must expose to run this opcode.
    #[inline]
    pub fn techniques(self) -> Techniques {
        Techniques::from_bits_truncate((self as u32 >> TECHNIQUE_SHIFT) as u8)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommandAvailability {
    Supported,
    Unsupported,
}

/// A fixed-layout payload and the opcode it is recorded under.
pub trait CommandPayload: Pod {
    const OP: Op;
}

macro_rules! payload {
    ($($ty:ident => $op:ident),* $(,)?) => {
        $(impl CommandPayload for $ty {
            const OP: Op = Op::$op;
        })*
    };
}

//===----------------------------------------------------------------------===//
// Command definitions
//===----------------------------------------------------------------------===//

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct CmdHeader {
    pub op: u32,
    /// Total record size, header included.
    pub size: u32,
}

pub const HEADER_SIZE: usize = size_of::<CmdHeader>();

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct BindPipeline {
    pub pipeline: Handle<Pipeline>,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct BindDescriptors {
    pub descriptors: Handle<Descriptors>,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct BindPrimitiveBuffer {
    pub buffer: Handle<PrimitiveBuffer>,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct BeginQuery {
    pub query: Handle<Query>,
}

#[repr(C)]
#[derive(Default, Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct EndQuery {}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct BeginFramebuffer {
    pub target: Handle<Surface>,
}

#[repr(C)]
#[derive(Default, Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct EndFramebuffer {}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct DrawInstanced {
    pub start: u32,
    pub count: u32,
    pub instance_count: u32,
    pub instance_start: u32,
    /// Added to every index. Always zero for non-indexed draws.
    pub vertex_start: u32,
    indexed: u32,
}

impl DrawInstanced {
    /// Non-indexed draw of `count` vertices, one instance.
    pub fn new(count: u32) -> Self {
        Self {
            start: 0,
            count,
            instance_count: 1,
            instance_start: 0,
            vertex_start: 0,
            indexed: 0,
        }
    }

    /// Indexed draw of `count` indices offset by `vertex_start`.
    pub fn indexed(count: u32, vertex_start: u32) -> Self {
        Self {
            vertex_start,
            indexed: 1,
            ..Self::new(count)
        }
    }

    pub fn with_start(mut self, start: u32) -> Self {
        self.start = start;
        self
    }

    pub fn with_instances(mut self, instance_count: u32, instance_start: u32) -> Self {
        self.instance_count = instance_count;
        self.instance_start = instance_start;
        self
    }

    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.indexed != 0
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct Dispatch {
    pub thread_count: [u32; 3],
}

impl Dispatch {
    pub fn new(thread_count: [u32; 3]) -> Self {
        Self { thread_count }
    }

    pub fn x(x: u32) -> Self {
        Self::new([x, 1, 1])
    }

    pub fn xy(x: u32, y: u32) -> Self {
        Self::new([x, y, 1])
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct TraceRays {
    pub thread_count: [u32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct SetClearStencil {
    pub value: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq)]
pub struct SetClearDepth {
    pub value: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq)]
pub struct SetBlendConstants {
    pub value: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct SetStencilCompareMask {
    pub mask: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct SetStencilWriteMask {
    pub mask: u32,
}

/// Clear color in the representation the attachment expects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClearColor {
    Float([f32; 4]),
    Uint([u32; 4]),
    Int([i32; 4]),
}

impl Default for ClearColor {
    fn default() -> Self {
        ClearColor::Float([0.0; 4])
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct SetClearColor {
    bits: [u32; 4],
    kind: u32,
}

impl SetClearColor {
    pub fn float(value: [f32; 4]) -> Self {
        Self {
            bits: value.map(f32::to_bits),
            kind: 0,
        }
    }

    pub fn uint(value: [u32; 4]) -> Self {
        Self { bits: value, kind: 1 }
    }

    pub fn int(value: [i32; 4]) -> Self {
        Self {
            bits: value.map(|v| v as u32),
            kind: 2,
        }
    }

    pub fn value(&self) -> ClearColor {
        match self.kind {
            1 => ClearColor::Uint(self.bits),
            2 => ClearColor::Int(self.bits.map(|v| v as i32)),
            _ => ClearColor::Float(self.bits.map(f32::from_bits)),
        }
    }
}

impl From<ClearColor> for SetClearColor {
    fn from(value: ClearColor) -> Self {
        match value {
            ClearColor::Float(v) => Self::float(v),
            ClearColor::Uint(v) => Self::uint(v),
            ClearColor::Int(v) => Self::int(v),
        }
    }
}

/// Rectangle in framebuffer pixels. A zero size stands for the size of the
/// framebuffer bound when the command runs.
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq, Hash)]
pub struct ViewRegion {
    pub size: [u32; 2],
    pub offset: [i32; 2],
}

impl ViewRegion {
    pub fn new(size: [u32; 2], offset: [i32; 2]) -> Self {
        Self { size, offset }
    }

    /// Covers whatever framebuffer is bound.
    pub fn full() -> Self {
        Self::default()
    }
}

#[repr(transparent)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct SetScissor(pub ViewRegion);

#[repr(transparent)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct SetViewport(pub ViewRegion);

#[repr(transparent)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct SetViewportAndScissor(pub ViewRegion);

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct BlitFramebuffer {
    pub src: Handle<Surface>,
    /// An invalid handle targets the backbuffer.
    pub dst: Handle<Surface>,
    pub src_area: [u32; 4],
    pub dst_area: [u32; 4],
    mask: u8,
    filter: u8,
    _pad: [u8; 2],
}

impl BlitFramebuffer {
    /// Areas are `[x, y, width, height]`. Depth and stencil planes can only
    /// be copied with [`Filter::Nearest`].
    pub fn new(
        src: Handle<Surface>,
        dst: Handle<Surface>,
        src_area: [u32; 4],
        dst_area: [u32; 4],
        mask: BlitMask,
        filter: Filter,
    ) -> Result<Self> {
        if mask.is_empty() {
            return Err(GPUError::invalid("blit mask selects no attachment"));
        }
        if filter == Filter::Linear && mask.intersects(BlitMask::DEPTH | BlitMask::STENCIL) {
            return Err(GPUError::invalid(
                "depth and stencil blits require nearest filtering",
            ));
        }

        Ok(Self {
            src,
            dst,
            src_area,
            dst_area,
            mask: mask.bits(),
            filter: filter as u8,
            _pad: [0; 2],
        })
    }

    #[inline]
    pub fn mask(&self) -> BlitMask {
        BlitMask::from_bits_truncate(self.mask)
    }

    #[inline]
    pub fn filter(&self) -> Filter {
        if self.filter == Filter::Linear as u8 {
            Filter::Linear
        } else {
            Filter::Nearest
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct ClearFramebuffer {
    pub target: Handle<Surface>,
    flags: u8,
    _pad: [u8; 3],
}

impl ClearFramebuffer {
    pub fn new(target: Handle<Surface>, flags: ClearFlags) -> Self {
        Self {
            target,
            flags: flags.bits(),
            _pad: [0; 3],
        }
    }

    #[inline]
    pub fn flags(&self) -> ClearFlags {
        ClearFlags::from_bits_truncate(self.flags)
    }
}

pub const DEBUG_LABEL_CAPACITY: usize = 64;

/// Fixed capacity UTF-8 label.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct DebugLabel {
    len: u32,
    bytes: [u8; DEBUG_LABEL_CAPACITY],
}

impl DebugLabel {
    pub fn new(label: &str) -> Result<Self> {
        let len = label.len();
        if len > DEBUG_LABEL_CAPACITY {
            return Err(GPUError::LabelTooLong {
                len,
                max: DEBUG_LABEL_CAPACITY,
            });
        }

        let mut bytes = [0u8; DEBUG_LABEL_CAPACITY];
        bytes[..len].copy_from_slice(label.as_bytes());
        Ok(Self {
            len: len as u32,
            bytes,
        })
    }

    pub fn as_str(&self) -> &str {
        let len = (self.len as usize).min(DEBUG_LABEL_CAPACITY);
        std::str::from_utf8(&self.bytes[..len]).unwrap_or("<invalid label>")
    }
}

#[repr(transparent)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct DebugStartRegion(pub DebugLabel);

#[repr(transparent)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct DebugInsertMarker(pub DebugLabel);

#[repr(C)]
#[derive(Default, Clone, Copy, Debug, Pod, Zeroable, PartialEq, Eq)]
pub struct DebugEndRegion {}

payload! {
    BindPipeline => BindPipeline,
    BindDescriptors => BindDescriptors,
    BindPrimitiveBuffer => BindPrimitiveBuffer,
    BeginQuery => BeginQuery,
    EndQuery => EndQuery,
    BeginFramebuffer => BeginFramebuffer,
    EndFramebuffer => EndFramebuffer,
    DrawInstanced => DrawInstanced,
    Dispatch => Dispatch,
    TraceRays => TraceRays,
    SetClearStencil => SetClearStencil,
    SetClearDepth => SetClearDepth,
    SetBlendConstants => SetBlendConstants,
    SetStencilCompareMask => SetStencilCompareMask,
    SetStencilWriteMask => SetStencilWriteMask,
    SetClearColor => SetClearColor,
    SetScissor => SetScissor,
    SetViewport => SetViewport,
    SetViewportAndScissor => SetViewportAndScissor,
    BlitFramebuffer => BlitFramebuffer,
    ClearFramebuffer => ClearFramebuffer,
    DebugStartRegion => DebugStartRegion,
    DebugInsertMarker => DebugInsertMarker,
    DebugEndRegion => DebugEndRegion,
}

//===----------------------------------------------------------------------===//
// Command list
//===----------------------------------------------------------------------===//

/// Append-only stream of `[CmdHeader][payload]` records.
///
/// Recording never talks to a driver; lists can be built on any thread and
/// handed to a device for execution afterwards.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CommandList {
    data: Vec<u8>,
}

impl std::fmt::Debug for CommandList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandList")
            .field("bytes", &self.data.len())
            .field("commands", &self.len())
            .finish()
    }
}

impl CommandList {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(1024),
        }
    }

    /// Adopts an externally produced stream after validating its framing.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mut offset = 0;
        while offset < data.len() {
            let size = read_header(&data[offset..])
                .map(|h| h.size as usize)
                .filter(|size| *size >= HEADER_SIZE && offset + size <= data.len())
                .ok_or(GPUError::MalformedCommand { offset })?;
            offset += size;
        }

        Ok(Self { data })
    }

    /// Appends a typed command.
    #[inline]
    pub fn record<T: CommandPayload>(&mut self, payload: &T) {
        self.record_raw(T::OP as u32, bytemuck::bytes_of(payload));
    }

    /// Appends a record with an arbitrary opcode. Readers that do not know
    /// `op` skip over it.
    pub fn record_raw(&mut self, op: u32, payload: &[u8]) {
        let header = CmdHeader {
            op,
            size: (HEADER_SIZE + payload.len()) as u32,
        };
        self.data.extend_from_slice(bytemuck::bytes_of(&header));
        self.data.extend_from_slice(payload);
    }

    pub fn bind_pipeline(&mut self, pipeline: Handle<Pipeline>) {
        self.record(&BindPipeline { pipeline });
    }

    pub fn bind_descriptors(&mut self, descriptors: Handle<Descriptors>) {
        self.record(&BindDescriptors { descriptors });
    }

    pub fn bind_primitive_buffer(&mut self, buffer: Handle<PrimitiveBuffer>) {
        self.record(&BindPrimitiveBuffer { buffer });
    }

    pub fn begin_query(&mut self, query: Handle<Query>) {
        self.record(&BeginQuery { query });
    }

    pub fn end_query(&mut self) {
        self.record(&EndQuery {});
    }

    pub fn begin_framebuffer(&mut self, target: Handle<Surface>) {
        self.record(&BeginFramebuffer { target });
    }

    pub fn end_framebuffer(&mut self) {
        self.record(&EndFramebuffer {});
    }

    pub fn draw(&mut self, cmd: DrawInstanced) {
        self.record(&cmd);
    }

    pub fn dispatch(&mut self, thread_count: [u32; 3]) {
        self.record(&Dispatch::new(thread_count));
    }

    pub fn trace_rays(&mut self, thread_count: [u32; 3]) {
        self.record(&TraceRays { thread_count });
    }

    pub fn set_clear_color(&mut self, color: ClearColor) {
        self.record(&SetClearColor::from(color));
    }

    pub fn set_clear_depth(&mut self, value: f32) {
        self.record(&SetClearDepth { value });
    }

    pub fn set_clear_stencil(&mut self, value: u32) {
        self.record(&SetClearStencil { value });
    }

    pub fn set_blend_constants(&mut self, value: [f32; 4]) {
        self.record(&SetBlendConstants { value });
    }

    pub fn set_stencil_compare_mask(&mut self, mask: u32) {
        self.record(&SetStencilCompareMask { mask });
    }

    pub fn set_stencil_write_mask(&mut self, mask: u32) {
        self.record(&SetStencilWriteMask { mask });
    }

    pub fn set_viewport(&mut self, region: ViewRegion) {
        self.record(&SetViewport(region));
    }

    pub fn set_scissor(&mut self, region: ViewRegion) {
        self.record(&SetScissor(region));
    }

    pub fn set_viewport_and_scissor(&mut self, region: ViewRegion) {
        self.record(&SetViewportAndScissor(region));
    }

    pub fn blit(&mut self, cmd: BlitFramebuffer) {
        self.record(&cmd);
    }

    pub fn clear(&mut self, target: Handle<Surface>, flags: ClearFlags) {
        self.record(&ClearFramebuffer::new(target, flags));
    }

    pub fn debug_start_region(&mut self, label: &str) -> Result<()> {
        self.record(&DebugStartRegion(DebugLabel::new(label)?));
        Ok(())
    }

    pub fn debug_insert_marker(&mut self, label: &str) -> Result<()> {
        self.record(&DebugInsertMarker(DebugLabel::new(label)?));
        Ok(())
    }

    pub fn debug_end_region(&mut self) {
        self.record(&DebugEndRegion {});
    }

    /// Concatenates `other` after the commands already recorded.
    pub fn append(&mut self, other: &CommandList) {
        self.data.extend_from_slice(&other.data);
    }

    pub fn clear_commands(&mut self) {
        self.data.clear();
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Walks the records from the start in recording order.
    pub fn iter(&self) -> CommandIter<'_> {
        CommandIter {
            data: &self.data,
            offset: 0,
        }
    }

    /// Decodes every record and forwards it to `sink`, stopping at the first
    /// error.
    pub fn replay<S: CommandSink>(&self, sink: &mut S) -> Result<usize> {
        let mut cnt = 0;
        for cmd in self.iter() {
            cnt += 1;
            let Some(op) = cmd.op() else {
                sink.unknown(cmd.raw_op(), cmd.bytes())?;
                continue;
            };

            match op {
                Op::BindPipeline => sink.bind_pipeline(&cmd.decode()?)?,
                Op::BindDescriptors => sink.bind_descriptors(&cmd.decode()?)?,
                Op::BindPrimitiveBuffer => sink.bind_primitive_buffer(&cmd.decode()?)?,
                Op::BeginQuery => sink.begin_query(&cmd.decode()?)?,
                Op::EndQuery => sink.end_query(&cmd.decode()?)?,
                Op::BeginFramebuffer => sink.begin_framebuffer(&cmd.decode()?)?,
                Op::EndFramebuffer => sink.end_framebuffer(&cmd.decode()?)?,
                Op::DrawInstanced => sink.draw_instanced(&cmd.decode()?)?,
                Op::Dispatch => sink.dispatch(&cmd.decode()?)?,
                Op::TraceRays => sink.trace_rays(&cmd.decode()?)?,
                Op::SetClearStencil => sink.set_clear_stencil(&cmd.decode()?)?,
                Op::SetClearDepth => sink.set_clear_depth(&cmd.decode()?)?,
                Op::SetBlendConstants => sink.set_blend_constants(&cmd.decode()?)?,
                Op::SetStencilCompareMask => sink.set_stencil_compare_mask(&cmd.decode()?)?,
                Op::SetStencilWriteMask => sink.set_stencil_write_mask(&cmd.decode()?)?,
                Op::SetClearColor => sink.set_clear_color(&cmd.decode()?)?,
                Op::SetScissor => sink.set_scissor(&cmd.decode()?)?,
                Op::SetViewport => sink.set_viewport(&cmd.decode()?)?,
                Op::SetViewportAndScissor => sink.set_viewport_and_scissor(&cmd.decode()?)?,
                Op::BlitFramebuffer => sink.blit_framebuffer(&cmd.decode()?)?,
                Op::ClearFramebuffer => sink.clear_framebuffer(&cmd.decode()?)?,
                Op::DebugStartRegion => sink.debug_start_region(&cmd.decode()?)?,
                Op::DebugInsertMarker => sink.debug_insert_marker(&cmd.decode()?)?,
                Op::DebugEndRegion => sink.debug_end_region(&cmd.decode()?)?,
            }
        }
        Ok(cnt)
    }
}

//===----------------------------------------------------------------------===//
// Iteration
//===----------------------------------------------------------------------===//

fn read_header(bytes: &[u8]) -> Option<CmdHeader> {
    bytes
        .get(..HEADER_SIZE)
        .map(bytemuck::pod_read_unaligned::<CmdHeader>)
}

#[derive(Clone, Copy, Debug)]
pub struct Command<'a> {
    op: u32,
    offset: usize,
    bytes: &'a [u8],
}

impl<'a> Command<'a> {
    /// `None` for opcodes this build does not know.
    #[inline]
    pub fn op(&self) -> Option<Op> {
        Op::from_u32(self.op)
    }

    #[inline]
    pub fn raw_op(&self) -> u32 {
        self.op
    }

    /// Byte offset of the record within its list.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Copies the payload out if the record holds a `T`.
    pub fn payload<T: CommandPayload>(&self) -> Option<T> {
        if self.op != T::OP as u32 || self.bytes.len() != size_of::<T>() {
            return None;
        }
        Some(bytemuck::pod_read_unaligned(self.bytes))
    }

    fn decode<T: CommandPayload>(&self) -> Result<T> {
        self.payload().ok_or(GPUError::MalformedCommand {
            offset: self.offset,
        })
    }
}

pub struct CommandIter<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for CommandIter<'a> {
    type Item = Command<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.data.get(self.offset..)?;
        let header = read_header(rest)?;
        let size = header.size as usize;
        if size < HEADER_SIZE || size > rest.len() {
            return None;
        }

        let cmd = Command {
            op: header.op,
            offset: self.offset,
            bytes: &rest[HEADER_SIZE..size],
        };
        self.offset += size;
        Some(cmd)
    }
}

//===----------------------------------------------------------------------===//
// Sinks
//===----------------------------------------------------------------------===//

/// Receives decoded commands in recording order.
pub trait CommandSink {
    fn bind_pipeline(&mut self, cmd: &BindPipeline) -> Result<()>;
    fn bind_descriptors(&mut self, cmd: &BindDescriptors) -> Result<()>;
    fn bind_primitive_buffer(&mut self, cmd: &BindPrimitiveBuffer) -> Result<()>;
    fn begin_query(&mut self, cmd: &BeginQuery) -> Result<()>;
    fn end_query(&mut self, cmd: &EndQuery) -> Result<()>;
    fn begin_framebuffer(&mut self, cmd: &BeginFramebuffer) -> Result<()>;
    fn end_framebuffer(&mut self, cmd: &EndFramebuffer) -> Result<()>;
    fn draw_instanced(&mut self, cmd: &DrawInstanced) -> Result<()>;
    fn dispatch(&mut self, cmd: &Dispatch) -> Result<()>;
    fn trace_rays(&mut self, cmd: &TraceRays) -> Result<()>;
    fn set_clear_stencil(&mut self, cmd: &SetClearStencil) -> Result<()>;
    fn set_clear_depth(&mut self, cmd: &SetClearDepth) -> Result<()>;
    fn set_blend_constants(&mut self, cmd: &SetBlendConstants) -> Result<()>;
    fn set_stencil_compare_mask(&mut self, cmd: &SetStencilCompareMask) -> Result<()>;
    fn set_stencil_write_mask(&mut self, cmd: &SetStencilWriteMask) -> Result<()>;
    fn set_clear_color(&mut self, cmd: &SetClearColor) -> Result<()>;
    fn set_scissor(&mut self, cmd: &SetScissor) -> Result<()>;
    fn set_viewport(&mut self, cmd: &SetViewport) -> Result<()>;
    fn set_viewport_and_scissor(&mut self, cmd: &SetViewportAndScissor) -> Result<()>;
    fn blit_framebuffer(&mut self, cmd: &BlitFramebuffer) -> Result<()>;
    fn clear_framebuffer(&mut self, cmd: &ClearFramebuffer) -> Result<()>;
    fn debug_start_region(&mut self, cmd: &DebugStartRegion) -> Result<()>;
    fn debug_insert_marker(&mut self, cmd: &DebugInsertMarker) -> Result<()>;
    fn debug_end_region(&mut self, cmd: &DebugEndRegion) -> Result<()>;

    /// Records with an opcode this build does not know are skipped by default.
    fn unknown(&mut self, op: u32, bytes: &[u8]) -> Result<()> {
        log::warn!("skipping unknown command 0x{op:08x} ({} bytes)", bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_pipeline_round_trip() {
        let p = Handle::<Pipeline>::new(3, 9);
        let mut list = CommandList::new();
        list.bind_pipeline(p);

        let first = list.iter().next().unwrap();
        assert_eq!(first.op(), Some(Op::BindPipeline));
        assert_eq!(first.payload::<BindPipeline>().unwrap().pipeline, p);
        assert!(first.payload::<BindDescriptors>().is_none());
    }

    #[test]
    fn sizes_include_header() {
        let mut list = CommandList::new();
        list.end_framebuffer();
        list.dispatch([64, 1, 1]);
        assert_eq!(
            list.as_bytes().len(),
            HEADER_SIZE * 2 + size_of::<Dispatch>()
        );
        let header: CmdHeader = bytemuck::pod_read_unaligned(&list.as_bytes()[..HEADER_SIZE]);
        assert_eq!(header.size as usize, HEADER_SIZE);
    }

    #[test]
    fn unknown_opcodes_are_skipped() {
        let mut list = CommandList::new();
        list.record_raw(0x7777, &[1, 2, 3, 4, 5]);
        list.set_clear_stencil(7);

        let cmds: Vec<_> = list.iter().collect();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0].op(), None);
        assert_eq!(
            cmds[1].payload::<SetClearStencil>(),
            Some(SetClearStencil { value: 7 })
        );
    }

    #[test]
    fn iteration_restarts_from_the_beginning() {
        let mut list = CommandList::new();
        list.draw(DrawInstanced::new(3));
        list.draw(DrawInstanced::indexed(6, 2));
        let a: Vec<_> = list.iter().map(|c| c.offset()).collect();
        let b: Vec<_> = list.iter().map(|c| c.offset()).collect();
        assert_eq!(a, b);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn draw_factories() {
        let plain = DrawInstanced::new(10);
        assert!(!plain.is_indexed());
        assert_eq!(plain.vertex_start, 0);

        let indexed = DrawInstanced::indexed(10, 4);
        assert!(indexed.is_indexed());
        assert_eq!(indexed.vertex_start, 4);
        assert_eq!(indexed.count, 10);
    }

    #[test]
    fn labels_are_bounded() {
        let mut list = CommandList::new();
        assert!(list.debug_start_region("shadow pass").is_ok());
        let long = "x".repeat(DEBUG_LABEL_CAPACITY + 1);
        assert!(matches!(
            list.debug_insert_marker(&long),
            Err(GPUError::LabelTooLong { .. })
        ));
        assert_eq!(list.len(), 1);

        let label = list.iter().next().unwrap().payload::<DebugStartRegion>().unwrap();
        assert_eq!(label.0.as_str(), "shadow pass");
    }

    #[test]
    fn clear_color_tags() {
        let c = SetClearColor::int([-1, 2, -3, 4]);
        assert_eq!(c.value(), ClearColor::Int([-1, 2, -3, 4]));
        let f = SetClearColor::float([0.5, 0.25, 1.0, 0.0]);
        assert_eq!(f.value(), ClearColor::Float([0.5, 0.25, 1.0, 0.0]));
    }

    #[test]
    fn linear_depth_blits_are_rejected() {
        let s = Handle::<Surface>::new(1, 1);
        assert!(BlitFramebuffer::new(s, s, [0; 4], [0; 4], BlitMask::DEPTH, Filter::Linear).is_err());
        let ok = BlitFramebuffer::new(s, s, [0; 4], [0; 4], BlitMask::COLOR, Filter::Linear).unwrap();
        assert_eq!(ok.filter(), Filter::Linear);
        assert_eq!(ok.mask(), BlitMask::COLOR);
    }

    #[test]
    fn from_bytes_validates_framing() {
        let mut list = CommandList::new();
        list.set_clear_depth(1.0);
        let mut bytes = list.as_bytes().to_vec();
        assert!(CommandList::from_bytes(bytes.clone()).is_ok());
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(
            CommandList::from_bytes(bytes),
            Err(GPUError::MalformedCommand { offset: 0 })
        ));
    }

    #[test]
    fn technique_bits() {
        assert_eq!(Op::TraceRays.techniques(), Techniques::RAYTRACING);
        assert!(Op::DrawInstanced.techniques().is_empty());
        assert_eq!(Op::from_u32(Op::TraceRays as u32), Some(Op::TraceRays));
    }
}
