use bitflags::bitflags;
use log::debug;

use super::buffer::BufferAttributes;
use super::descriptors::PipelineLayout;
use crate::gpu::device::Device;
use crate::gpu::driver::native::{native, Driver};
use crate::gpu::driver::types::{NativeHandle, NativeProgramDesc, NativeStage};
use crate::gpu::error::{GPUError, Result};
use crate::gpu::object::Registry;
use crate::gpu::structs::{BlendState, DepthStencil, Msaa, Rasterizer, ShaderStage, TopologyMode};
use crate::utils::Handle;

#[cfg(feature = "tessera-serde")]
use serde::{Deserialize, Serialize};

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
    pub struct PipelineFlags: u32 {
        /// Other pipelines may derive from this one.
        const IS_PARENT = 1 << 0;
        const DISABLE_OPTIMIZATION = 1 << 1;
        const RT_LIBRARY = 1 << 2;
        const RT_DISABLE_TRIANGLES = 1 << 3;
        const RT_DISABLE_PROCEDURAL = 1 << 4;
        const RT_PLACEHOLDER_ANYHIT = 1 << 5;
        const RT_PLACEHOLDER_CLOSESTHIT = 1 << 6;
        const RT_PLACEHOLDER_MISS = 1 << 7;
        const RT_FLAGS = Self::RT_LIBRARY.bits()
            | Self::RT_DISABLE_TRIANGLES.bits()
            | Self::RT_DISABLE_PROCEDURAL.bits()
            | Self::RT_PLACEHOLDER_ANYHIT.bits()
            | Self::RT_PLACEHOLDER_CLOSESTHIT.bits()
            | Self::RT_PLACEHOLDER_MISS.bits();
    }
}

/// One stage of a pipeline: which binary to load and where to enter it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "tessera-serde", derive(Serialize, Deserialize))]
pub struct ShaderEntry {
    pub stage: ShaderStage,
    /// Index into [`PipelineInfo::binaries`].
    pub binary: u32,
    pub entry: String,
}

impl ShaderEntry {
    pub fn new(stage: ShaderStage, binary: u32, entry: &str) -> Self {
        Self {
            stage,
            binary,
            entry: entry.to_string(),
        }
    }

    /// Entry point `main`.
    pub fn main(stage: ShaderStage, binary: u32) -> Self {
        Self::new(stage, binary, "main")
    }
}

/// Everything needed to build a [`Pipeline`].
///
/// Built through [`PipelineInfo::graphics`], [`PipelineInfo::compute`] or
/// [`PipelineInfo::raytracing`], which validate the stage list. The
/// classification is derived from the stages and never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineInfo {
    pub flags: PipelineFlags,
    pub binaries: Vec<Vec<u8>>,
    /// Stages in declaration order.
    pub stages: Vec<ShaderEntry>,
    pub layout: PipelineLayout,
    /// One entry per vertex stream, in binding order.
    pub attribute_layout: Vec<BufferAttributes>,
    pub topology: TopologyMode,
    pub depth_stencil: DepthStencil,
    pub rasterizer: Rasterizer,
    pub blend_state: BlendState,
    pub msaa: Msaa,
    /// Threads per compute work group.
    pub group_size: [u32; 3],
    pub parent: Option<Handle<Pipeline>>,
}

impl PipelineInfo {
    fn with_stages(
        flags: PipelineFlags,
        binaries: Vec<Vec<u8>>,
        stages: Vec<ShaderEntry>,
        layout: PipelineLayout,
    ) -> Self {
        Self {
            flags,
            binaries,
            stages,
            layout,
            attribute_layout: Vec::new(),
            topology: TopologyMode::default(),
            depth_stencil: DepthStencil::default(),
            rasterizer: Rasterizer::default(),
            blend_state: BlendState::default(),
            msaa: Msaa::default(),
            group_size: [0; 3],
            parent: None,
        }
    }

    /// Vertex through fragment stages. Anything else is rejected.
    pub fn graphics(
        flags: PipelineFlags,
        binaries: Vec<Vec<u8>>,
        stages: Vec<ShaderEntry>,
        layout: PipelineLayout,
        attribute_layout: Vec<BufferAttributes>,
    ) -> Result<Self> {
        if let Some(s) = stages.iter().find(|s| !s.stage.is_graphics()) {
            return Err(GPUError::invalid(format!(
                "{:?} stage is not supported on the graphics path",
                s.stage
            )));
        }

        let mut info = Self::with_stages(flags, binaries, stages, layout);
        info.attribute_layout = attribute_layout;
        info.validate()?;
        Ok(info)
    }

    pub fn compute(
        flags: PipelineFlags,
        binary: Vec<u8>,
        layout: PipelineLayout,
        group_size: [u32; 3],
    ) -> Result<Self> {
        Self::compute_with_entry(flags, binary, "main", layout, group_size)
    }

    pub fn compute_with_entry(
        flags: PipelineFlags,
        binary: Vec<u8>,
        entry: &str,
        layout: PipelineLayout,
        group_size: [u32; 3],
    ) -> Result<Self> {
        let mut info = Self::with_stages(
            flags,
            vec![binary],
            vec![ShaderEntry::new(ShaderStage::Compute, 0, entry)],
            layout,
        );
        info.group_size = group_size;
        info.validate()?;
        Ok(info)
    }

    /// Raytracing stages only. With [`PipelineFlags::RT_LIBRARY`] the
    /// pipeline is a library other raytracing pipelines link against.
    pub fn raytracing(
        flags: PipelineFlags,
        binaries: Vec<Vec<u8>>,
        stages: Vec<ShaderEntry>,
        layout: PipelineLayout,
    ) -> Result<Self> {
        if let Some(s) = stages.iter().find(|s| !s.stage.is_raytracing()) {
            return Err(GPUError::invalid(format!(
                "{:?} stage in a raytracing pipeline",
                s.stage
            )));
        }

        let info = Self::with_stages(flags, binaries, stages, layout);
        info.validate()?;
        Ok(info)
    }

    /// Checks the stage list against the binaries and the classification
    /// it implies. The fields are public, so [`Device::make_pipeline`]
    /// runs this again on whatever it is handed.
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(GPUError::invalid("pipeline declares no stages"));
        }
        for (i, s) in self.stages.iter().enumerate() {
            if s.binary as usize >= self.binaries.len() {
                return Err(GPUError::invalid(format!(
                    "{:?} stage references binary {} of {}",
                    s.stage,
                    s.binary,
                    self.binaries.len()
                )));
            }
            if self.stages[..i].iter().any(|o| o.stage == s.stage) {
                return Err(GPUError::invalid(format!(
                    "{:?} stage declared twice",
                    s.stage
                )));
            }
        }

        if self.is_compute() {
            if self.group_size.contains(&0) {
                return Err(GPUError::invalid(format!(
                    "compute group size {:?} has an empty dimension",
                    self.group_size
                )));
            }
            if self.flags.intersects(PipelineFlags::RT_FLAGS) {
                return Err(GPUError::invalid("raytracing flags on a compute pipeline"));
            }
        } else if self.is_raytracing() {
            if let Some(s) = self.stages.iter().find(|s| !s.stage.is_raytracing()) {
                return Err(GPUError::invalid(format!(
                    "{:?} stage in a raytracing pipeline",
                    s.stage
                )));
            }
        } else {
            if let Some(s) = self.stages.iter().find(|s| !s.stage.is_graphics()) {
                return Err(GPUError::invalid(format!(
                    "{:?} stage is not supported on the graphics path",
                    s.stage
                )));
            }
            if !self.stages.iter().any(|s| s.stage == ShaderStage::Vertex) {
                return Err(GPUError::invalid("graphics pipeline needs a vertex stage"));
            }
            if self.flags.intersects(PipelineFlags::RT_FLAGS) {
                return Err(GPUError::invalid("raytracing flags on a graphics pipeline"));
            }
        }

        Ok(())
    }

    pub fn with_topology(mut self, topology: TopologyMode) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Rasterizer) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_depth_stencil(mut self, depth_stencil: DepthStencil) -> Self {
        self.depth_stencil = depth_stencil;
        self
    }

    pub fn with_blend(mut self, blend_state: BlendState) -> Self {
        self.blend_state = blend_state;
        self
    }

    pub fn with_msaa(mut self, msaa: Msaa) -> Self {
        self.msaa = msaa;
        self
    }

    pub fn with_parent(mut self, parent: Handle<Pipeline>) -> Self {
        self.parent = Some(parent);
        self
    }

    #[inline]
    pub fn is_compute(&self) -> bool {
        matches!(self.stages.as_slice(), [s] if s.stage == ShaderStage::Compute)
    }

    #[inline]
    pub fn is_raytracing(&self) -> bool {
        self.stages.first().is_some_and(|s| s.stage.is_raytracing())
    }

    #[inline]
    pub fn is_graphics(&self) -> bool {
        !self.is_compute() && !self.is_raytracing()
    }
}

/// A pipeline and its lazily linked program.
#[derive(Debug)]
pub struct Pipeline {
    info: PipelineInfo,
    pub(crate) program: Option<NativeHandle>,
}

impl Pipeline {
    #[inline]
    pub fn info(&self) -> &PipelineInfo {
        &self.info
    }

    #[inline]
    pub fn is_compiled(&self) -> bool {
        self.program.is_some()
    }

    #[inline]
    pub fn is_compute(&self) -> bool {
        self.info.is_compute()
    }

    #[inline]
    pub fn is_raytracing(&self) -> bool {
        self.info.is_raytracing()
    }

    #[inline]
    pub fn is_graphics(&self) -> bool {
        self.info.is_graphics()
    }
}

impl<D: Driver> Device<D> {
    pub fn make_pipeline(&mut self, name: &str, info: PipelineInfo) -> Result<Handle<Pipeline>> {
        info.validate()?;
        if info.msaa.samples == 0 || info.msaa.samples > self.driver.max_samples() {
            return Err(GPUError::invalid(format!(
                "pipeline '{name}' requests {} samples, the driver allows 1..={}",
                info.msaa.samples,
                self.driver.max_samples()
            )));
        }

        if let Some(parent) = info.parent {
            let p = self.objects.get(parent)?;
            if !p.info.flags.contains(PipelineFlags::IS_PARENT) {
                return Err(GPUError::invalid(format!(
                    "pipeline '{name}' derives from '{}' which is not flagged IS_PARENT",
                    p.name()
                )));
            }
            self.add_ref(parent)?;
        }

        self.register(
            name,
            Pipeline {
                info,
                program: None,
            },
        )
    }
}

/// Links the program of `pipeline` if it has none yet. Parents are linked
/// first and handed to the driver as a derivation hint.
pub(crate) fn ensure_program<D: Driver>(
    objects: &mut Registry,
    driver: &mut D,
    pipeline: Handle<Pipeline>,
) -> Result<NativeHandle> {
    let p = objects.get(pipeline)?;
    if let Some(program) = p.program {
        return Ok(program);
    }

    let parent = p.info.parent;
    let parent = match parent {
        Some(parent) => Some(ensure_program(objects, driver, parent)?),
        None => None,
    };

    let p = objects.get(pipeline)?;
    let mut stages = Vec::with_capacity(p.info.stages.len());
    for s in &p.info.stages {
        stages.push(NativeStage {
            stage: native(driver, s.stage)?,
            binary: p.info.binaries.get(s.binary as usize).ok_or_else(|| {
                GPUError::invalid(format!("pipeline '{}' lost binary {}", p.name(), s.binary))
            })?,
            entry: &s.entry,
        });
    }

    let desc = NativeProgramDesc {
        label: p.name(),
        stages,
        parent,
        optimize: !p.info.flags.contains(PipelineFlags::DISABLE_OPTIMIZATION),
    };
    let program = driver.create_program(&desc).map_err(GPUError::ShaderLink)?;
    debug!("linked program {} for pipeline '{}'", program, p.name());

    objects.get_mut(pipeline)?.program = Some(program);
    Ok(program)
}
