use log::{trace, warn};

use crate::gpu::device::Device;
use crate::gpu::driver::command::*;
use crate::gpu::driver::native::{native, Driver};
use crate::gpu::driver::state::{set_if_changed, BindCategory, ExecutionContext, RenderPass};
use crate::gpu::driver::types::*;
use crate::gpu::error::{GPUError, Result};
use crate::gpu::object::Registry;
use crate::gpu::resources::pipeline::ensure_program;
use crate::gpu::resources::Surface;
use crate::gpu::structs::{BlitMask, ClearFlags, DepthFormat, Filter};
use crate::utils::Handle;

use super::pipeline_state::{apply_pipeline_state, issue_stencil_funcs};

/// Replays decoded commands against one context.
///
/// Borrows the pieces of a [`Device`] it needs separately so resource
/// lookups, cache updates and driver calls can interleave.
pub(crate) struct Translator<'a, D: Driver> {
    pub(crate) objects: &'a mut Registry,
    pub(crate) ctx: &'a mut ExecutionContext,
    pub(crate) driver: &'a mut D,
    validate: bool,
    backbuffer: [u32; 2],
}

impl<'a, D: Driver> Translator<'a, D> {
    #[inline]
    pub(crate) fn native(&self, value: impl Into<Abstract>) -> Result<NativeEnum> {
        native(&*self.driver, value)
    }

    fn require(&self, op: Op) -> Result<()> {
        if !self.driver.techniques().contains(op.techniques()) {
            return Err(GPUError::UnsupportedCommand(op as u32));
        }
        Ok(())
    }

    fn bind_draw_framebuffer(&mut self, framebuffer: NativeHandle, size: [u32; 2]) {
        if self.ctx.bind(BindCategory::DrawFramebuffer, framebuffer) {
            self.driver.issue(NativeCall::BindFramebuffer {
                target: FramebufferTarget::Draw,
                framebuffer,
            });
        }
        self.ctx.framebuffer_size = Some(size);
    }

    fn bind_read_framebuffer(&mut self, framebuffer: NativeHandle) {
        if self.ctx.bind(BindCategory::ReadFramebuffer, framebuffer) {
            self.driver.issue(NativeCall::BindFramebuffer {
                target: FramebufferTarget::Read,
                framebuffer,
            });
        }
    }

    fn surface_target(&self, surface: Handle<Surface>) -> Result<(NativeHandle, [u32; 2], ClearFlags)> {
        let s = self.objects.get(surface)?;
        let fb = s.framebuffer().ok_or_else(|| {
            GPUError::invalid(format!("surface '{}' is suspended", s.name()))
        })?;

        let mut planes = ClearFlags::empty();
        if !s.color_formats().is_empty() {
            planes |= ClearFlags::COLOR;
        }
        if s.depth_format() != DepthFormat::None {
            planes |= ClearFlags::DEPTH;
        }
        if s.depth_format().has_stencil() {
            planes |= ClearFlags::STENCIL;
        }
        Ok((fb, s.size(), planes))
    }

    /// Pushes the clear values `flags` will use, skipping unchanged ones.
    fn apply_clear_values(&mut self, flags: ClearFlags) {
        let ctx = &mut *self.ctx;
        if flags.contains(ClearFlags::COLOR) && set_if_changed(&mut ctx.applied_clear_color, ctx.clear_color) {
            self.driver.issue(NativeCall::ClearColor(ctx.clear_color));
        }
        if flags.contains(ClearFlags::DEPTH) && set_if_changed(&mut ctx.applied_clear_depth, ctx.clear_depth) {
            self.driver.issue(NativeCall::ClearDepth(ctx.clear_depth));
        }
        if flags.contains(ClearFlags::STENCIL)
            && set_if_changed(&mut ctx.applied_clear_stencil, ctx.clear_stencil)
        {
            self.driver.issue(NativeCall::ClearStencil(ctx.clear_stencil));
        }
    }

    /// A zero extent stands for the bound framebuffer.
    fn resolve_region(&self, region: &ViewRegion) -> Result<([i32; 2], [u32; 2])> {
        if !region.size.contains(&0) {
            return Ok((region.offset, region.size));
        }
        let size = self
            .ctx
            .framebuffer_size
            .ok_or(GPUError::NothingBound("framebuffer"))?;
        Ok((region.offset, size))
    }

    fn apply_viewport(&mut self, region: ([i32; 2], [u32; 2])) {
        if set_if_changed(&mut self.ctx.viewport, region) {
            self.driver.issue(NativeCall::Viewport {
                offset: region.0,
                size: region.1,
            });
        }
    }

    fn apply_scissor(&mut self, region: ([i32; 2], [u32; 2])) {
        if set_if_changed(&mut self.ctx.scissor, region) {
            self.driver.issue(NativeCall::Scissor {
                offset: region.0,
                size: region.1,
            });
        }
    }

    fn enable_scissor(&mut self, enable: bool) {
        if set_if_changed(&mut self.ctx.scissor_enabled, enable) {
            self.driver.issue(if enable {
                NativeCall::Enable(Capability::ScissorTest)
            } else {
                NativeCall::Disable(Capability::ScissorTest)
            });
        }
    }

    fn blit(
        &mut self,
        src: NativeHandle,
        dst: NativeHandle,
        src_area: [i32; 4],
        dst_area: [i32; 4],
        mask: BlitMask,
        filter: Filter,
    ) -> Result<()> {
        let filter = self.native(filter)?;
        self.bind_read_framebuffer(src);
        let size = [
            dst_area[2].abs_diff(dst_area[0]),
            dst_area[3].abs_diff(dst_area[1]),
        ];
        self.bind_draw_framebuffer(dst, size);
        self.driver.issue(NativeCall::BlitFramebuffer {
            src: src_area,
            dst: dst_area,
            mask,
            filter,
        });
        Ok(())
    }
}

/// `[x, y, w, h]` to corners, an all zero area meaning the whole surface.
/// The area must lie inside `size`.
fn corners(area: [u32; 4], size: [u32; 2]) -> Result<[i32; 4]> {
    let [x, y, w, h] = if area == [0; 4] {
        [0, 0, size[0], size[1]]
    } else {
        area
    };
    let right = x.checked_add(w).filter(|r| *r <= size[0]);
    let bottom = y.checked_add(h).filter(|b| *b <= size[1]);
    let (Some(right), Some(bottom)) = (right, bottom) else {
        return Err(GPUError::invalid(format!(
            "blit area {area:?} exceeds the {}x{} surface",
            size[0], size[1]
        )));
    };
    let to_i32 = |v: u32| {
        i32::try_from(v).map_err(|_| GPUError::invalid(format!("blit area {area:?} is out of range")))
    };
    Ok([to_i32(x)?, to_i32(y)?, to_i32(right)?, to_i32(bottom)?])
}

impl<'a, D: Driver> CommandSink for Translator<'a, D> {
    fn bind_pipeline(&mut self, cmd: &BindPipeline) -> Result<()> {
        let program = ensure_program(self.objects, self.driver, cmd.pipeline)?;
        if self.ctx.bind(BindCategory::Program, program) {
            self.driver.issue(NativeCall::UseProgram(program));
        }

        let p = self.objects.get(cmd.pipeline)?;
        if p.is_graphics() {
            apply_pipeline_state(self.ctx, self.driver, p.info())?;
        }
        self.ctx.pipeline = Some(cmd.pipeline);
        Ok(())
    }

    fn bind_descriptors(&mut self, cmd: &BindDescriptors) -> Result<()> {
        self.resolve_descriptors(cmd.descriptors)?;
        self.ctx.descriptors = Some(cmd.descriptors);
        Ok(())
    }

    fn bind_primitive_buffer(&mut self, cmd: &BindPrimitiveBuffer) -> Result<()> {
        self.bind_vertex_layout(cmd.buffer)?;
        self.ctx.primitive_buffer = Some(cmd.buffer);
        Ok(())
    }

    fn begin_query(&mut self, cmd: &BeginQuery) -> Result<()> {
        if self.ctx.active_query.is_some() {
            return Err(GPUError::invalid("a query is already active on this context"));
        }
        let q = self.objects.get(cmd.query)?;
        let (target, query) = (self.native(q.kind())?, q.native);
        self.driver.issue(NativeCall::BeginQuery { target, query });
        self.ctx.active_query = Some(cmd.query);
        Ok(())
    }

    fn end_query(&mut self, _cmd: &EndQuery) -> Result<()> {
        let h = self
            .ctx
            .active_query
            .take()
            .ok_or(GPUError::NothingBound("query"))?;
        let target = self.native(self.objects.get(h)?.kind())?;
        self.driver.issue(NativeCall::EndQuery { target });
        Ok(())
    }

    fn begin_framebuffer(&mut self, cmd: &BeginFramebuffer) -> Result<()> {
        if self.ctx.render_pass != RenderPass::Idle {
            return Err(GPUError::RenderPassActive);
        }

        let (fb, size, planes) = self.surface_target(cmd.target)?;
        self.bind_draw_framebuffer(fb, size);
        self.apply_viewport(([0, 0], size));
        self.apply_clear_values(planes);
        self.driver.issue(NativeCall::Clear(planes));

        self.ctx.render_pass = RenderPass::Active(cmd.target);
        Ok(())
    }

    fn end_framebuffer(&mut self, _cmd: &EndFramebuffer) -> Result<()> {
        if self.ctx.render_pass == RenderPass::Idle {
            return Err(GPUError::NoRenderPass);
        }
        self.ctx.render_pass = RenderPass::Idle;
        Ok(())
    }

    fn draw_instanced(&mut self, cmd: &DrawInstanced) -> Result<()> {
        if self.ctx.render_pass == RenderPass::Idle {
            return Err(GPUError::NoRenderPass);
        }

        let ph = self.ctx.pipeline.ok_or(GPUError::NothingBound("pipeline"))?;
        let p = self.objects.get(ph)?;
        if !p.is_graphics() {
            return Err(GPUError::NothingBound("graphics pipeline"));
        }
        let mode = self.native(p.info().topology)?;

        let pb = match self.ctx.primitive_buffer {
            Some(h) => Some(self.objects.get(h)?),
            None => None,
        };
        if self.validate {
            let matches = match pb {
                Some(pb) => pb.match_layout(&p.info().attribute_layout),
                None => p.info().attribute_layout.is_empty(),
            };
            if !matches {
                return Err(GPUError::LayoutMismatch);
            }
        }

        let call = if cmd.is_indexed() {
            let index = pb
                .and_then(|pb| pb.index_layout())
                .ok_or(GPUError::NothingBound("index buffer"))?;
            let format = index.attributes.formats().next().ok_or(GPUError::NothingBound("index buffer"))?;
            NativeCall::DrawElements {
                mode,
                count: cmd.count,
                index_type: self.native(Abstract::AttributeType(format))?,
                offset: index.offset + cmd.start as u64 * format.stride() as u64,
                instances: cmd.instance_count,
                base_vertex: cmd.vertex_start,
                base_instance: cmd.instance_start,
            }
        } else {
            NativeCall::DrawArrays {
                mode,
                first: cmd.start,
                count: cmd.count,
                instances: cmd.instance_count,
                base_instance: cmd.instance_start,
            }
        };
        self.driver.issue(call);
        Ok(())
    }

    fn dispatch(&mut self, cmd: &Dispatch) -> Result<()> {
        let ph = self.ctx.pipeline.ok_or(GPUError::NothingBound("pipeline"))?;
        let p = self.objects.get(ph)?;
        if !p.is_compute() {
            return Err(GPUError::NothingBound("compute pipeline"));
        }

        let group = p.info().group_size;
        let groups = [0, 1, 2].map(|i| cmd.thread_count[i].div_ceil(group[i]));
        self.driver.issue(NativeCall::DispatchCompute(groups));
        Ok(())
    }

    fn trace_rays(&mut self, cmd: &TraceRays) -> Result<()> {
        self.require(Op::TraceRays)?;
        let ph = self.ctx.pipeline.ok_or(GPUError::NothingBound("pipeline"))?;
        if !self.objects.get(ph)?.is_raytracing() {
            return Err(GPUError::NothingBound("raytracing pipeline"));
        }
        self.driver.issue(NativeCall::TraceRays(cmd.thread_count));
        Ok(())
    }

    fn set_clear_stencil(&mut self, cmd: &SetClearStencil) -> Result<()> {
        self.ctx.clear_stencil = cmd.value;
        Ok(())
    }

    fn set_clear_depth(&mut self, cmd: &SetClearDepth) -> Result<()> {
        self.ctx.clear_depth = cmd.value;
        Ok(())
    }

    fn set_blend_constants(&mut self, cmd: &SetBlendConstants) -> Result<()> {
        if set_if_changed(&mut self.ctx.blend_color, cmd.value) {
            self.driver.issue(NativeCall::BlendColor(cmd.value));
        }
        Ok(())
    }

    fn set_stencil_compare_mask(&mut self, cmd: &SetStencilCompareMask) -> Result<()> {
        if !set_if_changed(&mut self.ctx.stencil_compare_mask, cmd.mask) {
            return Ok(());
        }
        if let Some(ds) = self.ctx.applied.map(|a| a.depth_stencil) {
            if ds.enable_stencil {
                issue_stencil_funcs(self.driver, &ds, cmd.mask)?;
            }
        }
        Ok(())
    }

    fn set_stencil_write_mask(&mut self, cmd: &SetStencilWriteMask) -> Result<()> {
        if set_if_changed(&mut self.ctx.stencil_write_mask, cmd.mask) {
            self.driver.issue(NativeCall::StencilMask(cmd.mask));
        }
        Ok(())
    }

    fn set_clear_color(&mut self, cmd: &SetClearColor) -> Result<()> {
        self.ctx.clear_color = cmd.value();
        Ok(())
    }

    fn set_scissor(&mut self, cmd: &SetScissor) -> Result<()> {
        let region = self.resolve_region(&cmd.0)?;
        self.enable_scissor(true);
        self.apply_scissor(region);
        Ok(())
    }

    fn set_viewport(&mut self, cmd: &SetViewport) -> Result<()> {
        let region = self.resolve_region(&cmd.0)?;
        self.apply_viewport(region);
        Ok(())
    }

    fn set_viewport_and_scissor(&mut self, cmd: &SetViewportAndScissor) -> Result<()> {
        let region = self.resolve_region(&cmd.0)?;
        self.apply_viewport(region);
        self.apply_scissor(region);
        self.enable_scissor(false);
        Ok(())
    }

    fn blit_framebuffer(&mut self, cmd: &BlitFramebuffer) -> Result<()> {
        if self.ctx.render_pass != RenderPass::Idle {
            return Err(GPUError::RenderPassActive);
        }

        let (src, src_size, _) = self.surface_target(cmd.src)?;
        let (dst, dst_size) = if cmd.dst.valid() {
            let (fb, size, _) = self.surface_target(cmd.dst)?;
            (fb, size)
        } else {
            (0, self.backbuffer)
        };

        self.blit(
            src,
            dst,
            corners(cmd.src_area, src_size)?,
            corners(cmd.dst_area, dst_size)?,
            cmd.mask(),
            cmd.filter(),
        )
    }

    fn clear_framebuffer(&mut self, cmd: &ClearFramebuffer) -> Result<()> {
        match self.ctx.render_pass {
            RenderPass::Active(target) if target != cmd.target => {
                return Err(GPUError::RenderPassActive)
            }
            _ => {}
        }

        let (fb, size, planes) = self.surface_target(cmd.target)?;
        let flags = cmd.flags() & planes;
        if flags.is_empty() {
            trace!("clear of {:?} selects no attachment", cmd.target);
            return Ok(());
        }

        self.bind_draw_framebuffer(fb, size);
        self.apply_clear_values(flags);
        self.driver.issue(NativeCall::Clear(flags));
        Ok(())
    }

    fn debug_start_region(&mut self, cmd: &DebugStartRegion) -> Result<()> {
        self.driver
            .issue(NativeCall::PushDebugGroup(cmd.0.as_str().to_string()));
        Ok(())
    }

    fn debug_insert_marker(&mut self, cmd: &DebugInsertMarker) -> Result<()> {
        self.driver
            .issue(NativeCall::InsertDebugMarker(cmd.0.as_str().to_string()));
        Ok(())
    }

    fn debug_end_region(&mut self, _cmd: &DebugEndRegion) -> Result<()> {
        self.driver.issue(NativeCall::PopDebugGroup);
        Ok(())
    }
}

//===----------------------------------------------------------------------===//
// Submission
//===----------------------------------------------------------------------===//

impl<D: Driver> Device<D> {
    fn translator(&mut self, ctx: Handle<ExecutionContext>) -> Result<Translator<'_, D>> {
        let validate = self.info().validate_layouts;
        let backbuffer = self.backbuffer;
        let context = self
            .contexts
            .get_mut_ref(ctx)
            .ok_or(GPUError::StaleHandle("execution context"))?;
        context.check_thread()?;

        for obj in context.drain_deletions() {
            trace!("deleting {obj:?}");
            self.driver.destroy(obj);
        }

        Ok(Translator {
            objects: &mut self.objects,
            ctx: context,
            driver: &mut self.driver,
            validate,
            backbuffer,
        })
    }

    /// Replays `lists` in order on `ctx`, stopping at the first error.
    pub fn execute(&mut self, ctx: Handle<ExecutionContext>, lists: &[&CommandList]) -> Result<()> {
        let mut t = self.translator(ctx)?;
        for list in lists {
            list.replay(&mut t)?;
        }
        Ok(())
    }

    /// Executes `lists` against the backbuffer, copies `intermediate` into it
    /// flipped vertically, and shows the result.
    pub fn present(
        &mut self,
        ctx: Handle<ExecutionContext>,
        intermediate: Option<Handle<Surface>>,
        lists: &[&CommandList],
    ) -> Result<()> {
        let backbuffer = self.backbuffer;
        let source = match intermediate {
            Some(h) => {
                let s = self.objects.get(h)?;
                if s.size() != backbuffer {
                    return Err(GPUError::SizeMismatch {
                        intermediate: s.size(),
                        target: backbuffer,
                    });
                }
                s.framebuffer()
            }
            None => {
                warn!("presenting without an intermediate surface");
                None
            }
        };

        let mut t = self.translator(ctx)?;
        if t.ctx.render_pass != RenderPass::Idle {
            return Err(GPUError::RenderPassActive);
        }
        t.bind_draw_framebuffer(0, backbuffer);
        for list in lists {
            list.replay(&mut t)?;
        }
        if t.ctx.render_pass != RenderPass::Idle {
            return Err(GPUError::RenderPassActive);
        }

        if let Some(src) = source {
            let [w, h] = backbuffer.map(|v| v as i32);
            t.blit(
                src,
                0,
                [0, 0, w, h],
                [0, h, w, 0],
                BlitMask::COLOR,
                Filter::Linear,
            )?;
        }

        t.driver.present();
        t.ctx.advance_frame();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_area_covers_the_surface() {
        assert_eq!(corners([0; 4], [640, 480]).unwrap(), [0, 0, 640, 480]);
        assert_eq!(corners([10, 20, 30, 40], [640, 480]).unwrap(), [10, 20, 40, 60]);
    }

    #[test]
    fn areas_outside_the_surface_are_rejected() {
        assert!(matches!(
            corners([u32::MAX, 0, 2, 2], [640, 480]),
            Err(GPUError::InvalidInfo(_))
        ));
        assert!(corners([600, 0, 41, 10], [640, 480]).is_err());
        assert!(corners([0, 0, 1, 1], [u32::MAX, u32::MAX]).is_ok());
        assert!(corners([0, 0, u32::MAX, 1], [u32::MAX, u32::MAX]).is_err());
    }
}
