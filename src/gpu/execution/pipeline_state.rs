//! Field-by-field diff of fixed function state on pipeline binds.

use crate::gpu::driver::native::{native, Driver};
use crate::gpu::driver::state::{set_if_changed, ExecutionContext, PipelineState};
use crate::gpu::driver::types::{Capability, NativeCall, StencilFace};
use crate::gpu::error::Result;
use crate::gpu::resources::PipelineInfo;
use crate::gpu::structs::{BlendState, CullMode, DepthStencil};

#[inline]
fn changed<T: PartialEq>(prev: Option<T>, next: T) -> bool {
    prev.as_ref() != Some(&next)
}

fn toggle<D: Driver>(driver: &mut D, cap: Capability, prev: Option<bool>, next: bool) {
    if changed(prev, next) {
        driver.issue(if next {
            NativeCall::Enable(cap)
        } else {
            NativeCall::Disable(cap)
        });
    }
}

pub(crate) fn issue_stencil_funcs<D: Driver>(driver: &mut D, ds: &DepthStencil, compare_mask: u32) -> Result<()> {
    for (face, s) in [(StencilFace::Front, ds.front), (StencilFace::Back, ds.back)] {
        driver.issue(NativeCall::StencilFunc {
            face,
            func: native(&*driver, s.compare)?,
            reference: ds.stencil_reference as u32,
            mask: compare_mask,
        });
    }
    Ok(())
}

/// Pushes the rasterizer, blend and depth/stencil state of `info`, issuing
/// only what differs from the state last applied on `ctx`.
///
/// Sub-state guarded by a toggle (cull mode and winding, blend equations
/// and factors, depth func, stencil funcs) is only compared while that
/// toggle is on. Turning it back on reissues the sub-state.
pub(crate) fn apply_pipeline_state<D: Driver>(
    ctx: &mut ExecutionContext,
    driver: &mut D,
    info: &PipelineInfo,
) -> Result<()> {
    let next = PipelineState {
        rasterizer: info.rasterizer,
        blend: info.blend_state,
        depth_stencil: info.depth_stencil,
        min_sample_shading: info.msaa.min_sample_shading,
    };
    let prev = ctx.applied;
    if prev == Some(next) {
        return Ok(());
    }

    // Rasterizer.
    let r = next.rasterizer;
    let pr = prev.map(|p| p.rasterizer);
    let cull = r.cull != CullMode::None;
    let was_culling = pr.map(|p| p.cull != CullMode::None);
    toggle(driver, Capability::CullFace, was_culling, cull);
    if cull {
        let resend = was_culling != Some(true);
        if resend || changed(pr.map(|p| p.cull), r.cull) {
            driver.issue(NativeCall::CullFace(native(&*driver, r.cull)?));
        }
        if resend || changed(pr.map(|p| p.winding), r.winding) {
            driver.issue(NativeCall::FrontFace(native(&*driver, r.winding)?));
        }
    }
    if changed(pr.map(|p| p.fill), r.fill) {
        driver.issue(NativeCall::PolygonMode(native(&*driver, r.fill)?));
    }

    // Multisampling.
    let shading = next.min_sample_shading > 0.0;
    let prev_shading = prev.map(|p| p.min_sample_shading);
    toggle(
        driver,
        Capability::SampleShading,
        prev_shading.map(|s| s > 0.0),
        shading,
    );
    if shading && changed(prev_shading, next.min_sample_shading) {
        driver.issue(NativeCall::MinSampleShading(next.min_sample_shading));
    }

    // Blending.
    let b = next.blend;
    let pb = prev.map(|p| p.blend);
    if changed(pb.map(|p| p.write_mask), b.write_mask) {
        driver.issue(NativeCall::ColorMask(b.write_mask));
    }
    let was_blending = pb.map(|p| p.blend_enable);
    toggle(driver, Capability::Blend, was_blending, b.blend_enable);
    if b.blend_enable {
        let resend = was_blending != Some(true);
        if set_if_changed(&mut ctx.blend_color, b.blend_factor) {
            driver.issue(NativeCall::BlendColor(b.blend_factor));
        }
        if resend || changed(pb.map(|p| (p.blend_op, p.alpha_blend_op)), (b.blend_op, b.alpha_blend_op)) {
            driver.issue(NativeCall::BlendEquation {
                color: native(&*driver, b.blend_op)?,
                alpha: native(&*driver, b.alpha_blend_op)?,
            });
        }
        let funcs = |s: &BlendState| {
            (s.src_blend, s.dst_blend, s.alpha_src_blend, s.alpha_dst_blend)
        };
        if resend || changed(pb.as_ref().map(funcs), funcs(&b)) {
            driver.issue(NativeCall::BlendFunc {
                src_color: native(&*driver, b.src_blend)?,
                dst_color: native(&*driver, b.dst_blend)?,
                src_alpha: native(&*driver, b.alpha_src_blend)?,
                dst_alpha: native(&*driver, b.alpha_dst_blend)?,
            });
        }
    }
    let was_logic = pb.map(|p| p.logic_op_enabled());
    toggle(driver, Capability::ColorLogicOp, was_logic, b.logic_op_enabled());
    if b.logic_op_enabled() && (was_logic != Some(true) || changed(pb.map(|p| p.logic_op), b.logic_op)) {
        driver.issue(NativeCall::LogicOp(native(&*driver, b.logic_op)?));
    }

    // Depth.
    let ds = next.depth_stencil;
    let pds = prev.map(|p| p.depth_stencil);
    let was_testing = pds.map(|p| p.enable_depth_read);
    toggle(driver, Capability::DepthTest, was_testing, ds.enable_depth_read);
    if ds.enable_depth_read
        && (was_testing != Some(true) || changed(pds.map(|p| p.depth_compare), ds.depth_compare))
    {
        driver.issue(NativeCall::DepthFunc(native(&*driver, ds.depth_compare)?));
    }
    if changed(pds.map(|p| p.enable_depth_write), ds.enable_depth_write) {
        driver.issue(NativeCall::DepthMask(ds.enable_depth_write));
    }

    // Stencil.
    let was_stencil = pds.map(|p| p.enable_stencil);
    toggle(driver, Capability::StencilTest, was_stencil, ds.enable_stencil);
    if ds.enable_stencil {
        let resend = was_stencil != Some(true);
        let funcs = |d: &DepthStencil| {
            (d.front.compare, d.back.compare, d.stencil_reference, d.stencil_compare_mask)
        };
        if resend || changed(pds.as_ref().map(funcs), funcs(&ds)) {
            let mask = ds.stencil_compare_mask as u32;
            issue_stencil_funcs(driver, &ds, mask)?;
            ctx.stencil_compare_mask = Some(mask);
        }
        for (face, s, ps) in [
            (StencilFace::Front, ds.front, pds.map(|p| p.front)),
            (StencilFace::Back, ds.back, pds.map(|p| p.back)),
        ] {
            if resend || changed(ps.map(|p| (p.fail, p.depth_fail, p.pass)), (s.fail, s.depth_fail, s.pass)) {
                driver.issue(NativeCall::StencilOp {
                    face,
                    fail: native(&*driver, s.fail)?,
                    depth_fail: native(&*driver, s.depth_fail)?,
                    pass: native(&*driver, s.pass)?,
                });
            }
        }
        let write_mask = ds.stencil_write_mask as u32;
        if set_if_changed(&mut ctx.stencil_write_mask, write_mask) {
            driver.issue(NativeCall::StencilMask(write_mask));
        }
    }

    ctx.applied = Some(next);
    Ok(())
}
