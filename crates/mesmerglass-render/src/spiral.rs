//! Spiral shader uniform contract (§4.5).
//!
//! Any fragment shader satisfying this layout is acceptable; the shipped
//! WGSL in `shaders/spiral.wgsl` is a reference implementation, its math
//! quoted verbatim in a header comment.

use bytemuck::{Pod, Zeroable};

/// Arm counts the spiral pattern is allowed to derive `width_degrees` from.
pub const VALID_ARM_COUNTS: [u32; 7] = [1, 2, 3, 4, 5, 6, 8];

/// Blend modes the `blend_mode` uniform selects between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BlendMode {
    /// Straight alpha-over.
    Normal = 0,
    /// Additive blend.
    Add = 1,
    /// Screen blend.
    Screen = 2,
}

/// Derive `width_degrees` from an arm count, per `arms = 360 / width`.
/// Returns `None` for an arm count outside [`VALID_ARM_COUNTS`].
pub fn width_degrees_for_arms(arms: u32) -> Option<u32> {
    if VALID_ARM_COUNTS.contains(&arms) {
        Some(360 / arms)
    } else {
        None
    }
}

/// GPU-layout uniform block for the spiral fragment shader (§4.5).
///
/// Field order and sizes are fixed by `#[repr(C)]` plus `bytemuck::Pod`
/// derivation; do not reorder without also updating `shaders/spiral.wgsl`'s
/// `SpiralUniforms` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SpiralUniforms {
    /// Surface width / height.
    pub aspect_ratio: f32,
    /// Stereoscopic near plane (0 when not stereoscopic).
    pub near_plane: f32,
    /// Stereoscopic far plane (0 when not stereoscopic).
    pub far_plane: f32,
    /// Stereoscopic eye offset (0 when not stereoscopic).
    pub eye_offset: f32,

    /// Pattern id, `1..=7`.
    pub spiral_type: u32,
    /// Derived via [`width_degrees_for_arms`].
    pub width_degrees: u32,
    /// Accumulated phase from [`crate::PhaseAccumulator::time_uniform`]. The
    /// shader must use this directly as the rotation angle input and must
    /// NOT re-multiply it by `rotation_speed` (double-scaling bug, §4.5).
    pub time: f32,
    /// Passthrough hint only; not used to scale `time` in the shader.
    pub rotation_speed: f32,

    /// Primary arm color.
    pub arm_color_a: [f32; 4],
    /// Gap/secondary arm color.
    pub arm_color_b: [f32; 4],

    /// Flip-wave animation state, `0` or `1`.
    pub flip_state: u32,
    /// Flip-wave radius.
    pub flip_wave_radius: f32,
    /// Flip-wave width.
    pub flip_wave_width: f32,
    /// Overall pattern intensity, `[0, 1]`.
    pub intensity: f32,

    /// Contrast adjustment.
    pub contrast: f32,
    /// Vignette strength.
    pub vignette: f32,
    /// Chromatic aberration shift.
    pub chromatic_shift: f32,
    /// Spiral layer opacity, `[0, 1]`.
    pub opacity: f32,

    /// [`BlendMode`] as a raw `u32`.
    pub blend_mode: u32,
    /// Background zoom origin scale.
    pub zoom_origin: f32,
    /// Background zoom target scale.
    pub zoom: f32,
    /// Interpolation factor between `zoom_origin` and `zoom`, `[0, 1]`.
    pub zoom_progress: f32,
}

impl SpiralUniforms {
    /// Build a uniform block from playback-level spiral parameters plus the
    /// per-frame accumulated phase and aspect ratio. `arms` is expected to be
    /// one of [`VALID_ARM_COUNTS`] — `Director` derives it from
    /// `playback.spiral.spiral_type` every frame, the enum has no variant
    /// outside `1..=7`, so this is never exercised in practice. It falls back
    /// to `360` (1 arm) for any other value rather than panicking.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        aspect_ratio: f32,
        spiral_type: u32,
        arms: u32,
        arm_color_a: [f32; 4],
        arm_color_b: [f32; 4],
        time: f32,
        rotation_speed: f32,
        opacity: f32,
        zoom_origin: f32,
        zoom: f32,
        zoom_progress: f32,
    ) -> Self {
        Self {
            aspect_ratio,
            near_plane: 0.0,
            far_plane: 0.0,
            eye_offset: 0.0,
            spiral_type,
            width_degrees: width_degrees_for_arms(arms).unwrap_or(360),
            time,
            rotation_speed,
            arm_color_a,
            arm_color_b,
            flip_state: 0,
            flip_wave_radius: 0.0,
            flip_wave_width: 0.0,
            intensity: 1.0,
            contrast: 1.0,
            vignette: 0.0,
            chromatic_shift: 0.0,
            opacity,
            blend_mode: BlendMode::Normal as u32,
            zoom_origin,
            zoom,
            zoom_progress,
        }
    }

    /// `current_zoom = mix(zoom_origin, zoom, zoom_progress)` per §4.5.
    pub fn current_zoom(&self) -> f32 {
        self.zoom_origin + (self.zoom - self.zoom_origin) * self.zoom_progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_degrees_matches_documented_table() {
        assert_eq!(width_degrees_for_arms(1), Some(360));
        assert_eq!(width_degrees_for_arms(2), Some(180));
        assert_eq!(width_degrees_for_arms(3), Some(120));
        assert_eq!(width_degrees_for_arms(4), Some(90));
        assert_eq!(width_degrees_for_arms(5), Some(72));
        assert_eq!(width_degrees_for_arms(6), Some(60));
        assert_eq!(width_degrees_for_arms(8), Some(45));
    }

    #[test]
    fn invalid_arm_count_is_rejected() {
        assert_eq!(width_degrees_for_arms(7), None);
        assert_eq!(width_degrees_for_arms(0), None);
    }

    #[test]
    fn current_zoom_interpolates_linearly() {
        let mut u = SpiralUniforms::new(
            16.0 / 9.0,
            1,
            4,
            [1.0, 0.0, 0.0, 1.0],
            [0.0, 0.0, 0.0, 1.0],
            0.0,
            20.0,
            1.0,
            1.0,
            2.0,
            0.5,
        );
        assert!((u.current_zoom() - 1.5).abs() < 1e-6);
        u.zoom_progress = 0.0;
        assert!((u.current_zoom() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn uniform_block_is_plain_old_data() {
        // bytemuck::Pod requires no padding gaps; this just exercises the
        // cast path a real wgpu buffer write would take.
        let u = SpiralUniforms::new(
            1.0,
            1,
            1,
            [0.0; 4],
            [0.0; 4],
            0.0,
            0.0,
            1.0,
            1.0,
            1.0,
            0.0,
        );
        let bytes: &[u8] = bytemuck::bytes_of(&u);
        assert_eq!(bytes.len(), std::mem::size_of::<SpiralUniforms>());
    }
}
