//! CPU reference for the fragment-shader colorspace conversion.
//!
//! BT.601 limited-range YUV → RGB with fixed-point-derived constants.
//! The fragment shader in [`surface`](crate::surface) applies exactly
//! these coefficients; this mirror exists so the conversion can be
//! exercised without a GPU. Keep both in sync; the constants are
//! fixed for visual parity, do not "improve" them.

/// Luma scale applied to all three channels.
pub const Y_MUL: f32 = 1.1643828125;

pub const R_V: f32 = 1.59602734375;
pub const R_OFF: f32 = 0.870787598;

pub const G_U: f32 = 0.39176171875;
pub const G_V: f32 = 0.81296875;
pub const G_OFF: f32 = 0.52959375;

pub const B_U: f32 = 2.01723046875;
pub const B_OFF: f32 = 1.081389160375;

/// Convert one normalized `[0, 1]` YUV sample triple to RGB.
///
/// Pure function; the output is bit-reproducible for a given input.
/// Values are *not* clamped; the render target does that, exactly as
/// the GPU pipeline behaves.
pub fn yuv_to_rgb(y: f32, u: f32, v: f32) -> [f32; 3] {
    let fymul = y * Y_MUL;
    let r = fymul + R_V * v - R_OFF;
    let g = fymul - G_U * u - G_V * v + G_OFF;
    let b = fymul + B_U * u - B_OFF;
    [r, g, b]
}
