//! WGSL sources for every render pass.
//!
//! The 3D passes are prefixed with `common.wgsl`, which declares the
//! group 0 scene block and a few helpers. Post-processing and the cursor
//! overlay are standalone.

macro_rules! scene_shader {
    ($file:literal) => {
        concat!(include_str!("shaders/common.wgsl"), include_str!($file))
    };
}

pub const TERRAIN: &str = scene_shader!("shaders/terrain.wgsl");
pub const PARTICLES: &str = scene_shader!("shaders/particles.wgsl");
pub const STARS: &str = scene_shader!("shaders/stars.wgsl");

pub const POST_BRIGHT: &str = include_str!("shaders/post_bright.wgsl");
pub const POST_BLUR: &str = include_str!("shaders/post_blur.wgsl");
pub const POST_COMPOSITE: &str = include_str!("shaders/post_composite.wgsl");

pub const OVERLAY: &str = include_str!("shaders/overlay.wgsl");

/// Every shader with a label, for validation.
pub const ALL: [(&str, &str); 7] = [
    ("terrain", TERRAIN),
    ("particles", PARTICLES),
    ("stars", STARS),
    ("post_bright", POST_BRIGHT),
    ("post_blur", POST_BLUR),
    ("post_composite", POST_COMPOSITE),
    ("overlay", OVERLAY),
];
