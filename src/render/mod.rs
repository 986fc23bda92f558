mod renderer;
pub mod resources;
pub mod shaders;
pub mod targets;
pub mod uniforms;

use thiserror::Error;

pub use renderer::Renderer;
pub use uniforms::{pack_lights, FrameCamera, PackedLights};

/// Fatal GPU startup failures.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("window has zero area")]
    ZeroSizedWindow,
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("render target {target} is incomplete: {message}")]
    IncompleteTarget {
        target: &'static str,
        message: String,
    },
}
