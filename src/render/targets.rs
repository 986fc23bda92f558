use super::RenderError;

pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

pub struct DepthBuffer {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl DepthBuffer {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    pub fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

pub struct ColorTarget {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl ColorTarget {
    fn create(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HDR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Scene pass output: lit colour, bright-pass colour and depth.
pub struct HdrTarget {
    pub color: ColorTarget,
    pub bright: ColorTarget,
    pub depth: DepthBuffer,
}

impl HdrTarget {
    pub fn create(device: &wgpu::Device, width: u32, height: u32) -> Result<Self, RenderError> {
        checked(device, "hdr-target", || Self {
            color: ColorTarget::create(device, "hdr-color", width, height),
            bright: ColorTarget::create(device, "hdr-bright", width, height),
            depth: DepthBuffer::create(device, width, height),
        })
    }
}

pub struct PingPong {
    pub targets: [ColorTarget; 2],
}

impl PingPong {
    pub fn create(device: &wgpu::Device, width: u32, height: u32) -> Result<Self, RenderError> {
        checked(device, "ping-pong", || Self {
            targets: [
                ColorTarget::create(device, "ping-pong-0", width, height),
                ColorTarget::create(device, "ping-pong-1", width, height),
            ],
        })
    }
}

/// Runs `create` inside a validation error scope so a rejected
/// attachment surfaces as [`RenderError::IncompleteTarget`] instead of an
/// uncaptured device error.
fn checked<T>(
    device: &wgpu::Device,
    target: &'static str,
    create: impl FnOnce() -> T,
) -> Result<T, RenderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(RenderError::IncompleteTarget {
            target,
            message: err.to_string(),
        }),
        None => Ok(value),
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: width.max(1),
        height: height.max(1),
        depth_or_array_layers: 1,
    }
}
