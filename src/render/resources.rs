use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbaImage;
use log::{error, warn};
use wgpu::util::DeviceExt;

use crate::config::RenderConfig;
use crate::obj::{load_obj, MeshData};
use crate::scene::ModelId;

pub const DIFFUSE_FALLBACK: [u8; 4] = [255, 255, 255, 255];
pub const SPECULAR_FALLBACK: [u8; 4] = [128, 128, 128, 255];

/// Skybox faces in cubemap layer order.
pub const SKYBOX_FACES: [&str; 6] = ["right", "left", "top", "bottom", "front", "back"];

pub struct GpuMesh {
    pub vertex: wgpu::Buffer,
    pub index: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn from_mesh(device: &wgpu::Device, mesh: &MeshData, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }
}

pub struct GpuModel {
    pub mesh: GpuMesh,
    pub material: wgpu::BindGroup,
}

/// Bind group layout shared by the scene and foliage pipelines (group 2).
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("material-bind-layout"),
        entries: &[
            texture(0),
            texture(1),
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

pub fn material_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    diffuse: &wgpu::Texture,
    specular: &wgpu::Texture,
    label: &str,
) -> wgpu::BindGroup {
    let diffuse = diffuse.create_view(&wgpu::TextureViewDescriptor::default());
    let specular = specular.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&diffuse),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&specular),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// Loads the mesh and maps of `model`, substituting a cube and neutral
/// textures for whatever is missing.
pub fn load_model(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    config: &RenderConfig,
    model: ModelId,
) -> GpuModel {
    let name = model.asset_name();
    let dir = config.object_dir(name);
    let mesh = match load_obj(dir.join(format!("{name}.obj"))) {
        Ok(mesh) => mesh,
        Err(err) => {
            error!("failed to load mesh {name}: {err:?}");
            MeshData::cube()
        }
    };
    let diffuse = load_texture_or(
        device,
        queue,
        &dir.join("diffuse.png"),
        wgpu::TextureFormat::Rgba8UnormSrgb,
        DIFFUSE_FALLBACK,
    );
    let specular = load_texture_or(
        device,
        queue,
        &dir.join("specular.png"),
        wgpu::TextureFormat::Rgba8Unorm,
        SPECULAR_FALLBACK,
    );
    GpuModel {
        mesh: GpuMesh::from_mesh(device, &mesh, name),
        material: material_bind_group(
            device,
            layout,
            sampler,
            &diffuse,
            &specular,
            &format!("{name}-material"),
        ),
    }
}

pub fn load_rgba(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path).with_context(|| format!("unable to decode {}", path.display()))?;
    Ok(image.to_rgba8())
}

pub fn load_texture_or(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: &Path,
    format: wgpu::TextureFormat,
    fallback: [u8; 4],
) -> wgpu::Texture {
    match load_rgba(path) {
        Ok(image) => upload_rgba(device, queue, &path.display().to_string(), &image, format),
        Err(err) => {
            warn!("using a flat texture instead of {}: {err:#}", path.display());
            let pixel = RgbaImage::from_pixel(1, 1, image::Rgba(fallback));
            upload_rgba(device, queue, "fallback-texture", &pixel, format)
        }
    }
}

pub fn upload_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    image: &RgbaImage,
    format: wgpu::TextureFormat,
) -> wgpu::Texture {
    device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: image.width(),
                height: image.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        image.as_raw(),
    )
}

pub fn skybox_paths(config: &RenderConfig) -> [PathBuf; 6] {
    SKYBOX_FACES.map(|face| config.texture_path(format!("skybox/{face}.jpg")))
}

/// Side length and layer-major pixels of a cubemap. Faces that failed to
/// load or disagree with the first face's size are left black.
pub fn assemble_cube_faces(faces: &[Option<RgbaImage>; 6]) -> (u32, Vec<u8>) {
    let side = faces
        .iter()
        .flatten()
        .map(|face| face.width())
        .find(|&width| width > 0)
        .unwrap_or(1);
    let face_len = (side * side * 4) as usize;
    let mut data = vec![0u8; face_len * 6];
    for (index, face) in faces.iter().enumerate() {
        match face {
            Some(face) if face.width() == side && face.height() == side => {
                data[index * face_len..(index + 1) * face_len].copy_from_slice(face.as_raw());
            }
            Some(face) => error!(
                "skybox face {} is {}x{}, expected {side}x{side}",
                SKYBOX_FACES[index],
                face.width(),
                face.height()
            ),
            None => {}
        }
    }
    (side, data)
}

pub fn load_cubemap(device: &wgpu::Device, queue: &wgpu::Queue, paths: &[PathBuf; 6]) -> wgpu::Texture {
    let faces = [0, 1, 2, 3, 4, 5].map(|index| match load_rgba(&paths[index]) {
        Ok(face) => Some(face),
        Err(err) => {
            error!("cubemap face failed to load: {err:#}");
            None
        }
    });
    let (side, data) = assemble_cube_faces(&faces);
    device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("skybox-cubemap"),
            size: wgpu::Extent3d {
                width: side,
                height: side,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &data,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn decodes_png_to_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grass.png");
        RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 40]))
            .save(&path)
            .unwrap();
        let image = load_rgba(&path).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1), &Rgba([10, 20, 30, 40]));
    }

    #[test]
    fn missing_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_rgba(&dir.path().join("absent.png")).is_err());
    }

    #[test]
    fn cube_faces_zero_fill_missing_layers() {
        let red = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
        let faces = [Some(red.clone()), None, Some(red), None, None, None];
        let (side, data) = assemble_cube_faces(&faces);
        assert_eq!(side, 2);
        assert_eq!(data.len(), 2 * 2 * 4 * 6);
        assert_eq!(&data[0..4], &[255, 0, 0, 255]);
        assert!(data[16..32].iter().all(|&b| b == 0));
        assert_eq!(&data[32..36], &[255, 0, 0, 255]);
    }

    #[test]
    fn mismatched_face_is_left_black() {
        let faces = [
            Some(RgbaImage::from_pixel(2, 2, Rgba([1, 1, 1, 1]))),
            Some(RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 9]))),
            None,
            None,
            None,
            None,
        ];
        let (side, data) = assemble_cube_faces(&faces);
        assert_eq!(side, 2);
        assert!(data[16..32].iter().all(|&b| b == 0));
    }

    #[test]
    fn skybox_faces_follow_layer_order() {
        let paths = skybox_paths(&RenderConfig::default());
        assert!(paths[0].ends_with("textures/skybox/right.jpg"));
        assert!(paths[5].ends_with("textures/skybox/back.jpg"));
    }
}
