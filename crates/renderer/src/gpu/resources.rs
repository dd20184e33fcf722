use image::imageops::flip_vertical_in_place;
use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::error::{scoped, RenderError};
use crate::geometry::{generate_mesh, Mesh, GRID_DIVISIONS, TEAR_GAP};
use crate::plan::{MeshKind, TextureKind};
use crate::types::SceneImages;

use super::context::{GpuContext, SurfaceColorSpace};
use super::pipeline::PipelineLayouts;

pub(crate) struct MeshBuffer {
    pub buffer: wgpu::Buffer,
    pub vertex_count: u32,
}

pub(crate) struct SceneTexture {
    _texture: wgpu::Texture,
    _view: wgpu::TextureView,
    _sampler: wgpu::Sampler,
    pub bind_group: wgpu::BindGroup,
    pub size: (u32, u32),
}

/// GPU copies of both meshes and both images, created once at start-up.
pub(crate) struct GpuResources {
    tight: MeshBuffer,
    gapped: MeshBuffer,
    photo: SceneTexture,
    frame: SceneTexture,
}

impl GpuResources {
    pub(crate) fn new(
        context: &GpuContext,
        layouts: &PipelineLayouts,
        images: &SceneImages,
    ) -> Result<Self, RenderError> {
        let tight = upload_mesh(&context.device, "tight mesh", &generate_mesh(GRID_DIVISIONS, 0.0)?)?;
        let gapped = upload_mesh(
            &context.device,
            "gapped mesh",
            &generate_mesh(GRID_DIVISIONS, TEAR_GAP)?,
        )?;

        let photo = upload_texture(context, layouts, "photo texture", &images.photo)?;
        let frame = upload_texture(context, layouts, "frame texture", &images.frame)?;
        tracing::debug!(
            photo = ?photo.size,
            frame = ?frame.size,
            vertices = tight.vertex_count,
            "uploaded scene resources"
        );

        Ok(Self {
            tight,
            gapped,
            photo,
            frame,
        })
    }

    pub(crate) fn mesh(&self, kind: MeshKind) -> &MeshBuffer {
        match kind {
            MeshKind::Tight => &self.tight,
            MeshKind::Gapped => &self.gapped,
        }
    }

    pub(crate) fn texture(&self, kind: TextureKind) -> &SceneTexture {
        match kind {
            TextureKind::Photo => &self.photo,
            TextureKind::Frame => &self.frame,
        }
    }
}

pub(crate) fn upload_mesh(
    device: &wgpu::Device,
    label: &'static str,
    mesh: &Mesh,
) -> Result<MeshBuffer, RenderError> {
    if mesh.vertices().is_empty() {
        return Err(RenderError::resource(label, "mesh has no vertices"));
    }
    let (buffer, captured) = scoped(device, wgpu::ErrorFilter::OutOfMemory, || {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(mesh.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        })
    });
    if let Some(err) = captured {
        return Err(RenderError::resource(label, err.to_string()));
    }
    Ok(MeshBuffer {
        buffer,
        vertex_count: mesh.vertex_count(),
    })
}

pub(crate) fn upload_texture(
    context: &GpuContext,
    layouts: &PipelineLayouts,
    label: &'static str,
    image: &RgbaImage,
) -> Result<SceneTexture, RenderError> {
    let (width, height) = image.dimensions();
    check_texture_size(width, height, context.max_texture_dimension)
        .map_err(|reason| RenderError::resource(label, reason))?;

    let rgba = upload_pixels(image);
    let device = &context.device;
    let descriptor = texture_descriptor(label, width, height, texture_format(context.color_space));
    let (texture, captured) = scoped(device, wgpu::ErrorFilter::OutOfMemory, || {
        device.create_texture_with_data(
            &context.queue,
            &descriptor,
            wgpu::util::TextureDataOrder::LayerMajor,
            rgba.as_raw(),
        )
    });
    if let Some(err) = captured {
        return Err(RenderError::resource(label, err.to_string()));
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&sampler_descriptor(label));
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: &layouts.texture_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    });

    Ok(SceneTexture {
        _texture: texture,
        _view: view,
        _sampler: sampler,
        bind_group,
        size: (width, height),
    })
}

/// Row order the GPU expects: images are stored top-down, while texture
/// coordinates put v = 0 at the bottom.
fn upload_pixels(image: &RgbaImage) -> RgbaImage {
    let mut rgba = image.clone();
    flip_vertical_in_place(&mut rgba);
    rgba
}

fn texture_descriptor(
    label: &'static str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> wgpu::TextureDescriptor<'static> {
    wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    }
}

fn sampler_descriptor(label: &'static str) -> wgpu::SamplerDescriptor<'static> {
    wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    }
}

fn texture_format(color_space: SurfaceColorSpace) -> wgpu::TextureFormat {
    color_space.texture_format()
}

fn check_texture_size(width: u32, height: u32, max_dimension: u32) -> Result<(), String> {
    if width == 0 || height == 0 {
        return Err(format!("image is empty ({width}x{height})"));
    }
    if width > max_dimension || height > max_dimension {
        return Err(format!(
            "image is {width}x{height} but the device allows at most {max_dimension} per side"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_images() {
        assert!(check_texture_size(0, 10, 8192).is_err());
        assert!(check_texture_size(10, 0, 8192).is_err());
    }

    #[test]
    fn rejects_oversized_images() {
        let err = check_texture_size(9000, 10, 8192).unwrap_err();
        assert!(err.contains("8192"));
        assert!(check_texture_size(8192, 8192, 8192).is_ok());
    }

    #[test]
    fn upload_flips_rows() {
        let mut image = RgbaImage::new(1, 2);
        image.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        image.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
        let flipped = upload_pixels(&image);
        assert_eq!(flipped.dimensions(), (1, 2));
        assert_eq!(flipped.get_pixel(0, 0), &image::Rgba([0, 0, 255, 255]));
        assert_eq!(flipped.get_pixel(0, 1), &image::Rgba([255, 0, 0, 255]));
        assert_eq!(image.get_pixel(0, 0), &image::Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn textures_have_one_mip_level() {
        let descriptor = texture_descriptor("photo", 64, 32, wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(descriptor.mip_level_count, 1);
        assert_eq!(descriptor.sample_count, 1);
        assert_eq!(descriptor.size.width, 64);
        assert_eq!(descriptor.size.height, 32);
        assert_eq!(descriptor.dimension, wgpu::TextureDimension::D2);
    }

    #[test]
    fn samplers_clamp_and_filter_linearly() {
        let descriptor = sampler_descriptor("photo");
        assert_eq!(descriptor.address_mode_u, wgpu::AddressMode::ClampToEdge);
        assert_eq!(descriptor.address_mode_v, wgpu::AddressMode::ClampToEdge);
        assert_eq!(descriptor.mag_filter, wgpu::FilterMode::Linear);
        assert_eq!(descriptor.min_filter, wgpu::FilterMode::Linear);
    }

    #[test]
    fn format_follows_color_space() {
        assert_eq!(
            texture_format(SurfaceColorSpace::Gamma),
            wgpu::TextureFormat::Rgba8Unorm
        );
        assert_eq!(
            texture_format(SurfaceColorSpace::Linear),
            wgpu::TextureFormat::Rgba8UnormSrgb
        );
    }
}
