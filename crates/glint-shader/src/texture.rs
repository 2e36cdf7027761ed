//! The shader's single optional texture.
//!
//! A 1x1 transparent placeholder is always bound so the program layout never changes;
//! loading an image swaps it out and flips the `has_texture` uniform.

use std::path::PathBuf;

use crate::error::ShaderError;

/// Where texture pixels come from.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    Path(PathBuf),
    /// Encoded image bytes (PNG, JPEG, ...).
    Bytes(Vec<u8>),
}

impl TextureSource {
    /// Decodes the source into RGBA8 pixels.
    pub fn decode(&self) -> Result<image::RgbaImage, ShaderError> {
        let img = match self {
            TextureSource::Path(path) => image::open(path)?,
            TextureSource::Bytes(bytes) => image::load_from_memory(bytes)?,
        };
        Ok(img.to_rgba8())
    }

    fn describe(&self) -> String {
        match self {
            TextureSource::Path(path) => path.display().to_string(),
            TextureSource::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

impl From<&str> for TextureSource {
    fn from(path: &str) -> Self {
        TextureSource::Path(PathBuf::from(path))
    }
}

impl From<PathBuf> for TextureSource {
    fn from(path: PathBuf) -> Self {
        TextureSource::Path(path)
    }
}

impl From<Vec<u8>> for TextureSource {
    fn from(bytes: Vec<u8>) -> Self {
        TextureSource::Bytes(bytes)
    }
}

/// GPU texture + view + sampler.
pub(crate) struct GpuTexture {
    _texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub(crate) size: (u32, u32),
}

impl GpuTexture {
    /// A 1x1 transparent texel.
    pub(crate) fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::upload(device, queue, 1, 1, &[0, 0, 0, 0], "glint placeholder texture")
    }

    pub(crate) fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &image::RgbaImage,
    ) -> Self {
        let (width, height) = image.dimensions();
        Self::upload(device, queue, width, height, image.as_raw(), "glint texture")
    }

    /// Decodes `source` and uploads it. Errors are logged by the caller.
    pub(crate) fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: &TextureSource,
    ) -> Result<Self, ShaderError> {
        let image = source.decode()?;
        check_size(image.dimensions(), device.limits().max_texture_dimension_2d)?;
        log::debug!(
            "loaded texture {} ({}x{})",
            source.describe(),
            image.width(),
            image.height()
        );
        Ok(Self::from_image(device, queue, &image))
    }

    fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        rgba: &[u8],
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("glint texture sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Self {
            _texture: texture,
            view,
            sampler,
            size: (width, height),
        }
    }
}

fn check_size((width, height): (u32, u32), max: u32) -> Result<(), ShaderError> {
    if width > max || height > max {
        return Err(ShaderError::TextureSize { width, height, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(pixel));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    #[test]
    fn decodes_png_bytes_to_rgba() {
        let source = TextureSource::from(png_bytes(3, 2, [10, 20, 30, 255]));
        let img = source.decode().unwrap();

        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1).0, [10, 20, 30, 255]);
    }

    #[test]
    fn garbage_bytes_are_a_texture_error() {
        let source = TextureSource::Bytes(vec![1, 2, 3, 4]);
        assert!(matches!(source.decode(), Err(ShaderError::Texture(_))));
    }

    #[test]
    fn missing_file_is_a_texture_error() {
        let source = TextureSource::from("does/not/exist.png");
        assert!(matches!(source.decode(), Err(ShaderError::Texture(_))));
    }

    #[test]
    fn describe_names_the_source() {
        assert_eq!(TextureSource::from("a/b.png").describe(), "a/b.png");
        assert_eq!(TextureSource::Bytes(vec![0; 5]).describe(), "<5 bytes>");
    }

    #[test]
    fn size_limit_applies_to_each_side() {
        assert!(check_size((8192, 8192), 8192).is_ok());
        assert!(matches!(
            check_size((8193, 1), 8192),
            Err(ShaderError::TextureSize { width: 8193, height: 1, max: 8192 })
        ));
        assert!(matches!(
            check_size((1, 9000), 8192),
            Err(ShaderError::TextureSize { .. })
        ));
    }

    #[test]
    fn oversized_image_is_rejected_before_upload() {
        let (device, queue) = wgpu::Device::noop(&wgpu::DeviceDescriptor::default());
        let max = device.limits().max_texture_dimension_2d;

        let source = TextureSource::from(png_bytes(max + 1, 1, [255, 0, 0, 255]));
        assert!(source.decode().is_ok());

        match GpuTexture::load(&device, &queue, &source) {
            Err(ShaderError::TextureSize { width, max: limit, .. }) => {
                assert_eq!(width, max + 1);
                assert_eq!(limit, max);
            }
            Err(other) => panic!("expected size error, got {other:?}"),
            Ok(_) => panic!("expected size error, got a texture"),
        }
    }

    #[test]
    fn image_within_limits_uploads() {
        let (device, queue) = wgpu::Device::noop(&wgpu::DeviceDescriptor::default());
        let source = TextureSource::from(png_bytes(4, 2, [0, 255, 0, 255]));

        let texture = GpuTexture::load(&device, &queue, &source).unwrap();
        assert_eq!(texture.size, (4, 2));
    }
}
