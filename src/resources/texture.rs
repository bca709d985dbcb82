//! Texture data and GPU upload

use crate::backend::traits::*;
use crate::backend::types::*;

/// Decoded RGBA8 texture data
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub name: String,
}

impl TextureData {
    /// Decode texture data from an encoded image (PNG, JPEG, ...)
    pub fn from_bytes(bytes: &[u8], name: &str) -> Result<Self, String> {
        let img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
            name: name.to_string(),
        })
    }

    /// A 1x1 solid color texture
    pub fn solid_color(color: [u8; 4], name: &str) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: color.to_vec(),
            name: name.to_string(),
        }
    }

    /// The opaque-white fallback bound wherever a material leaves a texture
    /// slot empty, so no shader-resource slot is ever sampled null.
    pub fn white() -> Self {
        Self::solid_color([255, 255, 255, 255], "white_fallback")
    }

    /// Flip rows vertically in place
    pub fn flip_vertically(&mut self) {
        let row_size = (self.width * 4) as usize;
        let height = self.height as usize;
        for y in 0..height / 2 {
            let (top, bottom) = self.pixels.split_at_mut((height - 1 - y) * row_size);
            top[y * row_size..y * row_size + row_size]
                .swap_with_slice(&mut bottom[..row_size]);
        }
    }
}

/// An uploaded GPU texture with its shader-readable view
#[derive(Debug)]
pub struct GpuTexture {
    pub handle: TextureHandle,
    pub view: TextureViewHandle,
    pub width: u32,
    pub height: u32,
    pub name: String,
}

impl GpuTexture {
    /// Create and upload a texture
    pub fn create(backend: &mut dyn GraphicsBackend, data: &TextureData) -> BackendResult<Self> {
        let handle = backend.create_texture(&TextureDescriptor {
            label: Some(data.name.clone()),
            width: data.width,
            height: data.height,
            mip_levels: 1,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        })?;

        let view = backend.create_texture_view(handle, &TextureViewDescriptor::default())?;
        backend.write_texture(handle, &data.pixels, data.width, data.height);

        Ok(Self {
            handle,
            view,
            width: data.width,
            height: data.height,
            name: data.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    #[test]
    fn white_fallback_is_one_opaque_pixel() {
        let white = TextureData::white();
        assert_eq!((white.width, white.height), (1, 1));
        assert_eq!(white.pixels, vec![255, 255, 255, 255]);
    }

    #[test]
    fn flip_vertically_swaps_rows() {
        let mut data = TextureData {
            width: 1,
            height: 2,
            pixels: vec![1, 2, 3, 4, 5, 6, 7, 8],
            name: "two_rows".to_string(),
        };
        data.flip_vertically();
        assert_eq!(data.pixels, vec![5, 6, 7, 8, 1, 2, 3, 4]);
    }

    #[test]
    fn gpu_texture_has_a_view() {
        let mut backend = DummyBackend::new();
        let texture = GpuTexture::create(&mut backend, &TextureData::white()).unwrap();
        assert_eq!(backend.texture_count(), 1);
        assert!(backend.view_descriptor(texture.view).is_some());
    }
}
