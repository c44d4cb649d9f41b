use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, ensure};

use crate::coords::{Rect, Vec2};

static NEXT_TEXTURE: AtomicU64 = AtomicU64::new(1);
static NEXT_SHADER: AtomicU64 = AtomicU64::new(1);

/// Identity of a texture, used for batch compatibility and bind group caching.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

/// Identity of a shader, used for pipeline caching.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(u64);

pub type TextureRef = Arc<Texture>;
pub type ShaderRef = Arc<Shader>;

/// A sampled image. The GPU view is absent for textures that only carry a size.
pub struct Texture {
    id: TextureId,
    width: u32,
    height: u32,
    gpu: Option<(wgpu::Texture, wgpu::TextureView)>,
}

impl Texture {
    /// A texture known only by its size. Batches and sprites can be built
    /// around it; GPU backends skip it.
    pub fn new(width: u32, height: u32) -> TextureRef {
        Arc::new(Self {
            id: TextureId(NEXT_TEXTURE.fetch_add(1, Ordering::Relaxed)),
            width,
            height,
            gpu: None,
        })
    }

    /// Uploads tightly packed straight-alpha RGBA8 pixels.
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<TextureRef> {
        ensure!(width > 0 && height > 0, "texture `{label}` has no pixels");
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .context("texture dimensions overflow")?;
        ensure!(
            pixels.len() == expected,
            "texture `{label}`: expected {expected} bytes for {width}x{height}, got {}",
            pixels.len()
        );

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
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::debug!("texture `{label}` uploaded ({width}x{height})");

        Ok(Arc::new(Self {
            id: TextureId(NEXT_TEXTURE.fetch_add(1, Ordering::Relaxed)),
            width,
            height,
            gpu: Some((texture, view)),
        }))
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// The whole texture in texels.
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(Vec2::ZERO, self.size())
    }

    #[inline]
    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.gpu.as_ref().map(|(_, view)| view)
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("uploaded", &self.gpu.is_some())
            .finish()
    }
}

/// WGSL program a batch is drawn with.
///
/// Treated as opaque: it must accept the sprite vertex layout and bind groups.
#[derive(Debug)]
pub struct Shader {
    id: ShaderId,
    label: Cow<'static, str>,
    source: Cow<'static, str>,
}

impl Shader {
    pub fn from_wgsl(
        label: impl Into<Cow<'static, str>>,
        source: impl Into<Cow<'static, str>>,
    ) -> ShaderRef {
        Arc::new(Self {
            id: ShaderId(NEXT_SHADER.fetch_add(1, Ordering::Relaxed)),
            label: label.into(),
            source: source.into(),
        })
    }

    /// The built-in textured, tinted quad program.
    pub fn sprite() -> ShaderRef {
        Self::from_wgsl(
            "tessera sprite",
            include_str!("../render/shaders/sprite.wgsl"),
        )
    }

    #[inline]
    pub fn id(&self) -> ShaderId {
        self.id
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }
}
