//! GPU texture pooling for compositor layers (§4.5, "Texture lifecycle").

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Handle to a single pooled GPU texture.
#[derive(Clone)]
pub struct TextureHandle {
    /// Pool-assigned identity, unique for the process lifetime.
    pub id: u64,
    /// Backing `wgpu` texture.
    pub texture: Arc<wgpu::Texture>,
    /// Current width in pixels.
    pub width: u32,
    /// Current height in pixels.
    pub height: u32,
    /// Pixel format (§3 Texture Handle: RGBA8 or SRGB_RGBA8).
    pub format: wgpu::TextureFormat,
}

impl TextureHandle {
    /// Create a fresh view over the current texture.
    pub fn create_view(&self) -> wgpu::TextureView {
        self.texture
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Approximate GPU memory this texture occupies.
    pub fn size_bytes(&self) -> u64 {
        let bytes_per_pixel = 4u64; // every format this pool issues is 4 bytes/pixel
        (self.width as u64) * (self.height as u64) * bytes_per_pixel
    }
}

/// Parameters for creating a new pooled texture.
#[derive(Debug, Clone, Copy)]
pub struct TextureDescriptor {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: wgpu::TextureFormat,
    /// Usage flags.
    pub usage: wgpu::TextureUsages,
    /// Mip level count.
    pub mip_levels: u32,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            mip_levels: 1,
        }
    }
}

/// Named pool of reusable GPU textures backing the compositor's layer
/// slots (`video_texture_front`, `video_texture_back`, background stills,
/// text glyphs).
pub struct TexturePool {
    device: Arc<wgpu::Device>,
    textures: RwLock<HashMap<String, TextureHandle>>,
    views: RwLock<HashMap<String, Arc<wgpu::TextureView>>>,
}

impl TexturePool {
    /// Construct an empty pool against a device.
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self {
            device,
            textures: RwLock::new(HashMap::new()),
            views: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new managed texture under `name`, replacing any existing
    /// one of the same name.
    pub fn create(
        &self,
        name: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> String {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(name),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });

        let handle = TextureHandle {
            id,
            texture: Arc::new(texture),
            width,
            height,
            format,
        };

        let view = handle.create_view();
        let name_owned = name.to_string();

        // Insert the view before the handle so a racing `get_view` never
        // observes a texture with no corresponding view.
        self.views
            .write()
            .insert(name_owned.clone(), Arc::new(view));
        self.textures.write().insert(name_owned.clone(), handle);

        name_owned
    }

    /// Fetch a texture's current view.
    pub fn get_view(&self, name: &str) -> Arc<wgpu::TextureView> {
        self.views
            .read()
            .get(name)
            .expect("texture view not found in pool")
            .clone()
    }

    /// Fetch a texture's current backing `wgpu::Texture`, e.g. for a
    /// `copy_texture_to_texture` blit into a swapchain image.
    pub fn get_texture(&self, name: &str) -> Arc<wgpu::Texture> {
        self.textures
            .read()
            .get(name)
            .expect("texture not found in pool")
            .texture
            .clone()
    }

    /// Whether a texture has been created under `name`.
    pub fn has_texture(&self, name: &str) -> bool {
        self.textures.read().contains_key(name)
    }

    /// Reallocate the named texture if its dimensions changed. No-op if the
    /// dimensions already match, or if the name doesn't exist yet.
    pub fn resize_if_needed(&self, name: &str, new_width: u32, new_height: u32) {
        let mut textures = self.textures.write();
        if let Some(handle) = textures.get_mut(name) {
            if handle.width != new_width || handle.height != new_height {
                let new_texture = self.device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(name),
                    size: wgpu::Extent3d {
                        width: new_width,
                        height: new_height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: handle.format,
                    usage: handle.texture.usage(),
                    view_formats: &[],
                });

                handle.texture = Arc::new(new_texture);
                handle.width = new_width;
                handle.height = new_height;

                let new_view = handle.create_view();
                self.views
                    .write()
                    .insert(name.to_string(), Arc::new(new_view));
            }
        }
    }

    /// Upload pixel data into the named texture, creating it on first use.
    /// Callers are expected to have already consulted a [`crate::DedupCache`]
    /// — this method always performs the write.
    pub fn upload_data(&self, queue: &wgpu::Queue, name: &str, data: &[u8], width: u32, height: u32) {
        if !self.has_texture(name) {
            self.create(
                name,
                width,
                height,
                wgpu::TextureFormat::Rgba8UnormSrgb,
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            );
        } else {
            self.resize_if_needed(name, width, height);
        }

        let textures = self.textures.read();
        let handle = textures.get(name).expect("just ensured it exists");

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &handle.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width: handle.width,
                height: handle.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Drop a texture from the pool, freeing it for GPU reclamation.
    pub fn release(&self, name: &str) {
        self.textures.write().remove(name);
        self.views.write().remove(name);
    }

    /// Snapshot pool occupancy and approximate GPU memory use.
    pub fn stats(&self) -> PoolStats {
        let textures = self.textures.read();
        let total_memory = textures.values().map(TextureHandle::size_bytes).sum();
        PoolStats {
            total_textures: textures.len(),
            free_textures: 0,
            total_memory,
        }
    }
}

/// Pool occupancy snapshot.
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Number of live textures.
    pub total_textures: usize,
    /// Number of textures available for reuse (always 0: this pool doesn't
    /// keep a free list, it releases outright).
    pub free_textures: usize,
    /// Sum of every live texture's approximate GPU memory footprint.
    pub total_memory: u64,
}
