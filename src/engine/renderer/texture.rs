// wgpu-backed render device

use super::device::{check_upload, texture_extent, NativeTexture, RenderDevice, TextureId};
use super::DeviceError;
use anyhow::Result;
use log::info;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A [`RenderDevice`] that allocates real GPU textures
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: Mutex<HashMap<TextureId, wgpu::Texture>>,
    next_id: AtomicU64,
}

impl WgpuDevice {
    /// Wrap an existing device and queue
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            textures: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a device without a surface, for tools and asset validation
    pub fn headless() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow::anyhow!("Failed to find suitable GPU adapter"))?;

        info!("Using GPU: {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Sprite Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))?;

        Ok(Self::new(device, queue))
    }

    /// Create a sampling view of a resident texture
    pub fn create_view(&self, texture: &NativeTexture) -> Option<wgpu::TextureView> {
        self.textures
            .lock()
            .get(&texture.id)
            .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

impl RenderDevice for WgpuDevice {
    fn create_texture(&self, width: u32, height: u32) -> Result<NativeTexture, DeviceError> {
        let (width, height) = texture_extent(width, height);
        let limit = self.device.limits().max_texture_dimension_2d;
        if width > limit || height > limit {
            return Err(DeviceError::Backend(format!(
                "texture {}x{} exceeds device limit {}",
                width, height, limit
            )));
        }

        let id = TextureId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Sprite Frame"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.textures.lock().insert(id, texture);
        Ok(NativeTexture { id, width, height })
    }

    fn upload(
        &self,
        texture: &NativeTexture,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), DeviceError> {
        check_upload(texture, width, height, pixels)?;

        let textures = self.textures.lock();
        let target = textures
            .get(&texture.id)
            .ok_or(DeviceError::Lost(texture.id))?;

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        Ok(())
    }

    fn release(&self, texture: NativeTexture) {
        if let Some(t) = self.textures.lock().remove(&texture.id) {
            t.destroy();
        }
    }

    fn is_valid(&self, texture: &NativeTexture) -> bool {
        self.textures.lock().contains_key(&texture.id)
    }
}
