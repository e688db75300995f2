use eframe::wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingResource, BindingType, Color, ColorTargetState, ColorWrites,
    CommandEncoder, Device, Extent3d, FilterMode, FragmentState, LoadOp, MultisampleState, Operations,
    PipelineCompilationOptions, PipelineLayoutDescriptor, PrimitiveState, RenderPassColorAttachment,
    RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor, ShaderModuleDescriptor, ShaderSource,
    ShaderStages, StoreOp, Texture, TextureDescriptor, TextureDimension, TextureFormat, TextureSampleType,
    TextureUsages, TextureView, TextureViewDescriptor, TextureViewDimension, VertexState,
};
use egui_wgpu::RenderState;

const BLIT_SOURCE: &str = include_str!("../assets/shaders/blit.wgsl");

/// Display textures hold sRGB bytes so egui shows them unchanged.
pub const DISPLAY_FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

/// Full-screen triangle copying `outputTexture` into the display texture.
pub struct BlitPipeline {
    pipeline: RenderPipeline,
    layout: BindGroupLayout,
}

impl BlitPipeline {
    pub fn new(device: &Device) -> Self {
        log::debug!("[BlitPipeline] Creating blit pipeline");
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("blit_shader"),
            source: ShaderSource::Wgsl(BLIT_SOURCE.into()),
        });

        let layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("blit_bgl"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: false },
                    view_dimension: TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("blit_pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("blit_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[],
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(ColorTargetState {
                    format: DISPLAY_FORMAT,
                    blend: None,
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState::default(),
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self { pipeline, layout }
    }

    pub fn bind(&self, device: &Device, source: &Texture) -> BindGroup {
        let view = source.create_view(&TextureViewDescriptor::default());
        device.create_bind_group(&BindGroupDescriptor {
            label: Some("blit_bg"),
            layout: &self.layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: BindingResource::TextureView(&view),
            }],
        })
    }

    pub fn encode(&self, encoder: &mut CommandEncoder, source: &BindGroup, target: &DisplayTarget) {
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("blit_pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: &target.view,
                depth_slice: None,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(Color::BLACK),
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, source, &[]);
        pass.draw(0..3, 0..1);
    }
}

/// Display texture registered with the egui renderer.
pub struct DisplayTarget {
    texture: Texture,
    view: TextureView,
    texture_id: eframe::egui::TextureId,
}

impl DisplayTarget {
    pub fn new(render_state: &RenderState, size: [u32; 2]) -> Self {
        let texture = render_state.device.create_texture(&TextureDescriptor {
            label: Some("display_texture"),
            size: Extent3d {
                width: size[0],
                height: size[1],
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: DISPLAY_FORMAT,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&TextureViewDescriptor::default());
        let texture_id = render_state
            .renderer
            .write()
            .register_native_texture(&render_state.device, &view, FilterMode::Nearest);
        log::debug!("[BlitPipeline] Display texture {}x{} registered", size[0], size[1]);

        Self {
            texture,
            view,
            texture_id,
        }
    }

    pub fn texture_id(&self) -> eframe::egui::TextureId {
        self.texture_id
    }

    pub fn release(self, render_state: &RenderState) {
        render_state.renderer.write().free_texture(&self.texture_id);
        self.texture.destroy();
    }
}
