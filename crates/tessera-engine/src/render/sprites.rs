use std::collections::HashMap;
use std::num::NonZeroU64;

use crate::canvas::{CameraUniform, MAX_CANVAS_SLOTS, ProjectionUniform};
use crate::draw::{DrawBackend, DrawSubmission};
use crate::render::{RenderCtx, RenderTarget};
use crate::sprite::{
    InstanceTransform, QuadColors, QuadGeometry, QuadTexCoords, Shader, ShaderId, SlotIndices,
    TextureId, Visibility,
};

use super::common::{depth_state, premul_alpha_blend};

const GEOMETRY_ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    0 => Float32x2,
    1 => Float32x2,
    2 => Float32x2,
    3 => Float32x2
];
const UV_ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    4 => Float32x2,
    5 => Float32x2,
    6 => Float32x2,
    7 => Float32x2
];
const COLOR_ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    8 => Float32x4,
    9 => Float32x4,
    10 => Float32x4,
    11 => Float32x4
];
const TRANSFORM_ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    12 => Float32x4, // position, scale
    13 => Float32x2  // rotation, depth
];
const SLOT_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![14 => Uint32x2];
const VISIBILITY_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![15 => Uint32];

fn instance_layout<T>(attributes: &'static [wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: size_of::<T>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes,
    }
}

/// One layout per attribute column, in the order of
/// [`SpriteColumns::vertex_slices`](crate::sprite::SpriteColumns::vertex_slices).
fn column_layouts() -> [wgpu::VertexBufferLayout<'static>; 6] {
    [
        instance_layout::<QuadGeometry>(&GEOMETRY_ATTRS),
        instance_layout::<QuadTexCoords>(&UV_ATTRS),
        instance_layout::<QuadColors>(&COLOR_ATTRS),
        instance_layout::<InstanceTransform>(&TRANSFORM_ATTRS),
        instance_layout::<SlotIndices>(&SLOT_ATTRS),
        instance_layout::<Visibility>(&VISIBILITY_ATTRS),
    ]
}

fn table_binding_size<T>() -> Option<NonZeroU64> {
    NonZeroU64::new(size_of::<T>() as u64 * MAX_CANVAS_SLOTS as u64)
}

/// GPU state for drawing sprite submissions: bind group layouts, the
/// sampler, one pipeline per shader and one bind group per texture.
///
/// Pipelines are rebuilt when the surface or depth format changes.
#[derive(Default)]
pub struct SpriteRenderer {
    formats: Option<(wgpu::TextureFormat, wgpu::TextureFormat)>,
    view_layout: Option<wgpu::BindGroupLayout>,
    texture_layout: Option<wgpu::BindGroupLayout>,
    pipeline_layout: Option<wgpu::PipelineLayout>,
    sampler: Option<wgpu::Sampler>,

    pipelines: HashMap<ShaderId, wgpu::RenderPipeline>,
    texture_groups: HashMap<TextureId, wgpu::BindGroup>,

    warned_missing_view: bool,
}

impl SpriteRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend recording this frame's sprite draws into `target`.
    pub fn backend<'r, 'c, 't>(
        &'r mut self,
        ctx: &'r RenderCtx<'c>,
        target: &'r mut RenderTarget<'t>,
    ) -> SpriteBackend<'r, 'c, 't> {
        SpriteBackend {
            renderer: self,
            ctx,
            target,
        }
    }

    fn ensure_layouts(&mut self, ctx: &RenderCtx<'_>) {
        let formats = (ctx.surface_format, ctx.depth_format);
        if self.formats != Some(formats) {
            self.pipelines.clear();
            self.formats = Some(formats);
        }
        if self.pipeline_layout.is_some() {
            return;
        }

        let view_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("tessera sprite view bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: table_binding_size::<CameraUniform>(),
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: table_binding_size::<ProjectionUniform>(),
                        },
                        count: None,
                    },
                ],
            });

        let texture_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("tessera sprite texture bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("tessera sprite pipeline layout"),
                bind_group_layouts: &[&view_layout, &texture_layout],
                immediate_size: 0,
            });

        self.sampler = Some(ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tessera sprite sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        }));
        self.view_layout = Some(view_layout);
        self.texture_layout = Some(texture_layout);
        self.pipeline_layout = Some(pipeline_layout);
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>, shader: &Shader) {
        if self.pipelines.contains_key(&shader.id()) {
            return;
        }
        let Some(layout) = self.pipeline_layout.as_ref() else { return };

        let module = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(shader.label()),
            source: wgpu::ShaderSource::Wgsl(shader.source().into()),
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(shader.label()),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &column_layouts(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(depth_state(ctx.depth_format)),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("sprite pipeline built for shader `{}`", shader.label());
        self.pipelines.insert(shader.id(), pipeline);
    }

    fn ensure_texture_group(&mut self, ctx: &RenderCtx<'_>, id: TextureId, view: &wgpu::TextureView) {
        if self.texture_groups.contains_key(&id) {
            return;
        }
        let (Some(layout), Some(sampler)) = (self.texture_layout.as_ref(), self.sampler.as_ref()) else {
            return;
        };
        let group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessera sprite texture bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        self.texture_groups.insert(id, group);
    }
}

/// [`DrawBackend`] that records each submission as its own render pass,
/// loading the color and depth written by earlier passes.
pub struct SpriteBackend<'r, 'c, 't> {
    renderer: &'r mut SpriteRenderer,
    ctx: &'r RenderCtx<'c>,
    target: &'r mut RenderTarget<'t>,
}

impl DrawBackend for SpriteBackend<'_, '_, '_> {
    fn submit(&mut self, submission: DrawSubmission<'_>) {
        if submission.instances == 0 {
            return;
        }
        let ctx = self.ctx;
        let Some(texture_view) = submission.texture.view() else {
            if !self.renderer.warned_missing_view {
                log::warn!(
                    "texture {:?} has no GPU view; its sprites are skipped",
                    submission.texture.id()
                );
                self.renderer.warned_missing_view = true;
            }
            return;
        };

        submission.columns.sync(ctx.device, ctx.queue);
        submission.views.sync(ctx.device, ctx.queue);

        self.renderer.ensure_layouts(ctx);
        self.renderer.ensure_pipeline(ctx, submission.shader);
        self.renderer
            .ensure_texture_group(ctx, submission.texture.id(), texture_view);

        let renderer = &*self.renderer;
        let Some(pipeline) = renderer.pipelines.get(&submission.shader.id()) else { return };
        let Some(texture_group) = renderer.texture_groups.get(&submission.texture.id()) else {
            return;
        };
        let Some(view_layout) = renderer.view_layout.as_ref() else { return };
        let Some((cameras, projections)) = submission.views.gpu_buffers() else { return };
        let Some(slices) = submission.columns.vertex_slices() else { return };

        // Table buffers can be recreated on sync, so this group is per draw.
        let view_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessera sprite view bind group"),
            layout: view_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: cameras.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: projections.as_entire_binding(),
                },
            ],
        });

        let mut rpass = self
            .target
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tessera sprite pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &view_group, &[]);
        rpass.set_bind_group(1, texture_group, &[]);
        for (slot, slice) in slices.into_iter().enumerate() {
            rpass.set_vertex_buffer(slot as u32, slice);
        }
        rpass.draw(0..6, 0..submission.instances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_match_column_strides() {
        let strides: Vec<u64> = column_layouts().iter().map(|l| l.array_stride).collect();
        assert_eq!(strides, vec![32, 32, 64, 32, 8, 4]);
    }

    #[test]
    fn shader_locations_are_unique_and_dense() {
        let mut locations: Vec<u32> = column_layouts()
            .iter()
            .flat_map(|l| l.attributes.iter().map(|a| a.shader_location))
            .collect();
        locations.sort_unstable();
        assert_eq!(locations, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn transform_attributes_cover_rotation_and_depth() {
        assert_eq!(TRANSFORM_ATTRS[1].offset, 16);
        assert_eq!(table_binding_size::<CameraUniform>().map(NonZeroU64::get), Some(256));
    }
}
