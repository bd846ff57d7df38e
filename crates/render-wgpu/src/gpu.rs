use crate::camera::FlyCamera;
use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use heightfield_mesh::TerrainMesh;
use std::ops::Range;
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const LIGHT_DIR: Vec3 = Vec3::new(0.3, 1.0, 0.5);

/// Errors from building GPU resources.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("shader compile failed: {0}")]
    ShaderCompile(String),
    #[error("pipeline creation failed: {0}")]
    Pipeline(String),
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    height_range: [f32; 4],
    light_dir: [f32; 4],
}

impl Uniforms {
    fn for_frame(camera: &FlyCamera, (min_h, max_h): (f32, f32)) -> Self {
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            height_range: [min_h, max_h, 0.0, 0.0],
            light_dir: LIGHT_DIR.extend(0.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

/// Interleave mesh positions and normals into GPU vertices.
fn terrain_vertices(mesh: &TerrainMesh) -> Vec<Vertex> {
    mesh.positions()
        .iter()
        .zip(mesh.normals())
        .map(|(p, n)| Vertex {
            position: p.to_array(),
            normal: n.to_array(),
        })
        .collect()
}

/// GPU copy of one terrain mesh.
struct MeshBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    strips: Vec<Range<u32>>,
    height_range: (f32, f32),
}

/// wgpu-based terrain renderer.
pub struct TerrainRenderer {
    fill_pipeline: wgpu::RenderPipeline,
    wireframe_pipeline: Option<wgpu::RenderPipeline>,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    mesh: Option<MeshBuffers>,
    depth_texture: wgpu::TextureView,
    surface_format: wgpu::TextureFormat,
}

impl TerrainRenderer {
    /// Build pipelines for `surface_format`.
    ///
    /// A wireframe pipeline is only created when `wireframe` is set; the
    /// device must then have been created with `Features::POLYGON_MODE_LINE`.
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        wireframe: bool,
    ) -> Result<Self, RenderError> {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniform_buffer"),
            contents: bytemuck::bytes_of(&Uniforms {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
                height_range: [0.0, 1.0, 0.0, 0.0],
                light_dir: LIGHT_DIR.extend(0.0).to_array(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("terrain_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::TERRAIN_SHADER.into()),
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::ShaderCompile(err.to_string()));
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let fill_pipeline = Self::create_pipeline(
            device,
            &pipeline_layout,
            &shader,
            surface_format,
            "fs_main",
            wgpu::PolygonMode::Fill,
        );
        let wireframe_pipeline = wireframe.then(|| {
            Self::create_pipeline(
                device,
                &pipeline_layout,
                &shader,
                surface_format,
                "fs_wireframe",
                wgpu::PolygonMode::Line,
            )
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::Pipeline(err.to_string()));
        }

        let depth_texture = Self::create_depth_texture(device, width, height);

        tracing::debug!(
            "terrain pipelines ready (format {surface_format:?}, wireframe: {})",
            wireframe_pipeline.is_some()
        );

        Ok(Self {
            fill_pipeline,
            wireframe_pipeline,
            uniform_buffer,
            uniform_bind_group,
            mesh: None,
            depth_texture,
            surface_format,
        })
    }

    fn create_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        surface_format: wgpu::TextureFormat,
        fragment_entry: &str,
        polygon_mode: wgpu::PolygonMode,
    ) -> wgpu::RenderPipeline {
        let label = format!("terrain_pipeline_{fragment_entry}");
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label.as_str()),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x3,
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some(fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            // Strip winding alternates, so nothing is culled.
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: Some(wgpu::IndexFormat::Uint32),
                cull_mode: None,
                polygon_mode,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        })
    }

    /// Upload `mesh`, replacing any previously uploaded terrain.
    pub fn upload(&mut self, device: &wgpu::Device, mesh: &TerrainMesh) {
        let vertices = terrain_vertices(mesh);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("terrain_vertex_buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("terrain_index_buffer"),
            contents: bytemuck::cast_slice(mesh.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });

        tracing::info!(
            "uploaded terrain: {} vertices, {} strips, {} triangles",
            vertices.len(),
            mesh.strip_count(),
            mesh.triangle_count()
        );

        self.mesh = Some(MeshBuffers {
            vertex_buffer,
            index_buffer,
            strips: mesh.strip_ranges().collect(),
            height_range: mesh.height_range(),
        });
    }

    pub fn supports_wireframe(&self) -> bool {
        self.wireframe_pipeline.is_some()
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Render one frame of the uploaded terrain, one draw call per strip.
    ///
    /// Falls back to the filled pipeline when `wireframe` is requested but
    /// unsupported.
    pub fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        camera: &FlyCamera,
        wireframe: bool,
    ) {
        let height_range = self.mesh.as_ref().map_or((0.0, 1.0), |m| m.height_range);
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&Uniforms::for_frame(camera, height_range)),
        );

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("terrain_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.1,
                            g: 0.1,
                            b: 0.15,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            if let Some(mesh) = &self.mesh {
                let pipeline = match (&self.wireframe_pipeline, wireframe) {
                    (Some(lines), true) => lines,
                    _ => &self.fill_pipeline,
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                for strip in &mesh.strips {
                    pass.draw_indexed(strip.clone(), 0, 0..1);
                }
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heightfield_common::TerrainParams;
    use heightfield_heightmap::Heightmap;

    #[test]
    fn uniforms_match_wgsl_layout() {
        // mat4x4 + two vec4
        assert_eq!(std::mem::size_of::<Uniforms>(), 96);
    }

    #[test]
    fn frame_uniforms_carry_camera_and_light() {
        let camera = FlyCamera::default();
        let u = Uniforms::for_frame(&camera, (-16.0, 47.75));
        assert_eq!(u.view_proj, camera.view_projection().to_cols_array_2d());
        assert_eq!(u.height_range, [-16.0, 47.75, 0.0, 0.0]);
        assert_eq!(u.light_dir, [0.3, 1.0, 0.5, 0.0]);
    }

    #[test]
    fn vertices_interleave_positions_and_normals() {
        let hm = Heightmap::from_samples(2, 2, vec![0.0, 4.0, 8.0, 12.0]).unwrap();
        let mesh = TerrainMesh::build(&hm, &TerrainParams::new(1.0, 0.0));
        let vertices = terrain_vertices(&mesh);

        assert_eq!(vertices.len(), 4);
        assert_eq!(vertices[3].position, [0.0, 12.0, 0.0]);
        assert_eq!(vertices[0].normal, mesh.normals()[0].to_array());
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
    }

    #[test]
    fn shader_declares_entry_points() {
        for entry in ["fn vs_main", "fn fs_main", "fn fs_wireframe"] {
            assert!(shaders::TERRAIN_SHADER.contains(entry), "{entry}");
        }
    }
}
