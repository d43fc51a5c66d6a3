//! `RenderBackend` on a browser canvas through wgpu (WebGPU, or WebGL2 as a fallback).

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use ::wgpu::util::DeviceExt;
use foundation::{HandleAllocator, ResourceHandle, ResourceKind};
use gpu::{
    DeviceFault, FrameUniforms, LayerUniforms, MeshHandles, MeshVertex, ParticleInstance,
    PerspectiveCamera, QUAD_VERTICES, RenderBackend, RenderError, SceneHandles, Viewport,
    mesh_vertices, particle_instances,
};
use scene::{BlendMode, FaceSide, GlobeScene, Material, ShaderSource, SphereMesh};
use tracing::{debug, error, info, warn};

const ADDITIVE: ::wgpu::BlendState = ::wgpu::BlendState {
    color: ::wgpu::BlendComponent {
        src_factor: ::wgpu::BlendFactor::SrcAlpha,
        dst_factor: ::wgpu::BlendFactor::One,
        operation: ::wgpu::BlendOperation::Add,
    },
    alpha: ::wgpu::BlendComponent {
        src_factor: ::wgpu::BlendFactor::One,
        dst_factor: ::wgpu::BlendFactor::One,
        operation: ::wgpu::BlendOperation::Add,
    },
};

const MESH_ATTRIBUTES: [::wgpu::VertexAttribute; 2] = [
    ::wgpu::VertexAttribute {
        format: ::wgpu::VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    ::wgpu::VertexAttribute {
        format: ::wgpu::VertexFormat::Float32x3,
        offset: 12,
        shader_location: 1,
    },
];

const PARTICLE_ATTRIBUTES: [::wgpu::VertexAttribute; 3] = [
    ::wgpu::VertexAttribute {
        format: ::wgpu::VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    ::wgpu::VertexAttribute {
        format: ::wgpu::VertexFormat::Float32x3,
        offset: 12,
        shader_location: 1,
    },
    ::wgpu::VertexAttribute {
        format: ::wgpu::VertexFormat::Float32,
        offset: 24,
        shader_location: 2,
    },
];

// Field order is drop order: the surface goes before its instance.
struct GpuSurface {
    _canvas: web_sys::HtmlCanvasElement,
    surface: ::wgpu::Surface<'static>,
    device: ::wgpu::Device,
    queue: ::wgpu::Queue,
    config: ::wgpu::SurfaceConfiguration,
    depth_view: ::wgpu::TextureView,
    layer_layout: ::wgpu::BindGroupLayout,
    pipeline_layout: ::wgpu::PipelineLayout,
    shaders: HashMap<&'static str, ::wgpu::ShaderModule>,
    max_side: u32,
    fault: DeviceFault,
    _instance: ::wgpu::Instance,
}

impl GpuSurface {
    fn resize(&mut self, viewport: Viewport) {
        let viewport = viewport.fit_within(self.max_side);
        self.config.width = viewport.width;
        self.config.height = viewport.height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, &self.config);
    }

    /// Programs not compiled up front are compiled here; their errors reach
    /// the device fault instead of a `Result`.
    fn ensure_shader(&mut self, source: ShaderSource) -> Result<(), RenderError> {
        if self.shaders.contains_key(source.label) {
            return Ok(());
        }
        if source.wgsl.trim().is_empty() {
            return Err(empty_source(source));
        }
        let module = self
            .device
            .create_shader_module(::wgpu::ShaderModuleDescriptor {
                label: Some(source.label),
                source: ::wgpu::ShaderSource::Wgsl(Cow::Borrowed(source.wgsl)),
            });
        self.shaders.insert(source.label, module);
        Ok(())
    }
}

enum Geometry {
    Indexed {
        vertices: ::wgpu::Buffer,
        indices: ::wgpu::Buffer,
        index_count: u32,
    },
    Instanced {
        instances: Option<::wgpu::Buffer>,
        instance_count: u32,
    },
}

struct LayerMaterial {
    pipeline: ::wgpu::RenderPipeline,
    uniforms: ::wgpu::Buffer,
    bind_group: ::wgpu::BindGroup,
}

pub struct WgpuBackend {
    gpu: Option<GpuSurface>,
    alloc: HandleAllocator,
    renderer: Option<ResourceHandle>,
    geometries: HashMap<ResourceHandle, Geometry>,
    materials: HashMap<ResourceHandle, LayerMaterial>,
}

fn empty_source(source: ShaderSource) -> RenderError {
    RenderError::ShaderCompile {
        label: source.label.to_string(),
        message: "empty source".to_string(),
    }
}

fn create_depth_view(
    device: &::wgpu::Device,
    config: &::wgpu::SurfaceConfiguration,
) -> ::wgpu::TextureView {
    let tex = device.create_texture(&::wgpu::TextureDescriptor {
        label: Some("hero-depth"),
        size: ::wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: ::wgpu::TextureDimension::D2,
        format: ::wgpu::TextureFormat::Depth24Plus,
        usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&::wgpu::TextureViewDescriptor::default())
}

async fn compile_checked(
    device: &::wgpu::Device,
    source: ShaderSource,
) -> Result<::wgpu::ShaderModule, RenderError> {
    if source.wgsl.trim().is_empty() {
        return Err(empty_source(source));
    }
    let scope = device.push_error_scope(::wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(::wgpu::ShaderModuleDescriptor {
        label: Some(source.label),
        source: ::wgpu::ShaderSource::Wgsl(Cow::Borrowed(source.wgsl)),
    });
    if let Some(err) = scope.pop().await {
        return Err(RenderError::ShaderCompile {
            label: source.label.to_string(),
            message: err.to_string(),
        });
    }
    let info = module.get_compilation_info().await;
    let failure = info
        .messages
        .iter()
        .find(|m| matches!(m.message_type, ::wgpu::CompilationMessageType::Error));
    if let Some(failure) = failure {
        return Err(RenderError::ShaderCompile {
            label: source.label.to_string(),
            message: failure.message.clone(),
        });
    }
    Ok(module)
}

impl WgpuBackend {
    /// Acquire an adapter and device for `canvas` and compile `programs`.
    pub async fn from_canvas(
        canvas: web_sys::HtmlCanvasElement,
        programs: &[ShaderSource],
    ) -> Result<Self, RenderError> {
        let instance = ::wgpu::Instance::new(&::wgpu::InstanceDescriptor {
            backends: ::wgpu::Backends::BROWSER_WEBGPU | ::wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(::wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| RenderError::ResourceCreation(format!("surface error: {e}")))?;

        let adapter = instance
            .request_adapter(&::wgpu::RequestAdapterOptions {
                power_preference: ::wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::Backend(format!("adapter error: {e}")))?;

        let (device, queue) = adapter
            .request_device(&::wgpu::DeviceDescriptor {
                label: Some("hero-wgpu-device"),
                required_features: ::wgpu::Features::empty(),
                required_limits: ::wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                ..Default::default()
            })
            .await
            .map_err(|e| RenderError::Backend(format!("device error: {e}")))?;

        let fault = DeviceFault::default();
        device.on_uncaptured_error(Arc::new({
            let fault = fault.clone();
            move |err: ::wgpu::Error| {
                error!(%err, "wgpu uncaptured error");
                fault.record(err.to_string());
            }
        }));
        let max_side = device.limits().max_texture_dimension_2d.max(1);
        let Viewport { width, height } =
            Viewport::new(canvas.width(), canvas.height()).fit_within(max_side);

        let surface_caps = surface.get_capabilities(&adapter);
        // Palette colors are already display-encoded.
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| RenderError::ResourceCreation("surface has no formats".to_string()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .iter()
            .copied()
            .find(|m| *m == ::wgpu::CompositeAlphaMode::PreMultiplied)
            .or_else(|| surface_caps.alpha_modes.first().copied())
            .unwrap_or(::wgpu::CompositeAlphaMode::Auto);

        let config = ::wgpu::SurfaceConfiguration {
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            desired_maximum_frame_latency: 2,
            present_mode: ::wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
        };
        let scope = device.push_error_scope(::wgpu::ErrorFilter::Validation);
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);
        if let Some(err) = scope.pop().await {
            return Err(RenderError::ResourceCreation(format!(
                "surface configuration failed: {err}"
            )));
        }

        let mut shaders = HashMap::new();
        for &program in programs {
            let module = compile_checked(&device, program).await?;
            shaders.insert(program.label, module);
        }

        let layer_layout = device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
            label: Some("hero-layer-bgl"),
            entries: &[::wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: ::wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: ::wgpu::BindingType::Buffer {
                    ty: ::wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
            label: Some("hero-layer-pipeline-layout"),
            bind_group_layouts: &[&layer_layout],
            immediate_size: 0,
        });

        info!(
            ?format,
            ?alpha_mode,
            width,
            height,
            max_side,
            programs = shaders.len(),
            "wgpu surface ready"
        );

        Ok(Self {
            gpu: Some(GpuSurface {
                _canvas: canvas,
                surface,
                device,
                queue,
                config,
                depth_view,
                layer_layout,
                pipeline_layout,
                shaders,
                max_side,
                fault,
                _instance: instance,
            }),
            alloc: HandleAllocator::new(1),
            renderer: None,
            geometries: HashMap::new(),
            materials: HashMap::new(),
        })
    }

    /// Largest surface side the device accepts; `None` once released.
    pub fn max_surface_side(&self) -> Option<u32> {
        self.gpu.as_ref().map(|gpu| gpu.max_side)
    }
}

fn layer_pipeline(
    gpu: &GpuSurface,
    material: &Material,
    buffers: &[::wgpu::VertexBufferLayout<'_>],
) -> Result<::wgpu::RenderPipeline, RenderError> {
    let label = material.shader.label;
    let module = gpu
        .shaders
        .get(label)
        .ok_or_else(|| RenderError::ShaderCompile {
            label: label.to_string(),
            message: "program was never compiled".to_string(),
        })?;
    let blend = match material.blend {
        BlendMode::Alpha => ::wgpu::BlendState::ALPHA_BLENDING,
        BlendMode::Additive => ADDITIVE,
    };
    let cull_mode = match material.side {
        FaceSide::Front => Some(::wgpu::Face::Back),
        FaceSide::Back => Some(::wgpu::Face::Front),
    };

    Ok(gpu
        .device
        .create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&gpu.pipeline_layout),
            vertex: ::wgpu::VertexState {
                module,
                entry_point: Some(material.shader.vertex_entry),
                compilation_options: Default::default(),
                buffers,
            },
            fragment: Some(::wgpu::FragmentState {
                module,
                entry_point: Some(material.shader.fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(::wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(blend),
                    write_mask: ::wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: ::wgpu::PrimitiveState {
                topology: ::wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: ::wgpu::FrontFace::Ccw,
                cull_mode,
                polygon_mode: ::wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(::wgpu::DepthStencilState {
                format: ::wgpu::TextureFormat::Depth24Plus,
                depth_write_enabled: material.depth_write,
                depth_compare: ::wgpu::CompareFunction::Less,
                stencil: ::wgpu::StencilState::default(),
                bias: ::wgpu::DepthBiasState::default(),
            }),
            multisample: ::wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        }))
}

fn layer_material(
    gpu: &GpuSurface,
    material: &Material,
    buffers: &[::wgpu::VertexBufferLayout<'_>],
) -> Result<LayerMaterial, RenderError> {
    let pipeline = layer_pipeline(gpu, material, buffers)?;
    let uniforms = gpu.device.create_buffer(&::wgpu::BufferDescriptor {
        label: Some("hero-layer-uniforms"),
        size: std::mem::size_of::<LayerUniforms>() as u64,
        usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = gpu.device.create_bind_group(&::wgpu::BindGroupDescriptor {
        label: Some("hero-layer-bg"),
        layout: &gpu.layer_layout,
        entries: &[::wgpu::BindGroupEntry {
            binding: 0,
            resource: uniforms.as_entire_binding(),
        }],
    });
    Ok(LayerMaterial {
        pipeline,
        uniforms,
        bind_group,
    })
}

fn mesh_geometry(gpu: &GpuSurface, mesh: &SphereMesh) -> Geometry {
    let vertices = mesh_vertices(mesh);
    Geometry::Indexed {
        vertices: gpu
            .device
            .create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                label: Some("hero-sphere-vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: ::wgpu::BufferUsages::VERTEX,
            }),
        indices: gpu
            .device
            .create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                label: Some("hero-sphere-indices"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: ::wgpu::BufferUsages::INDEX,
            }),
        index_count: mesh.indices.len() as u32,
    }
}

fn particle_geometry(gpu: &GpuSurface, scene: &GlobeScene) -> Geometry {
    let instances = particle_instances(&scene.particles.buffer);
    let buffer = (!instances.is_empty()).then(|| {
        gpu.device
            .create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                label: Some("hero-particle-instances"),
                contents: bytemuck::cast_slice(&instances),
                usage: ::wgpu::BufferUsages::VERTEX,
            })
    });
    Geometry::Instanced {
        instances: buffer,
        instance_count: instances.len() as u32,
    }
}

impl RenderBackend for WgpuBackend {
    fn create_scene(
        &mut self,
        scene: &GlobeScene,
        viewport: Viewport,
    ) -> Result<SceneHandles, RenderError> {
        let Self {
            gpu,
            alloc,
            renderer,
            geometries,
            materials,
        } = self;
        let gpu = gpu
            .as_mut()
            .ok_or_else(|| RenderError::ResourceCreation("renderer already released".to_string()))?;
        if renderer.is_some() {
            return Err(RenderError::ResourceCreation(
                "a scene is already allocated on this surface".to_string(),
            ));
        }
        // Every fallible step runs before anything is allocated.
        for material in [
            &scene.ocean.material,
            &scene.glow.material,
            &scene.particles.material,
        ] {
            gpu.ensure_shader(material.shader)?;
        }
        gpu.resize(viewport);

        let mesh_layout = ::wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as ::wgpu::BufferAddress,
            step_mode: ::wgpu::VertexStepMode::Vertex,
            attributes: &MESH_ATTRIBUTES,
        };
        let particle_layout = ::wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ParticleInstance>() as ::wgpu::BufferAddress,
            step_mode: ::wgpu::VertexStepMode::Instance,
            attributes: &PARTICLE_ATTRIBUTES,
        };
        let ocean_material =
            layer_material(gpu, &scene.ocean.material, std::slice::from_ref(&mesh_layout))?;
        let glow_material =
            layer_material(gpu, &scene.glow.material, std::slice::from_ref(&mesh_layout))?;
        let particle_material = layer_material(
            gpu,
            &scene.particles.material,
            std::slice::from_ref(&particle_layout),
        )?;
        // Pipeline validation errors land in the fault slot; nothing is
        // registered yet, so bailing out here leaves no allocation behind.
        gpu.fault.check()?;

        let mut register = |geometry: Geometry, material: LayerMaterial| {
            let g = alloc.allocate(ResourceKind::Geometry);
            let m = alloc.allocate(ResourceKind::Material);
            geometries.insert(g, geometry);
            materials.insert(m, material);
            MeshHandles {
                geometry: g,
                material: m,
                texture: None,
            }
        };
        let ocean = register(mesh_geometry(gpu, &scene.ocean.mesh), ocean_material);
        let glow = register(mesh_geometry(gpu, &scene.glow.mesh), glow_material);
        let particles = register(particle_geometry(gpu, scene), particle_material);

        let handle = alloc.allocate(ResourceKind::Renderer);
        *renderer = Some(handle);

        let mut camera = PerspectiveCamera::default();
        camera.set_viewport(viewport.width, viewport.height);
        debug!(particles = scene.particle_count(), "wgpu scene allocated");

        Ok(SceneHandles {
            renderer: handle,
            camera,
            viewport,
            ocean,
            glow,
            particles,
        })
    }

    fn render(
        &mut self,
        handles: &SceneHandles,
        uniforms: &FrameUniforms,
    ) -> Result<(), RenderError> {
        let gpu = self
            .gpu
            .as_ref()
            .ok_or_else(|| RenderError::Backend("renderer already released".to_string()))?;
        gpu.fault.check()?;
        let layers = [
            (&handles.ocean, &uniforms.ocean),
            (&handles.glow, &uniforms.glow),
            (&handles.particles, &uniforms.particles),
        ];

        let mut draws = Vec::with_capacity(layers.len());
        for (mesh, layer) in layers {
            let material = self
                .materials
                .get(&mesh.material)
                .ok_or_else(|| RenderError::Backend(format!("unknown material {:?}", mesh.material)))?;
            let geometry = self
                .geometries
                .get(&mesh.geometry)
                .ok_or_else(|| RenderError::Backend(format!("unknown geometry {:?}", mesh.geometry)))?;
            gpu.queue
                .write_buffer(&material.uniforms, 0, bytemuck::bytes_of(layer));
            draws.push((geometry, material));
        }

        let frame = gpu
            .surface
            .get_current_texture()
            .map_err(|e| RenderError::SurfaceLost(format!("surface acquire failed: {e}")))?;
        let view = frame
            .texture
            .create_view(&::wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&::wgpu::CommandEncoderDescriptor {
                label: Some("hero-frame-encoder"),
            });
        {
            let [r, g, b, a] = uniforms.clear_color;
            let mut rpass = encoder.begin_render_pass(&::wgpu::RenderPassDescriptor {
                label: Some("hero-globe-pass"),
                color_attachments: &[Some(::wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: ::wgpu::Operations {
                        load: ::wgpu::LoadOp::Clear(::wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: ::wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(::wgpu::RenderPassDepthStencilAttachment {
                    view: &gpu.depth_view,
                    depth_ops: Some(::wgpu::Operations {
                        load: ::wgpu::LoadOp::Clear(1.0),
                        store: ::wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            for (geometry, material) in draws {
                match geometry {
                    Geometry::Indexed {
                        vertices,
                        indices,
                        index_count,
                    } => {
                        rpass.set_pipeline(&material.pipeline);
                        rpass.set_bind_group(0, &material.bind_group, &[]);
                        rpass.set_vertex_buffer(0, vertices.slice(..));
                        rpass.set_index_buffer(indices.slice(..), ::wgpu::IndexFormat::Uint16);
                        rpass.draw_indexed(0..*index_count, 0, 0..1);
                    }
                    Geometry::Instanced {
                        instances: Some(instances),
                        instance_count,
                    } => {
                        rpass.set_pipeline(&material.pipeline);
                        rpass.set_bind_group(0, &material.bind_group, &[]);
                        rpass.set_vertex_buffer(0, instances.slice(..));
                        rpass.draw(0..QUAD_VERTICES, 0..*instance_count);
                    }
                    Geometry::Instanced {
                        instances: None, ..
                    } => {}
                }
            }
        }

        gpu.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn resize(&mut self, handles: &SceneHandles) -> Result<(), RenderError> {
        let gpu = self
            .gpu
            .as_mut()
            .ok_or_else(|| RenderError::Backend("renderer already released".to_string()))?;
        gpu.resize(handles.viewport);
        Ok(())
    }

    fn release(&mut self, handles: SceneHandles) {
        for handle in handles.resources() {
            let known = match handle.kind() {
                ResourceKind::Geometry => self.geometries.remove(&handle).is_some(),
                ResourceKind::Material => self.materials.remove(&handle).is_some(),
                ResourceKind::Renderer => self.renderer.take_if(|r| *r == handle).is_some(),
                ResourceKind::Texture => false,
            };
            if !known {
                warn!(?handle, "release of a handle this surface does not own");
            }
        }
        if self.renderer.is_none() && self.gpu.take().is_some() {
            info!("wgpu surface released");
        }
    }
}
