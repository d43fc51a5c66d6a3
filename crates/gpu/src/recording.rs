//! Headless backend that records what it is asked to do.
//!
//! Used by tests and the native CLI; it allocates handles, tracks which are
//! live, and can be told to fail at specific points.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use foundation::{HandleAllocator, ResourceHandle, ResourceKind};
use scene::{GlobeScene, Material};
use tracing::{debug, warn};

use crate::camera::PerspectiveCamera;
use crate::renderer::{MeshHandles, RenderBackend, RenderError, SceneHandles, Viewport};
use crate::uniforms::FrameUniforms;

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    CreateScene {
        particles: usize,
        viewport: Viewport,
    },
    Draw {
        time_s: f32,
        camera_distance: f32,
        particle_color: [f32; 4],
    },
    Resize(Viewport),
    Release {
        resources: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Fail to compile the shader with this label.
    ShaderCompile(String),
    /// Fail the n-th (0-based) render call.
    RenderAt(u64),
}

#[derive(Debug, Default)]
pub struct Ledger {
    pub live: BTreeSet<ResourceHandle>,
    pub allocated: u64,
    pub released: u64,
    /// Release calls for handles that were not live.
    pub stale_releases: u64,
    pub renders: u64,
    pub commands: Vec<RenderCommand>,
}

/// Shared view of a [`RecordingBackend`]'s bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct RecordingLedger(Rc<RefCell<Ledger>>);

impl RecordingLedger {
    pub fn live_count(&self) -> usize {
        self.0.borrow().live.len()
    }

    pub fn allocated(&self) -> u64 {
        self.0.borrow().allocated
    }

    pub fn released(&self) -> u64 {
        self.0.borrow().released
    }

    pub fn stale_releases(&self) -> u64 {
        self.0.borrow().stale_releases
    }

    pub fn renders(&self) -> u64 {
        self.0.borrow().renders
    }

    pub fn commands(&self) -> Vec<RenderCommand> {
        self.0.borrow().commands.clone()
    }
}

#[derive(Debug)]
pub struct RecordingBackend {
    alloc: HandleAllocator,
    ledger: RecordingLedger,
    faults: Vec<Fault>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::with_generation(1)
    }

    pub fn with_generation(generation: u32) -> Self {
        Self {
            alloc: HandleAllocator::new(generation),
            ledger: RecordingLedger::default(),
            faults: Vec::new(),
        }
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    pub fn ledger(&self) -> RecordingLedger {
        self.ledger.clone()
    }

    fn allocate(&mut self, kind: ResourceKind) -> ResourceHandle {
        let handle = self.alloc.allocate(kind);
        let mut ledger = self.ledger.0.borrow_mut();
        ledger.live.insert(handle);
        ledger.allocated += 1;
        handle
    }

    fn free(&mut self, handle: ResourceHandle) {
        let mut ledger = self.ledger.0.borrow_mut();
        if ledger.live.remove(&handle) {
            ledger.released += 1;
        } else {
            warn!(?handle, "release of a handle that is not live");
            ledger.stale_releases += 1;
        }
    }

    fn compile(&self, material: &Material) -> Result<(), RenderError> {
        let label = material.shader.label;
        let injected = self
            .faults
            .iter()
            .any(|f| matches!(f, Fault::ShaderCompile(l) if l == label));
        if injected {
            return Err(RenderError::ShaderCompile {
                label: label.to_string(),
                message: "injected failure".to_string(),
            });
        }
        if material.shader.wgsl.trim().is_empty() {
            return Err(RenderError::ShaderCompile {
                label: label.to_string(),
                message: "empty source".to_string(),
            });
        }
        Ok(())
    }

    fn mesh(
        &mut self,
        material: &Material,
        taken: &mut Vec<ResourceHandle>,
    ) -> Result<MeshHandles, RenderError> {
        let geometry = self.allocate(ResourceKind::Geometry);
        taken.push(geometry);
        self.compile(material)?;
        let material = self.allocate(ResourceKind::Material);
        taken.push(material);
        Ok(MeshHandles {
            geometry,
            material,
            texture: None,
        })
    }
}

impl RenderBackend for RecordingBackend {
    fn create_scene(
        &mut self,
        scene: &GlobeScene,
        viewport: Viewport,
    ) -> Result<SceneHandles, RenderError> {
        let mut taken = Vec::new();
        let renderer = self.allocate(ResourceKind::Renderer);
        taken.push(renderer);

        let built = (|| {
            let ocean = self.mesh(&scene.ocean.material, &mut taken)?;
            let glow = self.mesh(&scene.glow.material, &mut taken)?;
            let particles = self.mesh(&scene.particles.material, &mut taken)?;
            Ok::<_, RenderError>((ocean, glow, particles))
        })();

        let (ocean, glow, particles) = match built {
            Ok(meshes) => meshes,
            Err(err) => {
                for handle in taken.into_iter().rev() {
                    self.free(handle);
                }
                return Err(err);
            }
        };

        let mut camera = PerspectiveCamera::default();
        camera.set_viewport(viewport.width, viewport.height);
        self.ledger
            .0
            .borrow_mut()
            .commands
            .push(RenderCommand::CreateScene {
                particles: scene.particle_count(),
                viewport,
            });
        debug!(resources = taken.len(), "recording backend created scene");

        Ok(SceneHandles {
            renderer,
            camera,
            viewport,
            ocean,
            glow,
            particles,
        })
    }

    fn render(
        &mut self,
        _handles: &SceneHandles,
        uniforms: &FrameUniforms,
    ) -> Result<(), RenderError> {
        let mut ledger = self.ledger.0.borrow_mut();
        let n = ledger.renders;
        ledger.renders += 1;
        if self.faults.contains(&Fault::RenderAt(n)) {
            return Err(RenderError::Backend(format!("injected failure at render {n}")));
        }
        ledger.commands.push(RenderCommand::Draw {
            time_s: uniforms.particles.params[0],
            camera_distance: uniforms.ocean.camera_pos[2],
            particle_color: uniforms.particles.color,
        });
        Ok(())
    }

    fn resize(&mut self, handles: &SceneHandles) -> Result<(), RenderError> {
        self.ledger
            .0
            .borrow_mut()
            .commands
            .push(RenderCommand::Resize(handles.viewport));
        Ok(())
    }

    fn release(&mut self, handles: SceneHandles) {
        let resources = handles.resources();
        let count = resources.len();
        for handle in resources {
            self.free(handle);
        }
        self.ledger
            .0
            .borrow_mut()
            .commands
            .push(RenderCommand::Release { resources: count });
    }
}
