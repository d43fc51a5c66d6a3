/// What a [`ResourceHandle`] refers to on the backend side.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Renderer,
    Geometry,
    Material,
    Texture,
}

/// Generational handle to a backend-owned resource.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle {
    index: u32,
    generation: u32,
    kind: ResourceKind,
}

impl ResourceHandle {
    pub fn new(index: u32, generation: u32, kind: ResourceKind) -> Self {
        ResourceHandle {
            index,
            generation,
            kind,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

/// Hands out unique handles for one backend instance.
///
/// Every allocator draws a fresh generation, so handles from two backends never
/// compare equal.
#[derive(Debug)]
pub struct HandleAllocator {
    generation: u32,
    next_index: u32,
}

impl HandleAllocator {
    pub fn new(generation: u32) -> Self {
        Self {
            generation,
            next_index: 0,
        }
    }

    pub fn allocate(&mut self, kind: ResourceKind) -> ResourceHandle {
        let index = self.next_index;
        self.next_index = self.next_index.wrapping_add(1);
        ResourceHandle::new(index, self.generation, kind)
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}
