use crate::binning::Bins;
use crate::math::V3;

/// The per-frame scratch allocations a single `render_frame` call needs:
/// projected screen coordinates and camera-space positions (parallel to
/// the mesh's vertices) and the tile bin lists built from them.
#[derive(Default)]
pub(super) struct FrameBuffers {
    pub projected: Vec<(i32, i32)>,
    pub camera_space: Vec<V3>,
    pub bins: Option<Bins>,
    /// Scratch: each vertex after the rotation matrix multiply, before the
    /// per-frame translation is folded in via the batch kernel.
    pub rotated: Vec<V3>,
    /// Scratch: `mesh_distance` offset broadcast to one entry per vertex,
    /// so the translate step can run as a single `add_slice_v3` call.
    pub offsets: Vec<V3>,
}

impl FrameBuffers {
    fn new() -> Self {
        FrameBuffers::default()
    }

    /// Clears and grows `projected`/`camera_space`/`rotated`/`offsets` to
    /// `vertex_count`, reusing whatever capacity this slot already has from
    /// two frames ago rather than allocating fresh each time.
    fn resize_for(&mut self, vertex_count: usize) {
        self.projected.clear();
        self.projected.resize(vertex_count, (0, 0));
        self.camera_space.clear();
        self.camera_space.resize(vertex_count, V3::ZERO);
        self.rotated.clear();
        self.rotated.resize(vertex_count, V3::ZERO);
        self.offsets.clear();
        self.offsets.resize(vertex_count, V3::ZERO);
    }
}

/// Double-buffered scratch storage for per-frame rendering data.
///
/// `render_frame` writes this frame's projected vertices, camera-space
/// positions and bin lists into one slot while the *other* slot — last
/// frame's data — is left completely untouched. A render only ever reads
/// the slot it just wrote (all of a frame's jobs finish, synchronously,
/// before `render_frame` returns), so this buys nothing for correctness;
/// what it buys is that a slot's `Vec`s and `Bins` keep their capacity
/// across frames instead of being dropped and reallocated every time,
/// since each slot is only overwritten once every *other* frame rather
/// than being freed immediately after use.
pub(super) struct FrameArena {
    slots: [FrameBuffers; 2],
    active: usize,
}

impl FrameArena {
    pub(super) fn new() -> Self {
        FrameArena { slots: [FrameBuffers::new(), FrameBuffers::new()], active: 0 }
    }

    /// Swaps to the other slot and sizes it for `vertex_count` vertices,
    /// ready for this frame's writes.
    pub(super) fn begin_frame(&mut self, vertex_count: usize) -> &mut FrameBuffers {
        self.active = 1 - self.active;
        let slot = &mut self.slots[self.active];
        slot.resize_for(vertex_count);
        slot.bins = None;
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_frame_alternates_slots_and_sizes_buffers() {
        let mut arena = FrameArena::new();
        let a = arena.begin_frame(10);
        assert_eq!(a.projected.len(), 10);
        a.projected[0] = (5, 5);

        let b = arena.begin_frame(3);
        assert_eq!(b.projected.len(), 3);

        // Coming back around, the slot from two frames ago is reused and
        // resized, not the one we just wrote.
        let a_again = arena.begin_frame(10);
        assert_eq!(a_again.projected.len(), 10);
    }
}
