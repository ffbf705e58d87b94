//! Handles actions related to screen drawing.
use std::sync::Arc;

use pixels::{self, Pixels, SurfaceTexture};
use winit;

/// Contains the necessary information to draw pixels on the screen.
///
/// Depth no longer lives here: each screen tile owns its own depth buffer
/// for the duration of a frame (see [`crate::tile::TileBuffer`]); this
/// type only ever holds the final composited BGRA image the orchestrator
/// writes into and `pixels` presents.
pub struct Screen {
    /// Width of the buffer.
    width: u32,
    /// Height of the buffer.
    height: u32,
    /// Pixels instance used to draw on screen.
    pixels: Option<pixels::Pixels<'static>>,
}

impl Screen {
    /// Creates new screen.
    ///
    /// Creates new screen, but does not instantiate pixels.
    ///
    /// # Arguments
    ///
    /// * `width` - Width of the screen buffer.
    /// * `height` - Height of the screen buffer.
    ///
    /// # Returns
    ///
    /// The instantiated Screen.
    pub fn new(width: u32, height: u32) -> Self {
        Screen { width, height, pixels: None }
    }

    /// Screen width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Screen height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }
    /// Initializes the pixels instance.
    ///
    /// Given a shared winit window, it creates the pixels instance.
    ///
    /// # Arguments
    ///
    /// * `window` - Shared window that hosts the application.
    ///
    /// # Returns
    ///
    /// An error if instantiation fails or nothing if everything goes well.
    pub fn initialize_pixels(
        &mut self,
        window: Arc<winit::window::Window>,
    ) -> Result<(), pixels::Error> {
        let pixels = {
            let surface_texture = SurfaceTexture::new(self.width, self.height, window);
            pixels::Pixels::new(self.width, self.height, surface_texture)?
        };
        self.pixels = Some(pixels);
        Ok(())
    }
    /// Mutable getter for the pixels instance.
    pub fn pixels_mut(&mut self) -> Option<&mut Pixels<'static>> {
        self.pixels.as_mut()
    }

    /// The presentable frame as a `width * height` row-major `u32` BGRA
    /// slab, the orchestrator's composite target. `None` until
    /// [`Screen::initialize_pixels`] has run.
    pub fn frame_mut(&mut self) -> Option<&mut [u32]> {
        let frame = self.pixels.as_mut()?.frame_mut();
        debug_assert_eq!(frame.len(), (self.width * self.height) as usize * 4);
        // SAFETY: `frame` is a byte slice whose length is a multiple of 4
        // and whose alignment the allocator guarantees is at least 4 for
        // a GPU-mapped buffer; each 4-byte group is one packed pixel, the
        // same layout `u32` BGRA pixels already use elsewhere in this
        // crate.
        let pixels = unsafe { std::slice::from_raw_parts_mut(frame.as_mut_ptr().cast::<u32>(), frame.len() / 4) };
        Some(pixels)
    }
}
