use log::warn;

use sliceview_core::SceneError;
use sliceview_renderer::{Compositor, RenderError};

use crate::controller::ViewportController;

/// Top-level handle tying a controller to an optional compositor.
///
/// All access goes through `lock()`, whose guard hands out borrows of
/// the two halves; the borrow checker guarantees the exclusivity that
/// the embedder's event loop needs.
pub struct Viewport {
    controller: ViewportController,
    compositor: Option<Box<dyn Compositor>>,
    repaint_needed: bool,
}

impl Viewport {
    pub fn new() -> Self {
        Self {
            controller: ViewportController::new(),
            compositor: None,
            repaint_needed: false,
        }
    }

    pub fn with_compositor(compositor: Box<dyn Compositor>) -> Self {
        Self {
            controller: ViewportController::new(),
            compositor: Some(compositor),
            repaint_needed: true,
        }
    }

    /// Installs or replaces the compositor; the next refresh redraws
    /// from scratch.
    pub fn set_compositor(&mut self, compositor: Box<dyn Compositor>) {
        self.compositor = Some(compositor);
        self.repaint_needed = true;
    }

    pub fn lock(&mut self) -> ViewportLock<'_> {
        ViewportLock { viewport: self }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive access to a viewport's controller and compositor.
pub struct ViewportLock<'a> {
    viewport: &'a mut Viewport,
}

impl ViewportLock<'_> {
    pub fn controller(&self) -> &ViewportController {
        &self.viewport.controller
    }

    pub fn controller_mut(&mut self) -> &mut ViewportController {
        &mut self.viewport.controller
    }

    pub fn has_compositor(&self) -> bool {
        self.viewport.compositor.is_some()
    }

    pub fn compositor_mut(&mut self) -> Option<&mut (dyn Compositor + 'static)> {
        self.viewport.compositor.as_deref_mut()
    }

    /// Marks that the canvas content is stale; the embedder polls
    /// `take_repaint_request` from its paint loop.
    pub fn invalidate(&mut self) {
        self.viewport.repaint_needed = true;
    }

    pub fn take_repaint_request(&mut self) -> bool {
        std::mem::take(&mut self.viewport.repaint_needed)
    }

    pub fn set_canvas_size(&mut self, width: u32, height: u32) {
        if let Some(compositor) = &mut self.viewport.compositor {
            compositor.set_canvas_size(width, height);
        }
        self.viewport.repaint_needed = true;
    }

    /// Fits the scene content to the compositor's canvas.
    pub fn fit_content(&mut self) -> Result<(), SceneError> {
        let viewport = &mut *self.viewport;
        match &viewport.compositor {
            Some(compositor) => {
                viewport
                    .controller
                    .fit_content(compositor.canvas_width(), compositor.canvas_height())?;
                viewport.repaint_needed = true;
                Ok(())
            }
            None => {
                warn!("Cannot fit the content without a compositor");
                Ok(())
            }
        }
    }

    /// Renders the controller's scene; a no-op without a compositor.
    pub fn refresh(&mut self) -> Result<(), RenderError> {
        let viewport = &mut *self.viewport;
        if let Some(compositor) = &mut viewport.compositor {
            compositor.refresh(viewport.controller.scene())?;
            viewport.repaint_needed = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sliceview_core::{Color, PolylineSceneLayer, Scene2D, SceneLayer, ScenePoint2D};

    use super::*;

    struct ProbeCompositor {
        width: u32,
        height: u32,
        refreshes: usize,
    }

    impl ProbeCompositor {
        fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                refreshes: 0,
            }
        }
    }

    impl Compositor for ProbeCompositor {
        fn set_canvas_size(&mut self, width: u32, height: u32) {
            self.width = width;
            self.height = height;
        }

        fn canvas_width(&self) -> u32 {
            self.width
        }

        fn canvas_height(&self) -> u32 {
            self.height
        }

        fn refresh(&mut self, _scene: &Scene2D) -> Result<(), RenderError> {
            self.refreshes += 1;
            Ok(())
        }

        fn reset_scene(&mut self) {}
    }

    #[test]
    fn test_repaint_request_lifecycle() {
        let mut viewport = Viewport::new();
        let mut lock = viewport.lock();

        assert!(!lock.take_repaint_request());
        lock.invalidate();
        assert!(lock.take_repaint_request());
        assert!(!lock.take_repaint_request());
    }

    #[test]
    fn test_refresh_clears_the_repaint_flag() {
        let mut viewport = Viewport::with_compositor(Box::new(ProbeCompositor::new(800, 600)));
        let mut lock = viewport.lock();
        assert!(lock.has_compositor());

        lock.refresh().unwrap();
        assert!(!lock.take_repaint_request());

        lock.invalidate();
        lock.refresh().unwrap();
        assert!(!lock.take_repaint_request());
    }

    #[test]
    fn test_refresh_without_compositor_is_a_no_op() {
        let mut viewport = Viewport::new();
        let mut lock = viewport.lock();
        assert!(!lock.has_compositor());
        lock.refresh().unwrap();
        lock.fit_content().unwrap();
    }

    #[test]
    fn test_fit_content_uses_the_compositor_canvas() {
        let mut viewport = Viewport::with_compositor(Box::new(ProbeCompositor::new(200, 100)));
        let mut lock = viewport.lock();

        let mut layer = PolylineSceneLayer::new();
        layer.add_chain(
            vec![ScenePoint2D::new(0.0, 0.0), ScenePoint2D::new(100.0, 50.0)],
            false,
            Color::new(255, 255, 255),
        );
        lock.controller_mut()
            .scene_mut()
            .set_layer(0, SceneLayer::Polyline(layer));

        lock.fit_content().unwrap();
        assert!(lock.take_repaint_request());
        assert!((lock.controller().zoom() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_set_canvas_size_reaches_the_compositor() {
        let mut viewport = Viewport::with_compositor(Box::new(ProbeCompositor::new(800, 600)));
        let mut lock = viewport.lock();
        lock.take_repaint_request();

        lock.set_canvas_size(1024, 768);
        assert!(lock.take_repaint_request());
        let compositor = lock.compositor_mut().unwrap();
        assert_eq!(compositor.canvas_width(), 1024);
        assert_eq!(compositor.canvas_height(), 768);
    }
}
