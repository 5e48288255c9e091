use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

/// Continuous repaint loop over `requestAnimationFrame`.
///
/// The scene is always animating (glow, blips), so every callback
/// immediately requests the next frame — there is no dirty flag to coalesce.
/// `cancel()` stops the chain, is idempotent, and is also run on `Drop` so a
/// dropped loop can never fire into freed state.
pub struct FrameLoop {
    inner: Rc<Inner>,
}

struct Inner {
    window: Option<web_sys::Window>,
    raf_id: Cell<Option<i32>>,
    cancelled: Cell<bool>,
    callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl FrameLoop {
    /// Start the loop; `render_fn` runs once per vsync until cancelled.
    pub fn start(mut render_fn: impl FnMut() + 'static) -> Self {
        let inner = Rc::new(Inner {
            window: web_sys::window(),
            raf_id: Cell::new(None),
            cancelled: Cell::new(false),
            callback: RefCell::new(None),
        });

        let inner_cb = inner.clone();
        let cb = Closure::<dyn FnMut()>::new(move || {
            inner_cb.raf_id.set(None);
            if inner_cb.cancelled.get() {
                return;
            }
            render_fn();
            Inner::schedule(&inner_cb);
        });
        *inner.callback.borrow_mut() = Some(cb);
        Inner::schedule(&inner);

        Self { inner }
    }

    /// Stop the loop and release the pending frame request. Safe to call
    /// more than once.
    pub fn cancel(&self) {
        if self.inner.cancelled.replace(true) {
            return;
        }
        if let (Some(raf_id), Some(window)) = (self.inner.raf_id.take(), self.inner.window.as_ref())
        {
            let _ = window.cancel_animation_frame(raf_id);
        }
        // Break the callback->inner reference cycle.
        self.inner.callback.borrow_mut().take();
    }
}

impl Inner {
    fn schedule(inner: &Rc<Inner>) {
        if inner.cancelled.get() || inner.raf_id.get().is_some() {
            return;
        }
        let cb_ref = inner.callback.borrow();
        let (Some(cb), Some(window)) = (cb_ref.as_ref(), inner.window.as_ref()) else {
            return;
        };
        if let Ok(raf_id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            inner.raf_id.set(Some(raf_id));
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}
