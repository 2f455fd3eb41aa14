// Surface - refcounted rendering target
//
// A decode session rendering straight to the display holds a native window
// supplied by the embedding application. The window's lifetime is managed
// by explicit acquire/release pairs; `Surface` ties one acquire to each
// clone so the window outlives every picture still referencing it.

use std::sync::Arc;

/// Rendering target owned by the embedding application.
pub trait NativeWindow: Send + Sync {
    fn acquire(&self);
    fn release(&self);
}

/// RAII hold on a native window. Clone acquires, drop releases.
pub struct Surface {
    window: Arc<dyn NativeWindow>,
}

impl Surface {
    pub fn retain(window: &Arc<dyn NativeWindow>) -> Self {
        window.acquire();
        Surface {
            window: window.clone(),
        }
    }

}

impl Clone for Surface {
    fn clone(&self) -> Self {
        self.window.acquire();
        Surface {
            window: self.window.clone(),
        }
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        self.window.release();
    }
}
