// Frame buffers and pooling
//
// Canonical host-memory pictures in one of two layouts, with a recycling
// pool so steady-state decode does not allocate per frame. Rows are padded
// to a 16-byte stride; all size math is checked so hostile geometry fails
// with an error instead of wrapping.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

const STRIDE_ALIGN: usize = 16;

fn align_stride(width_bytes: usize) -> usize {
    (width_bytes + STRIDE_ALIGN - 1) & !(STRIDE_ALIGN - 1)
}

/// Canonical output layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, three planes.
    Yuv420p,
    /// Semi-planar YUV 4:2:0, luma plane plus interleaved chroma plane.
    Nv12,
}

impl PixelFormat {
    pub fn plane_count(&self) -> usize {
        match self {
            PixelFormat::Yuv420p => 3,
            PixelFormat::Nv12 => 2,
        }
    }

    /// Width in bytes of plane `index` for a picture `width` pixels wide.
    fn plane_width_bytes(&self, index: usize, width: usize) -> usize {
        match (self, index) {
            (_, 0) => width,
            (PixelFormat::Yuv420p, _) => width.div_ceil(2),
            (PixelFormat::Nv12, _) => width.div_ceil(2) * 2,
        }
    }

    fn plane_rows(&self, index: usize, height: usize) -> usize {
        if index == 0 {
            height
        } else {
            height.div_ceil(2)
        }
    }
}

/// One plane of a frame. `stride` is the row pitch in bytes and may exceed
/// the visible width.
pub struct Plane {
    pub data: Vec<u8>,
    pub stride: usize,
}

/// Canonical decoded picture.
pub struct VideoFrame {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    pub planes: Vec<Plane>,
}

impl VideoFrame {
    pub fn new(width: usize, height: usize, format: PixelFormat) -> Result<Self, BridgeError> {
        if width == 0 || height == 0 {
            return Err(BridgeError::InvalidArgument(format!(
                "degenerate frame geometry {}x{}",
                width, height
            )));
        }
        let mut planes = Vec::with_capacity(format.plane_count());
        for index in 0..format.plane_count() {
            let stride = align_stride(format.plane_width_bytes(index, width));
            let rows = format.plane_rows(index, height);
            let size = stride.checked_mul(rows).ok_or_else(|| {
                BridgeError::ResourceExhaustion(format!(
                    "frame plane size overflow for {}x{}",
                    width, height
                ))
            })?;
            planes.push(Plane {
                data: vec![0; size],
                stride,
            });
        }
        Ok(VideoFrame {
            width,
            height,
            format,
            planes,
        })
    }
}

struct PoolState {
    width: usize,
    height: usize,
    format: PixelFormat,
    free: Vec<VideoFrame>,
}

/// Recycling frame pool. A geometry change drops the free list; frames
/// returned after a change are discarded rather than mixed in.
pub struct FramePool {
    state: Mutex<PoolState>,
}

impl FramePool {
    pub fn new() -> Arc<Self> {
        Arc::new(FramePool {
            state: Mutex::new(PoolState {
                width: 0,
                height: 0,
                format: PixelFormat::Nv12,
                free: Vec::new(),
            }),
        })
    }

    pub fn get_frame(
        self: &Arc<Self>,
        width: usize,
        height: usize,
        format: PixelFormat,
    ) -> Result<PooledFrame, BridgeError> {
        let mut state = self.state.lock();
        if state.width != width || state.height != height || state.format != format {
            state.free.clear();
            state.width = width;
            state.height = height;
            state.format = format;
        }
        let frame = match state.free.pop() {
            Some(frame) => frame,
            None => VideoFrame::new(width, height, format)?,
        };
        drop(state);
        Ok(PooledFrame {
            frame: Some(frame),
            pool: Arc::downgrade(self),
        })
    }

    fn put_back(&self, frame: VideoFrame) {
        let mut state = self.state.lock();
        if state.width == frame.width && state.height == frame.height && state.format == frame.format
        {
            state.free.push(frame);
        }
    }

    #[cfg(test)]
    fn free_count(&self) -> usize {
        self.state.lock().free.len()
    }
}

/// Frame checked out of a pool; returns itself on drop.
pub struct PooledFrame {
    frame: Option<VideoFrame>,
    pool: Weak<FramePool>,
}

impl std::ops::Deref for PooledFrame {
    type Target = VideoFrame;

    fn deref(&self) -> &VideoFrame {
        self.frame.as_ref().unwrap()
    }
}

impl std::ops::DerefMut for PooledFrame {
    fn deref_mut(&mut self) -> &mut VideoFrame {
        self.frame.as_mut().unwrap()
    }
}

impl Drop for PooledFrame {
    fn drop(&mut self) {
        if let (Some(frame), Some(pool)) = (self.frame.take(), self.pool.upgrade()) {
            pool.put_back(frame);
        }
    }
}
