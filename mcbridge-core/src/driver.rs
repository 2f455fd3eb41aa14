// Decode session driver
//
// Owns one codec instance and drives its buffer-queue protocol: feed as
// much of the pending packet as input slots allow, then drain at most one
// output slot per call. Output either renders straight to a retained
// surface or is normalized into a pooled host frame. The codec is shared
// through an `Arc` so pictures still referencing a codec slot keep the
// codec alive after the session closes; teardown runs when the last
// holder drops.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tracing::{debug, error, info, trace};

use crate::codec::{DequeueInput, DequeueOutput, MediaCodec};
use crate::codec_list::select_decoder;
use crate::error::BridgeError;
use crate::format::MediaFormat;
use crate::frame::{FramePool, PixelFormat, PooledFrame};
use crate::pixel::{self, Geometry};
use crate::runtime::Bridge;
use crate::surface::{NativeWindow, Surface};

// Input slots rarely take longer than half a frame interval to free up.
const INPUT_DEQUEUE_TIMEOUT_US: i64 = 8333;
const OUTPUT_DEQUEUE_TIMEOUT_US: i64 = 8333;

fn align16(value: i32) -> i32 {
    (value + 15) & !15
}

// ============================================================================
// Session types
// ============================================================================

/// One compressed input unit.
pub struct Packet<'a> {
    pub data: &'a [u8],
    pub pts_us: i64,
}

/// Where decoded pictures go.
pub enum OutputMode {
    /// Normalize into pooled host frames.
    CopyOut,
    /// Render into the given window; pictures carry no pixel data.
    Surface(Arc<dyn NativeWindow>),
}

pub struct SessionConfig {
    pub mime: String,
    pub width: i32,
    pub height: i32,
    pub output: OutputMode,
}

/// Result of one `decode` call.
pub struct DecodeOutput {
    pub bytes_consumed: usize,
    pub picture: Option<Picture>,
}

/// A decoded picture, either owned pixels or a claim on a codec slot
/// bound for the display.
pub struct Picture {
    pub width: i32,
    pub height: i32,
    pub format: Option<PixelFormat>,
    pub pts_us: i64,
    data: PictureData,
}

enum PictureData {
    Owned(PooledFrame),
    Surface(SurfaceBacking),
}

impl Picture {
    /// Pixel data for copy-out sessions; `None` for surface-bound output.
    pub fn frame(&self) -> Option<&PooledFrame> {
        match &self.data {
            PictureData::Owned(frame) => Some(frame),
            PictureData::Surface(_) => None,
        }
    }

    /// Sends a surface-bound picture to the display. Owned pictures just
    /// drop.
    pub fn render(self) {}
}

/// Claim on an output slot headed for the display. Dropping it releases
/// the slot with rendering enabled.
struct SurfaceBacking {
    codec: Arc<MediaCodec>,
    index: i32,
    // Hold keeps the window alive until the slot is consumed.
    _surface: Surface,
}

impl Drop for SurfaceBacking {
    fn drop(&mut self) {
        if let Err(e) = self.codec.release_output_buffer(self.index, true) {
            error!("failed to render output buffer {}: {}", self.index, e);
        }
    }
}

// ============================================================================
// Driver
// ============================================================================

pub struct DecodeDriver {
    bridge: Arc<Bridge>,
    codec: Option<Arc<MediaCodec>>,
    codec_name: String,
    format: Option<MediaFormat>,
    geometry: Option<Geometry>,
    surface: Option<Surface>,
    pool: Arc<FramePool>,
    width: i32,
    height: i32,
    queued_buffers: i64,
    queued_buffers_max: i64,
    dequeued_buffers: i64,
    first_buffer: u64,
    first_buffer_at: Instant,
}

impl DecodeDriver {
    /// Selects a decoder for the session, creates and starts it, and
    /// parses the initial output geometry when the codec reports one.
    pub fn init(
        bridge: Arc<Bridge>,
        session: SessionConfig,
        format: &MediaFormat,
    ) -> Result<Self, BridgeError> {
        let surface = match &session.output {
            OutputMode::CopyOut => None,
            OutputMode::Surface(window) => Some(Surface::retain(window)),
        };

        let codec_name = select_decoder(&bridge, &session.mime, session.width, session.height)?;
        debug!("found decoder {:?} for {}", codec_name, session.mime);

        let codec = MediaCodec::create_by_name(bridge.clone(), &codec_name)?;
        codec.configure(format, None, 0)?;
        codec.start()?;

        let mut driver = DecodeDriver {
            bridge,
            codec: Some(Arc::new(codec)),
            codec_name,
            format: None,
            geometry: None,
            surface,
            pool: FramePool::new(),
            width: session.width,
            height: session.height,
            queued_buffers: 0,
            queued_buffers_max: 0,
            dequeued_buffers: 0,
            first_buffer: 0,
            first_buffer_at: Instant::now(),
        };

        // Some codecs only report geometry after the first frames; an
        // absent initial format is not an error.
        if let Ok(initial) = driver.codec()?.output_format() {
            driver.geometry = Some(driver.parse_output_format(&initial)?);
            driver.format = Some(initial);
        }

        Ok(driver)
    }

    fn codec(&self) -> Result<&Arc<MediaCodec>, BridgeError> {
        self.codec
            .as_ref()
            .ok_or_else(|| BridgeError::InvalidArgument("decode session is closed".into()))
    }

    pub fn codec_name(&self) -> &str {
        &self.codec_name
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    fn parse_output_format(&self, format: &MediaFormat) -> Result<Geometry, BridgeError> {
        let text = format.to_display_string().unwrap_or_default();
        debug!("parsing output format {}", text);

        let mandatory = |key: &str| -> Result<i32, BridgeError> {
            format.get_i32(key)?.ok_or_else(|| {
                BridgeError::External(format!("could not get {} from format {}", key, text))
            })
        };

        let width = mandatory("width")?;
        let height = mandatory("height")?;
        let stride_value = mandatory("stride")?;
        let mut stride = if stride_value >= 0 { stride_value } else { width };
        let slice_value = mandatory("slice-height")?;
        let mut slice_height = if slice_value > 0 { slice_value } else { height };

        if self.codec_name.contains("OMX.Nvidia.") {
            slice_height = align16(height);
        } else if self.codec_name.contains("OMX.SEC.avc.dec") {
            slice_height = self.height;
            stride = self.width;
        }

        let mut color_format = mandatory("color-format")?;
        if self.codec_name == "OMX.k3.video.decoder.avc"
            && color_format == pixel::COLOR_FORMAT_YCBYCR
        {
            color_format = pixel::COLOR_TI_FORMAT_YUV420_PACKED_SEMI_PLANAR;
        }

        let pixel_format = if self.surface.is_some() {
            None
        } else {
            match pixel::map_color_format(color_format) {
                Some(pf) => Some(pf),
                None => {
                    return Err(BridgeError::InvalidArgument(format!(
                        "output color format {:#x} is not supported",
                        color_format
                    )))
                }
            }
        };

        let crop_top = format.get_i32("crop-top")?.unwrap_or(0);
        let crop_bottom = format.get_i32("crop-bottom")?.unwrap_or(0);
        let crop_left = format.get_i32("crop-left")?.unwrap_or(0);
        let crop_right = format.get_i32("crop-right")?.unwrap_or(0);

        info!(
            "output crop parameters top={} bottom={} left={} right={}",
            crop_top, crop_bottom, crop_left, crop_right
        );

        Ok(Geometry {
            width,
            height,
            stride,
            slice_height,
            color_format,
            crop_top,
            crop_bottom,
            crop_left,
            crop_right,
            pixel_format,
        })
    }

    /// Feeds as much of `packet` as input slots allow, then drains at
    /// most one output slot. Typically called in a loop until the whole
    /// packet is consumed.
    pub fn decode(&mut self, packet: &Packet<'_>) -> Result<DecodeOutput, BridgeError> {
        let mut offset = 0;
        while offset < packet.data.len() {
            let index = match self.codec()?.dequeue_input_buffer(INPUT_DEQUEUE_TIMEOUT_US)? {
                DequeueInput::Buffer(index) => index,
                DequeueInput::TryAgainLater => break,
            };
            let mut slice = self.codec()?.input_buffer(index)?;
            let written = slice.write(&packet.data[offset..]);
            offset += written;
            self.codec()?
                .queue_input_buffer(index, 0, written as i32, packet.pts_us, 0)?;
            self.queued_buffers += 1;
            if self.queued_buffers > self.queued_buffers_max {
                self.queued_buffers_max = self.queued_buffers;
            }
        }

        // Until the first output arrives, polling must not stall input.
        let timeout = if self.dequeued_buffers == 0 {
            0
        } else {
            OUTPUT_DEQUEUE_TIMEOUT_US
        };

        let picture = match self.codec()?.dequeue_output_buffer(timeout)? {
            DequeueOutput::Buffer { index, info } => {
                if self.first_buffer == 0 {
                    debug!(
                        "got first buffer after {:.3}ms",
                        self.first_buffer_at.elapsed().as_secs_f64() * 1000.0
                    );
                }
                self.first_buffer += 1;
                debug!(
                    "got output buffer {} offset={} size={} ts={} flags={}",
                    index, info.offset, info.size, info.presentation_time_us, info.flags
                );
                let picture = self.emit_picture(index, &info)?;
                self.queued_buffers -= 1;
                self.dequeued_buffers += 1;
                Some(picture)
            }
            DequeueOutput::OutputFormatChanged => {
                self.format = None;
                let format = self.codec()?.output_format()?;
                info!(
                    "output format changed to {}",
                    format.to_display_string().unwrap_or_default()
                );
                self.geometry = Some(self.parse_output_format(&format)?);
                self.format = Some(format);
                None
            }
            DequeueOutput::OutputBuffersChanged => {
                self.codec()?.clean_output_buffers()?;
                None
            }
            DequeueOutput::TryAgainLater => {
                trace!("no output buffer available, try again later");
                None
            }
        };

        Ok(DecodeOutput {
            bytes_consumed: offset,
            picture,
        })
    }

    fn emit_picture(
        &mut self,
        index: i32,
        info: &crate::codec::BufferInfo,
    ) -> Result<Picture, BridgeError> {
        if let Some(surface) = &self.surface {
            return Ok(Picture {
                width: self.width,
                height: self.height,
                format: None,
                pts_us: info.presentation_time_us,
                data: PictureData::Surface(SurfaceBacking {
                    codec: self.codec()?.clone(),
                    index,
                    _surface: surface.clone(),
                }),
            });
        }

        let copy_result = self.copy_output(index, info);

        // The slot goes back to the codec whether or not the copy worked;
        // a failed release outranks a successful copy.
        let release_result = self.codec()?.release_output_buffer(index, false);
        if let Err(e) = release_result {
            error!("failed to release output buffer {}: {}", index, e);
            return Err(e);
        }
        let (pixel_format, frame) = copy_result?;

        Ok(Picture {
            width: self.width,
            height: self.height,
            format: Some(pixel_format),
            pts_us: info.presentation_time_us,
            data: PictureData::Owned(frame),
        })
    }

    fn copy_output(
        &self,
        index: i32,
        info: &crate::codec::BufferInfo,
    ) -> Result<(PixelFormat, PooledFrame), BridgeError> {
        let geometry = self.geometry.as_ref().ok_or_else(|| {
            BridgeError::External("got an output buffer before any output format".into())
        })?;
        let pixel_format = geometry.pixel_format.ok_or_else(|| {
            BridgeError::InvalidArgument("no canonical layout for this session".into())
        })?;

        let slice = self.codec()?.output_buffer(index)?;
        let mut frame = self
            .pool
            .get_frame(self.width as usize, self.height as usize, pixel_format)?;
        pixel::copy_frame(geometry, slice.bytes(), info.offset.max(0) as usize, &mut frame)?;
        Ok((pixel_format, frame))
    }

    /// Drops all queued and pending buffers. Previously returned pictures
    /// stay valid; only codec-side state resets.
    pub fn flush(&mut self) -> Result<(), BridgeError> {
        self.queued_buffers = 0;
        self.dequeued_buffers = 0;
        self.codec()?.flush()?;
        self.first_buffer = 0;
        self.first_buffer_at = Instant::now();
        Ok(())
    }

    /// Ends the session. Codec teardown happens once the last picture
    /// holding the codec drops.
    pub fn close(&mut self) {
        self.codec = None;
        self.format = None;
        self.surface = None;
    }

    /// Diagnostics snapshot.
    pub fn info(&self) -> serde_json::Value {
        json!({
            "codec_name": self.codec_name,
            "active": self.codec.is_some(),
            "surface_output": self.surface.is_some(),
            "width": self.width,
            "height": self.height,
            "geometry": self.geometry,
            "queued_buffers": self.queued_buffers,
            "queued_buffers_max": self.queued_buffers_max,
            "dequeued_buffers": self.dequeued_buffers,
        })
    }
}

impl Drop for DecodeDriver {
    fn drop(&mut self) {
        self.close();
    }
}
