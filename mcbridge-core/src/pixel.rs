// Pixel normalization
//
// Decoders hand back raw buffers in whatever layout the vendor chip
// prefers. This module maps the reported color-format codes onto the two
// canonical layouts and copies a raw output buffer into a canonical frame,
// honoring stride, slice height, and crop offsets. The vendor 64x32 tiled
// layout gets its own untiling path.

use serde::Serialize;

use crate::error::BridgeError;
use crate::frame::{PixelFormat, VideoFrame};

// ============================================================================
// Color-format codes
// ============================================================================

pub const COLOR_FORMAT_YUV420_PLANAR: i32 = 0x13;
pub const COLOR_FORMAT_YUV420_SEMI_PLANAR: i32 = 0x15;
pub const COLOR_FORMAT_YCBYCR: i32 = 0x19;
pub const COLOR_QCOM_FORMAT_YUV420_SEMI_PLANAR: i32 = 0x7fa30c00;
pub const COLOR_QCOM_FORMAT_YUV420_PACKED_SEMI_PLANAR_64X32_TILE_2M8KA: i32 = 0x7fa30c03;
pub const COLOR_QCOM_FORMAT_YUV420_SEMI_PLANAR_32M: i32 = 0x7fa30c04;
pub const COLOR_TI_FORMAT_YUV420_PACKED_SEMI_PLANAR: i32 = 0x7f000100;
pub const COLOR_TI_FORMAT_YUV420_PACKED_SEMI_PLANAR_INTERLACED: i32 = 0x7f000001;

/// Maps a platform color-format code onto a canonical layout.
pub fn map_color_format(color_format: i32) -> Option<PixelFormat> {
    match color_format {
        COLOR_FORMAT_YUV420_PLANAR => Some(PixelFormat::Yuv420p),
        COLOR_FORMAT_YUV420_SEMI_PLANAR
        | COLOR_QCOM_FORMAT_YUV420_SEMI_PLANAR
        | COLOR_QCOM_FORMAT_YUV420_SEMI_PLANAR_32M
        | COLOR_QCOM_FORMAT_YUV420_PACKED_SEMI_PLANAR_64X32_TILE_2M8KA
        | COLOR_TI_FORMAT_YUV420_PACKED_SEMI_PLANAR
        | COLOR_TI_FORMAT_YUV420_PACKED_SEMI_PLANAR_INTERLACED => Some(PixelFormat::Nv12),
        _ => None,
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Parsed output geometry of a decode session.
#[derive(Debug, Clone, Serialize)]
pub struct Geometry {
    pub width: i32,
    pub height: i32,
    pub stride: i32,
    pub slice_height: i32,
    pub color_format: i32,
    pub crop_top: i32,
    pub crop_bottom: i32,
    pub crop_left: i32,
    pub crop_right: i32,
    /// None on a surface session, where no host copy happens.
    pub pixel_format: Option<PixelFormat>,
}

// ============================================================================
// Copy paths
// ============================================================================

/// Copies one raw decoder buffer into `frame`, dispatching on the
/// geometry's color format.
pub fn copy_frame(
    geometry: &Geometry,
    src: &[u8],
    offset: usize,
    frame: &mut VideoFrame,
) -> Result<(), BridgeError> {
    match geometry.color_format {
        COLOR_FORMAT_YUV420_PLANAR => copy_planar(geometry, src, offset, frame),
        COLOR_FORMAT_YUV420_SEMI_PLANAR
        | COLOR_QCOM_FORMAT_YUV420_SEMI_PLANAR
        | COLOR_QCOM_FORMAT_YUV420_SEMI_PLANAR_32M => {
            copy_semi_planar(geometry, src, offset, frame)
        }
        COLOR_TI_FORMAT_YUV420_PACKED_SEMI_PLANAR
        | COLOR_TI_FORMAT_YUV420_PACKED_SEMI_PLANAR_INTERLACED => {
            copy_ti_packed_semi_planar(geometry, src, offset, frame)
        }
        COLOR_QCOM_FORMAT_YUV420_PACKED_SEMI_PLANAR_64X32_TILE_2M8KA => {
            copy_qcom_tiled(src, frame)
        }
        other => Err(BridgeError::InvalidArgument(format!(
            "unsupported color format {:#x}",
            other
        ))),
    }
}

fn copy_rows(
    src: &[u8],
    src_offset: usize,
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
    width: usize,
    rows: usize,
) -> Result<(), BridgeError> {
    let mut src_pos = src_offset;
    let mut dst_pos = 0;
    for _ in 0..rows {
        let src_row = src.get(src_pos..src_pos + width).ok_or_else(|| {
            BridgeError::InvalidArgument("decoder buffer smaller than its geometry".into())
        })?;
        dst[dst_pos..dst_pos + width].copy_from_slice(src_row);
        src_pos += src_stride;
        dst_pos += dst_stride;
    }
    Ok(())
}

fn copy_planar(
    geometry: &Geometry,
    src: &[u8],
    offset: usize,
    frame: &mut VideoFrame,
) -> Result<(), BridgeError> {
    let stride = geometry.stride.max(0) as usize;
    let slice_height = geometry.slice_height.max(0) as usize;
    let crop_top = geometry.crop_top.max(0) as usize;
    let crop_left = geometry.crop_left.max(0) as usize;
    let width = frame.width;
    let height = frame.height;
    let chroma_stride = (stride + 1) / 2;

    for plane in 0..3 {
        let (src_stride, rows, copy_width, plane_offset) = if plane == 0 {
            (
                stride,
                height,
                width,
                offset + crop_top * stride + crop_left,
            )
        } else {
            let mut plane_offset = offset + slice_height * stride;
            if plane == 2 {
                plane_offset += ((slice_height + 1) / 2) * chroma_stride;
            }
            plane_offset += crop_top * chroma_stride + crop_left / 2;
            let dst_stride = frame.planes[plane].stride;
            let copy_width = dst_stride.min((width + 1) & !1);
            (chroma_stride, height / 2, copy_width, plane_offset)
        };
        let dst_stride = frame.planes[plane].stride;
        copy_rows(
            src,
            plane_offset,
            src_stride,
            &mut frame.planes[plane].data,
            dst_stride,
            copy_width,
            rows,
        )?;
    }
    Ok(())
}

fn copy_semi_planar(
    geometry: &Geometry,
    src: &[u8],
    offset: usize,
    frame: &mut VideoFrame,
) -> Result<(), BridgeError> {
    let stride = geometry.stride.max(0) as usize;
    let slice_height = geometry.slice_height.max(0) as usize;
    let crop_top = geometry.crop_top.max(0) as usize;
    let crop_left = geometry.crop_left.max(0) as usize;
    let width = frame.width;
    let height = frame.height;

    for plane in 0..2 {
        let (rows, plane_offset) = if plane == 0 {
            (height, offset + crop_top * stride + crop_left)
        } else {
            (
                height / 2,
                offset + slice_height * stride + crop_top * stride + crop_left,
            )
        };
        let dst_stride = frame.planes[plane].stride;
        let copy_width = if plane == 0 {
            width
        } else {
            dst_stride.min((width + 1) & !1)
        };
        copy_rows(
            src,
            plane_offset,
            stride,
            &mut frame.planes[plane].data,
            dst_stride,
            copy_width,
            rows,
        )?;
    }
    Ok(())
}

fn copy_ti_packed_semi_planar(
    geometry: &Geometry,
    src: &[u8],
    offset: usize,
    frame: &mut VideoFrame,
) -> Result<(), BridgeError> {
    let stride = geometry.stride.max(0) as usize;
    let slice_height = geometry.slice_height.max(0) as usize;
    let crop_top = geometry.crop_top.max(0) as usize;
    let crop_left = geometry.crop_left.max(0) as usize;
    let width = frame.width;
    let height = frame.height;

    for plane in 0..2 {
        let (rows, plane_offset) = if plane == 0 {
            // This layout bakes the luma crop into the buffer start.
            (height, offset)
        } else {
            (
                height / 2,
                offset + (slice_height - crop_top / 2) * stride + crop_top * stride + crop_left,
            )
        };
        let dst_stride = frame.planes[plane].stride;
        let copy_width = if plane == 0 {
            width
        } else {
            dst_stride.min((width + 1) & !1)
        };
        copy_rows(
            src,
            plane_offset,
            stride,
            &mut frame.planes[plane].data,
            dst_stride,
            copy_width,
            rows,
        )?;
    }
    Ok(())
}

// ============================================================================
// Vendor 64x32 tiled layout
// ============================================================================

const TILE_WIDTH: usize = 64;
const TILE_HEIGHT: usize = 32;
const TILE_SIZE: usize = TILE_WIDTH * TILE_HEIGHT;
const TILE_GROUP_SIZE: usize = 4 * TILE_SIZE;

/// Linear index of the tile at tile coordinates (x, y) in a grid of
/// `w` x `h` tiles. Tiles zigzag in pairs of rows, with a group-of-four
/// interleave that swaps column pairs on alternating rows.
fn qcom_tile_pos(x: usize, y: usize, w: usize, h: usize) -> usize {
    let mut flim = x + (y & !1) * w;
    if y & 1 != 0 {
        flim += (x & !3) + 2;
    } else if (h & 1) == 0 || y != h - 1 {
        flim += (x + 2) & !3;
    }
    flim
}

/// Untiles a 64x32-tiled buffer into `frame`. The tile grid ignores the
/// metadata offset; tiles address the buffer from its start.
fn copy_qcom_tiled(src: &[u8], frame: &mut VideoFrame) -> Result<(), BridgeError> {
    let width = frame.width;
    let height = frame.height;
    let linesize = frame.planes[0].stride;

    let tile_w = (width - 1) / TILE_WIDTH + 1;
    let tile_w_align = (tile_w + 1) & !1;
    let tile_h_luma = (height - 1) / TILE_HEIGHT + 1;
    let tile_h_chroma = if height / 2 == 0 {
        1
    } else {
        (height / 2 - 1) / TILE_HEIGHT + 1
    };

    let mut luma_size = tile_w_align * tile_h_luma * TILE_SIZE;
    if luma_size % TILE_GROUP_SIZE != 0 {
        luma_size = ((luma_size - 1) / TILE_GROUP_SIZE + 1) * TILE_GROUP_SIZE;
    }

    let mut remaining_height = height;
    for y in 0..tile_h_luma {
        let mut row_width = width;
        for x in 0..tile_w {
            let tile_width = row_width.min(TILE_WIDTH);
            let tile_height = remaining_height.min(TILE_HEIGHT);

            let mut luma_idx = y * TILE_HEIGHT * linesize + x * TILE_WIDTH;
            let mut chroma_idx = (luma_idx / linesize) * linesize / 2 + (luma_idx % linesize);

            let mut src_luma = qcom_tile_pos(x, y, tile_w_align, tile_h_luma) * TILE_SIZE;
            let mut src_chroma =
                luma_size + qcom_tile_pos(x, y / 2, tile_w_align, tile_h_chroma) * TILE_SIZE;
            if y & 1 != 0 {
                src_chroma += TILE_SIZE / 2;
            }

            for _ in 0..tile_height / 2 {
                for _ in 0..2 {
                    let row = src.get(src_luma..src_luma + tile_width).ok_or_else(|| {
                        BridgeError::InvalidArgument(
                            "tiled decoder buffer smaller than its geometry".into(),
                        )
                    })?;
                    frame.planes[0].data[luma_idx..luma_idx + tile_width].copy_from_slice(row);
                    src_luma += TILE_WIDTH;
                    luma_idx += linesize;
                }
                let row = src.get(src_chroma..src_chroma + tile_width).ok_or_else(|| {
                    BridgeError::InvalidArgument(
                        "tiled decoder buffer smaller than its geometry".into(),
                    )
                })?;
                frame.planes[1].data[chroma_idx..chroma_idx + tile_width].copy_from_slice(row);
                src_chroma += TILE_WIDTH;
                chroma_idx += linesize;
            }
            row_width = row_width.saturating_sub(TILE_WIDTH);
        }
        remaining_height = remaining_height.saturating_sub(TILE_HEIGHT);
    }
    Ok(())
}
