//! # mcbridge Core
//!
//! Bridge between a media pipeline and a platform-managed hardware video
//! decoder hosted inside a foreign managed runtime. The codec itself is
//! opaque: every interaction goes through a reflection-based call layer
//! ([`runtime`]/[`reflect`]), a typed property bag ([`format`]), and a
//! buffer-queue protocol ([`codec`]). The [`driver`] module orchestrates
//! the feed/drain loop and [`pixel`] normalizes decoder-native layouts
//! (planar, semi-planar, vendor-tiled) into canonical picture buffers.

// ============================================================================
// Runtime call layer
// ============================================================================
pub mod error;
pub mod runtime;
pub mod reflect;

// ============================================================================
// Foreign codec API surface
// ============================================================================
pub mod format;
pub mod codec;
pub mod codec_list;

// ============================================================================
// Media processing
// ============================================================================
pub mod surface;
pub mod frame;
pub mod pixel;
pub mod driver;

#[cfg(test)]
pub(crate) mod mockvm;

pub use error::BridgeError;
pub use runtime::Bridge;
