// SPDX-License-Identifier: MPL-2.0

//! Video and audio encoders

pub mod encoder;

pub use encoder::{Encoder, EncoderKind};
