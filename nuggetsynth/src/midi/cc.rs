//! Contains constant definitions for mapping MIDI CCs to channel parameters
//!
//! The numbering starts at zero and is dense so that small controllers with
//! one row of knobs can reach the common parameters (shape through volume)
//! without remapping.  Values are scaled by the engine's configured CC
//! maximum, not by 127.

#![allow(missing_docs)]

use wmidi::{ControlFunction, U7};

pub const SHAPE: ControlFunction = ControlFunction(U7::from_u8_lossy(0));
pub const TIMBRE: ControlFunction = ControlFunction(U7::from_u8_lossy(1));
pub const TIMBRE_ENV_DEPTH: ControlFunction = ControlFunction(U7::from_u8_lossy(2));
pub const COLOR: ControlFunction = ControlFunction(U7::from_u8_lossy(3));
pub const COLOR_ENV_DEPTH: ControlFunction = ControlFunction(U7::from_u8_lossy(4));
pub const ATTACK: ControlFunction = ControlFunction(U7::from_u8_lossy(5));
pub const DECAY: ControlFunction = ControlFunction(U7::from_u8_lossy(6));
pub const VOLUME: ControlFunction = ControlFunction(U7::from_u8_lossy(7));

pub const PITCH_ENV_DEPTH: ControlFunction = ControlFunction(U7::from_u8_lossy(8));
pub const TRANSPOSE: ControlFunction = ControlFunction(U7::from_u8_lossy(9));
pub const RESOLUTION: ControlFunction = ControlFunction(U7::from_u8_lossy(10));
pub const DECIMATION: ControlFunction = ControlFunction(U7::from_u8_lossy(11));
pub const SIGNATURE: ControlFunction = ControlFunction(U7::from_u8_lossy(12));

// toggles: on above half of the CC range
pub const VCO_FLATTEN: ControlFunction = ControlFunction(U7::from_u8_lossy(13));
pub const ENV_TO_VCA: ControlFunction = ControlFunction(U7::from_u8_lossy(14));
pub const ENV_HOLD: ControlFunction = ControlFunction(U7::from_u8_lossy(15));

pub const PAN: ControlFunction = ControlFunction(U7::from_u8_lossy(16));
pub const GLIDE: ControlFunction = ControlFunction(U7::from_u8_lossy(17));
