// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines the [`Command`] value type and its fixed-stride binary encoding.
//!
//! # Wire format
//!
//! Every command occupies [`COMMAND_STRIDE_BYTES`] bytes, i.e. [`COMMAND_GROUPS`]
//! groups of four 32-bit little-endian words. Word 0 always holds the
//! [`CommandType`] tag; unused trailing words are zero.
//!
//! ```text
//! word:          0     1       2           3     4     5        6        7
//! Invalid       tag    0       0           0     0     0        0        0
//! StoreLight    tag   slot    pos.x      pos.y pos.z color.r  color.g  color.b
//! RemoveLight   tag   slot     0           0     0     0        0        0
//! StoreSource   tag   slot  resolution   rgn.x rgn.y rgn.z    rgn.w     0
//! RemoveSources tag   first  count         0     0     0        0        0
//! ```
//!
//! Integer words (tag, slot, resolution, first, count) are written according
//! to the [`IntPacking`] mode; float words are always the raw IEEE-754 bits.

use super::error::DecodeError;
use serde::{Deserialize, Serialize};

/// Number of four-component float groups occupied by a single command.
pub const COMMAND_GROUPS: usize = 2;

/// Number of 32-bit words occupied by a single command.
pub const COMMAND_WORDS: usize = COMMAND_GROUPS * 4;

/// Size in bytes of one encoded command in the GPU buffer.
pub const COMMAND_STRIDE_BYTES: usize = COMMAND_WORDS * std::mem::size_of::<u32>();

/// How integer fields are stored in the float-typed command stream.
///
/// The processing shader is compiled with `GPU_CMD_INT_AS_FLOAT` set from
/// [`define_value`](IntPacking::define_value) and must decode integers the
/// same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IntPacking {
    /// The integer's bits are stored as-is and reinterpreted as a float word.
    #[default]
    BitCast,
    /// The integer is converted to its float value. Exact below 2^24.
    Convert,
}

impl IntPacking {
    /// Encodes an integer field into a stream word.
    ///
    /// With [`IntPacking::Convert`], `value` must be below 2^24.
    #[inline]
    pub fn pack(self, value: u32) -> u32 {
        match self {
            IntPacking::BitCast => value,
            IntPacking::Convert => {
                debug_assert!(
                    value < 1 << 24,
                    "{value} is not exactly representable with float packing"
                );
                (value as f32).to_bits()
            }
        }
    }

    /// Decodes a stream word back into the integer it carries.
    #[inline]
    pub fn unpack(self, word: u32) -> u32 {
        match self {
            IntPacking::BitCast => word,
            IntPacking::Convert => f32::from_bits(word) as u32,
        }
    }

    /// Returns `true` if integers are stored as bit-reinterpreted floats.
    pub const fn is_bit_cast(self) -> bool {
        matches!(self, IntPacking::BitCast)
    }

    /// The value published as `GPU_CMD_INT_AS_FLOAT`.
    pub const fn define_value(self) -> &'static str {
        match self {
            IntPacking::BitCast => "1",
            IntPacking::Convert => "0",
        }
    }
}

/// The type tag of a [`Command`], as seen by the processing shader.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandType {
    /// Sentinel; never enqueued by well-behaved callers.
    Invalid = 0,
    /// Writes a light into the light table.
    StoreLight = 1,
    /// Clears a light slot.
    RemoveLight = 2,
    /// Writes a shadow source into the source table.
    StoreSource = 3,
    /// Clears a contiguous range of source slots.
    RemoveSources = 4,
}

impl CommandType {
    /// The number of command types, `Invalid` included.
    pub const COUNT: usize = 5;

    /// Every command type, in tag order.
    pub const ALL: [CommandType; Self::COUNT] = [
        CommandType::Invalid,
        CommandType::StoreLight,
        CommandType::RemoveLight,
        CommandType::StoreSource,
        CommandType::RemoveSources,
    ];

    /// Returns the integer tag written into word 0 of an encoded command.
    #[inline]
    pub const fn tag(self) -> u32 {
        self as u32
    }

    /// Resolves an integer tag back into a command type.
    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(CommandType::Invalid),
            1 => Some(CommandType::StoreLight),
            2 => Some(CommandType::RemoveLight),
            3 => Some(CommandType::StoreSource),
            4 => Some(CommandType::RemoveSources),
            _ => None,
        }
    }

    /// The key under which this tag is published to the shader defines table.
    pub const fn define_name(self) -> &'static str {
        match self {
            CommandType::Invalid => "CMD_invalid",
            CommandType::StoreLight => "CMD_store_light",
            CommandType::RemoveLight => "CMD_remove_light",
            CommandType::StoreSource => "CMD_store_source",
            CommandType::RemoveSources => "CMD_remove_sources",
        }
    }
}

/// A single requested mutation of GPU-resident scene state.
///
/// Commands are plain values. Each variant carries exactly the fields its
/// layout needs, so a command with a missing or extra field cannot be built.
///
/// # Examples
///
/// ```
/// use lumen_core::renderer::gpu_command::{Command, CommandType, IntPacking, COMMAND_STRIDE_BYTES};
///
/// let cmd = Command::StoreLight {
///     slot: 5,
///     position: [1.0, 2.0, 3.0],
///     color: [1.0, 0.9, 0.7],
/// };
/// let mut bytes = [0u8; COMMAND_STRIDE_BYTES];
/// cmd.encode_into(&mut bytes, IntPacking::BitCast);
///
/// assert_eq!(cmd.command_type(), CommandType::StoreLight);
/// assert_eq!(Command::decode(&bytes, IntPacking::BitCast).unwrap(), cmd);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Command {
    /// Sentinel command; encodes as an all-zero slot.
    #[default]
    Invalid,
    /// Stores a light at `slot`.
    StoreLight {
        /// Index into the light table.
        slot: u32,
        /// World-space position.
        position: [f32; 3],
        /// Linear RGB color, intensity premultiplied.
        color: [f32; 3],
    },
    /// Removes the light at `slot`.
    RemoveLight {
        /// Index into the light table.
        slot: u32,
    },
    /// Stores a shadow source at `slot`.
    StoreSource {
        /// Index into the source table.
        slot: u32,
        /// Shadow map resolution in texels.
        resolution: u32,
        /// Atlas region as `[u0, v0, u1, v1]`.
        region: [f32; 4],
    },
    /// Removes `count` consecutive sources starting at `first_slot`.
    RemoveSources {
        /// First source slot to clear.
        first_slot: u32,
        /// Number of slots to clear.
        count: u32,
    },
}

impl Command {
    /// Returns the type tag of this command.
    pub const fn command_type(&self) -> CommandType {
        match self {
            Command::Invalid => CommandType::Invalid,
            Command::StoreLight { .. } => CommandType::StoreLight,
            Command::RemoveLight { .. } => CommandType::RemoveLight,
            Command::StoreSource { .. } => CommandType::StoreSource,
            Command::RemoveSources { .. } => CommandType::RemoveSources,
        }
    }

    /// Encodes this command into its fixed-size word layout.
    pub fn to_words(&self, packing: IntPacking) -> [u32; COMMAND_WORDS] {
        let mut words = [0u32; COMMAND_WORDS];
        words[0] = packing.pack(self.command_type().tag());

        match *self {
            Command::Invalid => {}
            Command::StoreLight {
                slot,
                position,
                color,
            } => {
                words[1] = packing.pack(slot);
                words[2..5].copy_from_slice(&position.map(f32::to_bits));
                words[5..8].copy_from_slice(&color.map(f32::to_bits));
            }
            Command::RemoveLight { slot } => {
                words[1] = packing.pack(slot);
            }
            Command::StoreSource {
                slot,
                resolution,
                region,
            } => {
                words[1] = packing.pack(slot);
                words[2] = packing.pack(resolution);
                words[3..7].copy_from_slice(&region.map(f32::to_bits));
            }
            Command::RemoveSources { first_slot, count } => {
                words[1] = packing.pack(first_slot);
                words[2] = packing.pack(count);
            }
        }

        words
    }

    /// Writes exactly [`COMMAND_STRIDE_BYTES`] bytes at the start of `out`.
    ///
    /// # Panics
    ///
    /// Panics if `out` is shorter than [`COMMAND_STRIDE_BYTES`].
    pub fn encode_into(&self, out: &mut [u8], packing: IntPacking) {
        let words = self.to_words(packing);
        for (chunk, word) in out[..COMMAND_STRIDE_BYTES].chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
    }

    /// Rebuilds a command from its word layout.
    pub fn from_words(
        words: &[u32; COMMAND_WORDS],
        packing: IntPacking,
    ) -> Result<Self, DecodeError> {
        let tag = packing.unpack(words[0]);
        let ty = CommandType::from_tag(tag).ok_or(DecodeError::UnknownTag(tag))?;
        let int = |index: usize| packing.unpack(words[index]);
        let float = |index: usize| f32::from_bits(words[index]);

        Ok(match ty {
            CommandType::Invalid => Command::Invalid,
            CommandType::StoreLight => Command::StoreLight {
                slot: int(1),
                position: [float(2), float(3), float(4)],
                color: [float(5), float(6), float(7)],
            },
            CommandType::RemoveLight => Command::RemoveLight { slot: int(1) },
            CommandType::StoreSource => Command::StoreSource {
                slot: int(1),
                resolution: int(2),
                region: [float(3), float(4), float(5), float(6)],
            },
            CommandType::RemoveSources => Command::RemoveSources {
                first_slot: int(1),
                count: int(2),
            },
        })
    }

    /// Decodes the command stored in the first [`COMMAND_STRIDE_BYTES`] bytes of `bytes`.
    pub fn decode(bytes: &[u8], packing: IntPacking) -> Result<Self, DecodeError> {
        if bytes.len() < COMMAND_STRIDE_BYTES {
            return Err(DecodeError::Truncated { len: bytes.len() });
        }

        let mut words = [0u32; COMMAND_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self::from_words(&words, packing)
    }
}
