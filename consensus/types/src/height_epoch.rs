use safe_arith::{ArithError, SafeArith};
use serde::{Deserialize, Serialize};
use ssz::{Decode, DecodeError, Encode};
use std::fmt;

/// A block height on the chain.
///
/// Heights are 1-based: the genesis block has height 1 and belongs to epoch 1.
/// Height 0 is not a valid chain position and the epoch arithmetic below
/// rejects it with an arithmetic error rather than mapping it anywhere.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Height(#[serde(with = "serde_utils::quoted_u64")] u64);

/// A Roll-DPoS epoch number, 1-based.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(#[serde(with = "serde_utils::quoted_u64")] u64);

macro_rules! impl_common {
    ($type: ident) => {
        impl $type {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn as_u64(&self) -> u64 {
                self.0
            }

            pub fn as_usize(&self) -> usize {
                self.0 as usize
            }

            pub fn safe_add(self, other: u64) -> Result<Self, ArithError> {
                self.0.safe_add(other).map(Self)
            }

            pub fn safe_sub(self, other: u64) -> Result<Self, ArithError> {
                self.0.safe_sub(other).map(Self)
            }
        }

        impl From<u64> for $type {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$type> for u64 {
            fn from(value: $type) -> u64 {
                value.0
            }
        }

        impl fmt::Display for $type {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $type {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}({})", stringify!($type), self.0)
            }
        }

        impl Encode for $type {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                <u64 as Encode>::ssz_fixed_len()
            }

            fn ssz_bytes_len(&self) -> usize {
                <u64 as Encode>::ssz_fixed_len()
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                self.0.ssz_append(buf)
            }
        }

        impl Decode for $type {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                <u64 as Decode>::ssz_fixed_len()
            }

            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
                u64::from_ssz_bytes(bytes).map(Self)
            }
        }
    };
}

impl_common!(Height);
impl_common!(Epoch);

impl Height {
    /// The epoch this height falls in, on a chain sealing `blocks_per_epoch`
    /// blocks per epoch.
    pub fn epoch(self, blocks_per_epoch: u64) -> Result<Epoch, ArithError> {
        self.0
            .safe_sub(1)?
            .safe_div(blocks_per_epoch)?
            .safe_add(1)
            .map(Epoch)
    }
}

impl Epoch {
    /// Height of the first block of this epoch.
    pub fn start_height(self, blocks_per_epoch: u64) -> Result<Height, ArithError> {
        self.0
            .safe_sub(1)?
            .safe_mul(blocks_per_epoch)?
            .safe_add(1)
            .map(Height)
    }

    /// Height of the last block of this epoch.
    pub fn last_height(self, blocks_per_epoch: u64) -> Result<Height, ArithError> {
        self.0.safe_mul(blocks_per_epoch).map(Height)
    }
}
