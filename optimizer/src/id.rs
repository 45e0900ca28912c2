// id.rs — Stable index identifiers for Weft IR arenas
//
// Every IR entity lives in a per-function arena (`Vec`) and is referred to
// by a `u32` index newtype. Indices are allocated in construction order and
// are never reused: the optimizer moves and rewires operations but never
// deletes them, so an id stays valid for the lifetime of its function.

use serde::{Deserialize, Serialize};

/// Index of an operation in `Func::ops`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpId(pub u32);

/// Index of a value in `Func::values`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub u32);

/// Index of a region in `Func::regions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub u32);

impl OpId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ValueId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl RegionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
