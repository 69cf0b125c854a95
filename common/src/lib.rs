use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Name of the register created by `Circuit::with_bits`
pub const DEFAULT_BIT_REGISTER: &str = "c";

/// Name under which WASM state slots are displayed
pub const WASM_STATE_REGISTER: &str = "_w";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("index {index} out of range for register '{register}' of size {size}")]
    IndexOutOfRange {
        register: String,
        index: usize,
        size: usize,
    },
}

/// A single classical bit, addressed by register name and index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bit {
    pub reg_name: String,
    pub index: usize,
}

impl Bit {
    pub fn new(reg_name: impl Into<String>, index: usize) -> Self {
        Self {
            reg_name: reg_name.into(),
            index,
        }
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.reg_name, self.index)
    }
}

/// One slot of the WASM state register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WasmState {
    pub index: usize,
}

impl WasmState {
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl fmt::Display for WasmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", WASM_STATE_REGISTER, self.index)
    }
}

/// Any unit a command can act on
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitId {
    Bit(Bit),
    WasmState(WasmState),
}

impl From<Bit> for UnitId {
    fn from(bit: Bit) -> Self {
        UnitId::Bit(bit)
    }
}

impl From<WasmState> for UnitId {
    fn from(state: WasmState) -> Self {
        UnitId::WasmState(state)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitId::Bit(bit) => bit.fmt(f),
            UnitId::WasmState(state) => state.fmt(f),
        }
    }
}

/// Named, ordered sequence of classical bits
///
/// Two registers are equal when both name and size match. A register value
/// on its own does not own any bits; the circuit's register table does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitRegister {
    name: String,
    size: usize,
}

impl BitRegister {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the bit at `index`
    pub fn bit(&self, index: usize) -> Result<Bit, UnitError> {
        if index >= self.size {
            return Err(UnitError::IndexOutOfRange {
                register: self.name.clone(),
                index,
                size: self.size,
            });
        }
        Ok(Bit::new(self.name.clone(), index))
    }

    /// All bits of the register in index order
    pub fn bits(&self) -> Vec<Bit> {
        (0..self.size)
            .map(|index| Bit::new(self.name.clone(), index))
            .collect()
    }

    pub fn contains(&self, bit: &Bit) -> bool {
        bit.reg_name == self.name && bit.index < self.size
    }
}

impl fmt::Display for BitRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.size)
    }
}
