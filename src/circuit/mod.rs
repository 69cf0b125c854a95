//! Classical circuits with WASM calls
//!
//! A [`Circuit`] is an ordered list of [`Command`]s over classical bits and
//! WASM state slots. Bits are only created through registers; WASM state slots
//! are created on demand by the WASM call operations in [`wasm_call`], which
//! grow the state register to cover every slot a call touches.
//!
//! # Usage
//!
//! ```ignore
//! use wasm_circuit::{Circuit, WasmCallOptions, WasmModuleHandler};
//!
//! let handler = WasmModuleHandler::from_file("add.wasm", true, 32)?;
//! let mut circuit = Circuit::new();
//! let a = circuit.add_c_register("a", 8)?;
//! let b = circuit.add_c_register("b", 8)?;
//!
//! circuit.add_wasm_to_reg("add1", &handler, &[a], &[b], None, &WasmCallOptions::default())?;
//! assert_eq!(circuit.wasm_state_count(), 1);
//! ```

pub mod op;
pub mod options;
mod wasm_call;

pub use op::{Command, Conditional, Op, WasmOp};
pub use options::{
    if_bit, if_not_bit, reg_eq, Condition, ResolvedCondition, WasmCallOptions,
    WasmCallOptionsBuilder,
};
pub use wasm_call::{check_wasm_widths, MAX_WASM_REGISTER_WIDTH};

use common::{Bit, BitRegister, UnitId, WasmState, DEFAULT_BIT_REGISTER};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::CircuitError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CircuitData")]
pub struct Circuit {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    /// Registers in the order they were added
    registers: Vec<BitRegister>,
    bits: Vec<Bit>,
    wasm_states: usize,
    commands: Vec<Command>,
}

/// Serialized form of a circuit, checked before it becomes a [`Circuit`]
#[derive(Debug, Deserialize)]
struct CircuitData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    registers: Vec<BitRegister>,
    /// Redundant with `registers`; must agree with them when present
    #[serde(default)]
    bits: Option<Vec<Bit>>,
    #[serde(default)]
    wasm_states: usize,
    #[serde(default)]
    commands: Vec<Command>,
}

impl TryFrom<CircuitData> for Circuit {
    type Error = CircuitError;

    fn try_from(data: CircuitData) -> Result<Self, Self::Error> {
        let mut circuit = Circuit {
            name: data.name,
            ..Self::default()
        };
        for register in &data.registers {
            circuit.add_c_register(register.name(), register.size())?;
        }
        if let Some(bits) = data.bits {
            if bits != circuit.bits {
                return Err(CircuitError::InvalidCircuit(
                    "bit list does not match the registers".to_string(),
                ));
            }
        }
        circuit.add_wasm_register(data.wasm_states);

        for command in data.commands {
            circuit.check_command(&command)?;
            circuit.push_command(command);
        }
        Ok(circuit)
    }
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Create a circuit with `n_bits` bits in the default register `c`
    pub fn with_bits(n_bits: usize) -> Self {
        let mut circuit = Self::new();
        if n_bits > 0 {
            circuit.push_register(BitRegister::new(DEFAULT_BIT_REGISTER, n_bits));
        }
        circuit
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Add a classical register and its bits
    pub fn add_c_register(&mut self, name: &str, size: usize) -> Result<BitRegister, CircuitError> {
        if self.get_c_register(name).is_some() {
            return Err(CircuitError::RegisterExists(name.to_string()));
        }
        let register = BitRegister::new(name, size);
        self.push_register(register.clone());
        Ok(register)
    }

    fn push_register(&mut self, register: BitRegister) {
        debug!("adding register {register}");
        self.bits.extend(register.bits());
        self.registers.push(register);
    }

    pub fn get_c_register(&self, name: &str) -> Option<&BitRegister> {
        self.registers.iter().find(|reg| reg.name() == name)
    }

    pub fn c_registers(&self) -> &[BitRegister] {
        &self.registers
    }

    pub fn bits(&self) -> &[Bit] {
        &self.bits
    }

    pub fn n_bits(&self) -> usize {
        self.bits.len()
    }

    pub fn contains_bit(&self, bit: &Bit) -> bool {
        self.get_c_register(&bit.reg_name)
            .map_or(false, |reg| reg.contains(bit))
    }

    /// Ensure the WASM state register has at least `min_slots` slots
    ///
    /// The register never shrinks, so repeated calls are harmless. Returns the
    /// register size afterwards.
    pub fn add_wasm_register(&mut self, min_slots: usize) -> usize {
        if min_slots > self.wasm_states {
            debug!("growing wasm state register from {} to {min_slots}", self.wasm_states);
            self.wasm_states = min_slots;
        }
        self.wasm_states
    }

    pub fn wasm_state_count(&self) -> usize {
        self.wasm_states
    }

    pub fn wasm_states(&self) -> Vec<WasmState> {
        (0..self.wasm_states).map(WasmState::new).collect()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn n_commands(&self) -> usize {
        self.commands.len()
    }

    /// Append a command whose units have already been validated
    pub(crate) fn push_command(&mut self, command: Command) {
        debug!("adding command {command}");
        self.commands.push(command);
    }

    /// Check that every bit exists and no unit is used twice
    pub(crate) fn check_units(&self, bits: &[Bit], slots: &[usize]) -> Result<(), CircuitError> {
        let mut seen_bits = HashSet::new();
        for bit in bits {
            if !self.contains_bit(bit) {
                return Err(CircuitError::UnknownBit(bit.clone()));
            }
            if !seen_bits.insert(bit) {
                return Err(CircuitError::DuplicateArgument(bit.to_string()));
            }
        }
        let mut seen_slots = HashSet::new();
        for slot in slots {
            if !seen_slots.insert(*slot) {
                return Err(CircuitError::DuplicateArgument(WasmState::new(*slot).to_string()));
            }
        }
        Ok(())
    }

    /// Check a command read from outside against the circuit's units
    ///
    /// The arguments must be the op's bits followed by its WASM state slots,
    /// all of them known to the circuit and none repeated.
    fn check_command(&self, command: &Command) -> Result<(), CircuitError> {
        command.op.check()?;
        let n_bits = command.op.n_bits();
        let expected = n_bits + command.op.n_wasm_states();
        if command.args.len() != expected {
            return Err(CircuitError::InvalidCircuit(format!(
                "{} expects {expected} argument(s), got {}",
                command.op,
                command.args.len()
            )));
        }

        let mut bits = Vec::with_capacity(n_bits);
        let mut slots = Vec::with_capacity(expected - n_bits);
        for (i, arg) in command.args.iter().enumerate() {
            match arg {
                UnitId::Bit(bit) if i < n_bits => bits.push(bit.clone()),
                UnitId::WasmState(state) if i >= n_bits => slots.push(state.index),
                _ => {
                    return Err(CircuitError::InvalidCircuit(format!(
                        "argument {arg} of {} is out of place",
                        command.op
                    )))
                }
            }
        }
        if let Some(slot) = slots.iter().find(|slot| **slot >= self.wasm_states) {
            return Err(CircuitError::UnknownWasmState(*slot));
        }
        self.check_units(&bits, &slots)
    }

    pub fn to_json(&self) -> Result<String, CircuitError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CircuitError> {
        Ok(serde_json::from_str(json)?)
    }
}
