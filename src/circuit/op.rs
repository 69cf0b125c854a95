use common::UnitId;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::options::check_condition_value;
use crate::error::CircuitError;

/// Classical call into a function of a WASM module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasmOp {
    /// Name of the called function
    pub func_name: String,
    /// Uid of the module the function lives in
    pub wasm_file_uid: String,
    /// Number of input variables
    pub n_inputs: usize,
    /// Number of output variables
    pub n_outputs: usize,
    /// Bit width of each input variable
    pub width_i_parameter: Vec<u32>,
    /// Bit width of each output variable
    pub width_o_parameter: Vec<u32>,
    /// Total number of bits the call acts on
    pub num_bits: usize,
    /// Number of WASM state slots the call acts on
    pub num_w: usize,
}

impl WasmOp {
    pub fn new(
        func_name: impl Into<String>,
        wasm_file_uid: impl Into<String>,
        width_i_parameter: Vec<u32>,
        width_o_parameter: Vec<u32>,
        num_w: usize,
    ) -> Self {
        let num_bits = width_i_parameter
            .iter()
            .chain(width_o_parameter.iter())
            .map(|w| *w as usize)
            .sum();
        Self {
            func_name: func_name.into(),
            wasm_file_uid: wasm_file_uid.into(),
            n_inputs: width_i_parameter.len(),
            n_outputs: width_o_parameter.len(),
            width_i_parameter,
            width_o_parameter,
            num_bits,
            num_w,
        }
    }
}

/// An operation that only runs when its condition bits hold `value`
///
/// Condition bits are read little-endian: the first bit is the least
/// significant one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditional {
    pub op: Box<Op>,
    pub width: usize,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Op {
    #[serde(rename = "WASM")]
    Wasm(WasmOp),
    Conditional(Conditional),
}

impl Op {
    /// The WASM call inside this op, looking through any conditions
    pub fn wasm(&self) -> Option<&WasmOp> {
        match self {
            Op::Wasm(op) => Some(op),
            Op::Conditional(cond) => cond.op.wasm(),
        }
    }

    /// Number of bit arguments, condition bits first
    pub fn n_bits(&self) -> usize {
        match self {
            Op::Wasm(op) => op.num_bits,
            Op::Conditional(cond) => cond.width + cond.op.n_bits(),
        }
    }

    /// Number of WASM state arguments, placed after the bits
    pub fn n_wasm_states(&self) -> usize {
        match self {
            Op::Wasm(op) => op.num_w,
            Op::Conditional(cond) => cond.op.n_wasm_states(),
        }
    }

    /// Check that the counts stored in the op agree with each other
    pub fn check(&self) -> Result<(), CircuitError> {
        match self {
            Op::Wasm(op) => op.check(),
            Op::Conditional(cond) => {
                check_condition_value(cond.value, cond.width)?;
                cond.op.check()
            }
        }
    }
}

impl WasmOp {
    fn check(&self) -> Result<(), CircuitError> {
        let num_bits: usize = self
            .width_i_parameter
            .iter()
            .chain(self.width_o_parameter.iter())
            .map(|w| *w as usize)
            .sum();
        if self.n_inputs != self.width_i_parameter.len()
            || self.n_outputs != self.width_o_parameter.len()
            || self.num_bits != num_bits
        {
            return Err(CircuitError::InvalidCircuit(format!(
                "wasm op '{}' has {} input(s), {} output(s) and {} bit(s), which do not match its widths {:?} and {:?}",
                self.func_name,
                self.n_inputs,
                self.n_outputs,
                self.num_bits,
                self.width_i_parameter,
                self.width_o_parameter
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Wasm(op) => {
                let short_uid: String = op.wasm_file_uid.chars().take(8).collect();
                write!(f, "WASM {}@{}", op.func_name, short_uid)
            }
            Op::Conditional(cond) => write!(f, "IF ({} bits == {}) THEN {}", cond.width, cond.value, cond.op),
        }
    }
}

/// An op placed on concrete units of a circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub op: Op,
    pub args: Vec<UnitId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opgroup: Option<String>,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|arg| arg.to_string()).collect();
        write!(f, "{} {};", self.op, args.join(", "))
    }
}
