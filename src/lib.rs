pub mod circuit;
pub mod error;
pub mod wasm;

pub use circuit::{Circuit, Command, Condition, Op, WasmCallOptions, WasmOp};
pub use common::{Bit, BitRegister, UnitId, WasmState};
pub use error::{CircuitError, WasmError};
pub use wasm::WasmModuleHandler;
