use common::Bit;
use thiserror::Error;

/// Errors raised while loading or introspecting a WASM module
#[derive(Error, Debug)]
pub enum WasmError {
    #[error("given integer length {0} not valid, only 32 and 64 are allowed")]
    InvalidIntSize(u32),
    #[error("wasm file not found at given path: {0}")]
    FileNotFound(String),
    #[error("failed to read wasm file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse wasm module: {0}")]
    Parse(#[from] wasmparser::BinaryReaderError),
    #[error("invalid wasm module: {0}")]
    InvalidModule(String),
    #[error("wasm module needs to contain a function called 'init'")]
    MissingInit,
    #[error("init function should not have any parameters or results, found {params} parameter(s) and {results} result(s)")]
    InvalidInit { params: usize, results: usize },
    #[error("function signatures of an unchecked wasm module are unknown, call check() first")]
    Unchecked,
}

/// Errors raised while adding operations to a circuit
///
/// Every variant is raised before the circuit is touched, so a failed call
/// leaves commands, bits and the WASM state register as they were.
#[derive(Error, Debug)]
pub enum CircuitError {
    #[error("only functions with i{int_size} type are allowed, got a width of {width} bits")]
    InvalidArgument { width: u32, int_size: u32 },
    #[error("wasm only supports registers of at most 32 bits, register '{register}' has {size}")]
    RegisterTooWide { register: String, size: usize },
    #[error("{funcname} not found, check wasm module {module}")]
    FunctionNotFound { funcname: String, module: String },
    #[error("conflicting call options: {0}")]
    ConfigurationConflict(String),
    #[error("wasm call expects {expected} bit argument(s), got {found}")]
    ArgumentCountMismatch { expected: usize, found: usize },
    #[error("bit {0} is not part of the circuit")]
    UnknownBit(Bit),
    #[error("register {0} is not part of the circuit")]
    UnknownRegister(String),
    #[error("register '{0}' already exists")]
    RegisterExists(String),
    #[error("unit {0} appears more than once in the operation arguments")]
    DuplicateArgument(String),
    #[error("condition value {value} does not fit in {width} condition bit(s)")]
    ConditionValueOutOfRange { value: u64, width: usize },
    #[error("wasm state {0} is not part of the circuit")]
    UnknownWasmState(usize),
    #[error("invalid circuit: {0}")]
    InvalidCircuit(String),
    #[error("circuit serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
