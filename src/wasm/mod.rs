mod types;
pub use types::{FunctionSignature, ValueType};

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use log::{debug, info};
use sha2::{Digest, Sha256};
use wasmparser::{ExternalKind, Parser, Payload, StructuralType, TypeRef};

use crate::error::WasmError;

/// Name of the function every checked module has to export
pub const INIT_FUNCTION: &str = "init";

/// Handle on a WASM module that circuits can call into
///
/// The handler keeps the module bytecode and, once checked, the arity of every
/// exported function whose parameters and results are all of the module's
/// integer type. Its `Display` form is the module uid recorded on every WASM
/// operation that references it.
#[derive(Debug, Clone)]
pub struct WasmModuleHandler {
    bytecode: Vec<u8>,
    uid: String,
    int_size: u32,
    checked: bool,
    functions: BTreeMap<String, (usize, usize)>,
    unsupported_functions: Vec<String>,
}

impl WasmModuleHandler {
    /// Create a handler from module bytes
    ///
    /// `int_size` selects whether functions exchange `i32` or `i64` values. With
    /// `check` set the exported signatures are read immediately, otherwise the
    /// handler stays unchecked and accepts any function call.
    pub fn new(bytecode: Vec<u8>, check: bool, int_size: u32) -> Result<Self, WasmError> {
        if int_size != 32 && int_size != 64 {
            return Err(WasmError::InvalidIntSize(int_size));
        }

        let uid = hex::encode(Sha256::digest(&bytecode));
        let mut handler = Self {
            bytecode,
            uid,
            int_size,
            checked: false,
            functions: BTreeMap::new(),
            unsupported_functions: Vec::new(),
        };

        if check {
            handler.check()?;
        }
        Ok(handler)
    }

    /// Create a handler from a `.wasm` file
    pub fn from_file<P: AsRef<Path>>(path: P, check: bool, int_size: u32) -> Result<Self, WasmError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(WasmError::FileNotFound(path.display().to_string()));
        }
        let bytecode = std::fs::read(path)?;
        Self::new(bytecode, check, int_size)
    }

    /// Read the exported function signatures of the module
    pub fn check(&mut self) -> Result<(), WasmError> {
        if self.checked {
            return Ok(());
        }

        let int_type = self.int_type();
        let mut signatures: Vec<Option<FunctionSignature>> = Vec::new();
        // Function index space: imported functions first, then local ones
        let mut function_types: Vec<u32> = Vec::new();
        let mut exports: Vec<(String, u32)> = Vec::new();

        for payload in Parser::new(0).parse_all(&self.bytecode) {
            match payload? {
                Payload::TypeSection(reader) => {
                    for ty in reader {
                        match ty?.structural_type {
                            StructuralType::Func(func_type) => {
                                signatures.push(Some(FunctionSignature::from(&func_type)))
                            }
                            _ => signatures.push(None),
                        }
                    }
                }
                Payload::ImportSection(reader) => {
                    for import in reader {
                        if let TypeRef::Func(type_index) = import?.ty {
                            function_types.push(type_index);
                        }
                    }
                }
                Payload::FunctionSection(reader) => {
                    for type_index in reader {
                        function_types.push(type_index?);
                    }
                }
                Payload::ExportSection(reader) => {
                    for export in reader {
                        let export = export?;
                        if export.kind == ExternalKind::Func {
                            exports.push((export.name.to_string(), export.index));
                        }
                    }
                }
                _ => {}
            }
        }

        let mut functions = BTreeMap::new();
        let mut unsupported_functions = Vec::new();
        for (name, func_index) in exports {
            let type_index = function_types.get(func_index as usize).ok_or_else(|| {
                WasmError::InvalidModule(format!(
                    "export '{name}' refers to unknown function {func_index}"
                ))
            })?;
            let signature = signatures
                .get(*type_index as usize)
                .and_then(Option::as_ref)
                .ok_or_else(|| {
                    WasmError::InvalidModule(format!(
                        "function '{name}' refers to unknown function type {type_index}"
                    ))
                })?;

            if signature.is_supported(int_type) {
                debug!("wasm function '{name}' has arity {:?}", signature.arity());
                functions.insert(name, signature.arity());
            } else {
                debug!("wasm function '{name}' has an unsupported signature {signature:?}");
                unsupported_functions.push(name);
            }
        }

        match functions.get(INIT_FUNCTION) {
            None => return Err(WasmError::MissingInit),
            Some(&(params, results)) if params != 0 || results != 0 => {
                return Err(WasmError::InvalidInit { params, results });
            }
            Some(_) => {}
        }

        info!(
            "checked wasm module {}: {} supported, {} unsupported function(s)",
            self.uid,
            functions.len(),
            unsupported_functions.len()
        );
        self.functions = functions;
        self.unsupported_functions = unsupported_functions;
        self.checked = true;
        Ok(())
    }

    /// Whether the module exposes `name` with exactly this arity
    ///
    /// An unchecked handler knows no signatures and accepts every call; any
    /// mismatch then only shows up when the module is executed.
    pub fn check_function(&self, name: &str, n_inputs: usize, n_outputs: usize) -> bool {
        if !self.checked {
            return true;
        }
        self.functions.get(name) == Some(&(n_inputs, n_outputs))
    }

    pub fn int_size(&self) -> u32 {
        self.int_size
    }

    /// Value type used for every parameter and result
    pub fn int_type(&self) -> ValueType {
        if self.int_size == 64 {
            ValueType::I64
        } else {
            ValueType::I32
        }
    }

    pub fn checked(&self) -> bool {
        self.checked
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    /// Lowercase hex SHA-256 of the bytecode
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Supported functions with their `(inputs, outputs)` arity
    pub fn functions(&self) -> Result<&BTreeMap<String, (usize, usize)>, WasmError> {
        if !self.checked {
            return Err(WasmError::Unchecked);
        }
        Ok(&self.functions)
    }

    /// Exported functions whose types cannot be used from a circuit
    pub fn unsupported_functions(&self) -> Result<&[String], WasmError> {
        if !self.checked {
            return Err(WasmError::Unchecked);
        }
        Ok(&self.unsupported_functions)
    }

    /// Human-readable listing of the module's functions
    pub fn describe(&self) -> Result<String, WasmError> {
        let functions = self.functions()?;
        let int_type = self.int_type();

        let mut result = format!("Functions in wasm module with the uid {}:\n", self.uid);
        for (name, (params, results)) in functions {
            result.push_str(&format!(
                "function '{name}' with {params} {int_type} parameter(s) and {results} {int_type} return value(s)\n"
            ));
        }
        for name in &self.unsupported_functions {
            result.push_str(&format!(
                "unsupported function with invalid parameter or result type: '{name}'\n"
            ));
        }
        Ok(result)
    }
}

impl fmt::Display for WasmModuleHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uid)
    }
}
