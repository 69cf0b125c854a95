use std::fmt;
use wasmparser::{FuncType, ValType};

/// Represents a WebAssembly value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// 32-bit integer
    I32,
    /// 64-bit integer
    I64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// 128-bit vector
    V128,
    /// Any reference type
    Ref,
}

impl From<ValType> for ValueType {
    fn from(val_type: ValType) -> Self {
        match val_type {
            ValType::I32 => ValueType::I32,
            ValType::I64 => ValueType::I64,
            ValType::F32 => ValueType::F32,
            ValType::F64 => ValueType::F64,
            ValType::V128 => ValueType::V128,
            _ => ValueType::Ref,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
            ValueType::V128 => "v128",
            ValueType::Ref => "ref",
        };
        f.write_str(name)
    }
}

/// Represents a WebAssembly function type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    /// Parameter types
    pub params: Vec<ValueType>,
    /// Result types
    pub results: Vec<ValueType>,
}

impl FunctionSignature {
    pub fn new(params: Vec<ValueType>, results: Vec<ValueType>) -> Self {
        Self { params, results }
    }

    /// Whether a circuit can call this function when integers are `int_type`
    ///
    /// Every parameter and result must be `int_type` and there may be at most
    /// one result.
    pub fn is_supported(&self, int_type: ValueType) -> bool {
        self.results.len() <= 1
            && self
                .params
                .iter()
                .chain(self.results.iter())
                .all(|ty| *ty == int_type)
    }

    pub fn arity(&self) -> (usize, usize) {
        (self.params.len(), self.results.len())
    }
}

impl From<&FuncType> for FunctionSignature {
    fn from(func_type: &FuncType) -> Self {
        Self::new(
            func_type.params().iter().map(|ty| ValueType::from(*ty)).collect(),
            func_type.results().iter().map(|ty| ValueType::from(*ty)).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_signatures() {
        let add = FunctionSignature::new(vec![ValueType::I32, ValueType::I32], vec![ValueType::I32]);
        assert!(add.is_supported(ValueType::I32));
        assert!(!add.is_supported(ValueType::I64));
        assert_eq!(add.arity(), (2, 1));

        let init = FunctionSignature::new(vec![], vec![]);
        assert!(init.is_supported(ValueType::I32));
        assert!(init.is_supported(ValueType::I64));
    }

    #[test]
    fn test_unsupported_signatures() {
        let float = FunctionSignature::new(vec![ValueType::F32], vec![ValueType::I32]);
        assert!(!float.is_supported(ValueType::I32));

        let multi = FunctionSignature::new(vec![], vec![ValueType::I32, ValueType::I32]);
        assert!(!multi.is_supported(ValueType::I32));
    }
}
