//! Optional settings for WASM call insertion
//!
//! Settings are collected with `WasmCallOptions::builder()` and validated when a
//! call is inserted, so a conflicting combination never reaches the circuit.

use common::{Bit, BitRegister};

use crate::error::CircuitError;

/// Widest condition a conditional operation can compare against
pub const MAX_CONDITION_WIDTH: usize = 64;

/// Classical predicate gating an operation
///
/// Only predicates that reduce to a fixed value on a set of bits are
/// supported: a single bit being set or clear, and a whole register equal to
/// a value. Comparisons such as `!=`, `<` or `>=` on a register are not
/// available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Run when the bit is 1
    Bit(Bit),
    /// Run when the bit is 0
    NotBit(Bit),
    /// Run when the register, read as an unsigned integer, equals the value
    RegEq(BitRegister, u64),
}

/// Condition on `bit` being set
pub fn if_bit(bit: Bit) -> Condition {
    Condition::Bit(bit)
}

/// Condition on `bit` being clear
pub fn if_not_bit(bit: Bit) -> Condition {
    Condition::NotBit(bit)
}

/// Condition on `register` holding `value`
pub fn reg_eq(register: BitRegister, value: u64) -> Condition {
    Condition::RegEq(register, value)
}

/// Condition bits and the value they must hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCondition {
    pub bits: Vec<Bit>,
    pub value: u64,
}

impl ResolvedCondition {
    fn new(bits: Vec<Bit>, value: u64) -> Result<Self, CircuitError> {
        check_condition_value(value, bits.len())?;
        Ok(Self { bits, value })
    }
}

/// Check that `value` can be held by `width` little-endian condition bits
pub(crate) fn check_condition_value(value: u64, width: usize) -> Result<(), CircuitError> {
    let fits = width <= MAX_CONDITION_WIDTH && (width == MAX_CONDITION_WIDTH || value >> width == 0);
    if !fits {
        return Err(CircuitError::ConditionValueOutOfRange { value, width });
    }
    Ok(())
}

impl Condition {
    pub fn resolve(&self) -> Result<ResolvedCondition, CircuitError> {
        match self {
            Condition::Bit(bit) => ResolvedCondition::new(vec![bit.clone()], 1),
            Condition::NotBit(bit) => ResolvedCondition::new(vec![bit.clone()], 0),
            Condition::RegEq(register, value) => ResolvedCondition::new(register.bits(), *value),
        }
    }
}

/// Optional settings of a WASM call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WasmCallOptions {
    /// Name of the group the inserted operation belongs to
    pub opgroup: Option<String>,
    /// Predicate gating the call
    pub condition: Option<Condition>,
    /// Explicit condition bits, used together with `condition_value`
    pub condition_bits: Option<Vec<Bit>>,
    /// Value the condition bits must hold
    pub condition_value: Option<u64>,
}

impl WasmCallOptions {
    /// Create a builder for call options
    pub fn builder() -> WasmCallOptionsBuilder {
        WasmCallOptionsBuilder::default()
    }

    /// Check the settings and turn the condition forms into bits and a value
    ///
    /// `condition` excludes `condition_bits`/`condition_value`, and those two
    /// must be given together.
    pub fn resolve_condition(&self) -> Result<Option<ResolvedCondition>, CircuitError> {
        match (&self.condition, &self.condition_bits, self.condition_value) {
            (None, None, None) => Ok(None),
            (Some(condition), None, None) => condition.resolve().map(Some),
            (Some(_), _, _) => Err(CircuitError::ConfigurationConflict(
                "condition cannot be combined with condition_bits or condition_value".to_string(),
            )),
            (None, Some(bits), Some(value)) => ResolvedCondition::new(bits.clone(), value).map(Some),
            (None, _, _) => Err(CircuitError::ConfigurationConflict(
                "condition_bits and condition_value must be given together".to_string(),
            )),
        }
    }
}

/// Builder for `WasmCallOptions`
#[derive(Debug, Default)]
pub struct WasmCallOptionsBuilder {
    options: WasmCallOptions,
}

impl WasmCallOptionsBuilder {
    pub fn opgroup(mut self, name: impl Into<String>) -> Self {
        self.options.opgroup = Some(name.into());
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.options.condition = Some(condition);
        self
    }

    pub fn condition_bits(mut self, bits: Vec<Bit>) -> Self {
        self.options.condition_bits = Some(bits);
        self
    }

    pub fn condition_value(mut self, value: u64) -> Self {
        self.options.condition_value = Some(value);
        self
    }

    /// Build the options; conflicts are reported when the call is inserted
    pub fn build(self) -> WasmCallOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_condition() {
        let options = WasmCallOptions::builder().opgroup("g").build();
        assert_eq!(options.opgroup.as_deref(), Some("g"));
        assert_eq!(options.resolve_condition().unwrap(), None);
    }

    #[test]
    fn test_condition_forms() {
        let b = Bit::new("c", 2);
        let resolved = WasmCallOptions::builder()
            .condition(if_bit(b.clone()))
            .build()
            .resolve_condition()
            .unwrap()
            .unwrap();
        assert_eq!(resolved, ResolvedCondition { bits: vec![b.clone()], value: 1 });

        let resolved = if_not_bit(b.clone()).resolve().unwrap();
        assert_eq!(resolved.value, 0);

        let reg = BitRegister::new("r", 3);
        let resolved = reg_eq(reg.clone(), 5).resolve().unwrap();
        assert_eq!(resolved.bits, reg.bits());
        assert_eq!(resolved.value, 5);

        let resolved = WasmCallOptions::builder()
            .condition_bits(vec![b.clone()])
            .condition_value(0)
            .build()
            .resolve_condition()
            .unwrap()
            .unwrap();
        assert_eq!(resolved.bits, vec![b]);
    }

    #[test]
    fn test_condition_conflicts() {
        let b = Bit::new("c", 0);
        let both = WasmCallOptions::builder()
            .condition(if_bit(b.clone()))
            .condition_bits(vec![b.clone()])
            .condition_value(1)
            .build();
        assert!(matches!(
            both.resolve_condition(),
            Err(CircuitError::ConfigurationConflict(_))
        ));

        let with_value = WasmCallOptions::builder()
            .condition(if_bit(b.clone()))
            .condition_value(1)
            .build();
        assert!(matches!(
            with_value.resolve_condition(),
            Err(CircuitError::ConfigurationConflict(_))
        ));

        let bits_only = WasmCallOptions::builder().condition_bits(vec![b]).build();
        assert!(matches!(
            bits_only.resolve_condition(),
            Err(CircuitError::ConfigurationConflict(_))
        ));
    }

    #[test]
    fn test_condition_value_range() {
        let reg = BitRegister::new("r", 2);
        assert!(reg_eq(reg.clone(), 3).resolve().is_ok());
        assert!(matches!(
            reg_eq(reg, 4).resolve(),
            Err(CircuitError::ConditionValueOutOfRange { value: 4, width: 2 })
        ));

        let wide = BitRegister::new("w", 64);
        assert!(reg_eq(wide, u64::MAX).resolve().is_ok());
        let too_wide = BitRegister::new("w", 65);
        assert!(reg_eq(too_wide, 0).resolve().is_err());
    }

    #[test]
    fn test_every_condition_is_an_equality() {
        let b = Bit::new("c", 0);
        let reg = BitRegister::new("r", 4);
        let conditions = [if_bit(b.clone()), if_not_bit(b), reg_eq(reg, 9)];

        for condition in &conditions {
            let resolved = condition.resolve().unwrap();
            let expected = match condition {
                Condition::Bit(_) => 1,
                Condition::NotBit(_) => 0,
                Condition::RegEq(_, value) => *value,
            };
            assert_eq!(resolved.value, expected);
        }
    }
}
