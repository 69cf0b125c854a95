use common::{Bit, BitRegister, UnitId, WasmState};
use log::warn;

use super::op::{Command, Conditional, Op, WasmOp};
use super::options::WasmCallOptions;
use super::Circuit;
use crate::error::CircuitError;
use crate::wasm::WasmModuleHandler;

/// Widest register a checked module can bind to a function parameter
pub const MAX_WASM_REGISTER_WIDTH: usize = 32;

const DEFAULT_WASM_SLOTS: &[usize] = &[0];

/// A WASM call that passed validation and only needs to be placed
struct WasmCall<'a> {
    funcname: &'a str,
    handler: &'a WasmModuleHandler,
    widths_i: Vec<u32>,
    widths_o: Vec<u32>,
    bits: Vec<Bit>,
    slots: &'a [usize],
    options: &'a WasmCallOptions,
}

/// Check that no variable is wider than the module's integer size
pub fn check_wasm_widths(list_i: &[u32], list_o: &[u32], int_size: u32) -> Result<(), CircuitError> {
    if let Some(&width) = list_i.iter().chain(list_o.iter()).find(|w| **w > int_size) {
        return Err(CircuitError::InvalidArgument { width, int_size });
    }
    Ok(())
}

impl Circuit {
    /// Add a classical function call from a WASM module on explicit bits
    ///
    /// `list_i` and `list_o` give the bit width of each input and output
    /// variable; `args` lists the bits they are bound to, inputs first.
    /// `args_wasm` names the WASM state slots touched by the call and defaults
    /// to slot 0.
    #[allow(clippy::too_many_arguments)]
    pub fn add_wasm(
        &mut self,
        funcname: &str,
        handler: &WasmModuleHandler,
        list_i: &[u32],
        list_o: &[u32],
        args: &[Bit],
        args_wasm: Option<&[usize]>,
        options: &WasmCallOptions,
    ) -> Result<&mut Self, CircuitError> {
        let slots = args_wasm.unwrap_or(DEFAULT_WASM_SLOTS);

        check_wasm_widths(list_i, list_o, handler.int_size())?;

        if !handler.check_function(funcname, list_i.len(), list_o.len()) {
            return Err(function_not_found(funcname, handler));
        }

        let expected: usize = list_i.iter().chain(list_o.iter()).map(|w| *w as usize).sum();
        if args.len() != expected {
            return Err(CircuitError::ArgumentCountMismatch {
                expected,
                found: args.len(),
            });
        }

        self.insert_wasm(WasmCall {
            funcname,
            handler,
            widths_i: list_i.to_vec(),
            widths_o: list_o.to_vec(),
            bits: args.to_vec(),
            slots,
            options,
        })
    }

    /// Add a classical function call from a WASM module on whole registers
    ///
    /// Each register in `list_i` and `list_o` is bound to one input or output
    /// variable. A checked module rejects registers wider than
    /// [`MAX_WASM_REGISTER_WIDTH`] and functions of another arity. An unchecked
    /// module skips both checks; the call is inserted as given.
    pub fn add_wasm_to_reg(
        &mut self,
        funcname: &str,
        handler: &WasmModuleHandler,
        list_i: &[BitRegister],
        list_o: &[BitRegister],
        args_wasm: Option<&[usize]>,
        options: &WasmCallOptions,
    ) -> Result<&mut Self, CircuitError> {
        let slots = args_wasm.unwrap_or(DEFAULT_WASM_SLOTS);

        if handler.checked() {
            if let Some(reg) = list_i
                .iter()
                .chain(list_o.iter())
                .find(|reg| reg.size() > MAX_WASM_REGISTER_WIDTH)
            {
                return Err(CircuitError::RegisterTooWide {
                    register: reg.name().to_string(),
                    size: reg.size(),
                });
            }
            if !handler.check_function(funcname, list_i.len(), list_o.len()) {
                return Err(function_not_found(funcname, handler));
            }
        } else {
            warn!("adding call to '{funcname}' of unchecked wasm module {handler} without validation");
        }

        let mut bits = Vec::new();
        for reg in list_i.iter().chain(list_o.iter()) {
            if self.get_c_register(reg.name()) != Some(reg) {
                return Err(CircuitError::UnknownRegister(reg.to_string()));
            }
            bits.extend(reg.bits());
        }

        self.insert_wasm(WasmCall {
            funcname,
            handler,
            widths_i: register_widths(list_i),
            widths_o: register_widths(list_o),
            bits,
            slots,
            options,
        })
    }

    /// Place a validated call, growing the WASM state register first
    ///
    /// Everything that can fail is checked before the circuit is modified.
    fn insert_wasm(&mut self, call: WasmCall<'_>) -> Result<&mut Self, CircuitError> {
        let condition = call.options.resolve_condition()?;

        let mut all_bits: Vec<Bit> = Vec::new();
        if let Some(condition) = &condition {
            all_bits.extend(condition.bits.iter().cloned());
        }
        all_bits.extend(call.bits);
        self.check_units(&all_bits, call.slots)?;

        if let Some(max_slot) = call.slots.iter().max() {
            self.add_wasm_register(max_slot + 1);
        }

        let wasm_op = Op::Wasm(WasmOp::new(
            call.funcname,
            call.handler.uid(),
            call.widths_i,
            call.widths_o,
            call.slots.len(),
        ));
        let op = match &condition {
            Some(condition) => Op::Conditional(Conditional {
                op: Box::new(wasm_op),
                width: condition.bits.len(),
                value: condition.value,
            }),
            None => wasm_op,
        };

        let mut args: Vec<UnitId> = all_bits.into_iter().map(UnitId::Bit).collect();
        args.extend(call.slots.iter().map(|slot| UnitId::WasmState(WasmState::new(*slot))));

        self.push_command(Command {
            op,
            args,
            opgroup: call.options.opgroup.clone(),
        });
        Ok(self)
    }
}

fn function_not_found(funcname: &str, handler: &WasmModuleHandler) -> CircuitError {
    CircuitError::FunctionNotFound {
        funcname: funcname.to_string(),
        module: handler.to_string(),
    }
}

fn register_widths(registers: &[BitRegister]) -> Vec<u32> {
    registers.iter().map(|reg| reg.size() as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{if_bit, reg_eq};
    use anyhow::Result;
    use wat::parse_str;

    fn add_handler(check: bool) -> Result<WasmModuleHandler> {
        let wasm = parse_str(
            r#"
            (module
                (func (export "init"))
                (func (export "add1") (param i32) (result i32)
                    local.get 0
                    i32.const 1
                    i32.add
                )
                (func (export "add") (param i32 i32) (result i32)
                    local.get 0
                    local.get 1
                    i32.add
                )
                (func (export "no_return") (param i32))
            )"#,
        )?;
        Ok(WasmModuleHandler::new(wasm, check, 32)?)
    }

    fn bits(reg: &str, range: std::ops::Range<usize>) -> Vec<Bit> {
        range.map(|i| Bit::new(reg, i)).collect()
    }

    #[test]
    fn test_add_wasm_records_op() -> Result<()> {
        let handler = add_handler(true)?;
        let mut circuit = Circuit::with_bits(6);

        circuit.add_wasm("add", &handler, &[2, 2], &[2], &bits("c", 0..6), Some(&[1]), &WasmCallOptions::default())?;

        assert_eq!(circuit.n_commands(), 1);
        assert_eq!(circuit.wasm_state_count(), 2);

        let command = &circuit.commands()[0];
        let op = command.op.wasm().expect("wasm op");
        assert_eq!(op.func_name, "add");
        assert_eq!(op.wasm_file_uid, handler.uid());
        assert_eq!(op.width_i_parameter, vec![2, 2]);
        assert_eq!(op.width_o_parameter, vec![2]);
        assert_eq!(op.num_bits, 6);
        assert_eq!(op.num_w, 1);
        assert_eq!(command.args.len(), 7);
        assert_eq!(command.args[6], UnitId::WasmState(WasmState::new(1)));
        assert!(command.opgroup.is_none());
        Ok(())
    }

    #[test]
    fn test_add_wasm_chaining() -> Result<()> {
        let handler = add_handler(true)?;
        let mut circuit = Circuit::with_bits(2);
        let options = WasmCallOptions::default();

        circuit
            .add_wasm("add1", &handler, &[1], &[1], &bits("c", 0..2), None, &options)?
            .add_wasm("add1", &handler, &[1], &[1], &bits("c", 0..2), Some(&[0, 2]), &options)?;

        assert_eq!(circuit.n_commands(), 2);
        assert_eq!(circuit.wasm_state_count(), 3);
        Ok(())
    }

    #[test]
    fn test_add_wasm_empty_slots() -> Result<()> {
        let handler = add_handler(true)?;
        let mut circuit = Circuit::with_bits(1);

        circuit.add_wasm("no_return", &handler, &[1], &[], &bits("c", 0..1), Some(&[]), &WasmCallOptions::default())?;

        assert_eq!(circuit.wasm_state_count(), 0);
        assert_eq!(circuit.commands()[0].op.wasm().map(|op| op.num_w), Some(0));
        Ok(())
    }

    #[test]
    fn test_add_wasm_argument_count() -> Result<()> {
        let handler = add_handler(true)?;
        let mut circuit = Circuit::with_bits(4);

        let err = circuit
            .add_wasm("add1", &handler, &[2], &[2], &bits("c", 0..3), None, &WasmCallOptions::default())
            .unwrap_err();
        assert!(matches!(err, CircuitError::ArgumentCountMismatch { expected: 4, found: 3 }));
        assert_eq!(circuit, Circuit::with_bits(4));
        Ok(())
    }

    #[test]
    fn test_add_wasm_unknown_and_duplicate_bits() -> Result<()> {
        let handler = add_handler(true)?;
        let mut circuit = Circuit::with_bits(2);
        let options = WasmCallOptions::default();

        let err = circuit
            .add_wasm("add1", &handler, &[1], &[1], &[Bit::new("c", 0), Bit::new("d", 0)], None, &options)
            .unwrap_err();
        assert!(matches!(err, CircuitError::UnknownBit(_)));

        let err = circuit
            .add_wasm("add1", &handler, &[1], &[1], &[Bit::new("c", 0), Bit::new("c", 0)], None, &options)
            .unwrap_err();
        assert!(matches!(err, CircuitError::DuplicateArgument(_)));

        let err = circuit
            .add_wasm("add1", &handler, &[1], &[1], &bits("c", 0..2), Some(&[4, 4]), &options)
            .unwrap_err();
        assert!(matches!(err, CircuitError::DuplicateArgument(_)));

        assert_eq!(circuit.wasm_state_count(), 0);
        assert_eq!(circuit.n_commands(), 0);
        Ok(())
    }

    #[test]
    fn test_conditional_call() -> Result<()> {
        let handler = add_handler(true)?;
        let mut circuit = Circuit::with_bits(2);
        let flag = circuit.add_c_register("flag", 1)?;

        let options = WasmCallOptions::builder()
            .opgroup("adder")
            .condition(if_bit(flag.bit(0)?))
            .build();
        circuit.add_wasm("add1", &handler, &[1], &[1], &bits("c", 0..2), None, &options)?;

        let command = &circuit.commands()[0];
        assert_eq!(command.opgroup.as_deref(), Some("adder"));
        match &command.op {
            Op::Conditional(cond) => {
                assert_eq!(cond.width, 1);
                assert_eq!(cond.value, 1);
                assert!(matches!(*cond.op, Op::Wasm(_)));
            }
            other => panic!("expected conditional op, got {other:?}"),
        }
        assert_eq!(command.args[0], UnitId::Bit(Bit::new("flag", 0)));
        assert_eq!(command.args.len(), 4);
        Ok(())
    }

    #[test]
    fn test_condition_overlapping_args() -> Result<()> {
        let handler = add_handler(true)?;
        let mut circuit = Circuit::with_bits(2);

        let options = WasmCallOptions::builder()
            .condition(if_bit(Bit::new("c", 1)))
            .build();
        let err = circuit
            .add_wasm("add1", &handler, &[1], &[1], &bits("c", 0..2), None, &options)
            .unwrap_err();
        assert!(matches!(err, CircuitError::DuplicateArgument(_)));
        Ok(())
    }

    #[test]
    fn test_add_wasm_to_reg_bits() -> Result<()> {
        let handler = add_handler(true)?;
        let mut circuit = Circuit::new();
        let a = circuit.add_c_register("a", 3)?;
        let b = circuit.add_c_register("b", 5)?;
        let out = circuit.add_c_register("out", 8)?;
        let cond = circuit.add_c_register("cond", 2)?;

        let options = WasmCallOptions::builder().condition(reg_eq(cond, 2)).build();
        circuit.add_wasm_to_reg("add", &handler, &[a, b], &[out], Some(&[3]), &options)?;

        let command = &circuit.commands()[0];
        let op = command.op.wasm().expect("wasm op");
        assert_eq!(op.width_i_parameter, vec![3, 5]);
        assert_eq!(op.width_o_parameter, vec![8]);
        assert_eq!(command.args.len(), 2 + 16 + 1);
        assert_eq!(command.args[2], UnitId::Bit(Bit::new("a", 0)));
        assert_eq!(command.args[18], UnitId::WasmState(WasmState::new(3)));
        assert_eq!(circuit.wasm_state_count(), 4);
        Ok(())
    }

    #[test]
    fn test_add_wasm_to_reg_unknown_register() -> Result<()> {
        let handler = add_handler(false)?;
        let mut circuit = Circuit::new();
        let a = circuit.add_c_register("a", 4)?;
        let resized = BitRegister::new("a", 6);
        let foreign = BitRegister::new("z", 1);
        let options = WasmCallOptions::default();

        let err = circuit.add_wasm_to_reg("add1", &handler, &[foreign], &[a.clone()], None, &options).unwrap_err();
        assert!(matches!(err, CircuitError::UnknownRegister(_)));
        let err = circuit.add_wasm_to_reg("add1", &handler, &[resized], &[], None, &options).unwrap_err();
        assert!(matches!(err, CircuitError::UnknownRegister(_)));
        assert_eq!(circuit.n_commands(), 0);
        assert_eq!(circuit.wasm_state_count(), 0);
        Ok(())
    }

    #[test]
    fn test_check_wasm_widths() {
        assert!(check_wasm_widths(&[32, 1], &[32], 32).is_ok());
        assert!(check_wasm_widths(&[], &[], 32).is_ok());
        assert!(matches!(
            check_wasm_widths(&[8], &[4_000_000_000], 64),
            Err(CircuitError::InvalidArgument { width: 4_000_000_000, int_size: 64 })
        ));
    }
}
