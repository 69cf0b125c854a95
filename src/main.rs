use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use wasm_circuit::circuit::check_wasm_widths;
use wasm_circuit::{Circuit, WasmCallOptions, WasmModuleHandler};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the uid and callable functions of a WASM module
    Inspect {
        /// Path to the WASM file to inspect
        #[arg(short, long)]
        wasm_file: String,

        /// Integer size used by the module's functions (32 or 64)
        #[arg(long, default_value_t = 32)]
        int_size: u32,

        /// Skip reading the function signatures
        #[arg(long)]
        no_check: bool,
    },

    /// Check whether a WASM module exposes a function with the given arity
    CheckFunction {
        /// Path to the WASM file
        #[arg(short, long)]
        wasm_file: String,

        /// Function name
        #[arg(short, long)]
        name: String,

        /// Number of input variables
        #[arg(long)]
        inputs: usize,

        /// Number of output variables
        #[arg(long)]
        outputs: usize,

        /// Integer size used by the module's functions (32 or 64)
        #[arg(long, default_value_t = 32)]
        int_size: u32,
    },

    /// Build a circuit with a single WASM call and print it as JSON
    Call {
        /// Path to the WASM file
        #[arg(short, long)]
        wasm_file: String,

        /// Function name
        #[arg(short, long)]
        name: String,

        /// Bit width of each input variable
        #[arg(long, value_delimiter = ',')]
        widths_in: Vec<u32>,

        /// Bit width of each output variable
        #[arg(long, value_delimiter = ',')]
        widths_out: Vec<u32>,

        /// WASM state slots the call acts on (defaults to slot 0)
        #[arg(long, value_delimiter = ',')]
        slots: Option<Vec<usize>>,

        /// Operation group of the call
        #[arg(long)]
        opgroup: Option<String>,

        /// Integer size used by the module's functions (32 or 64)
        #[arg(long, default_value_t = 32)]
        int_size: u32,

        /// Insert the call without reading the function signatures
        #[arg(long)]
        no_check: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { wasm_file, int_size, no_check } => {
            let handler = WasmModuleHandler::from_file(&wasm_file, !no_check, int_size)
                .with_context(|| format!("failed to load {wasm_file}"))?;

            println!("Module: {wasm_file}");
            println!("Uid: {handler}");
            if handler.checked() {
                print!("{}", handler.describe()?);
            } else {
                println!("Function signatures not checked");
            }
        }
        Commands::CheckFunction { wasm_file, name, inputs, outputs, int_size } => {
            let handler = WasmModuleHandler::from_file(&wasm_file, true, int_size)
                .with_context(|| format!("failed to load {wasm_file}"))?;

            if handler.check_function(&name, inputs, outputs) {
                println!("'{name}' with {inputs} input(s) and {outputs} output(s) found in {handler}");
            } else {
                anyhow::bail!("{name} with {inputs} input(s) and {outputs} output(s) not found in {handler}");
            }
        }
        Commands::Call {
            wasm_file,
            name,
            widths_in,
            widths_out,
            slots,
            opgroup,
            int_size,
            no_check,
        } => {
            let handler = WasmModuleHandler::from_file(&wasm_file, !no_check, int_size)
                .with_context(|| format!("failed to load {wasm_file}"))?;

            // Reject oversized widths before allocating a bit for each of them
            check_wasm_widths(&widths_in, &widths_out, handler.int_size())?;
            let n_bits: usize = widths_in.iter().chain(widths_out.iter()).map(|w| *w as usize).sum();
            let mut circuit = Circuit::with_bits(n_bits);
            let args = circuit.bits().to_vec();

            let mut builder = WasmCallOptions::builder();
            if let Some(opgroup) = opgroup {
                builder = builder.opgroup(opgroup);
            }
            let options = builder.build();

            circuit.add_wasm(&name, &handler, &widths_in, &widths_out, &args, slots.as_deref(), &options)?;
            println!("{}", circuit.to_json()?);
        }
    }

    Ok(())
}
