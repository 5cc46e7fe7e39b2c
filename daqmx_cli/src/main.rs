use clap::{Parser, Subcommand, ValueEnum};
use daqmx_gen::cmds;
use daqmx_gen::cmds::analyze::IrOutputFormat;
use daqmx_gen::cmds::common::resolve_inputs;
use daqmx_loader::Target;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "daqmx")]
#[command(about = "Binding generator for the NI-DAQmx function catalog", long_about = None)]
struct Cli {
    /* Generator config file; defaults to ./daqmx.yaml when present */
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /* Catalog file (YAML or JSON); overrides the config */
    #[arg(long = "catalog", value_name = "FILE", global = true)]
    catalog: Option<PathBuf>,

    /* External enum table merged into the catalog */
    #[arg(long = "enums", value_name = "FILE", global = true)]
    enums: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /* Emit bindings, IPC projection, description and IR */
    Codegen {
        /* Output directory for generated artifacts */
        #[arg(short = 'o', long = "output", value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /* Targets to emit; all when omitted */
        #[arg(short = 't', long = "target", value_enum)]
        targets: Vec<TargetArg>,

        /* Enable verbose output */
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },

    /* Show size plans, placement, shards and classes */
    Analyze {
        /* Restrict the report to one catalog function */
        #[arg(short = 'f', long = "function", value_name = "NAME")]
        function: Option<String>,

        /* Print the Surface Catalog after analysis */
        #[arg(long = "print-ir")]
        print_ir: bool,

        /* Format to use when printing the Surface Catalog */
        #[arg(long = "ir-format", value_enum, default_value = "json")]
        ir_format: IrOutputFormat,

        /* Print the generated wrapper of the selected function */
        #[arg(long = "print-wrapper", requires = "function")]
        print_wrapper: bool,
    },

    /* Print the canonical catalog description */
    Describe {
        /* Write to a file instead of stdout */
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /* Check the catalog and solve every function without emitting */
    Validate {
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum TargetArg {
    /* Rust bindings (.rs files) */
    Rust,
    /* IPC service definition (.proto) */
    Proto,
    /* Canonical catalog description (.yaml) */
    Description,
    /* Surface Catalog as JSON and protobuf */
    Ir,
}

impl From<TargetArg> for Target {
    fn from(target: TargetArg) -> Self {
        match target {
            TargetArg::Rust => Target::Rust,
            TargetArg::Proto => Target::Proto,
            TargetArg::Description => Target::Description,
            TargetArg::Ir => Target::Ir,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Codegen { output_dir, targets, verbose } => {
            let targets = targets.into_iter().map(Target::from).collect();
            let inputs = resolve_inputs(cli.config.as_deref(), cli.catalog, cli.enums, output_dir, targets)?;
            cmds::codegen::run(inputs, verbose)?;
        }

        Commands::Analyze { function, print_ir, ir_format, print_wrapper } => {
            let inputs = resolve_inputs(cli.config.as_deref(), cli.catalog, cli.enums, None, Vec::new())?;
            cmds::analyze::run(inputs, function, print_ir, ir_format, print_wrapper)?;
        }

        Commands::Describe { output } => {
            let inputs = resolve_inputs(cli.config.as_deref(), cli.catalog, cli.enums, None, Vec::new())?;
            cmds::validate::run_describe(inputs, output)?;
        }

        Commands::Validate { verbose } => {
            let inputs = resolve_inputs(cli.config.as_deref(), cli.catalog, cli.enums, None, Vec::new())?;
            cmds::validate::run_validate(inputs, verbose)?;
        }
    }

    Ok(())
}
