/* Analyze command - per-function plans, placement, shards and classes */

use super::common::{load, solve_and_report, Inputs};
use crate::codegen::rust_gen::emit_function;
use crate::codegen::shared::{surface_to_json, surface_to_protobuf};
use crate::placement::Placement;
use crate::solver::SizePlan;
use crate::surface::{SlotSource, SurfaceCatalog, SurfaceFunction};
use anyhow::anyhow;
use clap::ValueEnum;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum IrOutputFormat {
    Json,
    Protobuf,
}

/* Execute the analyze command */
pub fn run(
    inputs: Inputs,
    function: Option<String>,
    print_ir: bool,
    ir_format: IrOutputFormat,
    print_wrapper: bool,
) -> anyhow::Result<()> {
    println!("DAQmx Generator - Catalog Analysis Tool");
    println!("=======================================\n");

    let catalog = load(&inputs, true)?;
    let surface = solve_and_report(&catalog, &inputs.coercion, true)?;

    match function.as_deref() {
        Some(name) => {
            let function = surface
                .function(name)
                .ok_or_else(|| anyhow!("function '{}' is not in the catalog", name))?;
            print_function(function);
            if print_wrapper {
                println!("\n[~] Generated wrapper:");
                println!("{}", emit_function(&surface, function, ""));
            }
        }
        None => {
            for function in surface.functions.values() {
                print_function(function);
            }
            print_classes(&surface);
            print_shards(&surface);
        }
    }

    if print_ir {
        print_surface_ir(&surface, ir_format)?;
    }

    Ok(())
}

fn print_function(function: &SurfaceFunction) {
    println!("\n[*] Function: {} ({})", function.name, function.native_symbol);
    let placement = match &function.placement {
        Placement::Module => "module".to_string(),
        Placement::Instance { class, accessor } => format!("method of {} (receiver '{}')", class, accessor),
        Placement::Factory { class } => format!("factory of {}", class),
        Placement::Static { class } => format!("static on {}", class),
    };
    println!("  Placement: {} as `{}`", placement, function.method_name);

    if !function.inputs.is_empty() {
        println!("  Inputs:");
        for input in &function.inputs {
            let optional = if input.optional { " (optional)" } else { "" };
            println!("    - {}: {}{}", input.name, input.ty, optional);
        }
    }
    if !function.outputs.is_empty() {
        println!("  Outputs:");
        for output in &function.outputs {
            println!("    - {}: {} [{:?}]", output.name, output.ty, output.kind);
        }
    }

    for (buffer, plan) in &function.size_plans {
        let detail = match plan {
            SizePlan::LenDerived { size_param } => format!("len-derived, '{}' hidden", size_param),
            SizePlan::CallerSized { size_param, by_ptr, companion } => format!(
                "caller-sized by '{}'{}{}",
                size_param,
                if *by_ptr { " (by pointer)" } else { "" },
                companion.as_ref().map(|c| format!(", count in '{}'", c)).unwrap_or_default()
            ),
            SizePlan::TwoCall { size_param } => format!("two-call, '{}' discovered", size_param),
            SizePlan::ExprComputed { expression, .. } => format!("expr-computed: {}", expression),
        };
        println!("  [~] {}: {}", buffer, detail);
    }
    if function.evaluation_order.len() > 1 {
        println!("  Evaluation order: {}", function.evaluation_order.join(" -> "));
    }

    if let Some(compound) = &function.compound {
        let columns = function
            .slots
            .iter()
            .filter(|s| matches!(s.source, SlotSource::Repeating { .. }))
            .count();
        println!(
            "  Compound: {} of {} (max {}, {} variadic slots)",
            compound.param, compound.record, compound.max_length, columns
        );
    }
    if let Some(stream) = &function.stream {
        println!("  Stream: {} records via '{}'", stream.record, stream.callback_param);
    }
    if let Some(adaptor) = &function.adaptor {
        println!("  Adaptor: {} = {}", adaptor.name, adaptor.expression);
    }
    if let Some(shard) = &function.shard {
        println!("  Shard: {} of {}", shard.kind, shard.group);
    }
    println!(
        "  IPC: rpc {}{} ({} request / {} response fields)",
        function.ipc.rpc,
        if function.ipc.streaming { " [stream]" } else { "" },
        function.ipc.request_fields.len(),
        function.ipc.response_fields.len()
    );
}

fn print_classes(surface: &SurfaceCatalog) {
    println!("\n[~] Classes:");
    println!("============");
    for class in surface.classes.values() {
        println!("[*] {}", class.name);
        if !class.factories.is_empty() {
            println!("  Factories: {}", class.factories.join(", "));
        }
        if !class.statics.is_empty() {
            println!("  Statics: {}", class.statics.join(", "));
        }
        println!("  Methods: {}", class.methods.len());
        if let Some(releaser) = &class.releaser {
            println!("  Released by: {}", releaser);
        }
    }
}

fn print_shards(surface: &SurfaceCatalog) {
    if surface.shards.is_empty() {
        return;
    }
    println!("\n[~] Attribute Shard Groups:");
    println!("===========================");
    for group in surface.shards.values() {
        let kinds: Vec<String> = group.kinds().map(|k| k.to_string()).collect();
        println!("[*] {} -> {}: {}", group.native_symbol, group.method_name, kinds.join(", "));
    }
}

fn print_surface_ir(surface: &SurfaceCatalog, format: IrOutputFormat) -> anyhow::Result<()> {
    match format {
        IrOutputFormat::Json => {
            println!("\n[~] Surface Catalog (JSON)");
            println!("==========================");
            println!("{}", surface_to_json(surface)?);
            println!();
        }
        IrOutputFormat::Protobuf => {
            println!("\n[~] Surface Catalog (Protobuf)");
            println!("==============================");
            println!("(hex-encoded bytes, surface schema v{})", surface.version);
            let bytes = surface_to_protobuf(surface)?;
            println!("{}", hex_encode(&bytes));
            println!();
        }
    }
    Ok(())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
