use clap::{Parser, ValueEnum};
use serde::Serialize;
use sse2_probe::cpu::cpuid::{self, CpuidError, CpuidResult, LEAF_FEATURES};
use sse2_probe::cpu::features::{EcxFeatures, EdxFeatures, FeatureSet};
use sse2_probe::cpu::hardware::CpuFeatures;
use sse2_probe::probe::Sse2Status;
use std::process::ExitCode;
use tracing::{debug, info, Level};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Print the CPUID leaf 1 feature bits and optionally gate on required features.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Feature that must be present (e.g. sse2, sse4.1, avx). Repeatable.
    #[arg(short, long = "require", value_name = "FEATURE")]
    require: Vec<FeatureSet>,

    /// Also show what the standard library's runtime detection reports.
    #[arg(long)]
    compare: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct Report {
    vendor: String,
    max_basic_leaf: u32,
    leaf1: CpuidResult,
    sse2: bool,
    edx_features: Vec<String>,
    ecx_features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    runtime: Option<CpuFeatures>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if !cpuid::is_available() {
        return Err(CpuidError::Unavailable.into());
    }
    debug!("cpuid available");

    let (vendor, max_basic_leaf) = cpuid::identify()?;
    let leaf1 = cpuid::checked_cpuid(LEAF_FEATURES)?;
    let host = FeatureSet::from_leaf1(&leaf1);
    info!(%vendor, max_basic_leaf, "identified processor");

    let runtime = args.compare.then(CpuFeatures::detect);
    if let Some(runtime) = &runtime {
        cross_check(&host, runtime);
    }

    let required: FeatureSet = args.require.iter().copied().collect();
    let missing = host.missing(&required);
    debug!(required = %required, missing = %missing, "requirement check");

    let report = Report {
        vendor,
        max_basic_leaf,
        leaf1,
        sse2: Sse2Status::from_edx(leaf1.edx).is_supported(),
        edx_features: FeatureSet { edx: host.edx, ecx: EcxFeatures::empty() }.names(),
        ecx_features: FeatureSet { edx: EdxFeatures::empty(), ecx: host.ecx }.names(),
        runtime,
        missing: missing.names(),
    };

    match args.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => print_text(&report),
    }

    if missing.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("Missing features: {}", missing);
        Ok(ExitCode::from(1))
    }
}

// AVX and FMA also need OS support for the extended state, so runtime
// detection can legitimately report less than the raw bits.
fn cross_check(host: &FeatureSet, runtime: &CpuFeatures) {
    for (name, detected) in runtime.entries() {
        let Ok(feature) = name.parse::<FeatureSet>() else {
            continue; // not a leaf 1 feature
        };
        let raw = host.contains(&feature);
        if raw != detected {
            info!(feature = name, cpuid = raw, runtime = detected, "detection differs");
        }
    }
}

fn print_text(report: &Report) {
    let yes_no = |b: bool| if b { "yes" } else { "no" };

    println!("Vendor:         {}", report.vendor);
    println!("Max basic leaf: {:#x}", report.max_basic_leaf);
    println!(
        "Leaf 1:         eax={:#010x} ebx={:#010x} ecx={:#010x} edx={:#010x}",
        report.leaf1.eax, report.leaf1.ebx, report.leaf1.ecx, report.leaf1.edx
    );
    println!("SSE2:           {}", yes_no(report.sse2));
    println!("EDX features:   {}", report.edx_features.join(" "));
    println!("ECX features:   {}", report.ecx_features.join(" "));

    if let Some(runtime) = &report.runtime {
        println!("\nRuntime detection:");
        for (name, detected) in runtime.entries() {
            println!("  {:<8} {}", name, yes_no(detected));
        }
    }
}
