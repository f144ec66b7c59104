//! snmp-get: retrieve SNMP object values.

use clap::Parser;
use snmp_session::cli::args::{CommonArgs, OutputArgs};
use snmp_session::cli::hints::parse_oid;
use snmp_session::cli::output::{OutputContext, write_error};
use snmp_session::{Oid, VarBind};
use std::process::ExitCode;
use std::time::Instant;

/// Retrieve one or more SNMP object values.
#[derive(Debug, Parser)]
#[command(name = "snmp-get", about, disable_version_flag = true)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    output: OutputArgs,

    /// Use GETNEXT instead of GET.
    #[arg(short = 'n', long)]
    next: bool,

    /// OIDs to retrieve (dotted notation or well-known names).
    #[arg(required = true, value_name = "OID")]
    oids: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.output.init_tracing();

    let oids: Vec<Oid> = match args.oids.iter().map(|s| parse_oid(s)).collect() {
        Ok(oids) => oids,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let start = Instant::now();
    let varbinds = match run(&args, &oids).await {
        Ok(Ok(varbinds)) => varbinds,
        Ok(Err(e)) => {
            write_error(&e);
            return ExitCode::FAILURE;
        }
        Err(usage) => {
            eprintln!("Error: {usage}");
            return ExitCode::FAILURE;
        }
    };

    let ctx = OutputContext {
        show_hints: args.output.hints,
        show_timing: args.output.timing,
    };
    if let Err(e) = ctx.write_results(&varbinds) {
        eprintln!("Error writing output: {e}");
        return ExitCode::FAILURE;
    }
    ctx.write_timing(varbinds.len(), start.elapsed());
    ExitCode::SUCCESS
}

/// Outer error is a usage problem, inner is a protocol failure.
async fn run(args: &Args, oids: &[Oid]) -> Result<snmp_session::Result<Vec<VarBind>>, String> {
    let builder = args.common.session_builder()?;
    Ok(async {
        let session = builder.connect().await?;
        if args.next {
            let mut out = Vec::with_capacity(oids.len());
            for oid in oids {
                out.push(session.get_next(oid).await?);
            }
            Ok(out)
        } else {
            session.get_many(oids).await
        }
    }
    .await)
}
