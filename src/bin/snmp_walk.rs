//! snmp-walk: enumerate an SNMP subtree.

use clap::Parser;
use snmp_session::cli::args::{CommonArgs, OutputArgs, SnmpVersion};
use snmp_session::cli::hints::parse_oid;
use snmp_session::cli::output::{OutputContext, write_error};
use snmp_session::{Oid, Session, WalkEnd};
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Instant;

/// Walk one or more SNMP subtrees.
#[derive(Debug, Parser)]
#[command(name = "snmp-walk", about, disable_version_flag = true)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    output: OutputArgs,

    /// Use GETNEXT even when GETBULK is available.
    #[arg(long)]
    no_bulk: bool,

    /// Bindings requested per GETBULK round.
    #[arg(short = 'm', long, default_value_t = 10)]
    max_repetitions: i32,

    /// Subtrees to walk (default: mib-2).
    #[arg(value_name = "OID", default_value = "1.3.6.1.2.1")]
    oids: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.output.init_tracing();

    let roots: Vec<Oid> = match args.oids.iter().map(|s| parse_oid(s)).collect() {
        Ok(oids) => oids,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let builder = match args.common.session_builder() {
        Ok(b) => b.max_repetitions(args.max_repetitions),
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let session = match builder.connect().await {
        Ok(s) => s,
        Err(e) => {
            write_error(&e);
            return ExitCode::FAILURE;
        }
    };

    let ctx = OutputContext {
        show_hints: args.output.hints,
        show_timing: args.output.timing,
    };
    let bulk = !args.no_bulk && args.common.snmp_version == SnmpVersion::V2c;
    let start = Instant::now();
    let mut total = 0;

    for root in roots {
        match walk(&session, root, bulk, args.max_repetitions, &ctx).await {
            Ok(count) => total += count,
            Err(e) => {
                write_error(&e);
                return ExitCode::FAILURE;
            }
        }
    }

    ctx.write_timing(total, start.elapsed());
    ExitCode::SUCCESS
}

async fn walk(
    session: &Session,
    root: Oid,
    bulk: bool,
    max_repetitions: i32,
    ctx: &OutputContext,
) -> snmp_session::Result<usize> {
    let mut stdout = io::stdout().lock();
    let mut count = 0;

    let end = if bulk {
        let mut walk = session.bulk_walk(root, max_repetitions);
        while let Some(vb) = walk.next().await {
            ctx.write_varbind(&mut stdout, &vb?)
                .map_err(io_error)?;
            count += 1;
        }
        walk.end_reason()
    } else {
        let mut walk = session.walk(root);
        while let Some(vb) = walk.next().await {
            ctx.write_varbind(&mut stdout, &vb?)
                .map_err(io_error)?;
            count += 1;
        }
        walk.end_reason()
    };
    stdout.flush().map_err(io_error)?;

    if end == Some(WalkEnd::Exhausted) && count == 0 {
        eprintln!("No objects found under this OID");
    }
    Ok(count)
}

fn io_error(source: io::Error) -> snmp_session::Error {
    snmp_session::Error::Io {
        target: None,
        source,
    }
}
