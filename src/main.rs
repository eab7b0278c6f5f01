use anyhow::Result;
use asta_rs::assembler::Assembler;
use asta_rs::cli::Args;
use asta_rs::previewer;
use clap::Parser;
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.quiet {
            EnvFilter::new("warn")
        } else if args.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut cfg = args.to_config();
    previewer::preview(&mut cfg)?;
    if cfg.preview_only {
        return Ok(());
    }

    let mut asm = Assembler::new(cfg)?;
    asm.assemble(args.quiet)?;
    tracing::info!("asta-rs: assembly complete");
    Ok(())
}
