//! CLI entrypoint for `hf gallagher` subcommands, `spec.md` §6.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use rfcore_core::error::Pm3Error;

/// Gallagher CAD/credential tooling anchoring rfcore's observable behavior.
#[derive(Debug, Parser)]
#[command(name = "rfcore-cli")]
#[command(about = "hf gallagher subcommands for rfcore")]
struct Cli {
    #[command(subcommand)]
    command: Hf,

    /// On-disk CAD snapshot used in place of a live reader session.
    #[arg(long, global = true, default_value = "gallagher_cad_state.bin")]
    state: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Hf {
    /// Gallagher CAD/credential operations.
    #[command(subcommand)]
    Gallagher(GallagherCommand),
}

#[derive(Debug, Subcommand)]
enum GallagherCommand {
    /// Read the Card Application Directory and report its entries.
    Reader {
        /// Restrict output to this AID (3 hex bytes).
        #[arg(long)]
        aid: Option<String>,
        /// Site key (unused by the file-backed reader; accepted for
        /// signature parity with the live-reader command).
        #[arg(long)]
        sitekey: Option<String>,
        /// Continuous polling (no-op here; live-reader only).
        #[arg(short = '@')]
        continuous: bool,
    },
    /// Build a Gallagher credential block and register its AID in the CAD.
    Clone {
        #[arg(long)]
        rc: u8,
        #[arg(long)]
        fc: u16,
        #[arg(long)]
        cn: u32,
        #[arg(long)]
        il: u8,
        #[arg(long)]
        aid: Option<String>,
        #[arg(long)]
        sitekey: Option<String>,
        #[arg(long)]
        cadkey: Option<String>,
        #[arg(long)]
        nocadupdate: bool,
        #[arg(long)]
        noappcreate: bool,
    },
    /// Remove a facility's AID entry from the CAD.
    Delete {
        #[arg(long)]
        aid: String,
        #[arg(long)]
        sitekey: Option<String>,
        #[arg(long)]
        cadkey: Option<String>,
        #[arg(long)]
        nocadupdate: bool,
        #[arg(long)]
        noappdelete: bool,
    },
    /// Derive a diversified application key.
    Diversify {
        #[arg(long)]
        aid: String,
        #[arg(long, default_value_t = 0)]
        keynum: u8,
        #[arg(long)]
        uid: Option<String>,
        #[arg(long)]
        sitekey: Option<String>,
    },
    /// Decode a raw credential block.
    Decode {
        #[arg(long)]
        data: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(cli: Cli) -> Result<String, Pm3Error> {
    let Hf::Gallagher(command) = cli.command;
    match command {
        GallagherCommand::Reader { aid, sitekey: _, continuous: _ } => {
            rfcore_cli::reader(&cli.state, aid.as_deref())
        }
        GallagherCommand::Clone {
            rc,
            fc,
            cn,
            il,
            aid,
            sitekey: _,
            cadkey: _,
            nocadupdate,
            noappcreate: _,
        } => rfcore_cli::clone_credential(&cli.state, rc, fc, cn, il, aid.as_deref(), nocadupdate),
        GallagherCommand::Delete {
            aid,
            sitekey: _,
            cadkey: _,
            nocadupdate,
            noappdelete: _,
        } => rfcore_cli::delete_credential(&cli.state, &aid, nocadupdate),
        GallagherCommand::Diversify {
            aid,
            keynum,
            uid,
            sitekey,
        } => rfcore_cli::diversify(&aid, keynum, uid.as_deref(), sitekey.as_deref()),
        GallagherCommand::Decode { data } => rfcore_cli::decode(&data),
    }
}
