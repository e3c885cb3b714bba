use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use kinfo_core::corefile::CoreFile;
use kinfo_core::error::{KinfoError, KinfoResult};
use kinfo_core::types::{Architecture, LwpId};
use kinfo_utils::{info, init_logging, warn, LogConfig, LogLevel};

mod report;

use report::ThreadRow;

/// Inspect the FreeBSD notes of an ELF core dump.
#[derive(Parser, Debug)]
#[command(name = "kinfo")]
#[command(version)]
#[command(about = "Inspect FreeBSD core dumps: process status, memory map, open files, and signal info", long_about = None)]
struct Cli
{
    /// Path to the core file
    core: PathBuf,

    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Architecture to assume when the core's machine field is not recognized
    #[arg(long, global = true)]
    arch: Option<Architecture>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Commands
{
    /// Process status from the process-info note
    Status,
    /// Virtual memory map
    Mappings,
    /// Open file table
    Files,
    /// Current working directory
    Cwd,
    /// Executable path
    Exe,
    /// Command line the process was started with
    Cmdline,
    /// Threads in dump order, the signalled one first
    Threads,
    /// Signal information of one thread
    Siginfo
    {
        /// LWP id of the thread (default: the signalled thread)
        #[arg(long)]
        lwp: Option<u64>,
    },
    /// Auxiliary vector
    Auxv,
    /// cmdline, cwd, exe, mappings and status (default)
    All,
}

fn main()
{
    let cli = Cli::parse();

    let config = match LogConfig::from_env() {
        Ok(config) => config.with_level(cli.log_level),
        Err(e) => {
            eprintln!("Failed to read logging configuration: {}", e);
            process::exit(1);
        }
    };
    let _guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_command(cli: &Cli) -> Result<(), Box<dyn Error>>
{
    info!("Opening core file {}", cli.core.display());
    let data = std::fs::read(&cli.core)?;
    let core = CoreFile::parse_with(&data, cli.arch)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(pid) = core.pid() {
        writeln!(out, "process {pid}")?;
    }

    match cli.command.unwrap_or(Commands::All) {
        Commands::Status => print_status(&mut out, &core)?,
        Commands::Mappings => print_mappings(&mut out, &core)?,
        Commands::Files => {
            if let Some(entries) = soft(core.files(), "unable to read open files")? {
                report::write_files(&mut out, &entries)?;
            }
        }
        Commands::Cwd => print_cwd(&mut out, &core)?,
        Commands::Exe => print_exe(&mut out, &core)?,
        Commands::Cmdline => print_cmdline(&mut out, &core)?,
        Commands::Threads => print_threads(&mut out, &core)?,
        Commands::Siginfo { lwp } => print_siginfo(&mut out, &core, lwp)?,
        Commands::Auxv => {
            if let Some(entries) = soft(core.auxv(), "unable to read auxiliary vector")? {
                report::write_auxv(&mut out, &entries, core.params().address_bits)?;
            }
        }
        Commands::All => {
            print_cmdline(&mut out, &core)?;
            print_cwd(&mut out, &core)?;
            print_exe(&mut out, &core)?;
            print_mappings(&mut out, &core)?;
            print_status(&mut out, &core)?;
        }
    }
    Ok(())
}

/// Turn a soft failure into a warning and `None`; pass hard failures on
fn soft<T>(result: KinfoResult<T>, what: &str) -> KinfoResult<Option<T>>
{
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_soft() => {
            warn!("{what}: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn print_status(out: &mut impl Write, core: &CoreFile) -> Result<(), Box<dyn Error>>
{
    if let Some(snapshot) = soft(core.process_info(), "unable to read process status")? {
        report::write_status(out, &snapshot)?;
    }
    Ok(())
}

fn print_mappings(out: &mut impl Write, core: &CoreFile) -> Result<(), Box<dyn Error>>
{
    if let Some(regions) = soft(core.vm_map(), "unable to find mappings in core file")? {
        report::write_mappings(out, &regions, core.params().address_bits)?;
    }
    Ok(())
}

fn print_cwd(out: &mut impl Write, core: &CoreFile) -> Result<(), Box<dyn Error>>
{
    if let Some(cwd) = soft(core.cwd(), "unable to read current working directory")? {
        writeln!(out, "cwd = '{cwd}'")?;
    }
    Ok(())
}

fn print_exe(out: &mut impl Write, core: &CoreFile) -> Result<(), Box<dyn Error>>
{
    if let Some(exe) = soft(core.exe(), "unable to read executable path name")? {
        writeln!(out, "exe = '{exe}'")?;
    }
    Ok(())
}

fn print_cmdline(out: &mut impl Write, core: &CoreFile) -> Result<(), Box<dyn Error>>
{
    if let Some(info) = soft(core.prpsinfo(), "Command line unavailable")? {
        writeln!(out, "cmdline = '{}'", info.psargs)?;
    }
    Ok(())
}

fn print_threads(out: &mut impl Write, core: &CoreFile) -> Result<(), Box<dyn Error>>
{
    let mut rows = Vec::with_capacity(core.threads().len());
    for thread in core.threads() {
        let status = core.prstatus(thread)?;
        rows.push(ThreadRow {
            ptid: core.ptid(thread),
            name: core.thread_name(thread),
            signal: core.abi().signal_from_target(status.cursig),
        });
    }
    report::write_threads(out, &rows)?;
    Ok(())
}

fn print_siginfo(out: &mut impl Write, core: &CoreFile, lwp: Option<u64>) -> Result<(), Box<dyn Error>>
{
    let thread = match lwp {
        Some(lwp) => core.thread(LwpId(lwp))?,
        None => core
            .threads()
            .first()
            .ok_or_else(|| KinfoError::Unavailable("core file has no threads".to_string()))?,
    };
    if let Some(info) = soft(core.siginfo(thread), "siginfo unavailable")? {
        report::write_siginfo(out, core.ptid(thread), &info)?;
    }
    Ok(())
}
