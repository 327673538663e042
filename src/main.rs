//! # Struk CLI
//!
//! Command-line front end for printing receipts on a Bluetooth ESC/POS
//! printer.
//!
//! ## Usage
//!
//! ```bash
//! # List paired devices (the saved printer comes first)
//! struk devices
//!
//! # Connect once and remember the printer
//! struk connect 00:11:22:33:44:55 --name RPP02N --save
//!
//! # Check the printer responds
//! struk test-print
//!
//! # Show a receipt on screen, then print it on 80mm paper
//! struk preview sale.json
//! struk --paper 80 print sale.json
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `struk=info`).

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use struk::{
    ConnectionConfig, PaperProfile, PrintResult, PrinterManager, Receipt, ReceiptRenderer,
    RfcommAdapter,
    store::{self, JsonFileStore},
    transport::SystemClock,
};

/// Struk - Bluetooth receipt printer utility
#[derive(Parser, Debug)]
#[command(name = "struk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file holding the saved printer and receipt design
    #[arg(long, global = true, default_value = "struk.json")]
    store: PathBuf,

    /// Connection tuning as JSON (retry delays, chunking, staleness)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Paper width in mm, overriding the stored design (58 or 80)
    #[arg(long, global = true, value_parser = parse_paper)]
    paper: Option<PaperProfile>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List paired Bluetooth devices
    Devices,

    /// Connect to a printer
    Connect {
        /// Printer MAC address (XX:XX:XX:XX:XX:XX)
        address: String,

        /// Display name to save with the printer
        #[arg(long)]
        name: Option<String>,

        /// Remember the printer for later prints
        #[arg(long)]
        save: bool,
    },

    /// Forget the saved printer
    Forget,

    /// Print a short test page on the saved printer
    TestPrint,

    /// Show a receipt as text without printing
    Preview {
        /// Receipt JSON file
        receipt: PathBuf,
    },

    /// Print a receipt on the saved printer
    Print {
        /// Receipt JSON file
        receipt: PathBuf,
    },
}

fn parse_paper(s: &str) -> Result<PaperProfile, String> {
    s.trim_end_matches("mm")
        .parse::<u16>()
        .ok()
        .and_then(PaperProfile::by_width_mm)
        .ok_or_else(|| format!("unsupported paper width '{}' (use 58 or 80)", s))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "struk=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> PrintResult<()> {
    let cli = Cli::parse();

    let settings = JsonFileStore::open(&cli.store)?;
    let mut design = store::load_design(&settings)?;
    if let Some(paper) = cli.paper {
        design.paper_width = paper.columns;
    }
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ConnectionConfig::default(),
    };
    let renderer = ReceiptRenderer::new();

    let open_printer =
        move || PrinterManager::with_clock(RfcommAdapter::default(), settings, SystemClock, config);

    match cli.command {
        Commands::Devices => {
            let printer = open_printer()?;
            let devices = printer.list_devices()?;
            if devices.is_empty() {
                println!("No paired devices. Pair the printer with bluetoothctl first.");
            }
            for device in devices {
                let marker = if device.is_saved { " (saved)" } else { "" };
                println!("{}  {}{}", device.address, device.name, marker);
            }
        }
        Commands::Connect {
            address,
            name,
            save,
        } => {
            let mut printer = open_printer()?;
            printer.connect(&address)?;
            let name = name
                .or_else(|| printer.connected_device().map(|d| d.name.clone()))
                .unwrap_or_else(|| address.clone());
            println!("Connected to {} ({})", name, address);
            if save {
                printer.save_printer(&address, &name)?;
                println!("Saved as default printer");
            }
        }
        Commands::Forget => {
            let mut printer = open_printer()?;
            printer.clear_saved_printer()?;
            println!("Saved printer forgotten");
        }
        Commands::TestPrint => {
            let mut printer = open_printer()?;
            renderer.print_test_page(&mut printer, design.paper_width)?;
            println!("Printed successfully!");
        }
        Commands::Preview { receipt } => {
            let receipt = load_receipt(&receipt)?;
            println!("{}", renderer.render_preview(&receipt, &design));
        }
        Commands::Print { receipt } => {
            let receipt = load_receipt(&receipt)?;
            let mut printer = open_printer()?;
            renderer.print(&mut printer, &receipt, &design)?;
            println!("Printed successfully!");
        }
    }

    Ok(())
}

fn load_receipt(path: &Path) -> PrintResult<Receipt> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

fn load_config(path: &Path) -> PrintResult<ConnectionConfig> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
