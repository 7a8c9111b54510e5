use chipvm::instruction::Instruction;
use chipvm::memory::PROGRAM_ORIGIN;
use clap::Parser;
use log::{error, info};
use std::{fs, io::Write, path::PathBuf};

#[derive(Parser)]
#[command(author, version, about = "Disassembles a program image", long_about = None)]
struct Cli {
    /// The path to the program image
    path: PathBuf,

    /// Where to output the disassembled program
    #[arg(short, long)]
    output_file: Option<PathBuf>,
}

/// One listing line: address, raw word and mnemonic.
fn line(address: usize, word: u16) -> String {
    match Instruction::try_from(word) {
        Ok(inst) => format!("{address:03X}: {word:04X}  {inst}"),
        Err(_) => format!("{address:03X}: {word:04X}  ???"),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var("RUST_LOG", "info");
    env_logger::init();

    let cli = Cli::parse();

    if let Some(mut f) = cli.output_file.clone() {
        if f.extension().is_none() {
            error!("{} is not a file", f.display());
            std::process::exit(1);
        }
        f.pop();
        if !f.as_os_str().is_empty() {
            fs::create_dir_all(f)?;
        }
    }

    let path = cli.output_file.unwrap_or(PathBuf::from("output.txt"));
    let mut file = fs::File::create(&path)?;
    let program = chipvm::read_program(&cli.path)?;

    writeln!(file, "== {} ==", cli.path.display())?;
    for (n, chunk) in program.chunks(2).enumerate() {
        let address = PROGRAM_ORIGIN as usize + n * 2;
        // A trailing odd byte is padded as the machine would see it.
        let word = u16::from_be_bytes([chunk[0], chunk.get(1).copied().unwrap_or(0)]);
        writeln!(file, "{}", line(address, word))?;
    }

    file.flush()?;

    info!("Wrote disassembled program to {}", path.display());

    Ok(())
}
