use anyhow::{Context, Result};
use dcpuasm::assemble_with_debug;
use log::info;
use std::{env, fs};

fn main() -> Result<()> {
    env_logger::init();

    let filename: String = env::args()
        .nth(1)
        .ok_or_else(|| anyhow::Error::msg("Need an input filename"))?;
    let output_name: Option<String> = env::args().nth(2);

    let program_text =
        fs::read_to_string(&filename).with_context(|| format!("reading {}", filename))?;

    let (program, debug) = assemble_with_debug(&filename, &program_text)?;

    match output_name {
        Some(output_name) => {
            fs::write(format!("{}.lst", output_name), program.to_string())?;
            fs::write(format!("{}.bin", output_name), program.to_be_bytes())?;
            fs::write(format!("{}.sdb", output_name), debug.to_json()?)?;
            info!(
                "{}: wrote {} words to {}.bin",
                filename,
                program.len_bytes() / 2,
                output_name
            );
        }
        None => print!("{}", program),
    }

    Ok(())
}
