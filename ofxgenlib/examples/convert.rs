use ofxgenlib::{config::ConverterConfig, convert::convert};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Пример: выгрузка Fidelity -> OFX (stdin -> stdout), номер счёта — первым аргументом
    let account_id = std::env::args().nth(1).unwrap_or_else(|| "0".into());
    convert(
        std::io::BufReader::new(std::io::stdin()),
        std::io::stdout(),
        &account_id,
        &ConverterConfig::default(),
    )?;
    Ok(())
}
