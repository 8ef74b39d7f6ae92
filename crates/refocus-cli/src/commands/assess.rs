use refocus_core::compute_report;

pub fn run(answers: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    let report = compute_report(answers)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
