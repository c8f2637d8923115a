// ==============================================================================
// demos/inspect_vcf.rs - Installed Database Inspection
// ==============================================================================
// Description: Prints header metadata and checksums for a bgzipped VCF
// Author: Matt Barham
// Created: 2026-10-15
// ==============================================================================
// Usage:
//   cargo run --example inspect_vcf -- ~/.glade/databases/clinvar/GRCh38/clinvar.vcf.gz
// ==============================================================================

use glade::checksum::{calculate_md5, calculate_sha256};
use glade::validator::VcfValidator;
use std::env;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <vcf.gz>", args[0]);
        eprintln!("\nExample:");
        eprintln!(
            "  cargo run --example inspect_vcf -- ~/.glade/databases/clinvar/GRCh38/clinvar.vcf.gz"
        );
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);

    println!("{}", "=".repeat(80));
    println!("VCF Inspection");
    println!("{}", "=".repeat(80));
    println!("File: {}", path.display());
    println!();

    let header = VcfValidator::new().inspect(path)?;
    println!("Header:");
    println!("  - Format:    {}", header.file_format);
    println!("  - File date: {}", header.file_date.as_deref().unwrap_or("-"));
    println!("  - Reference: {}", header.reference.as_deref().unwrap_or("-"));
    println!("  - Source:    {}", header.source.as_deref().unwrap_or("-"));
    println!("  - Samples:   {}", header.sample_count);
    println!();

    println!("Checksums:");
    println!("  - MD5:     {}", calculate_md5(path)?);
    println!("  - SHA-256: {}", calculate_sha256(path)?);

    Ok(())
}
