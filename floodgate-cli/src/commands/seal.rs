//! Seal command - produce a signature envelope the way the gateway does.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::cli::SealArgs;
use crate::print_warning;

pub fn run(args: SealArgs) -> Result<()> {
    // Reject typos early; the gateway only ever signs JSON
    let _: Value = serde_json::from_str(&args.payload).context("--payload is not valid JSON")?;

    if args.secret.secret.is_none() {
        print_warning("Using the configured Pay2 key");
    }

    let verifier = super::verifier(args.secret)?;
    println!("{}", verifier.seal(args.payload.as_bytes()));

    Ok(())
}
