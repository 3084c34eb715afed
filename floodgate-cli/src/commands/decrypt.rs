//! Decrypt command - verify a signature envelope and show what it carries.

use anyhow::{Context, Result, bail};
use colored::Colorize;
use floodgate::Pay2Notification;
use floodgate::webhooks::cross_check;
use serde_json::Value;

use crate::cli::DecryptArgs;
use crate::{print_error, print_info, print_success};

pub fn run(args: DecryptArgs) -> Result<()> {
    println!("\n{} Verifying Pay2 signature...\n", "floodgate".cyan().bold());

    let preview: String = args.signature.chars().take(50).collect();
    print_info(&format!("Signature: {}...", preview));

    let verifier = super::verifier(args.secret)?;
    let plaintext = match verifier.verify_and_decrypt_str(&args.signature) {
        Ok(plaintext) => plaintext,
        Err(failure) => {
            print_error(&failure.to_string());
            bail!("signature rejected");
        }
    };
    print_success("Signature valid, payload decrypted");
    println!("\n{}", plaintext);

    let fields: Value = match serde_json::from_str(&plaintext) {
        Ok(fields) => fields,
        Err(e) => {
            print_error(&format!("Decrypted payload is not JSON: {}", e));
            return Ok(());
        }
    };

    if let Value::Object(map) = &fields {
        println!("\n{}", "Fields:".yellow());
        for (key, value) in map {
            println!("  {}: {}", key, display_value(value));
        }
    }

    if let Some(payload) = args.payload {
        println!();
        let signed: Pay2Notification =
            serde_json::from_value(fields).context("Decrypted payload is not a notification")?;
        let body: Pay2Notification =
            serde_json::from_str(&payload).context("--payload is not a JSON notification")?;

        match cross_check(&signed, &body) {
            Ok(()) => print_success("Payload matches the signed notification"),
            Err(mismatch) => {
                print_error(&mismatch.to_string());
                bail!("payload does not match");
            }
        }
    }

    Ok(())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
