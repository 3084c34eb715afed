pub mod antiflood;
pub mod decrypt;
pub mod seal;

use anyhow::{Context, Result};
use floodgate::Pay2Config;
use floodgate::webhooks::Pay2Verifier;

use crate::cli::SecretArgs;

/// Verifier for the `--secret` flag, or the configured Pay2 key
pub(crate) fn verifier(args: SecretArgs) -> Result<Pay2Verifier> {
    if let Some(secret) = args.secret {
        return Ok(Pay2Verifier::new(secret));
    }

    let config = Pay2Config::from_env();
    let secret = config.active_secret().cloned().with_context(|| {
        if config.test_mode {
            "No secret given and FLOODGATE_PAY2_TEST_API_KEY is not set"
        } else {
            "No secret given and FLOODGATE_PAY2_API_KEY is not set"
        }
    })?;
    Ok(Pay2Verifier::new(secret))
}
