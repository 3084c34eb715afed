//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "floodgate-cli")]
#[command(version)]
#[command(about = "Inspect Pay2 webhooks and anti-flood counters", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Verify and decrypt a Pay2-House-Signature value
    Decrypt(DecryptArgs),

    /// Build a Pay2-House-Signature value for a JSON payload
    Seal(SealArgs),

    /// Inspect or clear anti-flood counters in Redis
    Antiflood {
        #[command(subcommand)]
        command: AntifloodCommand,
    },
}

#[derive(Args, Debug)]
pub struct SecretArgs {
    /// Shared secret (defaults to the configured Pay2 API key)
    #[arg(long, env = "FLOODGATE_PAY2_SECRET", hide_env_values = true)]
    pub secret: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecryptArgs {
    /// Base64 envelope from the Pay2-House-Signature header
    #[arg(long)]
    pub signature: String,

    /// Request body to cross-check against the signed notification
    #[arg(long)]
    pub payload: Option<String>,

    #[command(flatten)]
    pub secret: SecretArgs,
}

#[derive(Args, Debug)]
pub struct SealArgs {
    /// JSON notification to encrypt and sign
    #[arg(long)]
    pub payload: String,

    #[command(flatten)]
    pub secret: SecretArgs,
}

#[derive(Subcommand, Debug)]
pub enum AntifloodCommand {
    /// Show the current bucket for an actor and action
    Status(BucketArgs),

    /// Delete the current bucket for an actor and action
    Reset(BucketArgs),
}

#[derive(Args, Debug)]
pub struct BucketArgs {
    /// User id or IP address the attempts are counted against
    #[arg(long)]
    pub actor: String,

    /// Action name
    #[arg(long, default_value = "default")]
    pub action: String,

    /// Limit used to compute remaining attempts (defaults to the configured limit)
    #[arg(long)]
    pub limit: Option<u32>,

    /// Redis connection URL (defaults to the configured store URL)
    #[arg(long)]
    pub redis_url: Option<String>,
}
