//! Antiflood commands - inspect or clear a bucket in the shared store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use floodgate::{Actor, AntiFlood, AntiFloodConfig, RedisCounterStore, StoreConfig};

use crate::cli::BucketArgs;
use crate::{print_info, print_success, print_warning};

fn limiter(args: &BucketArgs) -> Result<(AntiFlood<RedisCounterStore>, Actor)> {
    let url = args
        .redis_url
        .clone()
        .or_else(|| StoreConfig::from_env().redis_url)
        .context("No --redis-url given and FLOODGATE_STORE_REDIS_URL is not set")?;

    let store = RedisCounterStore::new(&url)?;
    let limiter = AntiFlood::new(store, AntiFloodConfig::from_env());
    Ok((limiter, Actor::user(args.actor.trim())))
}

pub async fn status(args: BucketArgs) -> Result<()> {
    let (limiter, actor) = limiter(&args)?;

    let key = limiter.bucket_key(&actor, &args.action, Utc::now())?;
    print_info(&format!("Bucket: {}", key.bold()));

    match limiter.get_record(&actor, &args.action).await? {
        Some(count) => println!("  attempts:  {}", count),
        None => println!("  attempts:  {}", "none".dimmed()),
    }

    let remaining = limiter
        .remaining_attempts(&actor, &args.action, args.limit)
        .await?;
    println!("  remaining: {}", remaining);

    match limiter.get_timestamp(&actor, &args.action).await? {
        Some(ts) => println!("  window opened: {}", format_timestamp(ts)),
        None => println!("  window opened: {}", "no active window".dimmed()),
    }

    Ok(())
}

pub async fn reset(args: BucketArgs) -> Result<()> {
    let (limiter, actor) = limiter(&args)?;

    if limiter.delete_record(&actor, &args.action).await? {
        print_success(&format!("Cleared '{}' for {}", args.action, actor));
    } else {
        print_warning(&format!("No counter for '{}' and {} in the current minute", args.action, actor));
    }

    Ok(())
}

fn format_timestamp(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}
