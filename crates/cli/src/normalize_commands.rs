use std::{
    io::Read,
    path::{Path, PathBuf},
};

use {
    anyhow::{Context, Result},
    clap::Args,
    courier_auto_reply::{
        NormalizeReplyOptions, Normalized, ResponsePrefixContext, normalize_reply_payload,
    },
    courier_common::types::ReplyPayload,
    courier_config::CourierConfig,
    serde_json::json,
    tracing::info,
};

/// Exit status when the reply is suppressed.
const SKIPPED_EXIT_CODE: i32 = 3;

#[derive(Args, Debug, Default)]
pub struct NormalizeArgs {
    /// Payload JSON file (reads stdin when omitted or `-`).
    #[arg(long)]
    pub input: Option<PathBuf>,
    /// Config file (defaults to the discovered one).
    #[arg(long, env = "COURIER_CONFIG")]
    pub config: Option<PathBuf>,
    /// Response prefix, overriding `messages.response_prefix`.
    #[arg(long)]
    pub prefix: Option<String>,
    /// Leave `HEARTBEAT_OK` in the text.
    #[arg(long)]
    pub no_strip_heartbeat: bool,
    /// Model id for `{model}` / `{modelFull}` in the prefix template.
    #[arg(long)]
    pub model: Option<String>,
    /// Provider for `{provider}` in the prefix template.
    #[arg(long)]
    pub provider: Option<String>,
    /// Thinking level for `{thinkingLevel}` in the prefix template.
    #[arg(long)]
    pub thinking_level: Option<String>,
}

pub fn handle_normalize(args: NormalizeArgs) -> Result<()> {
    let config = crate::load_config(args.config.as_deref())?;
    let raw = read_input(args.input.as_deref())?;

    let (output, skipped) = run(&raw, &config, &args)?;
    println!("{output}");

    if skipped {
        std::process::exit(SKIPPED_EXIT_CODE);
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read payload from stdin")?;
            Ok(raw)
        },
    }
}

/// Normalize `raw` and render the JSON to print. The flag is true when the
/// reply was suppressed.
fn run(raw: &str, config: &CourierConfig, args: &NormalizeArgs) -> Result<(String, bool)> {
    let payload = ReplyPayload::from_json(raw)?;

    let context = ResponsePrefixContext {
        model: args.model.clone(),
        provider: args.provider.clone(),
        thinking_level: args.thinking_level.clone(),
        ..ResponsePrefixContext::from_identity(&config.identity)
    };
    let mut options = NormalizeReplyOptions::from_config(&config.messages).with_prefix_context(&context);
    if let Some(ref prefix) = args.prefix {
        options.response_prefix = Some(prefix.as_str());
    }
    if args.no_strip_heartbeat {
        options.strip_heartbeat = Some(false);
    }

    match normalize_reply_payload(payload, &options) {
        Normalized::Send(payload) => Ok((serde_json::to_string_pretty(&payload)?, false)),
        Normalized::Suppressed(reason) => {
            info!(%reason, "reply suppressed");
            Ok((json!({ "skipped": reason }).to_string(), true))
        },
    }
}
