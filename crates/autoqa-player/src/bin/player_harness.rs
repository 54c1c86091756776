use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use autoqa_core::Config;
use autoqa_heal::{LlmChatClient, LlmConfig};
use autoqa_model::{ObjectRepository, RecordedSession};
use autoqa_player::{CdpDriver, PlaybackPolicy, PlayerEngine};

#[derive(Debug, Clone)]
struct HarnessCli {
    session: PathBuf,
    config: Option<PathBuf>,
    ws_url: String,
    object_repository: Option<PathBuf>,
    summary_json_out: Option<PathBuf>,
    cdp_connect_timeout_sec: u64,
    cdp_connect_attempts: u32,
}

impl HarnessCli {
    fn parse() -> Result<Self> {
        let mut session: Option<PathBuf> = None;
        let mut config: Option<PathBuf> = None;
        let mut ws_url: Option<String> = None;
        let mut object_repository: Option<PathBuf> = None;
        let mut summary_json_out: Option<PathBuf> = None;
        let mut cdp_connect_timeout_sec: u64 = 10;
        let mut cdp_connect_attempts: u32 = 3;

        let mut args = std::env::args().skip(1);
        while let Some(flag) = args.next() {
            match flag.as_str() {
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                "--session" => session = Some(PathBuf::from(require_arg_value(&mut args, &flag)?)),
                "--config" => config = Some(PathBuf::from(require_arg_value(&mut args, &flag)?)),
                "--ws-url" => ws_url = Some(require_arg_value(&mut args, &flag)?),
                "--object-repository" => {
                    object_repository = Some(PathBuf::from(require_arg_value(&mut args, &flag)?));
                }
                "--summary-json-out" => {
                    summary_json_out = Some(PathBuf::from(require_arg_value(&mut args, &flag)?));
                }
                "--cdp-connect-timeout-sec" => {
                    cdp_connect_timeout_sec = parse_positive_u64(&require_arg_value(&mut args, &flag)?, &flag)?;
                }
                "--cdp-connect-attempts" => {
                    cdp_connect_attempts =
                        parse_positive_u64(&require_arg_value(&mut args, &flag)?, &flag)? as u32;
                }
                other => bail!("unknown argument '{other}'"),
            }
        }

        let session = session.context("--session is required")?;
        let ws_url = ws_url.context("--ws-url is required")?;
        if ws_url.trim().is_empty() {
            bail!("--ws-url cannot be empty");
        }

        Ok(Self {
            session,
            config,
            ws_url,
            object_repository,
            summary_json_out,
            cdp_connect_timeout_sec,
            cdp_connect_attempts,
        })
    }
}

fn require_arg_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next().with_context(|| format!("missing value for {flag}"))
}

fn parse_positive_u64(raw: &str, flag: &str) -> Result<u64> {
    let parsed = raw
        .parse::<u64>()
        .with_context(|| format!("invalid numeric value for {flag}: '{raw}'"))?;
    if parsed == 0 {
        bail!("{flag} must be greater than 0");
    }
    Ok(parsed)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

fn write_summary_json(path: &Path, result: &autoqa_player::PlaybackResult) -> Result<()> {
    ensure_parent_dir(path)?;
    let rendered = serde_json::json!({
        "success": result.success,
        "stepsCompleted": result.steps_completed,
        "totalSteps": result.total_steps,
        "failureReason": result.failure_reason,
    });
    std::fs::write(path, serde_json::to_string_pretty(&rendered)?)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn print_usage() {
    println!(
        "Usage: player_harness \
--session <path> \
--ws-url <ws://host:port/devtools/page/id> \
[--config <path>] \
[--object-repository <path>] \
[--summary-json-out <path>] \
[--cdp-connect-timeout-sec <n>] \
[--cdp-connect-attempts <n>]"
    );
}

async fn run() -> Result<()> {
    let cli = HarnessCli::parse()?;
    if !cli.session.is_file() {
        bail!("session '{}' must point to an existing file", cli.session.display());
    }

    let session = RecordedSession::load_from_file(&cli.session)
        .with_context(|| format!("failed to load session '{}'", cli.session.display()))?;
    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => Config::default(),
    }
    .apply_env_overrides(&std::env::vars().collect());

    let policy = PlaybackPolicy::from(&config);
    std::fs::create_dir_all(&policy.evidence_dir)
        .with_context(|| format!("failed to create evidence dir {}", policy.evidence_dir.display()))?;

    let driver = Arc::new(
        CdpDriver::connect(
            &cli.ws_url,
            Duration::from_secs(cli.cdp_connect_timeout_sec),
            cli.cdp_connect_attempts,
            Duration::from_millis(500),
        )
        .await
        .with_context(|| format!("failed to connect to debug endpoint '{}'", cli.ws_url))?,
    );

    let mut engine = PlayerEngine::new(driver, policy.clone(), session.session_id.clone());

    if let Some(path) = &cli.object_repository {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read object repository '{}'", path.display()))?;
        let repository: ObjectRepository =
            serde_json::from_str(&raw).with_context(|| format!("failed to parse object repository '{}'", path.display()))?;
        engine = engine.with_object_repository(repository);
    }

    if policy.healing_enabled {
        if let Some(base_url) = &config.ai_llm_base_url {
            let llm_config = LlmConfig {
                base_url: base_url.clone(),
                api_key: std::env::var("AUTOQA_AI_LLM_API_KEY").ok(),
                model: config.ai_llm_model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string()),
                temperature: config.ai_llm_temperature.unwrap_or(0.0),
                max_tokens: config.ai_llm_max_tokens.unwrap_or(256),
                timeout_sec: config.ai_llm_timeout_sec,
                retry_count: config.ai_llm_retry_count,
                retry_delay_ms: config.ai_llm_retry_delay_ms,
            };
            let chat_client = LlmChatClient::new(llm_config).context("failed to initialize llm chat client")?;
            engine = engine.with_healing(Arc::new(chat_client));
        } else {
            tracing::warn!("player.healing.enabled is true but ai.llm.base.url is unset, healing stays disabled");
        }
    }

    let result = engine.run(&session).await;

    let summary_json_out = cli
        .summary_json_out
        .unwrap_or_else(|| policy.evidence_dir.join("player-summary.json"));
    write_summary_json(&summary_json_out, &result)?;

    println!(
        "player harness summary: success={} steps_completed={} total_steps={} failure_reason={}",
        result.success,
        result.steps_completed,
        result.total_steps,
        result.failure_reason.as_deref().unwrap_or("none"),
    );
    println!("summary_json={}", summary_json_out.display());

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("player harness failed: {error:#}");
        std::process::exit(1);
    }
}
