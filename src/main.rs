//!
//! authscript binary
//! -----------------
//! Runs a Lua authentication script against a session described by a JSON fixture.
//! The chosen user is bound as the global `user`, the step number as `step`, and the
//! script's return value is printed as JSON.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tracing::info;

use authscript::config::{BridgeConfig, EngineKind};
use authscript::fixture::SessionFixture;
use authscript::{logging, new_engine, ScriptObject};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} --session <fixture.json> --script <file.lua> [--step N] [--idp NAME] [--engine userdata|proxy]\n\nFlags:\n  --session <path>     JSON session fixture (step users, roles, claims)\n  --script <path>      Lua script to evaluate; its return value is printed as JSON\n  --step <N>           Authentication step to bind (default: the session's current step)\n  --idp <name>         Bind the user authenticated by this IdP at the step (LOCAL for the local store);\n                       if omitted, the aggregate subject is bound\n  --engine <kind>      Engine binding (overrides AUTHSCRIPT_ENGINE)\n  -h, --help           Show this help\n\nEnvironment:\n  AUTHSCRIPT_ENGINE            userdata | proxy (default userdata)\n  AUTHSCRIPT_READONLY_WRITES   reject | fallthrough (default reject)\n  AUTHSCRIPT_LOG               tracing filter when RUST_LOG is unset (default info)"
    );
}

struct Args {
    session: PathBuf,
    script: PathBuf,
    step: Option<u32>,
    idp: Option<String>,
    engine: Option<EngineKind>,
}

fn parse_args(program: &str, mut it: impl Iterator<Item = String>) -> Result<Option<Args>> {
    let mut session = None;
    let mut script = None;
    let mut step = None;
    let mut idp = None;
    let mut engine = None;
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| it.next().ok_or_else(|| anyhow!("missing value for {flag}"));
        match arg.as_str() {
            "--session" => session = Some(PathBuf::from(value("--session")?)),
            "--script" => script = Some(PathBuf::from(value("--script")?)),
            "--step" => step = Some(value("--step")?.parse::<u32>().context("--step expects a positive integer")?),
            "--idp" => idp = Some(value("--idp")?),
            "--engine" => engine = Some(value("--engine")?.parse::<EngineKind>()?),
            "-h" | "--help" => {
                print_usage(program);
                return Ok(None);
            }
            other => return Err(anyhow!("unknown argument: {other}")),
        }
    }
    let session = session.ok_or_else(|| anyhow!("--session is required"))?;
    let script = script.ok_or_else(|| anyhow!("--script is required"))?;
    Ok(Some(Args { session, script, step, idp, engine }))
}

fn main() -> Result<()> {
    let mut argv = env::args();
    let program = argv.next().unwrap_or_else(|| "authscript".to_string());
    let args = match parse_args(&program, argv) {
        Ok(Some(a)) => a,
        Ok(None) => return Ok(()),
        Err(e) => {
            print_usage(&program);
            return Err(e);
        }
    };

    let cfg = BridgeConfig::from_env()?;
    logging::init(&cfg.log_filter);
    let kind = args.engine.unwrap_or(cfg.engine);

    let fixture = SessionFixture::from_path(&args.session)
        .with_context(|| format!("loading session fixture {}", args.session.display()))?;
    let session = fixture.build().context("building session")?;
    let step = args.step.unwrap_or_else(|| session.context.current_step());
    let user = session
        .wrapper(step, args.idp.as_deref(), cfg.readonly_writes)
        .ok_or_else(|| match &args.idp {
            Some(idp) => anyhow!("no user authenticated by '{idp}' at step {step}"),
            None => anyhow!("session has no subject"),
        })?;
    info!(target: "authscript", "running {} with engine={}, step={}, user={}", args.script.display(), kind, step, user.describe());

    let source = fs::read_to_string(&args.script).with_context(|| format!("reading script {}", args.script.display()))?;
    let engine = new_engine(kind)?;
    engine.bind_user("user", user)?;
    engine.bind_value("step", &serde_json::json!(step))?;
    let out = engine.eval(&source).context("script evaluation failed")?;
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
