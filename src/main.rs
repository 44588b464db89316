// ==========================================
// School Closure - command line entry
// ==========================================
// Usage:
//   school-closure [db_path] <command> [args]
//
// Commands:
//   status   <period_id>
//   validate <period_id>
//   preview  <period_id>
//   execute  <period_id> <initiated_by>
//   outcomes <period_id> [status]
//   pending  <period_id>
//   resolve  <pending_subject_id> <aprobada|convalidada>
//   closure  <closure_id>
//   config
//
// Output is JSON on stdout; errors are JSON on stderr.
// ==========================================

use anyhow::{anyhow, Context};
use serde::Serialize;
use serde_json::json;

use school_closure::app::{get_default_db_path, AppState};
use school_closure::{logging, ApiError, ApiResult};

const COMMANDS: &[&str] = &[
    "status", "validate", "preview", "execute", "outcomes", "pending", "resolve", "closure", "config",
];

const USAGE: &str = "usage: school-closure [db_path] <status|validate|preview|execute|outcomes|pending|resolve|closure|config> [args]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let db_path = match args.first() {
        Some(first) if !COMMANDS.contains(&first.as_str()) => args.remove(0),
        _ => get_default_db_path(),
    };
    if args.is_empty() {
        return Err(anyhow!(USAGE));
    }

    tracing::info!(version = school_closure::VERSION, db_path = %db_path, "{}", school_closure::APP_NAME);
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    let command = args.remove(0);
    let exit_code = match run(&state, &command, &args).await? {
        Ok(success) => {
            if success {
                0
            } else {
                2
            }
        }
        Err(err) => {
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "error": err.to_string(),
                    "status": err.status_code(),
                }))?
            );
            1
        }
    };

    std::process::exit(exit_code);
}

/// Run one command; the inner result is the API outcome, the outer one
/// covers argument and output failures.
async fn run(state: &AppState, command: &str, args: &[String]) -> anyhow::Result<ApiResult<bool>> {
    let api = &state.closure_api;

    let outcome = match command {
        "status" => print(api.status(int_arg(args, 0, "period_id")?)),
        "validate" => api
            .validate(int_arg(args, 0, "period_id")?)
            .and_then(|report| {
                let valid = report.valid;
                print(Ok(report)).map(|_| valid)
            }),
        "preview" => print(api.preview(int_arg(args, 0, "period_id")?).await),
        "execute" => {
            let period_id = int_arg(args, 0, "period_id")?;
            let initiated_by = str_arg(args, 1, "initiated_by")?;
            api.execute(period_id, initiated_by).await.and_then(|report| {
                let success = report.success;
                print(Ok(report)).map(|_| success)
            })
        }
        "outcomes" => {
            let period_id = int_arg(args, 0, "period_id")?;
            print(api.list_outcomes(period_id, args.get(1).map(String::as_str)))
        }
        "pending" => print(api.list_pending_subjects(int_arg(args, 0, "period_id")?)),
        "resolve" => {
            let id = int_arg(args, 0, "pending_subject_id")?;
            let status = str_arg(args, 1, "status")?;
            print(api.resolve_pending_subject(id, status))
        }
        "closure" => print(api.get_closure(str_arg(args, 0, "closure_id")?)),
        "config" => print(
            state
                .config_manager
                .get_config_snapshot()
                .map_err(|e| ApiError::ConfigError(e.to_string())),
        ),
        other => return Err(anyhow!("unknown command {}\n{}", other, USAGE)),
    };
    Ok(outcome)
}

fn print<T: Serialize>(result: ApiResult<T>) -> ApiResult<bool> {
    let value = result?;
    let text = serde_json::to_string_pretty(&value).map_err(|e| ApiError::InternalError(e.to_string()))?;
    println!("{}", text);
    Ok(true)
}

fn str_arg<'a>(args: &'a [String], idx: usize, name: &str) -> anyhow::Result<&'a str> {
    args.get(idx)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing argument <{}>\n{}", name, USAGE))
}

fn int_arg(args: &[String], idx: usize, name: &str) -> anyhow::Result<i64> {
    let raw = str_arg(args, idx, name)?;
    raw.parse::<i64>()
        .with_context(|| format!("<{}> must be an integer, got {}", name, raw))
}
