use lifecycle_core::{BatchRequestDto, LifecycleConfig};
use std::env;
use std::process::ExitCode;

const USAGE: &str = "usage: lifecycle_admin <finalize|unfinalize|delete|disable|enable> [--kind <interview|account>] [--db <path>] <id>...";

struct Args {
    db_path: Option<String>,
    request: BatchRequestDto,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args, String> {
    let action = raw.next().ok_or_else(|| USAGE.to_string())?;
    let mut kind = None;
    let mut db_path = None;
    let mut target_ids = Vec::new();

    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--kind" => kind = Some(raw.next().ok_or("--kind needs a value")?),
            "--db" => db_path = Some(raw.next().ok_or("--db needs a value")?),
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ => target_ids.push(arg),
        }
    }

    Ok(Args {
        db_path,
        request: BatchRequestDto {
            action,
            kind,
            target_ids,
        },
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = env_logger::try_init();

    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::from(64);
        }
    };

    let mut config = LifecycleConfig::from_env();
    if let Some(path) = &args.db_path {
        config = config.with_db_path(path);
    }
    log::info!("Using database {}", config.db_path);

    if let Err(e) = lifecycle_core::initialize_with_config(config).await {
        eprintln!("initialization failed: {}", e);
        return ExitCode::FAILURE;
    }

    let service = match lifecycle_core::get_lifecycle_service() {
        Ok(service) => service,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = match service.run_batch(args.request).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("batch rejected: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("could not serialize report: {}", e);
            return ExitCode::FAILURE;
        }
    }
    eprintln!("{}", report.summary());

    // Partial failure is a distinct status so scripts can resubmit the failed ids
    if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}
