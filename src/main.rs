//! Wire-protocol binary: one JSON request on stdin, one JSON response on
//! stdout, exit code zero on success. Diagnostics go to stderr, gated by the
//! `CADENCE_VERBOSITY` environment variable.

use std::collections::HashMap;
use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use cadence_engine::models::ScheduleTemplate;
use cadence_engine::{log_decisions, solve, validate, EngineConfig};

#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
enum Request {
    Solve {
        template: ScheduleTemplate,
        /// Resource-name to quantity overrides for this solve.
        #[serde(default)]
        inventory: Option<HashMap<String, u32>>,
    },
    Validate {
        template: ScheduleTemplate,
    },
}

#[derive(Debug, Serialize)]
struct OkResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ErrResponse {
    ok: bool,
    error: String,
}

fn write_ok<T: Serialize>(data: T) {
    let response = OkResponse { ok: true, data };
    let json = serde_json::to_string(&response).unwrap_or_else(|e| {
        format!("{{\"ok\":false,\"error\":\"serialization error: {e}\"}}")
    });
    println!("{json}");
    let _ = io::stdout().flush();
}

fn write_err(message: impl std::fmt::Display) -> ! {
    let response = ErrResponse {
        ok: false,
        error: message.to_string(),
    };
    let json = serde_json::to_string(&response)
        .unwrap_or_else(|_| "{\"ok\":false,\"error\":\"double serialization error\"}".to_string());
    println!("{json}");
    let _ = io::stdout().flush();
    std::process::exit(1);
}

fn main() {
    let config = EngineConfig::from_env();

    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        write_err(format!("Failed to read stdin: {e}"));
    }

    let request: Request = match serde_json::from_str(&input) {
        Ok(request) => request,
        Err(e) => write_err(format!("Invalid JSON input: {e}")),
    };

    match request {
        Request::Solve {
            template,
            inventory,
        } => {
            log_decisions!(
                config.verbosity,
                "solve '{}': {} steps, {} resources",
                template.id,
                template.steps.len(),
                template.resources.len()
            );
            match solve(&template, inventory.as_ref(), &config) {
                Ok(solved) => write_ok(solved),
                Err(e) => write_err(e),
            }
        }
        Request::Validate { template } => {
            log_decisions!(config.verbosity, "validate '{}'", template.id);
            write_ok(validate(&template));
        }
    }
}
