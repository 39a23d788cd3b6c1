//! Purpose: Hold top-level CLI command dispatch for `fabric`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Only `completion` runs without a connection.
//! Invariants: `request` prints non-2xx responses as data and still exits 0.

use super::*;
use fabric_client::api::{LogicalRequest, Method};

pub(super) fn dispatch_command(command: Command, connect: &ConnectArgs) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "fabric", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Whoami => {
            let client = connect.client()?;
            let conn = client.connection()?;
            emit_json(json!({
                "tenant": conn.tenant(),
                "fabric": conn.fabric(),
                "scheme": conn.identity().authorization().scheme().as_str(),
                "url_prefix": conn.url_prefix(),
            }));
            Ok(RunOutcome::ok())
        }
        Command::Fabrics => {
            let client = connect.client()?;
            let fabrics = client.fabrics()?.list()?;
            emit_json(json!({ "fabrics": fabrics }));
            Ok(RunOutcome::ok())
        }
        Command::Collections { include_system } => {
            let client = connect.client()?;
            let collections = client.collections()?.list(!include_system)?;
            emit_json(json!({ "collections": collections }));
            Ok(RunOutcome::ok())
        }
        Command::Query {
            query,
            bind,
            batch_size,
        } => {
            let bind_vars = match bind.as_deref() {
                Some(raw) => match parse_json_arg("--bind", raw)? {
                    Value::Object(map) => map,
                    _ => {
                        return Err(Error::new(ErrorKind::Usage)
                            .with_message("--bind must be a JSON object"));
                    }
                },
                None => Map::new(),
            };
            let client = connect.client()?;
            let mut runner = client.query()?;
            if let Some(batch_size) = batch_size {
                runner = runner.with_batch_size(batch_size);
            }
            let rows = runner.execute(&query, &bind_vars)?;
            emit_json(json!({ "rows": rows }));
            Ok(RunOutcome::ok())
        }
        Command::Request {
            method,
            path,
            data,
            params,
        } => {
            let mut request = LogicalRequest::new(Method::parse(&method)?, path);
            for raw in &params {
                let (key, value) = parse_param(raw)?;
                request = request.with_param(key, value);
            }
            if let Some(raw) = data.as_deref() {
                request = request.with_json(&parse_json_arg("--data", raw)?)?;
            }
            let client = connect.client()?;
            let response = client.connection()?.send(&request)?;
            let body = serde_json::from_str::<Value>(&response.body)
                .unwrap_or_else(|_| Value::String(response.body.clone()));
            emit_json(json!({
                "status": response.status_code,
                "url": response.url,
                "body": body,
            }));
            Ok(RunOutcome::ok())
        }
    }
}
