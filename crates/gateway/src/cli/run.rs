//! `imolink run`: one-shot message.

use serde::Serialize;

use imo_domain::config::Config;

use crate::bootstrap;

#[derive(Debug, Serialize)]
struct RunResult<'a> {
    user: &'a str,
    thread_id: Option<String>,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Send `message` as `user`, print the reply, and exit non-zero on error.
pub async fn run(config: Config, message: String, user: String, json_output: bool) -> anyhow::Result<()> {
    let engine = bootstrap::build_engine(&config)?;

    let result = engine.process_message(&user, &message).await;
    let thread_id = engine.sessions().get(&user).map(|s| s.thread_id);

    if json_output {
        let (reply, error) = match &result {
            Ok(reply) => (Some(reply.clone()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        let out = RunResult {
            user: &user,
            thread_id,
            ok: result.is_ok(),
            reply,
            error,
        };
        let json = serde_json::to_string_pretty(&out)
            .map_err(|e| anyhow::anyhow!("serializing result: {e}"))?;
        println!("{json}");
    } else {
        match &result {
            Ok(reply) => print!("{reply}"),
            Err(e) => eprintln!("error: {e}"),
        }
    }

    if result.is_err() {
        std::process::exit(1);
    }
    Ok(())
}
