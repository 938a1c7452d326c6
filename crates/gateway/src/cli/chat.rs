//! `imolink chat`: interactive REPL command.
//!
//! Opens a readline-based loop that sends each line through the engine
//! as the current user.  Slash commands switch the user and inspect the
//! live sessions.

use imo_domain::config::Config;

use crate::bootstrap;
use crate::runtime::Engine;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run the interactive chat REPL.
pub async fn chat(config: Config, mut user: String) -> anyhow::Result<()> {
    // 1. Boot the engine (its cleanup loop starts with it).
    let engine = bootstrap::build_engine(&config)?;

    // 2. Initialize rustyline editor with persistent history.
    let history_path = dirs::home_dir()
        .unwrap_or_default()
        .join(".imolink")
        .join("chat_history.txt");
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut rl = rustyline::DefaultEditor::new()?;
    let _ = rl.load_history(&history_path);

    // 3. Welcome message on stderr (keep stdout clean for replies).
    eprintln!("imolink interactive chat");
    eprintln!("User: {user}  |  Type /help for commands, Ctrl+D to exit");
    eprintln!();

    // 4. REPL loop.
    loop {
        match rl.readline("you> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                rl.add_history_entry(&line).ok();

                if trimmed.starts_with('/') {
                    if handle_slash_command(trimmed, &mut user, &engine) {
                        break;
                    }
                    continue;
                }

                match engine.process_message(&user, trimmed).await {
                    Ok(reply) if reply.is_empty() => eprintln!("\x1b[2m(no reply)\x1b[0m"),
                    Ok(reply) => print!("{reply}"),
                    Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /exit to quit)");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("\x1B[31mreadline error: {e}\x1B[0m");
                break;
            }
        }
    }

    // 5. Save history and stop background work.
    rl.save_history(&history_path).ok();
    engine.shutdown().await;

    eprintln!("Goodbye!");
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slash command handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process a slash command.  Returns `true` if the REPL should exit.
fn handle_slash_command(input: &str, user: &mut String, engine: &Engine) -> bool {
    let (cmd, arg) = match input.split_once(' ') {
        Some((cmd, arg)) => (cmd, Some(arg.trim())),
        None => (input, None),
    };

    match cmd {
        "/exit" | "/quit" => return true,

        "/user" => {
            if let Some(id) = arg.filter(|s| !s.is_empty()) {
                *user = id.to_string();
                eprintln!("Now chatting as: {user}");
            } else {
                eprintln!("Current user: {user}");
                eprintln!("Usage: /user <id>");
            }
        }

        "/sessions" => {
            let mut sessions = engine.sessions().list();
            sessions.sort_by(|a, b| b.last_accessed_at.cmp(&a.last_accessed_at));
            if sessions.is_empty() {
                eprintln!("No live sessions.");
            }
            for s in sessions {
                eprintln!(
                    "  {}  thread={}  last={}  name={}",
                    s.user_id,
                    s.thread_id,
                    s.last_accessed_at.format("%Y-%m-%d %H:%M:%S"),
                    s.collected_name().unwrap_or("-"),
                );
            }
        }

        "/help" => {
            eprintln!("Commands:");
            eprintln!("  /user <id>       Switch the user messages are sent as");
            eprintln!("  /sessions        List live sessions");
            eprintln!("  /exit, /quit     Exit the chat");
            eprintln!("  /help            Show this help");
        }

        other => {
            eprintln!("Unknown command: {other}  (type /help for a list)");
        }
    }

    false
}
