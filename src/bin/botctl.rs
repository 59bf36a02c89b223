//! Administrative command line for the bot database.
//!
//! Usage: botctl <config.json> <command> [args...]

use std::path::Path;
use std::sync::Arc;

use botforge::chatbot::engine::DEFAULT_LIMIT;
use botforge::chatbot::{BotService, Database, NewBot, Role, User};
use botforge::config::Config;
use botforge::trainer::FALLBACK_REPLY;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <config.json> <command> [args...]", program);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  add-user <username> <email> <password> [admin|user]");
    eprintln!("  create-bot <username> <password> <name> [description]");
    eprintln!("  list-bots <username> <password>");
    eprintln!("  add-script <username> <password> <bot_id> <file>");
    eprintln!("  import-scripts <username> <password> <bot_id> <dir>");
    eprintln!("  list-scripts <username> <password> <bot_id>");
    eprintln!("  delete-script <username> <password> <script_id>");
    eprintln!("  train <username> <password> <bot_id>");
    eprintln!("  ask <username> <password> <bot_id> <text...>");
    eprintln!();
    eprintln!("import-scripts reads every .txt file in <dir> (sorted by name),");
    eprintln!("one script per file, and retrains the bot once at the end.");
    std::process::exit(1);
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        usage(&args[0]);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load(&args[1]) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let database = match Database::open(&config.database_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let service = BotService::new(config.service_config(), database);

    if let Err(e) = run(&service, &args[2], &args[3..]) {
        if e.is_empty() {
            usage(&args[0]);
        }
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Returns an empty error for bad arguments so `main` prints usage.
fn run(service: &BotService, command: &str, args: &[String]) -> Result<(), String> {
    match (command, args) {
        ("add-user", [username, email, password, rest @ ..]) => {
            let role = match rest.first() {
                Some(r) => r.parse::<Role>()?,
                None => Role::User,
            };
            let user = service
                .register_user(username, email, password, role)
                .map_err(|e| e.to_string())?;
            println!("Created {} {} (id: {})", user.role.as_str(), user.username, user.id);
        }
        ("create-bot", [username, password, name, rest @ ..]) => {
            let user = login(service, username, password)?;
            let bot = NewBot {
                name: name.clone(),
                description: rest.first().cloned(),
                personality: None,
            };
            let bot = service.create_bot(&user, bot).map_err(|e| e.to_string())?;
            println!("Created bot {} (id: {})", bot.name, bot.id);
        }
        ("list-bots", [username, password]) => {
            let user = login(service, username, password)?;
            let bots = service.list_bots(&user, 0, DEFAULT_LIMIT).map_err(|e| e.to_string())?;
            for bot in bots {
                let trained = bot.trained_at.as_deref().unwrap_or("never");
                println!("{:>5}  {:<24} {:<12} trained: {}", bot.id, bot.name, bot.personality, trained);
            }
        }
        ("add-script", [username, password, bot_id, file]) => {
            let user = login(service, username, password)?;
            let bot_id = parse_id(bot_id)?;
            let content = std::fs::read_to_string(file).map_err(|e| format!("Failed to read {file}: {e}"))?;
            let script = service.add_script(&user, bot_id, &content).map_err(|e| e.to_string())?;
            println!("Added script {} to bot {}", script.id, bot_id);
        }
        ("import-scripts", [username, password, bot_id, dir]) => {
            let user = login(service, username, password)?;
            let bot_id = parse_id(bot_id)?;
            let contents = read_script_dir(Path::new(dir))?;
            println!("Read {} script(s) from {}", contents.len(), dir);
            let scripts = service.add_scripts(&user, bot_id, &contents).map_err(|e| e.to_string())?;
            println!("Imported {} script(s) into bot {}", scripts.len(), bot_id);
        }
        ("list-scripts", [username, password, bot_id]) => {
            let user = login(service, username, password)?;
            let scripts = service
                .list_scripts(&user, parse_id(bot_id)?, 0, DEFAULT_LIMIT)
                .map_err(|e| e.to_string())?;
            for script in scripts {
                let preview: String = script.content.chars().take(60).collect();
                println!("{:>5}  {:?}", script.id, preview);
            }
        }
        ("delete-script", [username, password, script_id]) => {
            let user = login(service, username, password)?;
            let script = service
                .delete_script(&user, parse_id(script_id)?)
                .map_err(|e| e.to_string())?;
            println!("Deleted script {} from bot {}", script.id, script.bot_id);
        }
        ("train", [username, password, bot_id]) => {
            let user = login(service, username, password)?;
            let result = service.train_bot(&user, parse_id(bot_id)?).map_err(|e| e.to_string())?;
            let profile = &result.personality_profile;
            println!("Bot {} trained at {}", result.bot_id, result.trained_at);
            println!("  distinct terms: {}", profile.distinct_terms);
            println!("  average length: {:.2}", profile.avg_length);
            for (term, count) in &profile.top_terms {
                println!("  {:<20} {}", term, count);
            }
        }
        ("ask", [username, password, bot_id, words @ ..]) if !words.is_empty() => {
            let user = login(service, username, password)?;
            let bot = service.get_bot(&user, parse_id(bot_id)?).map_err(|e| e.to_string())?;
            let model = service.model(bot.id).map_err(|e| e.to_string())?;
            let query = words.join(" ");
            let best = model.best_match(&query).map_err(|e| e.to_string())?;
            let reply = model.respond(&query).map_err(|e| e.to_string())?;
            if reply == FALLBACK_REPLY {
                println!("(best score {:.3} below threshold)", best.score);
            } else {
                println!("(script #{} score {:.3})", best.index + 1, best.score);
            }
            println!("{reply}");
        }
        _ => return Err(String::new()),
    }
    Ok(())
}

fn login(service: &BotService, username: &str, password: &str) -> Result<User, String> {
    service.authenticate(username, password).map_err(|e| e.to_string())
}

fn parse_id(s: &str) -> Result<i64, String> {
    s.parse().map_err(|_| format!("'{s}' is not a valid id"))
}

fn read_script_dir(dir: &Path) -> Result<Vec<String>, String> {
    let entries = std::fs::read_dir(dir).map_err(|e| format!("Failed to read {}: {e}", dir.display()))?;
    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
        .collect();
    paths.sort();

    let mut contents = Vec::with_capacity(paths.len());
    for path in paths {
        let text = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        if text.trim().is_empty() {
            eprintln!("Skipping empty {}", path.display());
            continue;
        }
        contents.push(text);
    }
    Ok(contents)
}
