use clario::config::ClarioConfig;
use clario::core::date::Clock;
use clario::core::principal::Principal;
use clario::localize::TranslationStore;
use clario::session::Session;
use clario::sync::{RemoteSync, keyring};
use clario::view::{self, cards};

struct FilteredJournal {
    inner: systemd_journal_logger::JournalLog,
}

impl log::Log for FilteredJournal {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        if metadata.target().starts_with("clario") {
            let max = if clario::debug_logging() {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Info
            };
            metadata.level() <= max
        } else {
            metadata.level() <= log::LevelFilter::Warn
        }
    }
    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            self.inner.log(record);
        }
    }
    fn flush(&self) {
        self.inner.flush();
    }
}

/// Log to the systemd user journal (`journalctl --user -t clario -f`).
/// Clario itself logs at info or debug, everything else at warn.
fn init_logging(debug: bool) {
    clario::set_debug_logging(debug);
    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => journal.with_syslog_identifier("clario".to_string()),
        Err(e) => {
            eprintln!("Journal logging unavailable: {}", e);
            return;
        }
    };
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        // Global max must be Debug so debug logs can pass through when toggled
        log::set_max_level(log::LevelFilter::Debug);
    }
}

const USAGE: &str = "Usage:
  clario --principal <id> --email <address> [--name <name>] [--locale <tag>]
  clario --set-token <server>     (reads the token from stdin)
  clario --forget-token <server>";

struct Args {
    principal: String,
    email: String,
    name: Option<String>,
    locale: Option<String>,
}

enum Command {
    Dashboard(Args),
    SetToken(String),
    ForgetToken(String),
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Command, String> {
    let mut principal = None;
    let mut email = None;
    let mut name = None;
    let mut locale = None;

    while let Some(arg) = args.next() {
        let value = args.next().ok_or_else(|| format!("{} needs a value", arg));
        match arg.as_str() {
            "--set-token" => return Ok(Command::SetToken(value?)),
            "--forget-token" => return Ok(Command::ForgetToken(value?)),
            "--principal" => principal = Some(value?),
            "--email" => email = Some(value?),
            "--name" => name = Some(value?),
            "--locale" => locale = Some(value?),
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }

    Ok(Command::Dashboard(Args {
        principal: principal.ok_or("--principal is required")?,
        email: email.ok_or("--email is required")?,
        name,
        locale,
    }))
}

async fn set_token(server: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut token = String::new();
    std::io::stdin().read_line(&mut token)?;
    let token = token.trim();
    if token.is_empty() {
        return Err("no token on stdin".into());
    }
    keyring::store_token(server, token).await?;
    log::info!("Stored access token for {}", server);
    println!("Token stored for {}", server);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClarioConfig::load();
    init_logging(config.debug_logging);

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(Command::Dashboard(args)) => args,
        Ok(Command::SetToken(server)) => return set_token(&server).await,
        Ok(Command::ForgetToken(server)) => {
            keyring::delete_token(&server).await?;
            println!("Token removed for {}", server);
            return Ok(());
        }
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    let mut principal = Principal::new(args.principal, args.email);
    if let Some(name) = args.name {
        principal = principal.with_display_name(name);
    }
    if let Some(tag) = args.locale.or_else(|| std::env::var("LANG").ok()) {
        principal = principal.with_locale(tag);
    }

    let sync = RemoteSync::connect(&config.store).await?;
    let translations = TranslationStore::embedded(config.locale, config.fallback_locale);
    let session = Session::start(principal, sync, translations, Clock::System)
        .await?
        .with_notice_duration(config.notice_seconds);

    let data = session.data();
    let tr = session.translations();
    let counts = view::dashboard_counts(data);

    println!(
        "{}",
        tr.resolve("dashboard.greeting", &[("name", data.profile().name.as_str())])
    );
    println!();
    println!("{:<20} {}", tr.t("dashboard.activeTasks"), counts.active_tasks);
    println!("{:<20} {}", tr.t("dashboard.projects"), counts.projects);
    println!("{:<20} {}", tr.t("dashboard.dailyTasks"), counts.active_daily_tasks);
    println!("{:<20} {}", tr.t("dashboard.completedToday"), counts.completed_today);
    println!();
    println!("{}", tr.t("dashboard.recentTasks"));

    let recent = view::recent_tasks(data);
    if recent.is_empty() {
        println!("  {}", tr.t("dashboard.noRecentTasks"));
    }
    for task in recent {
        let card = cards::task_card(task, data, tr);
        let project = card.project.map(|p| format!(" [{}]", p)).unwrap_or_default();
        println!(
            "  {} {}{}: {}",
            if card.overdue { "!" } else { "-" },
            card.title,
            project,
            card.due_text
        );
    }

    let today = data.today();
    let daily = view::todays_daily_tasks(data);
    if !daily.is_empty() {
        println!();
        println!("{}", tr.t("nav.dailyTasks"));
        for task in daily {
            let card = cards::daily_task_card(task, today, tr);
            println!(
                "  [{}] {} ({})",
                if card.completed_today { "x" } else { " " },
                card.title,
                card.streak_text
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, String> {
        parse_args(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn token_commands() {
        assert!(matches!(
            parse(&["--set-token", "https://docs.example.com"]),
            Ok(Command::SetToken(server)) if server == "https://docs.example.com"
        ));
        assert!(matches!(
            parse(&["--forget-token", "https://docs.example.com"]),
            Ok(Command::ForgetToken(_))
        ));
        assert!(parse(&["--set-token"]).is_err());
    }

    #[test]
    fn dashboard_needs_principal_and_email() {
        let Ok(Command::Dashboard(args)) =
            parse(&["--principal", "uid-1", "--email", "ada@example.com", "--locale", "de"])
        else {
            panic!("expected dashboard");
        };
        assert_eq!(args.principal, "uid-1");
        assert_eq!(args.locale.as_deref(), Some("de"));
        assert_eq!(args.name, None);

        assert_eq!(
            parse(&["--email", "ada@example.com"]).err().as_deref(),
            Some("--principal is required")
        );
        assert!(parse(&["--bogus", "x"]).is_err());
    }
}
