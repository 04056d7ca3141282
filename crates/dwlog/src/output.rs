use chrono::SecondsFormat;
use dwlog_core::query::LogIndexView;
use dwlog_core::severity::Severity;
use dwlog_store::StatusResponse;
use owo_colors::OwoColorize;

pub fn print_index_human(v: &LogIndexView) {
    for row in &v.logs {
        println!(
            "{} #{} {} {} | {} context={} extra={}",
            row.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            row.id,
            row.channel.cyan(),
            level_label(row.level, &row.level_name),
            row.message,
            row.context.to_json_string(),
            row.extra.to_json_string()
        );
    }
    println!(
        "-- page {} of {} ({} matching records) --",
        v.current_page, v.total_pages, v.total_items
    );
    if !v.levels.is_empty() {
        let levels = v
            .levels
            .iter()
            .map(|l| format!("{}({})", l.level_name, l.level))
            .collect::<Vec<_>>();
        println!("levels={}", levels.join(","));
    }
    if !v.channels.is_empty() {
        println!("channels={}", v.channels.join(","));
    }
}

pub fn print_status_human(v: &StatusResponse) {
    println!("dialect={}", v.dialect);
    println!("table={} exists={}", v.table, v.table_exists);
    if let Some(count) = v.logs_count {
        println!("logs={count}");
    }
}

fn level_label(level: i16, name: &str) -> String {
    let label = name.to_ascii_uppercase();
    match Severity::from_value(level) {
        Some(Severity::Debug) => label.bright_black().to_string(),
        Some(Severity::Info | Severity::Notice) => label.green().to_string(),
        Some(Severity::Warning) => label.yellow().to_string(),
        Some(Severity::Error) => label.red().to_string(),
        Some(Severity::Critical | Severity::Alert | Severity::Emergency) => {
            label.magenta().to_string()
        }
        None => label,
    }
}

pub fn info(message: &str) {
    println!("{} {message}", "[INFO]".blue());
}

pub fn success(message: &str) {
    println!("{} {message}", "[OK]".green());
}

pub fn warning(message: &str) {
    println!("{} {message}", "[WARNING]".yellow());
}

pub fn error(message: &str) {
    eprintln!("{} {message}", "[ERROR]".red());
}
