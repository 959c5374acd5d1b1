//! Startup summary display.

/// Configuration for startup display.
pub struct StartupConfig {
    pub version: &'static str,
    pub data_path: String,
    pub auth_enabled: bool,
    pub token_count: usize,
    pub http_port: u16,
    pub post_endpoint: String,
    pub resumed: bool,
}

/// ANSI color codes for terminal output.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const MAGENTA: &str = "\x1b[35m";
}

/// Check if terminal supports colors.
fn supports_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    atty::is(atty::Stream::Stdout)
}

/// Print the startup summary.
pub fn print_startup_summary(config: &StartupConfig) {
    let use_color = supports_color();
    let (bold, dim, cyan, green, yellow, magenta, reset) = if use_color {
        (
            colors::BOLD,
            colors::DIM,
            colors::CYAN,
            colors::GREEN,
            colors::YELLOW,
            colors::MAGENTA,
            colors::RESET,
        )
    } else {
        ("", "", "", "", "", "", "")
    };

    println!();
    println!(
        "  {cyan}{bold}postQ{reset} {dim}v{version}{reset} - durable question auto-poster",
        cyan = cyan,
        bold = bold,
        dim = dim,
        version = config.version,
        reset = reset
    );

    let auth = if config.auth_enabled {
        format!("{}enabled ({} tokens){}", green, config.token_count, reset)
    } else {
        format!("{}disabled{}", yellow, reset)
    };
    let schedule = if config.resumed {
        format!("{}resumed from last run{}", green, reset)
    } else {
        format!("{}stopped{}", dim, reset)
    };

    println!("    {dim}data{reset}      {}", config.data_path, dim = dim, reset = reset);
    println!("    {dim}auth{reset}      {}", auth, dim = dim, reset = reset);
    println!("    {dim}schedule{reset}  {}", schedule, dim = dim, reset = reset);
    println!(
        "    {dim}post to{reset}   {magenta}{}{reset}",
        config.post_endpoint,
        dim = dim,
        magenta = magenta,
        reset = reset
    );
    println!(
        "    {dim}http{reset}      {magenta}http://0.0.0.0:{}{reset}  {dim}(docs at /docs){reset}",
        config.http_port,
        dim = dim,
        magenta = magenta,
        reset = reset
    );
    println!();
}
