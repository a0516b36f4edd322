use colored::Colorize;
use once_cell::sync::Lazy;

pub static SUCCESS: Lazy<colored::ColoredString> = Lazy::new(|| "[PSUP]".green());
pub static FAIL: Lazy<colored::ColoredString> = Lazy::new(|| "[PSUP]".red());
pub static WARN: Lazy<colored::ColoredString> = Lazy::new(|| "[PSUP]".yellow());
pub static INFO: Lazy<colored::ColoredString> = Lazy::new(|| "[PSUP]".cyan());
