use global_placeholders::init;
use std::env;

/// Register global paths, overridable through the environment:
/// `PSUP_CONF_DIR` for the declaration directory, `PSUP_LOG` for the
/// shared application log.
pub fn init() {
    let conf_dir = env::var("PSUP_CONF_DIR").unwrap_or_else(|_| "/etc/psup".into());
    let log_file = env::var("PSUP_LOG").unwrap_or_else(|_| "/var/log/psup.log".into());

    init!("psup.config", conf_dir);
    init!("psup.log", log_file);
}
