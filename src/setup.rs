use crate::{
    config::{self, AppConfig},
    helpers,
};

use macros_rs::string;
use std::{collections::BTreeMap, env, fs, path::PathBuf};

pub struct ScaffoldOptions {
    pub app: Option<String>,
    pub dir: Option<PathBuf>,
    pub port: u16,
    pub cluster_size: u32,
    pub user: String,
    pub command: String,
}

/// Write a new application declaration into the configuration directory.
/// Name and working directory default to the current directory, matching
/// how applications are usually scaffolded in place.
pub fn scaffold(options: ScaffoldOptions) -> Result<(), String> {
    let dir = match options.dir {
        Some(dir) => dir,
        None => env::current_dir()
            .map_err(|err| format!("Couldn't determine the current directory: {err}"))?,
    };

    let app = match options.app {
        Some(app) => app,
        None => dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| string!("Couldn't derive an application name; pass --app"))?,
    };

    let declaration = AppConfig {
        app: app.clone(),
        dir,
        port: options.port,
        cluster_size: options.cluster_size,
        user: options.user,
        command: options.command,
        extra: BTreeMap::new(),
    };

    let conf_dir = config::conf_dir();
    fs::create_dir_all(&conf_dir)
        .map_err(|_| format!("Couldn't write to '{conf_dir}'. Please rerun with 'sudo'."))?;

    let location = format!("{conf_dir}/{app}.yml");
    let contents = serde_yaml::to_string(&declaration)
        .map_err(|err| format!("Failed to serialize declaration for '{app}': {err}"))?;
    fs::write(&location, contents)
        .map_err(|_| format!("Couldn't write to '{location}'. Please rerun with 'sudo'."))?;

    println!(
        "{} Wrote configuration to '{}'",
        *helpers::SUCCESS,
        location
    );
    println!(
        "{} Start it with `psup start {}`",
        *helpers::INFO,
        app
    );

    Ok(())
}

/// Install a systemd unit so the supervised fleet starts at boot. Writes a
/// system unit when root, a user unit otherwise.
pub fn install() -> Result<(), String> {
    let binary = env::current_exe()
        .map_err(|err| format!("Couldn't locate the psup binary: {err}"))?;
    let binary = binary.display();

    let is_root = nix::unistd::Uid::effective().is_root();
    let (unit_path, install_target) = if is_root {
        (PathBuf::from("/etc/systemd/system/psup.service"), "multi-user.target")
    } else {
        let home = env::var("HOME")
            .map_err(|_| string!("Couldn't determine a home directory for the user unit"))?;
        let unit_dir = PathBuf::from(home).join(".config/systemd/user");
        fs::create_dir_all(&unit_dir).map_err(|err| {
            format!("Couldn't create '{}': {}", unit_dir.display(), err)
        })?;
        (unit_dir.join("psup.service"), "default.target")
    };

    let unit = format!(
        r#"[Unit]
Description=psup supervised applications
After=network.target

[Service]
Type=oneshot
RemainAfterExit=yes
ExecStart={binary} start
ExecStop={binary} stop

[Install]
WantedBy={install_target}
"#
    );

    fs::write(&unit_path, unit).map_err(|_| {
        format!(
            "Couldn't write to '{}'. Please rerun with 'sudo'.",
            unit_path.display()
        )
    })?;

    println!(
        "{} Service file created at: {}",
        *helpers::SUCCESS,
        unit_path.display()
    );

    if is_root {
        println!("\n{} To enable the supervised fleet at boot:", *helpers::SUCCESS);
        println!("  sudo systemctl daemon-reload");
        println!("  sudo systemctl enable psup.service");
        println!("  sudo systemctl start psup.service");
    } else {
        println!("\n{} To enable the supervised fleet at boot:", *helpers::SUCCESS);
        println!("  systemctl --user daemon-reload");
        println!("  systemctl --user enable psup.service");
        println!("  systemctl --user start psup.service");
        println!("\n{} To start at boot without logging in:", *helpers::INFO);
        println!("  loginctl enable-linger $USER");
    }

    Ok(())
}
