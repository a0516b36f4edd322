use crate::config::{self, AppConfig};
use std::{collections::BTreeMap, path::PathBuf};

/// Prefix for the environment variables handed to a launched instance.
pub const ENV_PREFIX: &str = "PSUP";

/// One runnable unit derived from an [`AppConfig`] and a cluster index.
/// Identified by (app, port); recomputed on every invocation, never persisted.
#[derive(Clone, Debug)]
pub struct Instance {
    pub app: String,
    pub port: u16,
    pub dir: PathBuf,
    pub user: String,
    pub command: String,
    pub cluster_size: u32,
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Instance {
    /// Canonical PID file location, a pure function of (app, port, dir).
    /// The launched process writes it; the supervisor only reads and deletes.
    pub fn pid_file(&self) -> PathBuf {
        self.dir.join(format!("{}.{}.pid", self.app, self.port))
    }

    /// Environment contract for the launched process: one `PSUP_<FIELD>`
    /// variable per declaration field plus the extras, so the process can
    /// self-configure, its port and where to write its PID file included.
    pub fn environment(&self) -> Vec<(String, String)> {
        let mut env = vec![
            (format!("{ENV_PREFIX}_APP"), self.app.clone()),
            (format!("{ENV_PREFIX}_DIR"), self.dir.display().to_string()),
            (format!("{ENV_PREFIX}_PORT"), self.port.to_string()),
            (
                format!("{ENV_PREFIX}_CLUSTER_SIZE"),
                self.cluster_size.to_string(),
            ),
            (format!("{ENV_PREFIX}_USER"), self.user.clone()),
            (format!("{ENV_PREFIX}_COMMAND"), self.command.clone()),
            (
                format!("{ENV_PREFIX}_PID_FILE"),
                self.pid_file().display().to_string(),
            ),
        ];

        for (key, value) in &self.extra {
            match config::scalar_string(value) {
                Some(value) => env.push((format!("{ENV_PREFIX}_{}", key.to_uppercase()), value)),
                None => ::log::warn!(
                    "Skipping non-scalar field '{}' of '{}' in environment",
                    key,
                    self.app
                ),
            }
        }

        env
    }
}

/// Expand one declaration into its cluster of instances, ports ascending
/// from the base port. Pure; order matters only for deterministic reporting.
pub fn expand(config: &AppConfig) -> Result<Vec<Instance>, String> {
    if config.cluster_size == 0 {
        return Err(format!(
            "Invalid cluster_size 0 for '{}'; expected at least 1",
            config.app
        ));
    }

    let mut instances = Vec::with_capacity(config.cluster_size as usize);
    for index in 0..config.cluster_size {
        let port = u16::try_from(index)
            .ok()
            .and_then(|offset| config.port.checked_add(offset))
            .ok_or_else(|| {
                format!(
                    "Port overflow for '{}' at cluster index {} (base port {})",
                    config.app, index, config.port
                )
            })?;

        instances.push(Instance {
            app: config.app.clone(),
            port,
            dir: config.dir.clone(),
            user: config.user.clone(),
            command: config.command.clone(),
            cluster_size: config.cluster_size,
            extra: config.extra.clone(),
        });
    }

    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use macros_rs::string;

    fn blog_config(cluster_size: u32) -> AppConfig {
        AppConfig {
            app: string!("blog"),
            dir: PathBuf::from("/srv/blog"),
            port: 4000,
            cluster_size,
            user: string!("httpd"),
            command: string!("/usr/bin/env ruby rv_harness.rb"),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn single_instance_cluster() {
        let instances = expand(&blog_config(1)).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].port, 4000);
    }

    #[test]
    fn ports_are_sequential_and_ascending() {
        let instances = expand(&blog_config(3)).unwrap();
        let ports: Vec<u16> = instances.iter().map(|i| i.port).collect();
        assert_eq!(ports, vec![4000, 4001, 4002]);
    }

    #[test]
    fn zero_cluster_size_is_a_config_error() {
        let err = expand(&blog_config(0)).unwrap_err();
        assert!(err.contains("cluster_size 0"));
    }

    #[test]
    fn port_overflow_is_a_config_error() {
        let mut config = blog_config(10);
        config.port = u16::MAX - 3;
        let err = expand(&config).unwrap_err();
        assert!(err.contains("Port overflow"));
    }

    #[test]
    fn pid_file_derives_from_app_port_and_dir() {
        let instances = expand(&blog_config(2)).unwrap();
        assert_eq!(instances[0].pid_file(), PathBuf::from("/srv/blog/blog.4000.pid"));
        assert_eq!(instances[1].pid_file(), PathBuf::from("/srv/blog/blog.4001.pid"));
    }

    #[test]
    fn environment_carries_every_field_prefixed() {
        let mut config = blog_config(2);
        config
            .extra
            .insert(string!("database"), serde_yaml::Value::from("blog_production"));

        let instances = expand(&config).unwrap();
        let env: BTreeMap<String, String> = instances[1].environment().into_iter().collect();

        assert_eq!(env["PSUP_APP"], "blog");
        assert_eq!(env["PSUP_DIR"], "/srv/blog");
        assert_eq!(env["PSUP_PORT"], "4001");
        assert_eq!(env["PSUP_CLUSTER_SIZE"], "2");
        assert_eq!(env["PSUP_USER"], "httpd");
        assert_eq!(env["PSUP_PID_FILE"], "/srv/blog/blog.4001.pid");
        assert_eq!(env["PSUP_DATABASE"], "blog_production");
    }
}
