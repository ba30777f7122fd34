use crate::bootstrap::{Clock, ContainerExec, DatabaseBootstrapper, DatabaseCredentials};
use crate::config::{ConfigStore, ConfigValue, Layout, CONFIG_KEYS};
use crate::error::{Error, Result};
use crate::runner::{shell_join, CommandRunner};
use crossterm::style::Stylize;
use regex::Regex;
use std::sync::OnceLock;

pub const IMAGE_NAME: &str = "framework.docker:latest";
pub const DEFAULT_NAME: &str = "framework";

/// `docker start` output that means the CLI could not reach the daemon.
pub fn daemon_not_running(output: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(?is)Cannot connect to the Docker daemon at .*? Is the docker daemon running\?")
                .expect("static regex")
        })
        .is_match(output)
}

/// Host ports published for the container's 80, 443 and 3306.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMap {
    pub http: String,
    pub https: String,
    pub mysql: String,
}

impl PortMap {
    pub fn from_store(store: &ConfigStore) -> Self {
        let read = |key: &str, default: &str| store.get(key).unwrap_or_else(|| default.to_string());
        Self {
            http: read("http.port", "80"),
            https: read("https.port", "443"),
            mysql: read("mysql.port", "3306"),
        }
    }
}

pub struct ContainerManager<'a, R, C> {
    store: &'a mut ConfigStore,
    runner: &'a R,
    clock: &'a C,
    layout: Layout,
    docker_bin: String,
}

impl<'a, R: CommandRunner, C: Clock> ContainerManager<'a, R, C> {
    pub fn new(
        store: &'a mut ConfigStore,
        runner: &'a R,
        clock: &'a C,
        layout: Layout,
        docker_bin: impl Into<String>,
    ) -> Self {
        Self {
            store,
            runner,
            clock,
            layout,
            docker_bin: docker_bin.into(),
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut ConfigStore {
        &mut *self.store
    }

    /// Configured container name; unset falls back to the default, an empty one is an error.
    pub fn container_name(&self) -> Result<String> {
        match self.store.get("name") {
            Some(name) if name.trim().is_empty() => Err(Error::MissingRequiredArgument("name")),
            Some(name) => Ok(name),
            None => Ok(DEFAULT_NAME.to_string()),
        }
    }

    fn docker<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = vec![self.docker_bin.clone()];
        argv.extend(args.into_iter().map(Into::into));
        argv
    }

    /// Read (`value == None`) or write one allow-listed key. Returns the value now in effect.
    pub fn configure(&mut self, key: &str, value: Option<&str>) -> Result<Option<String>> {
        if !CONFIG_KEYS.contains(&key) {
            return Err(Error::InvalidConfigKey(key.to_string()));
        }

        let Some(value) = value else {
            let current = if key == "mysql" {
                self.store.contains("mysql").then(|| "enabled".to_string())
            } else {
                self.store.get(key)
            };
            if let Some(v) = &current {
                println!("Current value {key}: {v}");
            }
            return Ok(current);
        };

        if key == "mysql" {
            let enabled = !matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "no" | "off" | "false" | "0"
            );
            let marker = if enabled { ConfigValue::Group } else { ConfigValue::Unset };
            self.store.set(key, marker);
        } else {
            self.store.set(key, value);
        }
        self.store.save()?;
        tracing::info!(%key, "configuration updated");
        Ok(Some(value.to_string()))
    }

    pub fn build_image_argv(&self, no_cache: bool) -> Vec<String> {
        let mut args = vec!["build".to_string()];
        if no_cache {
            args.push("--no-cache".to_string());
        }
        args.extend([
            "-t".to_string(),
            IMAGE_NAME.to_string(),
            "-f".to_string(),
            self.layout.dockerfile().display().to_string(),
            self.layout.docker_context.display().to_string(),
        ]);
        self.docker(args)
    }

    pub async fn build_image(&self, no_cache: bool) -> Result<()> {
        println!("Building docker image...");
        let out = self.runner.run(&self.build_image_argv(no_cache)).await?;
        print!("{out}");
        Ok(())
    }

    pub fn run_argv(&self, name: &str) -> Vec<String> {
        let ports = PortMap::from_store(self.store());
        let mount = |file: &str, target: &str| {
            format!("{}:{target}", self.layout.amp_file(file).display())
        };

        self.docker([
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            name.to_string(),
            "-v".to_string(),
            format!("{}:/var/www/html/", self.layout.project_root.display()),
            "-v".to_string(),
            mount("default-host.conf", "/etc/apache2/sites-available/000-default.conf"),
            "-v".to_string(),
            mount("xdebug.ini", "/etc/php/8.3/mods-available/xdebug.ini"),
            "-v".to_string(),
            mount("php.ini", "/etc/php/8.3/apache2/php.ini"),
            "--add-host".to_string(),
            "host.docker.internal:host-gateway".to_string(),
            "-p".to_string(),
            format!("{}:80", ports.http),
            "-p".to_string(),
            format!("{}:443", ports.https),
            "-p".to_string(),
            format!("{}:3306", ports.mysql),
            IMAGE_NAME.to_string(),
        ])
    }

    /// Create and run the container, then bootstrap MySQL when the `mysql` group is configured.
    /// A failed bootstrap leaves the container in place.
    pub async fn build(&self) -> Result<()> {
        let name = self.container_name()?;
        println!("Building docker container [{name}]...");

        let out = self.runner.run(&self.run_argv(&name)).await?;
        print!("{out}");

        if let Some(creds) = DatabaseCredentials::from_store(self.store()) {
            let mut boot = DatabaseBootstrapper::new(self, self.clock);
            boot.bootstrap(&creds).await?;
            tracing::debug!(state = ?boot.state(), "database bootstrap finished");
        }
        Ok(())
    }

    pub async fn start(&self) -> Result<()> {
        let name = self.container_name()?;
        println!("Starting docker container [{name}]...");

        let out = self.runner.run(&self.docker(["start", name.as_str()])).await?;
        if daemon_not_running(&out) {
            return Err(Error::DaemonNotRunning);
        }

        println!(
            "{}",
            format!(
                "Docker container {name} started. To enter into the container: docker exec -it {name} /bin/bash"
            )
            .green()
        );
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        let name = self.container_name()?;
        println!("Stopping docker container [{name}]...");

        let out = self.runner.run(&self.docker(["stop", name.as_str()])).await?;
        print!("{out}");
        println!("{}", format!("Docker container {name} stopped.").green());
        Ok(())
    }

    pub async fn stop_all(&self) -> Result<()> {
        println!("Stopping all docker containers...");

        let listing = self.runner.run(&self.docker(["ps", "-a", "-q"])).await?;
        let (ids, other): (Vec<&str>, Vec<&str>) = listing
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .partition(|line| line.chars().all(|c| c.is_ascii_hexdigit()));

        // Warnings or daemon errors mixed into the listing are passed through.
        for line in &other {
            println!("{line}");
        }
        if ids.is_empty() {
            if other.is_empty() {
                println!("No docker containers found.");
            }
            return Ok(());
        }

        let mut args = vec!["stop"];
        args.extend(ids);
        let out = self.runner.run(&self.docker(args)).await?;
        print!("{out}");
        println!("{}", "All docker containers has been stopped.".green());
        Ok(())
    }

    pub fn exec_argv(&self, name: &str, args: &[String]) -> Vec<String> {
        self.docker([
            "exec".to_string(),
            name.to_string(),
            "/bin/bash".to_string(),
            "-c".to_string(),
            shell_join(args),
        ])
    }

    pub async fn exec_command(&self, args: &[String]) -> Result<String> {
        if args.is_empty() {
            return Err(Error::MissingRequiredArgument("command"));
        }
        let name = self.container_name()?;
        self.runner.run(&self.exec_argv(&name, args)).await
    }

    /// Run the application's own setup inside the container.
    pub async fn setup(&self) -> Result<()> {
        let args = ["php", "/var/www/html/cli.php", "setup"].map(String::from);
        let out = self.exec_command(&args).await?;
        print!("{out}");
        Ok(())
    }
}

impl<R: CommandRunner, C: Clock> ContainerExec for ContainerManager<'_, R, C> {
    async fn exec_command(&self, args: &[String]) -> Result<String> {
        ContainerManager::exec_command(self, args).await
    }
}
