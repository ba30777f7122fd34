use crate::config::ConfigStore;
use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// What the mysql client prints first when the server socket is not listening yet.
pub const MYSQL_NOT_LISTENING: &str = "ERROR 2002 (HY000): ";

/// Readiness heuristic: anything other than the "can't connect" signature counts as up,
/// including unrelated SQL errors.
pub fn mysql_not_listening(output: &str) -> bool {
    output.starts_with(MYSQL_NOT_LISTENING)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub const DATABASE: Self = Self {
        max_attempts: 10,
        interval: Duration::from_millis(90),
    };
}

#[allow(async_fn_in_trait)]
pub trait Clock {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Ready { attempts: u32 },
    Exhausted { attempts: u32 },
}

/// Sleep, probe, repeat until the probe answers `true` or the policy runs out.
/// Probe errors abort immediately; only a `false` answer is retried.
pub async fn retry_until<C, F, Fut>(policy: &RetryPolicy, clock: &C, mut probe: F) -> Result<RetryOutcome>
where
    C: Clock,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    for attempt in 1..=policy.max_attempts {
        clock.sleep(policy.interval).await;
        if probe(attempt).await? {
            return Ok(RetryOutcome::Ready { attempts: attempt });
        }
        tracing::warn!(attempt, max = policy.max_attempts, "not ready yet, retrying");
    }
    Ok(RetryOutcome::Exhausted {
        attempts: policy.max_attempts,
    })
}

/// Runs a command inside the development container.
#[allow(async_fn_in_trait)]
pub trait ContainerExec {
    async fn exec_command(&self, args: &[String]) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseCredentials {
    pub user: String,
    pub password: String,
    pub database: String,
}

impl DatabaseCredentials {
    pub const DEFAULT: &'static str = "developer";

    /// `None` when the `mysql` group is absent, which turns the bootstrap off.
    pub fn from_store(store: &ConfigStore) -> Option<Self> {
        if !store.contains("mysql") {
            return None;
        }
        let read = |key: &str| store.get(key).unwrap_or_else(|| Self::DEFAULT.to_string());
        Some(Self {
            user: read("mysql.user"),
            password: read("mysql.password"),
            database: read("mysql.database"),
        })
    }
}

fn sql_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// The three provisioning statements, in execution order, each with its progress label.
pub fn provisioning_statements(creds: &DatabaseCredentials) -> [(&'static str, String); 3] {
    let db = sql_identifier(&creds.database);
    let user = sql_literal(&creds.user);
    [
        (
            "Creating database...",
            format!("CREATE DATABASE IF NOT EXISTS {db};"),
        ),
        (
            "Creating database user...",
            format!(
                "CREATE USER IF NOT EXISTS {user}@'%' IDENTIFIED BY {};",
                sql_literal(&creds.password)
            ),
        ),
        (
            "Creating database privileges...",
            format!("GRANT ALL PRIVILEGES ON {db}.* TO {user}@'%' WITH GRANT OPTION;"),
        ),
    ]
}

fn mysql_argv(statement: &str) -> Vec<String> {
    vec!["mysql".to_string(), "-e".to_string(), statement.to_string()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Waiting,
    Ready,
    Provisioning,
    Done,
    Failed,
}

pub struct DatabaseBootstrapper<'a, E, C> {
    exec: &'a E,
    clock: &'a C,
    policy: RetryPolicy,
    state: BootstrapState,
}

impl<'a, E: ContainerExec, C: Clock> DatabaseBootstrapper<'a, E, C> {
    pub fn new(exec: &'a E, clock: &'a C) -> Self {
        Self::with_policy(exec, clock, RetryPolicy::DATABASE)
    }

    pub fn with_policy(exec: &'a E, clock: &'a C, policy: RetryPolicy) -> Self {
        Self {
            exec,
            clock,
            policy,
            state: BootstrapState::Waiting,
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    pub async fn bootstrap(&mut self, creds: &DatabaseCredentials) -> Result<()> {
        println!("Configuring database...");
        self.state = BootstrapState::Waiting;

        let exec = self.exec;
        let outcome = retry_until(&self.policy, self.clock, move |_attempt| async move {
            let out = exec.exec_command(&mysql_argv("SELECT NOW();")).await?;
            Ok::<_, Error>(!mysql_not_listening(&out))
        })
        .await?;

        match outcome {
            RetryOutcome::Exhausted { attempts } => {
                self.state = BootstrapState::Failed;
                tracing::warn!(attempts, "mysql never became ready");
                return Err(Error::DatabaseNotReady { attempts });
            }
            RetryOutcome::Ready { attempts } => {
                self.state = BootstrapState::Ready;
                tracing::info!(attempts, "mysql is ready");
            }
        }

        self.state = BootstrapState::Provisioning;
        for (label, statement) in provisioning_statements(creds) {
            println!("{label}");
            let out = self.exec.exec_command(&mysql_argv(&statement)).await?;
            print!("{out}");
        }

        self.state = BootstrapState::Done;
        Ok(())
    }
}
