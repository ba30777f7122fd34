use crate::config::{ConfigStore, ConfigValue};
use crate::error::{Error, Result};
use crossterm::cursor::MoveToPreviousLine;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use crossterm::QueueableCommand;
use std::io::{self, BufRead, Write};

/// Asks the user for one value; an empty answer means `default`.
pub trait Prompt {
    fn ask(&mut self, label: &str, default: &str) -> Result<String>;
}

/// Line-based prompt on stdin/stdout. The answered line is rewritten as `label: value`.
pub struct TerminalPrompt<I, O> {
    input: I,
    output: O,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<I: BufRead, O: Write> TerminalPrompt<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }
}

impl<I: BufRead, O: Write> Prompt for TerminalPrompt<I, O> {
    fn ask(&mut self, label: &str, default: &str) -> Result<String> {
        let io_err = Error::Input;

        write!(self.output, "{label} ({default}): ").map_err(io_err)?;
        self.output.flush().map_err(io_err)?;

        let mut line = String::new();
        self.input.read_line(&mut line).map_err(io_err)?;
        let answer = match line.trim() {
            "" => default.to_string(),
            s => s.to_string(),
        };

        self.output
            .queue(MoveToPreviousLine(1))
            .and_then(|o| o.queue(Clear(ClearType::CurrentLine)))
            .map_err(io_err)?;
        writeln!(self.output, "{label}: {}", answer.as_str().green()).map_err(io_err)?;
        self.output.flush().map_err(io_err)?;
        Ok(answer)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Walk through every setting, then save once.
pub fn interactive_configuration(store: &mut ConfigStore, prompt: &mut impl Prompt) -> Result<()> {
    println!("{}", "Configuration...".blue());

    store.set("name", prompt.ask("Project name", "framework")?.as_str());
    store.set("http.port", prompt.ask("Local HTTP port", "80")?.as_str());
    store.set("https.port", prompt.ask("Local HTTPS port", "443")?.as_str());

    let use_mysql = prompt.ask("Will you use local MySQL server", "Yes")?;
    store.set("mysql", ConfigValue::Unset);
    if is_yes(&use_mysql) {
        store.set("mysql", ConfigValue::Group);
        store.set("mysql.port", prompt.ask("Local MySQL port", "3306")?.as_str());
        store.set("mysql.user", prompt.ask("Local MySQL user", "developer")?.as_str());
        store.set("mysql.password", prompt.ask("Local MySQL password", "developer")?.as_str());
        store.set("mysql.database", prompt.ask("Local MySQL database", "developer")?.as_str());
    }

    store.save()?;
    println!("{}", "Successfully configured".green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ScriptedPrompt {
        answers: VecDeque<&'static str>,
        asked: Vec<String>,
    }

    impl ScriptedPrompt {
        fn new(answers: &[&'static str]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                asked: Vec::new(),
            }
        }
    }

    impl Prompt for ScriptedPrompt {
        fn ask(&mut self, label: &str, default: &str) -> Result<String> {
            self.asked.push(label.to_string());
            Ok(match self.answers.pop_front().unwrap_or("") {
                "" => default.to_string(),
                s => s.to_string(),
            })
        }
    }

    fn empty_store(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::load(dir.path().join("app/etc/docker.json")).expect("load")
    }

    #[test]
    fn defaults_enable_mysql_and_save_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = empty_store(&dir);
        let mut prompt = ScriptedPrompt::new(&[]);

        interactive_configuration(&mut store, &mut prompt).expect("configure");

        assert_eq!(prompt.asked.len(), 8);
        let saved = ConfigStore::load(store.path()).expect("reload");
        assert_eq!(saved.get("name").as_deref(), Some("framework"));
        assert_eq!(saved.get("http.port").as_deref(), Some("80"));
        assert_eq!(saved.get("https.port").as_deref(), Some("443"));
        assert_eq!(saved.get("mysql.port").as_deref(), Some("3306"));
        assert_eq!(saved.get("mysql.database").as_deref(), Some("developer"));
    }

    #[test]
    fn declining_mysql_drops_the_group() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = empty_store(&dir);
        store.set("mysql.user", "old");
        let mut prompt = ScriptedPrompt::new(&["devbox", "8080", "", "No"]);

        interactive_configuration(&mut store, &mut prompt).expect("configure");

        assert_eq!(prompt.asked.len(), 4);
        let saved = ConfigStore::load(store.path()).expect("reload");
        assert_eq!(saved.get("name").as_deref(), Some("devbox"));
        assert_eq!(saved.get("http.port").as_deref(), Some("8080"));
        assert!(!saved.contains("mysql"));
    }

    #[test]
    fn terminal_prompt_falls_back_to_default() {
        let mut out = Vec::new();
        let answer = TerminalPrompt::new(&b"\n"[..], &mut out)
            .ask("Project name", "framework")
            .expect("ask");
        assert_eq!(answer, "framework");

        let rendered = String::from_utf8_lossy(&out);
        assert!(rendered.starts_with("Project name (framework): "));
    }

    #[test]
    fn terminal_prompt_trims_the_answer() {
        let mut out = Vec::new();
        let answer = TerminalPrompt::new(&b"  devbox \n"[..], &mut out)
            .ask("Project name", "framework")
            .expect("ask");
        assert_eq!(answer, "devbox");
    }
}
