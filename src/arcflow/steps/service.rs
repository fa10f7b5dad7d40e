// SPDX-License-Identifier: MIT

//! Service launch and console-error check

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use super::{resolve_in, shell};
use crate::adk::error::BoxError;
use crate::adk::step::Step;
use crate::arcflow::config::ServiceSettings;
use crate::arcflow::workflow::state::DevState;

/// Infer (install commands, start command) from the files in `repo`
///
/// Checked in order: npm, Maven/Gradle, Composer, Go modules, pip. A pip
/// project gets no start command.
pub fn detect_service_commands(repo: &Path) -> (Vec<String>, Option<String>) {
    let has = |name: &str| repo.join(name).exists();
    let commands = |install: &[&str], start: Option<&str>| -> (Vec<String>, Option<String>) {
        (
            install.iter().map(|c| c.to_string()).collect(),
            start.map(String::from),
        )
    };

    if has("package.json") {
        commands(&["npm install"], Some("npm run dev"))
    } else if has("pom.xml") || has("build.gradle") {
        if has("mvnw.cmd") {
            commands(
                &["mvnw.cmd -q -DskipTests package"],
                Some("mvnw.cmd spring-boot:run"),
            )
        } else if has("gradlew.bat") {
            commands(&["gradlew.bat build -x test"], Some("gradlew.bat bootRun"))
        } else {
            commands(&["mvn -q -DskipTests package"], Some("mvn spring-boot:run"))
        }
    } else if has("composer.json") {
        let start = if has("artisan") {
            Some("php artisan serve --host 0.0.0.0 --port 8000")
        } else if repo.join("public").is_dir() {
            Some("php -S 0.0.0.0:8000 -t public")
        } else if has("index.php") {
            Some("php -S 0.0.0.0:8000 index.php")
        } else {
            None
        };
        commands(&["composer install"], start)
    } else if has("go.mod") {
        commands(&["go mod tidy"], Some("go run ."))
    } else if has("requirements.txt") {
        commands(&["pip install -r requirements.txt"], None)
    } else {
        (Vec::new(), None)
    }
}

/// Command launched for a `module:app` service entry
fn uvicorn(entry: &str) -> String {
    format!("uvicorn {} --host 0.0.0.0 --port 8000 --reload", entry)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Installs dependencies and launches the service in the background
///
/// The start command comes from `start_command`, then `service_entry`, then
/// repository detection. The service is not awaited; its output goes to the
/// configured log file.
pub struct ServiceManageStep {
    settings: ServiceSettings,
}

impl ServiceManageStep {
    pub fn new(settings: ServiceSettings) -> Self {
        Self { settings }
    }

    /// Start command plus any extra installs it depends on
    fn start_plan(state: &DevState, repo: &Path) -> (Option<String>, Vec<String>) {
        if let Some(start) = non_blank(state.start_command.as_deref()) {
            return (Some(start.to_string()), Vec::new());
        }
        if let Some(entry) = non_blank(state.service_entry.as_deref()) {
            let command = if entry.contains(':') {
                uvicorn(entry)
            } else {
                entry.to_string()
            };
            return (Some(command), Vec::new());
        }
        let (install, start) = detect_service_commands(repo);
        (start, install)
    }

    async fn install(repo: &Path, commands: &[String]) {
        for command in commands.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
            match shell(command, repo).status().await {
                Ok(status) if status.success() => log::info!("install ok: {}", command),
                Ok(status) => log::warn!("install '{}' exited with {}", command, status),
                Err(e) => log::warn!("install '{}' could not run: {}", command, e),
            }
        }
    }

    async fn launch(&self, repo: &Path, command: &str) -> std::io::Result<()> {
        let log_path = resolve_in(&repo.to_string_lossy(), &self.settings.log_file);
        if let Some(parent) = log_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let out = tokio::fs::File::create(&log_path).await?.into_std().await;
        let err = out.try_clone()?;

        let child = shell(command, repo)
            .stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::from(err))
            .spawn()?;
        log::info!(
            "Launched '{}' (pid {:?}), output in {}",
            command,
            child.id(),
            log_path.display()
        );
        Ok(())
    }

    fn started(value: bool) -> DevState {
        log::info!("service_started: {}", value);
        DevState {
            service_started: Some(value),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Step<DevState> for ServiceManageStep {
    async fn run(&self, state: &DevState) -> Result<DevState, BoxError> {
        let repo = Path::new(state.repo_path());

        Self::install(repo, state.install_commands.as_deref().unwrap_or_default()).await;

        let (command, extra_installs) = Self::start_plan(state, repo);
        Self::install(repo, &extra_installs).await;

        let Some(command) = command else {
            log::warn!("No start command found for {}", repo.display());
            return Ok(Self::started(false));
        };

        match self.launch(repo, &command).await {
            Ok(()) => Ok(Self::started(true)),
            Err(e) => {
                log::warn!("Could not launch '{}': {}", command, e);
                Ok(Self::started(false))
            }
        }
    }
}

/// Scans the service output for error lines
///
/// Waits the configured grace period first. Finding errors bumps
/// `repair_attempts`; the workflow router decides whether to repair.
pub struct CheckConsoleErrorsStep {
    settings: ServiceSettings,
    max_attempts: u32,
}

impl CheckConsoleErrorsStep {
    pub fn new(settings: ServiceSettings, max_attempts: u32) -> Self {
        Self {
            settings,
            max_attempts,
        }
    }

    fn error_lines(&self, output: &str) -> Vec<String> {
        let markers: Vec<String> = self
            .settings
            .error_markers
            .iter()
            .map(|m| m.to_lowercase())
            .collect();
        let lines: Vec<String> = output
            .lines()
            .filter(|line| {
                let lower = line.to_lowercase();
                markers.iter().any(|m| lower.contains(m.as_str()))
            })
            .map(|line| line.trim_end().to_string())
            .collect();

        let skip = lines.len().saturating_sub(self.settings.max_error_lines);
        lines.into_iter().skip(skip).collect()
    }
}

#[async_trait]
impl Step<DevState> for CheckConsoleErrorsStep {
    async fn run(&self, state: &DevState) -> Result<DevState, BoxError> {
        if !state.service_started.unwrap_or(false) {
            log::info!("console_errors: service not running, nothing to check");
            return Ok(DevState {
                console_errors: Some(String::new()),
                ..Default::default()
            });
        }

        tokio::time::sleep(Duration::from_millis(self.settings.console_wait_ms)).await;

        let log_path = resolve_in(state.repo_path(), &self.settings.log_file);
        let output = match tokio::fs::read(&log_path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                log::debug!("No service output at {}: {}", log_path.display(), e);
                String::new()
            }
        };

        let errors = self.error_lines(&output);
        if errors.is_empty() {
            log::info!("console_errors: none");
            return Ok(DevState {
                console_errors: Some(String::new()),
                ..Default::default()
            });
        }

        let attempts = state.repair_attempts.unwrap_or(0) + 1;
        log::warn!("console_errors: {} lines (check {})", errors.len(), attempts);
        if attempts > self.max_attempts {
            log::warn!(
                "Repair limit of {} reached, finishing with errors",
                self.max_attempts
            );
        }

        Ok(DevState {
            console_errors: Some(errors.join("\n")),
            repair_attempts: Some(attempts),
            ..Default::default()
        })
    }
}
