//! Interactive CLI session driven by a driver definition.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};

use super::normalize;
use super::response::Response;
use super::state::{ModeTracker, SessionState};
use super::transcript::{MASK, Transcript};
use crate::channel::{Channel, CompiledPrompt, ExpectMatch};
use crate::config::EngineConfig;
use crate::credentials::CredentialSet;
use crate::error::{ChannelError, CliError, CredentialError, Error, Result};
use crate::platform::{CliMode, DriverDefinition, ModeRole, ProgramStep};
use crate::transport::{Protocol, Transport};

/// Session tunables, taken from the engine configuration.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub command_timeout: Duration,
    pub elevation_retries: usize,
    pub max_macro_steps: usize,
    pub search_depth: usize,
}

impl From<&EngineConfig> for SessionSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            command_timeout: config.command_timeout(),
            elevation_retries: config.elevation_retries,
            max_macro_steps: config.max_macro_steps,
            search_depth: config.search_depth,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

/// Per-command overrides.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Mode whose prompt ends the command; the current mode when `None`.
    pub mode: Option<String>,
    pub no_cr: bool,
    pub timeout: Option<Duration>,
    /// Leave a viewer once this many lines were collected.
    pub max_lines: Option<usize>,
}

impl CommandOptions {
    pub fn in_mode(mode: impl Into<String>) -> Self {
        Self {
            mode: Some(mode.into()),
            ..Self::default()
        }
    }
}

impl From<&ProgramStep> for CommandOptions {
    fn from(step: &ProgramStep) -> Self {
        Self {
            mode: step.mode.clone(),
            no_cr: step.no_cr,
            timeout: step.timeout,
            max_lines: step.max_lines,
        }
    }
}

/// Values substituted into macro commands.
struct LoginSecrets {
    username: String,
    password: Option<SecretString>,
    /// Tried in turn on successive elevation attempts.
    elevation: Vec<SecretString>,
}

impl LoginSecrets {
    fn from_credential(credential: &CredentialSet) -> Self {
        let copy = |s: &SecretString| SecretString::from(s.expose_secret().to_owned());
        let mut elevation: Vec<SecretString> = credential.super_password().map(copy).into_iter().collect();
        if let Some(password) = credential.password() {
            if !elevation.iter().any(|s| s.expose_secret() == password.expose_secret()) {
                elevation.push(copy(password));
            }
        }
        Self {
            username: credential.username().unwrap_or_default().to_owned(),
            password: credential.password().map(copy),
            elevation,
        }
    }
}

/// A CLI session on one device.
///
/// The session walks the driver's mode graph with macros, runs commands
/// with paging and viewer handling, and tracks the locked prompt. Any read
/// timeout or disconnection marks it broken; later calls fail fast.
pub struct CliSession {
    channel: Channel,
    definition: Arc<DriverDefinition>,
    protocol: Protocol,
    secrets: LoginSecrets,
    settings: SessionSettings,
    tracker: ModeTracker,
    /// Modes whose paging was already disabled.
    pager_avoided: HashSet<String>,
    elevation_attempts: usize,
    transcript: Option<Transcript>,
    connected: bool,
    broken: bool,
}

impl CliSession {
    pub fn new(
        transport: Box<dyn Transport>,
        definition: Arc<DriverDefinition>,
        protocol: Protocol,
        credential: &CredentialSet,
        settings: SessionSettings,
        debug_enabled: bool,
    ) -> Self {
        let transcript = debug_enabled.then(|| {
            let mut transcript = Transcript::new();
            for secret in credential.secrets() {
                transcript.mask(secret);
            }
            transcript
        });
        Self {
            channel: Channel::new(transport, settings.search_depth),
            definition,
            protocol,
            secrets: LoginSecrets::from_credential(credential),
            tracker: ModeTracker::new(protocol.as_str()),
            settings,
            pager_avoided: HashSet::new(),
            elevation_attempts: 0,
            transcript,
            connected: false,
            broken: false,
        }
    }

    /// Connect and run the driver's entry macro.
    ///
    /// On success the session sits in the entry macro's target mode. On
    /// failure the caller still owns the session and must [`close`] it.
    ///
    /// [`close`]: CliSession::close
    pub async fn open(&mut self) -> Result<()> {
        self.tracker.push(SessionState::Connecting);
        self.channel.connect().await?;
        self.connected = true;
        self.tracker.push(SessionState::AwaitingBanner);

        let entry = self.definition.info.entry.clone();
        self.run_macro(&entry).await?;
        info!(
            "Logged in over {} with driver {}, mode {}",
            self.protocol,
            self.definition.name(),
            self.tracker.mode()
        );
        Ok(())
    }

    pub fn mode(&self) -> &str {
        self.tracker.mode()
    }

    pub fn state(&self) -> SessionState {
        self.tracker.state()
    }

    pub fn state_history(&self) -> &[SessionState] {
        self.tracker.history()
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Elevation secrets sent by the last macro run.
    pub fn elevation_attempts(&self) -> usize {
        self.elevation_attempts
    }

    /// Take the debug transcript, if debugging was enabled.
    pub fn take_transcript(&mut self) -> Option<Transcript> {
        self.transcript.take()
    }

    /// Disconnect (idempotent).
    pub async fn close(&mut self) {
        if self.connected {
            self.channel.close().await;
            self.connected = false;
            debug!("Session to {} closed", self.definition.name());
        }
        self.tracker.push(SessionState::Closed);
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.broken || !self.connected {
            return Err(CliError::SessionBroken.into());
        }
        Ok(())
    }

    /// Run macro `name` from the current mode.
    ///
    /// Each step sends the macro command, waits for one of its option
    /// modes and continues with that mode's `auto` macro or its macro of
    /// the same name, until the target mode is reached.
    pub async fn run_macro(&mut self, name: &str) -> Result<()> {
        self.ensure_usable()?;
        if self.tracker.mode() == name {
            return Ok(());
        }

        let definition = Arc::clone(&self.definition);
        let start = definition.mode(self.tracker.mode())?;
        let target = start
            .get_macro(name)
            .ok_or_else(|| CliError::NoMacro {
                mode: start.name.clone(),
                name: name.to_owned(),
            })?
            .target
            .clone()
            .unwrap_or_else(|| name.to_owned());

        // Each macro walks the elevation secrets from the first one
        self.elevation_attempts = 0;
        let mut current = name.to_owned();
        for _ in 0..self.settings.max_macro_steps {
            let mode = definition.mode(self.tracker.mode())?;
            let step = mode.get_macro(&current).ok_or_else(|| CliError::NoMacro {
                mode: mode.name.clone(),
                name: current.clone(),
            })?;
            let options = step
                .options
                .iter()
                .map(|option| {
                    definition.mode(option)?.prompt.as_ref().ok_or_else(|| CliError::UnknownMode {
                        mode: option.clone(),
                    })
                })
                .collect::<std::result::Result<Vec<&CompiledPrompt>, CliError>>()?;

            if let Some(cmd) = &step.cmd {
                let (text, secret) = self.render(cmd);
                let text = if step.no_cr { text } else { text + "\r" };
                self.send(&text, secret).await?;
            }

            let timeout = step.timeout.unwrap_or(self.settings.command_timeout);
            let found = self.expect(&options, timeout).await?;
            let reached = definition.mode(&step.options[found.index])?;
            self.tracker.enter(reached, found.capture);
            debug!("Macro {name}: {} -> {}", mode.name, reached.name);

            if reached.name == target {
                return self.avoid_pager(reached).await;
            }
            if let Some(message) = &reached.fail {
                return Err(CredentialError::Rejected {
                    message: message.clone(),
                }
                .into());
            }
            if mode.role == ModeRole::PrivilegePrompt
                && matches!(reached.role, ModeRole::Basic | ModeRole::Login)
            {
                warn!(
                    "Elevation to '{target}' rejected (attempt {})",
                    self.elevation_attempts
                );
                if self.elevation_attempts > self.settings.elevation_retries {
                    return Err(CredentialError::ElevationRejected {
                        target,
                        attempts: self.elevation_attempts,
                    }
                    .into());
                }
            }

            current = match reached.next_macro(name) {
                Some((next, _)) => next.to_owned(),
                None => {
                    return Err(CliError::TargetNotReached {
                        name: name.to_owned(),
                        target,
                        mode: reached.name.clone(),
                    }
                    .into());
                }
            };
        }

        Err(CliError::MacroLoop {
            name: name.to_owned(),
            target,
            steps: self.settings.max_macro_steps,
        }
        .into())
    }

    /// Run one command and return its cleaned output.
    ///
    /// Pages are continued transparently. In a viewer mode the quit keys
    /// are sent once the viewer prompt shows up (or `max_lines` were
    /// collected) and the session returns to the viewer's exit mode. A
    /// match of the mode's error marker fails with
    /// [`CliError::CommandRejected`]; the session stays usable.
    pub async fn run_command(&mut self, command: &str, options: &CommandOptions) -> Result<Response> {
        self.ensure_usable()?;
        let definition = Arc::clone(&self.definition);
        let mode_name = options
            .mode
            .clone()
            .unwrap_or_else(|| self.tracker.mode().to_owned());
        let mode = definition.mode(&mode_name)?;
        let prompt = mode.prompt.as_ref().ok_or_else(|| CliError::UnknownMode {
            mode: mode_name.clone(),
        })?;
        if mode.clear_prompt {
            self.tracker.clear_strict_prompt();
        }
        let prompt = prompt.locked(self.tracker.strict_prompt());
        let timeout = options.timeout.unwrap_or(self.settings.command_timeout);
        let started = Instant::now();

        let text = if options.no_cr {
            command.to_owned()
        } else {
            format!("{command}\r")
        };
        self.send(&text, false).await?;

        let mut output = String::new();
        let mut pages = 0;
        let mut last_prompt = String::new();
        loop {
            let mut expected = vec![&prompt];
            if let Some(pager) = &mode.pager {
                expected.push(&pager.pattern);
            }
            let found = self.expect(&expected, timeout).await?;
            normalize::append_page(&mut output, &found.before);
            if found.index == 0 {
                last_prompt = found.matched;
                break;
            }

            pages += 1;
            self.tracker.push(SessionState::Paging);
            if mode.is_viewer() && options.max_lines.is_some_and(|max| output.lines().count() >= max) {
                debug!("Leaving viewer after {} lines", output.lines().count());
                break;
            }
            if let Some(pager) = &mode.pager {
                self.send(&pager.response, false).await?;
            }
        }

        if let Some(max) = options.max_lines {
            output = normalize::truncate_lines(&output, max);
        }
        if mode.is_viewer() {
            self.tracker.push(SessionState::Viewer);
            self.leave_viewer(mode).await?;
        } else if pages > 0 {
            self.tracker.push(mode.role.into());
        }

        let output = normalize::strip_echo(&output, command);
        let elapsed = started.elapsed();
        debug!(
            "Command '{}' returned {} bytes in {:?} ({} pages)",
            command.trim_end(),
            output.len(),
            elapsed,
            pages
        );

        if let Some(message) = mode.detect_error(&output) {
            return Err(CliError::CommandRejected {
                command: command.trim_end().to_owned(),
                message,
            }
            .into());
        }
        Ok(Response::new(command, output, last_prompt, pages, elapsed))
    }

    async fn leave_viewer(&mut self, viewer: &CliMode) -> Result<()> {
        let Some(quit) = &viewer.quit else {
            return Ok(());
        };
        let definition = Arc::clone(&self.definition);
        let back = definition.mode(&quit.back_to)?;
        let prompt = back.prompt.as_ref().ok_or_else(|| CliError::UnknownMode {
            mode: back.name.clone(),
        })?;

        self.send(&quit.keys, false).await?;
        let found = self.expect(&[prompt], self.settings.command_timeout).await?;
        self.tracker.enter(back, found.capture);
        Ok(())
    }

    /// Send the pager avoidance commands of `mode`, once per session.
    /// Their rejection is ignored.
    async fn avoid_pager(&mut self, mode: &CliMode) -> Result<()> {
        let Some(pager) = &mode.pager else {
            return Ok(());
        };
        if pager.avoid.is_empty() || !self.pager_avoided.insert(mode.name.clone()) {
            return Ok(());
        }
        for command in &pager.avoid {
            match self.run_command(command, &CommandOptions::default()).await {
                Ok(_) => debug!("Paging disabled with '{command}'"),
                Err(Error::Cli(CliError::CommandRejected { message, .. })) => {
                    debug!("Pager avoidance '{command}' rejected: {message}")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Substitute login values into a macro command. The flag tells
    /// whether the result carries a secret.
    fn render(&mut self, cmd: &str) -> (String, bool) {
        let mut secret = false;
        let mut text = cmd.replace("{{username}}", &self.secrets.username);
        if text.contains("{{password}}") {
            secret = true;
            let password = self
                .secrets
                .password
                .as_ref()
                .map(|p| p.expose_secret())
                .unwrap_or_default();
            text = text.replace("{{password}}", password);
        }
        if text.contains("{{super_password}}") {
            secret = true;
            let index = self.elevation_attempts.min(self.secrets.elevation.len().saturating_sub(1));
            let value = self
                .secrets
                .elevation
                .get(index)
                .map(|s| s.expose_secret())
                .unwrap_or_default();
            if value.is_empty() {
                warn!("No elevation secret available");
            }
            text = text.replace("{{super_password}}", value);
            self.elevation_attempts += 1;
        }
        (text, secret)
    }

    async fn send(&mut self, text: &str, secret: bool) -> Result<()> {
        if let Some(transcript) = self.transcript.as_mut() {
            if secret {
                let tail = if text.ends_with('\r') { "\r" } else { "" };
                transcript.sent(&format!("{MASK}{tail}"));
            } else {
                transcript.sent(text);
            }
        }
        if let Err(e) = self.channel.send(text.as_bytes()).await {
            self.broken = true;
            return Err(e);
        }
        Ok(())
    }

    async fn expect(&mut self, prompts: &[&CompiledPrompt], timeout: Duration) -> Result<ExpectMatch> {
        match self.channel.expect(prompts, timeout).await {
            Ok(found) => {
                if let Some(transcript) = self.transcript.as_mut() {
                    transcript.received(&format!("{}{}", found.before, found.matched));
                }
                Ok(found)
            }
            Err(e) => {
                self.broken = true;
                if let (Some(transcript), Error::Channel(ChannelError::PatternTimeout { partial, .. })) =
                    (self.transcript.as_mut(), &e)
                {
                    transcript.received(partial);
                }
                warn!("Session to {} broken: {e}", self.definition.name());
                Err(e)
            }
        }
    }
}
