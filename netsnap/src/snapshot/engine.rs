//! The snapshot state machine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use super::dump;
use super::result::{ConfigOutcome, SnapshotPhase, SnapshotResult, SnapshotStatus, StepFailure};
use super::SnapshotOptions;
use crate::config::EngineConfig;
use crate::credentials::{CredentialSet, candidates};
use crate::driver::{CliSession, CommandOptions, SessionSettings, Transcript};
use crate::error::{CliError, Error, ErrorKind, Result, SnapshotError};
use crate::extract::{Extracted, Extractor};
use crate::model::{Config, Device, DeviceField, DeviceStatus};
use crate::platform::{DriverDefinition, DriverRegistry, ForEach, ProgramStep, StepAction};
use crate::reconcile::reconcile;
use crate::transport::{ConnectTarget, Connector, Protocol, SYS_UPTIME_OID, SnmpClient};

/// Runs snapshots of single devices.
///
/// The engine holds no per-device state, one instance serves any number
/// of concurrent runs.
pub struct SnapshotEngine {
    registry: Arc<DriverRegistry>,
    connector: Arc<dyn Connector>,
    config: EngineConfig,
}

/// Bookkeeping of one run.
struct Run<'a> {
    device: &'a Device,
    options: &'a SnapshotOptions,
    now: DateTime<Utc>,
    result: SnapshotResult,
    transcript: Option<Transcript>,
}

impl Run<'_> {
    fn reach(&mut self, phase: SnapshotPhase) {
        debug!("{}: {:?}", self.device.label(), phase);
        self.result.phase = phase;
    }

    fn collect_transcript(&mut self, session: &mut CliSession) {
        if let (Some(all), Some(more)) = (self.transcript.as_mut(), session.take_transcript()) {
            all.append(more);
        }
    }
}

impl SnapshotEngine {
    pub fn new(registry: Arc<DriverRegistry>, connector: Arc<dyn Connector>, config: EngineConfig) -> Self {
        Self {
            registry,
            connector,
            config,
        }
    }

    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Take a snapshot of `device`.
    ///
    /// `credentials` is the pool the candidates are picked from, unless
    /// the options carry a one-time override. Failures are reported in the
    /// result, never as an `Err`.
    pub async fn run_snapshot(
        &self,
        device: &Device,
        credentials: &[CredentialSet],
        options: SnapshotOptions,
    ) -> SnapshotResult {
        let now = options.timestamp.unwrap_or_else(Utc::now);
        let mut run = Run {
            device,
            options: &options,
            now,
            result: SnapshotResult::new(device.id, now),
            transcript: options.debug_enabled.then(Transcript::new),
        };
        info!("Starting snapshot of {}", device.label());

        match self.execute(&mut run, credentials).await {
            Ok(()) => {
                run.reach(SnapshotPhase::Done);
                run.result.outputs.clear();
                run.result.status = if run.result.partial_failures.is_empty() {
                    SnapshotStatus::Success
                } else {
                    SnapshotStatus::Partial
                };
                info!(
                    "Snapshot of {} done ({:?}, {} warnings)",
                    device.label(),
                    run.result.status,
                    run.result.warnings.len()
                );
            }
            Err(error) => {
                warn!(
                    "Snapshot of {} failed in {:?}: {error}",
                    device.label(),
                    run.result.phase
                );
                let result = &mut run.result;
                result.status = SnapshotStatus::Failure;
                result.failed_in = Some(result.phase);
                result.error_kind = Some(error.kind());
                result.error = Some(error.to_string());
                result.device = None;
                result.config = None;
                result.module_diff = None;
                result.interfaces.clear();
            }
        }

        let mut result = run.result;
        result.debug_transcript = run.transcript.map(Transcript::into_entries);
        result.finished_at = Utc::now().max(result.started_at);
        result
    }

    async fn execute(&self, run: &mut Run<'_>, credentials: &[CredentialSet]) -> Result<()> {
        let device = run.device;
        if device.status == DeviceStatus::Disabled {
            return Err(SnapshotError::DeviceDisabled {
                device: device.label(),
            }
            .into());
        }
        let definition = self
            .registry
            .get_by_name(&device.driver)
            .ok_or_else(|| SnapshotError::MissingDriver {
                name: device.driver.clone(),
            })?;
        run.reach(SnapshotPhase::DriverResolved);

        let target = device.connect_target(run.options.force_connect_address);
        let needs_cli = definition
            .program
            .iter()
            .any(|step| !matches!(step.action, StepAction::SnmpGet(_)));

        let mut session = if needs_cli {
            Some(self.connect(run, &definition, &target, credentials).await?)
        } else {
            run.reach(SnapshotPhase::CredentialsResolved);
            None
        };
        run.reach(SnapshotPhase::Connected);

        let mut snmp: Option<Box<dyn SnmpClient>> = None;
        let outcome = self
            .run_program(run, &definition, session.as_mut(), &mut snmp, &target, credentials)
            .await;
        if let Some(session) = session.as_mut() {
            session.close().await;
            run.collect_transcript(session);
        }
        if let Some(client) = snmp.as_mut() {
            client.close().await;
        }
        let extracted = outcome?;
        run.reach(SnapshotPhase::CommandsRun);
        run.result.warnings = extracted.warnings.clone();
        run.reach(SnapshotPhase::Parsed);

        self.assemble(run, &definition, extracted).await?;
        run.reach(SnapshotPhase::Reconciled);
        Ok(())
    }

    /// Protocols to try, in order.
    fn protocols(device: &Device, definition: &DriverDefinition) -> Vec<Protocol> {
        let order = if device.protocol_order.is_empty() {
            &definition.info.protocols
        } else {
            &device.protocol_order
        };
        order
            .iter()
            .copied()
            .filter(|p| p.is_cli() && definition.supports(*p))
            .collect()
    }

    /// Credential candidates, or the one-time override.
    fn candidates<'c>(
        device: &Device,
        options: &'c SnapshotOptions,
        credentials: &'c [CredentialSet],
        protocol: Protocol,
    ) -> Vec<&'c CredentialSet> {
        match &options.credentials_override {
            Some(set) if set.usable_over(protocol) => vec![set],
            Some(_) => Vec::new(),
            None => candidates(device, credentials, protocol),
        }
    }

    /// Find the first protocol and credential that log in.
    async fn connect(
        &self,
        run: &mut Run<'_>,
        definition: &Arc<DriverDefinition>,
        target: &ConnectTarget,
        credentials: &[CredentialSet],
    ) -> Result<CliSession> {
        let protocols = Self::protocols(run.device, definition);
        let options = run.options;
        let mut rejected = 0;

        for protocol in &protocols {
            let protocol = *protocol;
            let sets = Self::candidates(run.device, options, credentials, protocol);
            run.reach(SnapshotPhase::CredentialsResolved);
            debug!("{} candidate credentials over {protocol}", sets.len());

            for credential in sets {
                if run.result.attempts > 0 {
                    tokio::time::sleep(self.config.attempt_pause()).await;
                }
                run.result.attempts += 1;
                debug!(
                    "Trying {protocol} to {}:{} with credential '{}'",
                    target.address,
                    target.port(protocol),
                    credential.name
                );
                match self.open(run, definition, protocol, target, credential).await {
                    Ok(session) => {
                        run.result.protocol = Some(protocol);
                        run.result.credential = Some(credential.summary());
                        return Ok(session);
                    }
                    Err(e) if e.is_credential_failure() => {
                        warn!("Credential '{}' rejected over {protocol}: {e}", credential.name);
                        rejected += 1;
                    }
                    Err(e) if e.is_connect_failure() => {
                        warn!("Giving up on {protocol}: {e}");
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if rejected > 0 {
            Err(SnapshotError::AuthenticationExhausted {
                tried: run.result.attempts,
            }
            .into())
        } else {
            let names: Vec<&str> = protocols.iter().map(|p| p.as_str()).collect();
            Err(SnapshotError::ConnectFailed {
                protocols: if names.is_empty() {
                    "no usable protocol".to_owned()
                } else {
                    names.join(", ")
                },
            }
            .into())
        }
    }

    /// Connect and log in with one credential; the session is closed on
    /// failure.
    async fn open(
        &self,
        run: &mut Run<'_>,
        definition: &Arc<DriverDefinition>,
        protocol: Protocol,
        target: &ConnectTarget,
        credential: &CredentialSet,
    ) -> Result<CliSession> {
        let transport = self
            .connector
            .cli_transport(protocol, target, credential, &self.config)?;
        let mut session = CliSession::new(
            transport,
            Arc::clone(definition),
            protocol,
            credential,
            SessionSettings::from(&self.config),
            run.options.debug_enabled,
        );
        match session.open().await {
            Ok(()) => Ok(session),
            Err(e) => {
                session.close().await;
                run.collect_transcript(&mut session);
                Err(e)
            }
        }
    }

    async fn run_program(
        &self,
        run: &mut Run<'_>,
        definition: &DriverDefinition,
        mut session: Option<&mut CliSession>,
        snmp: &mut Option<Box<dyn SnmpClient>>,
        target: &ConnectTarget,
        credentials: &[CredentialSet],
    ) -> Result<Extracted> {
        let mut extractor = Extractor::new(definition);
        for step in &definition.program {
            if step.diagnostic && run.options.skip_diagnostics {
                debug!("Skipping diagnostic step '{}'", step.id);
                continue;
            }

            match &step.action {
                StepAction::Command(command) if step.for_each == Some(ForEach::Interface) => {
                    let session = Self::session(&mut session)?;
                    for name in extractor.interface_names() {
                        let command = command.replace("{name}", &name);
                        match session.run_command(&command, &CommandOptions::from(step)).await {
                            Ok(response) => {
                                extractor.apply_to_interface(step, &name, &response.result);
                                run.result.outputs.insert(format!("{}:{name}", step.id), response.result);
                            }
                            Err(e) => Self::step_failed(run, step, e, session.is_broken())?,
                        }
                    }
                }
                StepAction::Command(command) => {
                    let session = Self::session(&mut session)?;
                    match session.run_command(command, &CommandOptions::from(step)).await {
                        Ok(response) => {
                            extractor.apply(step, &response.result);
                            run.result.outputs.insert(step.id.clone(), response.result);
                        }
                        Err(e) => Self::step_failed(run, step, e, session.is_broken())?,
                    }
                }
                StepAction::Macro(name) => {
                    let session = Self::session(&mut session)?;
                    if let Err(e) = session.run_macro(name).await {
                        Self::step_failed(run, step, e, session.is_broken())?;
                    }
                }
                StepAction::SnmpGet(oid) => {
                    let value = match self.snmp(run, snmp, target, credentials).await {
                        Ok(client) => client.get(oid).await.map_err(Error::from),
                        Err(e) => Err(e),
                    };
                    match value {
                        Ok(value) => {
                            extractor.apply(step, &value);
                            run.result.outputs.insert(step.id.clone(), value);
                        }
                        Err(e) => Self::step_failed(run, step, e, false)?,
                    }
                }
            }
        }
        Ok(extractor.finish())
    }

    fn session<'s>(session: &'s mut Option<&mut CliSession>) -> Result<&'s mut CliSession> {
        session
            .as_deref_mut()
            .ok_or_else(|| CliError::SessionBroken.into())
    }

    /// Record a failed step, or stop the run.
    ///
    /// Read timeouts and broken sessions always stop the run; other errors
    /// stop it only for required steps.
    fn step_failed(run: &mut Run<'_>, step: &ProgramStep, error: Error, broken: bool) -> Result<()> {
        if broken || error.kind() == ErrorKind::ReadTimeout {
            return Err(error);
        }
        if step.optional {
            warn!("Optional step '{}' failed: {error}", step.id);
            run.result.partial_failures.push(StepFailure::new(&step.id, &error));
            return Ok(());
        }
        Err(SnapshotError::Incomplete {
            step: step.id.clone(),
            source: Box::new(error),
        }
        .into())
    }

    /// The run's SNMP client, opened on first use.
    async fn snmp<'s>(
        &self,
        run: &Run<'_>,
        slot: &'s mut Option<Box<dyn SnmpClient>>,
        target: &ConnectTarget,
        credentials: &[CredentialSet],
    ) -> Result<&'s mut Box<dyn SnmpClient>> {
        let client = match slot.take() {
            Some(client) => client,
            None => self.snmp_client(run, target, credentials).await?,
        };
        Ok(slot.insert(client))
    }

    /// Open an SNMP client with the first credential that answers.
    async fn snmp_client(
        &self,
        run: &Run<'_>,
        target: &ConnectTarget,
        credentials: &[CredentialSet],
    ) -> Result<Box<dyn SnmpClient>> {
        let sets = Self::candidates(run.device, run.options, credentials, Protocol::Snmp);
        let mut last = None;
        for credential in sets {
            let mut client = match self.connector.snmp_client(target, credential, &self.config) {
                Ok(client) => client,
                Err(e) => {
                    last = Some(e);
                    continue;
                }
            };
            match client.get(SYS_UPTIME_OID).await {
                Ok(_) => return Ok(client),
                Err(e) => {
                    warn!("SNMP credential '{}' got no answer: {e}", credential.name);
                    client.close().await;
                    last = Some(e);
                }
            }
        }
        match last {
            Some(e) => Err(e.into()),
            None => Err(SnapshotError::AuthenticationExhausted { tried: 0 }.into()),
        }
    }

    /// Build the new device state, config and module diff.
    async fn assemble(&self, run: &mut Run<'_>, definition: &DriverDefinition, extracted: Extracted) -> Result<()> {
        let now = run.now;
        let mut device = run.device.clone();

        for (field, value) in &extracted.device_fields {
            match field {
                DeviceField::Name => device.name = value.clone(),
                DeviceField::Family => device.family = value.clone(),
                DeviceField::Location => device.location = value.clone(),
                DeviceField::Contact => device.contact = value.clone(),
                DeviceField::SoftwareVersion => device.software_version = value.clone(),
                DeviceField::SerialNumber => device.serial_number = value.clone(),
                DeviceField::NetworkClass => {
                    if let Ok(class) = value.parse() {
                        device.network_class = class;
                    }
                }
                DeviceField::Vrf => {}
            }
        }
        device.vrfs = extracted.vrfs;
        device.attributes = extracted.device_attributes;
        device.interfaces = extracted.interfaces;

        let config = Config {
            device_id: device.id,
            created_at: now,
            author: extracted.config_author.unwrap_or_default(),
            attributes: extracted.config_attributes,
        };
        let outcome = match &device.last_config {
            Some(last) if last.same_content(&config) => {
                info!("The configuration of {} hasn't changed", device.label());
                ConfigOutcome::Unchanged
            }
            _ => {
                device.last_config = Some(config.clone());
                ConfigOutcome::New(config)
            }
        };
        if let (Some(directory), Some(config)) = (&self.config.dump_directory, outcome.new_config()) {
            let path = dump::path(directory, &device.name);
            let text = dump::render(definition, config, now);
            match tokio::fs::write(&path, text).await {
                Ok(()) => debug!("Config dumped to {}", path.display()),
                Err(e) => warn!("Couldn't write config dump {}: {e}", path.display()),
            }
        }

        let diff = reconcile(&device.modules, &extracted.modules, now, self.config.module_reappearance)?;
        device.modules = diff.modules();
        device.last_snapshot_success = Some(now);

        run.result.interfaces = device.interfaces.clone();
        run.result.config = Some(outcome);
        run.result.module_diff = Some(diff);
        run.result.device = Some(device);
        Ok(())
    }
}
