//! Scripted device CLIs for the end-to-end tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use secrecy::ExposeSecret;

use netsnap::config::EngineConfig;
use netsnap::credentials::{CredentialKind, CredentialScope, CredentialSet, SnmpCommunity, SnmpVersion};
use netsnap::error::{ConnectFailure, TransportError};
use netsnap::model::{Device, Module, ObservedModule};
use netsnap::transport::{ConnectTarget, Connector, Protocol, SnmpClient, Transport};
use netsnap::{DriverRegistry, SnapshotEngine};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Scripted device behind a [`FakeTransport`].
pub trait FakeCli: Send {
    /// Printed once the connection is up.
    fn greeting(&mut self) -> String;

    /// What the device prints in reply to `data`.
    fn input(&mut self, data: &str) -> String;
}

/// Commands terminated by a carriage return; an unterminated tail is dropped.
fn commands(data: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = data.split('\r').collect();
    parts.pop();
    parts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CiscoMode {
    Username,
    Password,
    Disable,
    Enable,
    EnablePassword,
}

/// IOS-XE router "router1" on a CSR1000V.
pub struct FakeCisco {
    mode: CiscoMode,
    enable_secret: String,
    /// Commands answered with the unknown command marker.
    unknown: Vec<String>,
    /// Local login asked for on the terminal (Telnet).
    login: Option<(String, String)>,
    typed_username: String,
}

impl FakeCisco {
    pub fn new(enable_secret: &str) -> Self {
        Self {
            mode: CiscoMode::Disable,
            enable_secret: enable_secret.to_owned(),
            unknown: Vec::new(),
            login: None,
            typed_username: String::new(),
        }
    }

    pub fn rejecting(mut self, command: &str) -> Self {
        self.unknown.push(command.to_owned());
        self
    }

    /// Ask for a username and password before the user EXEC prompt.
    pub fn with_login(mut self, username: &str, password: &str) -> Self {
        self.login = Some((username.to_owned(), password.to_owned()));
        self.mode = CiscoMode::Username;
        self
    }

    fn prompt(&self) -> &'static str {
        match self.mode {
            CiscoMode::Username => "Username: ",
            CiscoMode::Password => "Password: ",
            CiscoMode::Disable => "router1>",
            CiscoMode::Enable => "router1#",
            CiscoMode::EnablePassword => "",
        }
    }

    fn command(&mut self, command: &str) -> String {
        match self.mode {
            CiscoMode::Username => {
                self.typed_username = command.to_owned();
                self.mode = CiscoMode::Password;
                return format!("{command}\r\n{}", self.prompt());
            }
            CiscoMode::Password => {
                let accepted = self
                    .login
                    .as_ref()
                    .is_some_and(|(user, password)| *user == self.typed_username && password == command);
                if accepted {
                    self.mode = CiscoMode::Disable;
                    return format!("\r\n{}", self.prompt());
                }
                self.mode = CiscoMode::Username;
                return format!("\r\n% Login invalid\r\n\r\n{}", self.prompt());
            }
            _ => {}
        }

        let mut out = format!("{command}\r\n");
        let enabled = self.mode == CiscoMode::Enable;
        let known = !self.unknown.iter().any(|c| c == command);
        match self.mode {
            CiscoMode::EnablePassword => {
                if command == self.enable_secret {
                    self.mode = CiscoMode::Enable;
                } else {
                    out.push_str("% Bad secrets\n");
                    self.mode = CiscoMode::Disable;
                }
                out.push_str(self.prompt());
                return out;
            }
            _ if !known => {
                out.push_str(UNKNOWN_COMMAND);
            }
            _ if enabled && (command == "show running-config" || command == "show startup-config") => {
                out.push_str(RUNNING_CONFIG);
            }
            _ if enabled && command == "show inventory" => out.push_str(INVENTORY),
            _ if command == "show version" => out.push_str(VERSION),
            _ if command == "terminal length 0" => {}
            CiscoMode::Enable if command == "disable" => self.mode = CiscoMode::Disable,
            _ if command.starts_with("show interface") => {
                let name = command
                    .strip_prefix("show interface ")
                    .and_then(|rest| rest.split(' ').next())
                    .unwrap_or_default();
                out.push_str(&interface_status(name));
            }
            CiscoMode::Disable if command == "enable" => {
                self.mode = CiscoMode::EnablePassword;
                out.push_str("Password: ");
                return out;
            }
            _ => out.push_str(UNKNOWN_COMMAND),
        }
        out.push_str(self.prompt());
        out
    }
}

impl FakeCli for FakeCisco {
    fn greeting(&mut self) -> String {
        if self.mode == CiscoMode::Username {
            return format!("\r\nUser Access Verification\r\n\r\n{}", self.prompt());
        }
        self.prompt().to_owned()
    }

    fn input(&mut self, data: &str) -> String {
        commands(data)
            .into_iter()
            .filter(|c| !c.is_empty())
            .map(|c| self.command(c))
            .collect()
    }
}

const UNKNOWN_COMMAND: &str = "% Unknown command or computer name, or unable to find computer address\n";

pub const VERSION: &str = "Cisco IOS XE Software, Version 03.16.07b.S - Extended Support Release\r\n\
Cisco IOS Software, CSR1000V Software (X86_64_LINUX_IOSD-UNIVERSALK9-M), Version 15.5(3)S7b, RELEASE SOFTWARE (fc1)\r\n\
Technical Support: http://www.cisco.com/techsupport\r\n\
Copyright (c) 1986-2018 by Cisco Systems, Inc.\r\n\
Compiled Fri 02-Mar-18 08:11 by mcpre\r\n\
\r\n\
\r\n\
ROM: IOS-XE ROMMON\r\n\
\r\n\
router1 uptime is 18 weeks, 1 day, 43 minutes\r\n\
Uptime for this control processor is 18 weeks, 1 day, 45 minutes\r\n\
System returned to ROM by reload at 18:12:05 UTC Sun Feb 21 2021\r\n\
System image file is \"bootflash:packages.conf\"\r\n\
Last reload reason: <NULL>\r\n\
\r\n\
License Level: ax\r\n\
License Type: Default. No valid license found.\r\n\
Next reload license Level: ax\r\n\
\r\n\
cisco CSR1000V (VXE) processor (revision VXE) with 1090048K/6147K bytes of memory.\r\n\
Processor board ID 90PIQM03HLS\r\n\
4 Gigabit Ethernet interfaces\r\n\
32768K bytes of non-volatile configuration memory.\r\n\
3022136K bytes of physical memory.\r\n\
7774207K bytes of virtual hard disk at bootflash:.\r\n\
\r\n\
Configuration register is 0x2102\r\n";

pub const RUNNING_CONFIG: &str = "!\r\n\
! Last configuration change at 12:12:12 UTC Sat Jan 12 2022 by admin\r\n\
!\r\n\
version 15.5\r\n\
service timestamps debug datetime msec\r\n\
service timestamps log datetime msec\r\n\
!\r\n\
hostname router1\r\n\
!\r\n\
boot-start-marker\r\n\
boot-end-marker\r\n\
!\r\n\
no aaa new-model\r\n\
!\r\n\
no ip domain lookup\r\n\
!\r\n\
interface Loopback0\r\n \
ip address 10.255.0.1 255.255.255.255\r\n\
!\r\n\
interface GigabitEthernet1\r\n \
description Management\r\n \
ip address 192.168.200.101 255.255.255.0\r\n \
negotiation auto\r\n\
!\r\n\
interface GigabitEthernet2\r\n \
ip address 10.0.0.1 255.255.255.254\r\n \
ip ospf network point-to-point\r\n \
negotiation auto\r\n\
!\r\n\
interface GigabitEthernet3\r\n \
no ip address\r\n \
shutdown\r\n \
negotiation auto\r\n\
!\r\n\
interface GigabitEthernet4\r\n \
no ip address\r\n \
shutdown\r\n \
negotiation auto\r\n\
!\r\n\
router ospf 1\r\n \
network 10.0.0.0 0.0.0.1 area 0\r\n \
network 10.255.0.1 0.0.0.0 area 0\r\n\
!\r\n\
ip forward-protocol nd\r\n\
!\r\n\
no ip http server\r\n\
no ip http secure-server\r\n\
ip ssh version 2\r\n\
!\r\n\
access-list 98 permit 192.168.200.0 0.0.0.255\r\n\
!\r\n\
snmp-server community cisco RO 98\r\n\
snmp-server location SNMPLOCATION\r\n\
snmp-server contact SNMPCONTACT\r\n\
snmp-server enable traps config\r\n\
!\r\n\
!\r\n\
control-plane\r\n\
!\r\n\
!\r\n\
line con 0\r\n \
stopbits 1\r\n\
line vty 0 4\r\n \
login local\r\n \
transport input telnet ssh\r\n\
line vty 5 15\r\n \
login local\r\n \
transport input telnet ssh\r\n\
!\r\n\
ntp server pool.ntp.org\r\n\
!\r\n\
end\r\n";

pub const INVENTORY: &str = "NAME: \"Chassis\", DESCR: \"Cisco CSR1000V Chassis\"\r\n\
PID: CSR1000V          , VID: V00, SN: 96NETS96HOT\r\n\
\r\n\
NAME: \"module R0\", DESCR: \"Cisco CSR1000V Route Processor\"\r\n\
PID: CSR1000V          , VID: V00, SN: JAB1616161C\r\n\
\r\n\
NAME: \"module F0\", DESCR: \"Cisco CSR1000V Embedded Services Processor\"\r\n\
PID: CSR1000V          , VID:    , SN:\r\n";

fn interface_status(name: &str) -> String {
    let hardware = |n: u8| format!("Hardware is CSR vNIC, address is 5000.0001.000{n} (bia 5000.0001.000{n})\r\n");
    match name {
        "GigabitEthernet1" => format!(
            "GigabitEthernet1 is up, line protocol is up\r\n{}Internet address is 192.168.200.101/24\r\n",
            hardware(0)
        ),
        "GigabitEthernet2" => format!(
            "GigabitEthernet2 is up, line protocol is up\r\n{}Internet address is 10.0.0.1/31\r\n",
            hardware(1)
        ),
        "GigabitEthernet3" => format!(
            "GigabitEthernet3 is administratively down, line protocol is down\r\n{}",
            hardware(2)
        ),
        "GigabitEthernet4" => format!(
            "GigabitEthernet4 is administratively down, line protocol is down\r\n{}",
            hardware(3)
        ),
        "Loopback0" => "Loopback0 is up, line protocol is up\r\nInternet address is 10.255.0.1/32\r\n".to_owned(),
        _ => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZpeMode {
    Basic,
    Screen,
    Paging,
}

/// NodeGrid console server "NODEGRID-1".
pub struct FakeZpe {
    mode: ZpeMode,
    username: String,
    page_size: usize,
    paged: VecDeque<String>,
}

impl FakeZpe {
    pub fn new(username: &str, page_size: usize) -> Self {
        Self {
            mode: ZpeMode::Basic,
            username: username.to_owned(),
            page_size,
            paged: VecDeque::new(),
        }
    }

    fn prompt(&self) -> String {
        match self.mode {
            ZpeMode::Basic => format!("[{}@NODEGRID-1 /]# ", self.username),
            _ => String::new(),
        }
    }

    fn start_paged(&mut self, text: &str) -> String {
        let mut lines: Vec<String> = text.split('\n').map(str::to_owned).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        self.paged = lines.into();
        self.next_page()
    }

    fn next_page(&mut self) -> String {
        let mut out = String::new();
        for _ in 0..self.page_size {
            let Some(line) = self.paged.pop_front() else {
                break;
            };
            out.push_str(&line);
            out.push('\n');
        }
        if self.paged.is_empty() {
            self.mode = ZpeMode::Basic;
            out.push_str(&self.prompt());
        } else {
            self.mode = ZpeMode::Paging;
            out.push_str("-- more --:");
        }
        out
    }

    fn command(&mut self, command: &str) -> String {
        let mut out = format!("{command}\r\n");
        let basic = self.mode == ZpeMode::Basic;
        let trimmed = command.trim_start();
        if self.mode == ZpeMode::Paging && command.is_empty() {
            out.push_str(&self.next_page());
        } else if basic && trimmed == "hostname" {
            out.push_str(&self.start_paged("NODEGRID-1\r\n"));
        } else if basic && trimmed.trim_end_matches('/') == "show /system/about" {
            out.push_str(&self.start_paged(ABOUT));
        } else if basic && trimmed.trim_end_matches('/') == "show /system/system_usage/memory_usage" {
            out.push_str(&self.start_paged(MEMORY));
        } else if basic && trimmed.trim_end_matches('/') == "show /settings/devices" {
            out.push_str(&self.start_paged(DEVICES));
        } else if basic && trimmed == "show_settings" {
            out.push_str(SETTINGS);
            out.push_str(&self.prompt());
        } else if basic && trimmed == "event_system_audit" {
            out.push_str(AUDIT);
            out.push_str("(h->Help, q->Quit)");
            self.mode = ZpeMode::Screen;
        } else {
            out.push_str(&format!("Error: Invalid command: {command}\r\n"));
            out.push_str(&self.prompt());
        }
        out
    }
}

impl FakeCli for FakeZpe {
    fn greeting(&mut self) -> String {
        self.prompt()
    }

    fn input(&mut self, data: &str) -> String {
        if self.mode == ZpeMode::Screen && data == "q" {
            self.mode = ZpeMode::Basic;
            return format!("\r\n{}", self.prompt());
        }
        commands(data).into_iter().map(|c| self.command(c)).collect()
    }
}

pub const ABOUT: &str = "system: NodeGrid Serial Console\r\n\
licenses: 16\r\n\
software: v3.1.16 (Jul 16 2016 - 16:16:16)\r\n\
cpu: Intel(R) Atom(TM) CPU E3827  @ 1.74GHz\r\n\
cpu_cores: 2\r\n\
bogomips_per_core: 3416.16\r\n\
serial_number: 1416161616\r\n\
uptime: 16 days, 16 hours, 16 minutes\r\n\
model: NSC-T16S\r\n\
part_number:  NSC-T16S-STND-DAC-F-SFP\r\n\
bios_version: 80168T00\r\n\
psu: 2\r\n\
\u{7}";

const MEMORY: &str = "  memory type  total (kb)  used (kb)  free (kb)\r\n\
\x20 ===========  ==========  =========  =========\r\n\
\x20 Mem          3934644     2224184    1710460  \r\n\
\x20 Swap         976892      520612     456280   \r\n\
\u{7}";

const DEVICES: &str = "  * name                     connected through  type          access \r\n\
\x20 * =======================  =================  ============  =======\r\n\
\x20 monitoring   \r\n\
\x20 =============\r\n\
\x20 * AAA-AAA-AAA-AAA-AAAA    ttyS1              local_serial  enabled\r\n\
\x20 not supported\r\n\
\x20 * BBB-BBB-BBB-BBB-BBBB    ttyS2              local_serial  enabled\r\n\
\x20 not supported\r\n\
\x20 * CCC-CCC-CCC-CCC-CCCC    ttyS3              local_serial  enabled\r\n\
\x20 not supported\r\n\
\x20 * DDD-DDD-DDD-DDD-DDDD    ttyS4              local_serial  enabled\r\n\
\x20 not supported\r\n\
\x20 * EEE-EEE-EEE-EEE-EEEE    ttyS5              local_serial  enabled\r\n\
\x20 not supported\r\n\
\x20 * FFF-FFF-FFF-FFF-FFFF    ttyS6              local_serial  enabled\r\n\
\x20 not supported\r\n\
\x20 * GGG-GGG-GGG-GGG-GGGG    ttyS7              local_serial  enabled\r\n\
\x20 not supported\r\n\
\x20 * HHH-HHH-HHH-HHH-HHHH    ttyS8              local_serial  enabled\r\n\
\x20 not supported\r\n\
\x20 * III-III-III-III-IIII    ttyS9              local_serial  enabled\r\n\
\x20 not supported\r\n\
\x20 * JJJ-JJJ-JJJ-JJJ-JJJJ    ttyS10             local_serial  enabled\r\n\
\x20 not supported\r\n\
\x20 * usbS1                   usbS1              usb_serialB   enabled\r\n\
\x20 not supported\r\n";

const SETTINGS: &str = "/settings/system_preferences help_url=http://www.zpesystems.com/ng/v3_0/NodeGrid-UserGuide-v3_0.pdf\r\n\
/settings/system_preferences idle_timeout=1500\r\n\
/settings/system_preferences enable_banner=no\r\n\
/settings/network_connections/ETH0 ethernet_interface=eth0\r\n\
/settings/network_connections/ETH0 connect_automatically=no\r\n\
/settings/network_connections/ETH0 set_as_primary_connection=yes\r\n\
/settings/network_connections/ETH0 enable_lldp=no\r\n\
/settings/network_connections/ETH0 ipv4_mode=dhcp\r\n\
/settings/network_connections/ETH0 ipv6_mode=address_auto_configuration\r\n\
/settings/network_connections/ETH1 ethernet_interface=eth1\r\n\
/settings/network_connections/ETH1 connect_automatically=no\r\n\
/settings/network_connections/ETH1 set_as_primary_connection=no\r\n\
/settings/network_connections/ETH1 enable_lldp=no\r\n\
/settings/network_connections/ETH1 ipv4_mode=dhcp\r\n\
/settings/network_connections/ETH1 ipv6_mode=address_auto_configuration\r\n\
/settings/network_connections/bond connect_automatically=yes\r\n\
/settings/network_connections/bond set_as_primary_connection=no\r\n\
/settings/network_connections/bond enable_lldp=no\r\n\
/settings/network_connections/bond primary_interface=eth0\r\n\
/settings/network_connections/bond secondary_interface=eth1\r\n\
/settings/network_connections/bond bonding_mode=active_backup\r\n\
/settings/network_connections/bond link_monitoring=mii\r\n\
/settings/network_connections/bond monitoring_frequency=100\r\n\
/settings/network_connections/bond link_up_delay=0\r\n\
/settings/network_connections/bond link_down_delay=0\r\n\
/settings/network_connections/bond arp_validate=none\r\n\
/settings/network_connections/bond bond_mac_policy=primary_interf\r\n\
/settings/network_connections/bond ipv4_mode=static\r\n\
/settings/network_connections/bond ipv4_address=10.10.16.16\r\n\
/settings/network_connections/bond ipv4_bitmask=24\r\n\
/settings/network_connections/bond ipv4_gateway=10.10.16.254\r\n\
/settings/network_connections/bond ipv6_mode=no_ipv6_address\r\n\
/settings/snmp/system syscontact=support@zpesystems.com\r\n\
/settings/snmp/system syslocation=\"Nodegrid \"\r\n\
/settings/local_accounts/admin username=admin\r\n\
\r\n";

const AUDIT: &str = "<2022-01-03T11:21:16Z> Event ID 200: A user logged into the system. User: ops@10.16.2.16. Session type: SSH. Authentication Method: TACACS+.\r\n\
<2022-01-03T11:21:16Z> Event ID 201: A user logged out of the system. User: ops@10.16.2.16. Session type: SSH.\r\n\
<2022-01-04T02:52:16Z> Event ID 108: The configuration has changed. Change made by user: homer.\r\n\
<2022-01-04T03:04:16Z> Event ID 200: A user logged into the system. User: ops@10.16.2.16. Session type: SSH. Authentication Method: TACACS+.\r\n";

/// In-memory transport driving a [`FakeCli`].
pub struct FakeTransport {
    cli: Box<dyn FakeCli>,
    /// Username and password the device accepts.
    accepts: (String, String),
    /// Username and password presented by the client.
    presented: (String, String),
    refuse: bool,
    /// Check the presented credentials at connect time (SSH); Telnet
    /// devices ask for them on the terminal instead.
    check_login: bool,
    pending: Vec<u8>,
    connected: bool,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.refuse {
            return Err(TransportError::Connect {
                host: "192.0.2.1".into(),
                port: 22,
                failure: ConnectFailure::Refused,
                message: "connection refused".into(),
            });
        }
        if self.check_login && self.presented != self.accepts {
            return Err(TransportError::AuthenticationFailed {
                user: self.presented.0.clone(),
            });
        }
        self.connected = true;
        let greeting = self.cli.greeting();
        self.pending.extend_from_slice(greeting.as_bytes());
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        let reply = self.cli.input(&String::from_utf8_lossy(data));
        self.pending.extend_from_slice(reply.as_bytes());
        Ok(())
    }

    async fn read_available(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }
        if self.pending.is_empty() {
            tokio::time::sleep(timeout).await;
            return Err(TransportError::ReadTimeout(timeout));
        }
        Ok(std::mem::take(&mut self.pending))
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// One `cli_transport` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub protocol: Protocol,
    pub credential: String,
}

type CliFactory = dyn Fn(&CredentialSet) -> Box<dyn FakeCli> + Send + Sync;

/// SNMP agent answering from a fixed OID table.
#[derive(Clone, Default)]
pub struct FakeAgent {
    community: String,
    values: HashMap<String, String>,
    /// Every OID requested, across clients.
    gets: Arc<Mutex<Vec<String>>>,
}

impl FakeAgent {
    pub fn new(community: &str, values: &[(&str, &str)]) -> Self {
        Self {
            community: community.to_owned(),
            values: values.iter().map(|(o, v)| (o.to_string(), v.to_string())).collect(),
            gets: Arc::default(),
        }
    }
}

struct FakeSnmpClient {
    agent: FakeAgent,
    community: String,
}

#[async_trait]
impl SnmpClient for FakeSnmpClient {
    async fn get(&mut self, oid: &str) -> Result<String, TransportError> {
        if self.community != self.agent.community {
            // Agents drop requests with a wrong community
            return Err(TransportError::ReadTimeout(Duration::from_secs(1)));
        }
        self.agent.gets.lock().unwrap().push(oid.to_owned());
        self.agent
            .values
            .get(oid)
            .cloned()
            .ok_or_else(|| TransportError::Snmp(format!("no such object {oid}")))
    }
}

/// Connector handing out [`FakeTransport`]s and recording every attempt.
pub struct FakeConnector {
    factory: Box<CliFactory>,
    accepts: (String, String),
    refused: Vec<Protocol>,
    attempts: Mutex<Vec<Attempt>>,
    agent: Option<FakeAgent>,
}

impl FakeConnector {
    pub fn new(
        username: &str,
        password: &str,
        factory: impl Fn(&CredentialSet) -> Box<dyn FakeCli> + Send + Sync + 'static,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            accepts: (username.to_owned(), password.to_owned()),
            refused: Vec::new(),
            attempts: Mutex::new(Vec::new()),
            agent: None,
        }
    }

    /// Router accepting admin/admin with enable secret `enable_secret`.
    pub fn cisco(enable_secret: &str) -> Self {
        let secret = enable_secret.to_owned();
        Self::new("admin", "admin", move |_| Box::new(FakeCisco::new(&secret)))
    }

    /// Router asking for admin/admin on the terminal, as over Telnet.
    pub fn cisco_login(enable_secret: &str) -> Self {
        let secret = enable_secret.to_owned();
        Self::new("admin", "admin", move |_| {
            Box::new(FakeCisco::new(&secret).with_login("admin", "admin"))
        })
    }

    /// Console server accepting admin/admin, paging every `page_size` lines.
    pub fn zpe(page_size: usize) -> Self {
        Self::new("admin", "admin", move |credential| {
            Box::new(FakeZpe::new(credential.username().unwrap_or_default(), page_size))
        })
    }

    pub fn refusing(mut self, protocol: Protocol) -> Self {
        self.refused.push(protocol);
        self
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn with_agent(mut self, agent: FakeAgent) -> Self {
        self.agent = Some(agent);
        self
    }

    /// OIDs the agent answered, in order.
    pub fn snmp_gets(&self) -> Vec<String> {
        self.agent
            .as_ref()
            .map(|agent| agent.gets.lock().unwrap().clone())
            .unwrap_or_default()
    }
}

impl Connector for FakeConnector {
    fn cli_transport(
        &self,
        protocol: Protocol,
        _target: &ConnectTarget,
        credential: &CredentialSet,
        _config: &EngineConfig,
    ) -> Result<Box<dyn Transport>, TransportError> {
        self.attempts.lock().unwrap().push(Attempt {
            protocol,
            credential: credential.name.clone(),
        });
        let presented = (
            credential.username().unwrap_or_default().to_owned(),
            credential
                .password()
                .map(|p| p.expose_secret().to_owned())
                .unwrap_or_default(),
        );
        Ok(Box::new(FakeTransport {
            cli: (self.factory)(credential),
            accepts: self.accepts.clone(),
            presented,
            refuse: self.refused.contains(&protocol),
            check_login: protocol == Protocol::Ssh,
            pending: Vec::new(),
            connected: false,
        }))
    }

    fn snmp_client(
        &self,
        _target: &ConnectTarget,
        credential: &CredentialSet,
        _config: &EngineConfig,
    ) -> Result<Box<dyn SnmpClient>, TransportError> {
        let (Some(agent), CredentialKind::SnmpCommunity(c)) = (&self.agent, &credential.kind) else {
            return Err(TransportError::Unsupported {
                protocol: Protocol::Snmp.to_string(),
            });
        };
        Ok(Box::new(FakeSnmpClient {
            agent: agent.clone(),
            community: c.community.expose_secret().to_owned(),
        }))
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        attempt_pause_ms: 0,
        command_timeout_ms: 2_000,
        ..EngineConfig::default()
    }
}

pub fn engine(connector: Arc<FakeConnector>) -> SnapshotEngine {
    SnapshotEngine::new(
        Arc::new(DriverRegistry::builtin().unwrap()),
        connector,
        test_config(),
    )
}

pub fn account(id: u64, name: &str, password: &str, super_password: Option<&str>) -> CredentialSet {
    CredentialSet::cli_account(id, name, CredentialScope::Global, "admin", password, super_password)
}

pub fn community(id: u64, name: &str, community: &str) -> CredentialSet {
    CredentialSet::new(
        id,
        name,
        CredentialScope::Global,
        CredentialKind::SnmpCommunity(SnmpCommunity {
            version: SnmpVersion::V2c,
            community: community.to_owned().into(),
        }),
    )
}

pub fn earlier() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// The router as known before its first snapshot, with two stale modules.
pub fn cisco_device() -> Device {
    let mut device = Device::new(1, "CiscoIOS12", IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));
    device.protocol_order = vec![Protocol::Ssh];
    device.modules = vec![
        Module::first_seen(&ObservedModule::new("chassis", "TESTCHASSIS", "16161616TEST16"), earlier()),
        Module::first_seen(&ObservedModule::new("slot", "TESTSLOT", "29038POSD203"), earlier()),
    ];
    device
}

pub fn zpe_device() -> Device {
    Device::new(2, "ZPENodeGrid", IpAddr::V4(Ipv4Addr::new(192, 0, 2, 2)))
}
