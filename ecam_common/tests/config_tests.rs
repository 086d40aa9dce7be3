//! Full controller configuration files.

use ecam_common::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const FULL: &str = r#"
[shared]
service_name = "ecam-trigger-01"
log_level = "debug"

[link]
driver = "tcp"
host = "icepap01"
port = 5001
timeout = 1.5

[trigger]
controller_alias = "ipap01"
element = 2
axis_infos = "InfoA, InfoC"
start_trigger_only = true

[[trigger.ecam_source]]
axis = 44
source = "ENCIN"

[[trigger.ecam_source]]
axis = 45
source = "TGTENC"

[[motors]]
axis = 44
alias = "dmot44"
step_per_unit = 100.0

[[motors]]
axis = 45
alias = "dmot45"
step_per_unit = -2.5
"#;

fn write_config(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn full_config_loads_and_validates() {
    let file = write_config(FULL);
    let config = ControllerConfig::load(file.path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.shared.log_level, LogLevel::Debug);
    assert_eq!(config.link.driver, "tcp");
    assert_eq!(config.link.port, 5001);
    assert_eq!(config.trigger.element, 2);
    assert_eq!(config.trigger.axis_info_list(), vec!["InfoA", "InfoC"]);
    assert!(config.trigger.start_trigger_only);

    let sources = config.trigger.source_map();
    assert_eq!(sources[&44], "ENCIN");
    assert_eq!(sources[&45], "TGTENC");
    assert_eq!(SourceKind::from_name(&sources[&44]), Some(SourceKind::ExternalEncoder));

    let motors = StaticMotorDirectory::from_entries(&config.motors);
    assert_eq!(motors.step_per_unit(45).unwrap(), -2.5);
    assert_eq!(motors.alias(44).as_deref(), Some("dmot44"));
}

#[test]
fn duplicate_motor_axis_rejected() {
    let text = format!("{FULL}\n[[motors]]\naxis = 44\nalias = \"again\"\nstep_per_unit = 1.0\n");
    let config = ControllerConfig::load(write_config(&text).path()).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError(msg)) if msg.contains("44")
    ));
}

#[test]
fn duplicate_motor_alias_rejected() {
    let text = format!("{FULL}\n[[motors]]\naxis = 46\nalias = \"dmot45\"\nstep_per_unit = 1.0\n");
    let config = ControllerConfig::load(write_config(&text).path()).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError(msg)) if msg.contains("dmot45")
    ));
}

#[test]
fn zero_step_per_unit_rejected() {
    let text = FULL.replace("step_per_unit = 100.0", "step_per_unit = 0.0");
    let config = ControllerConfig::load(write_config(&text).path()).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn tcp_without_host_rejected() {
    let text = FULL.replace("host = \"icepap01\"\n", "");
    let config = ControllerConfig::load(write_config(&text).path()).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn missing_shared_section_is_parse_error() {
    let text = "[link]\ndriver = \"simulation\"\n";
    assert!(matches!(
        ControllerConfig::load(write_config(text).path()),
        Err(ConfigError::ParseError(_))
    ));
}
