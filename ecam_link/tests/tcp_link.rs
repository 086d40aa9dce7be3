//! TCP link tests against a scripted in-process controller.

use ecam_common::link::config::LinkConfig;
use ecam_common::link::driver::LinkError;
use ecam_common::link::types::{OutputLevel, OutputPolarity, OutputTarget, SourceKind};
use ecam_link::default_registry;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

/// Serve one connection: answer each request with the matching scripted
/// reply and report every request received.
fn scripted_controller(script: Vec<(&'static str, &'static str)>) -> (u16, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut writer = stream.try_clone().expect("clone");
        let reader = BufReader::new(stream);
        let mut replies = script.into_iter();
        for line in reader.lines() {
            let Ok(line) = line else { break };
            let _ = tx.send(line);
            let Some((_, reply)) = replies.next() else { break };
            writer.write_all(reply.as_bytes()).expect("write");
            writer.write_all(b"\r\n").expect("write");
        }
    });

    (port, rx)
}

fn tcp_config(port: u16) -> LinkConfig {
    LinkConfig {
        driver: "tcp".into(),
        host: "127.0.0.1".into(),
        port,
        timeout: 1.0,
        ..Default::default()
    }
}

#[test]
fn queries_and_commands_round_trip() {
    let (port, requests) = scripted_controller(vec![
        ("44:?STATUS", "44:?STATUS 0x00800C03"),
        ("44:?CFG EINNSTEP", "44:?CFG EINNSTEP 10000"),
        ("#44:SYNCAUX ECAM NORMAL", "44:SYNCAUX OK"),
        ("#44:ECAMDAT ENCIN 3 0 125 250", "44:ECAMDAT OK"),
        ("?PMUX", "?PMUX B44 E0 AUX HARD"),
    ]);

    let registry = default_registry();
    let mut link = registry.create(&tcp_config(port)).expect("create");
    assert_eq!(link.name(), "tcp");

    let state = link.read_state(44).expect("state");
    assert!(state.is_poweron());
    assert!(state.is_moving());
    assert!(state.is_settling());

    assert_eq!(link.read_config(44, "EINNSTEP").unwrap(), "10000");

    link.write_output(44, &OutputTarget::SyncAux, OutputLevel::Ecam, OutputPolarity::Normal)
        .expect("syncaux");
    link.load_table(44, &[0.0, 125.0, 250.0], SourceKind::ExternalEncoder)
        .expect("table");

    let links = link.list_links().expect("pmux");
    assert_eq!(links.len(), 1);
    assert!(links[0].drives("E0"));

    let sent: Vec<String> = requests.try_iter().collect();
    assert_eq!(
        sent,
        vec![
            "44:?STATUS",
            "44:?CFG EINNSTEP",
            "#44:SYNCAUX ECAM NORMAL",
            "#44:ECAMDAT ENCIN 3 0 125 250",
            "?PMUX",
        ]
    );
}

#[test]
fn error_reply_is_protocol_error() {
    let (port, _requests) = scripted_controller(vec![(
        "#44:ECAMDAT AXIS 2 1 0",
        "44:ECAMDAT ERROR Table not increasing",
    )]);

    let mut link = default_registry().create(&tcp_config(port)).expect("create");
    let err = link
        .load_table(44, &[1.0, 0.0], SourceKind::Axis)
        .expect_err("must be rejected");
    assert!(matches!(err, LinkError::Protocol(_)));
}

#[test]
fn silent_controller_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let handle = thread::spawn(move || {
        // Accept and hold the connection without answering.
        let (stream, _) = listener.accept().expect("accept");
        thread::sleep(std::time::Duration::from_millis(500));
        drop(stream);
    });

    let mut config = tcp_config(port);
    config.timeout = 0.1;
    let mut link = default_registry().create(&config).expect("create");
    let err = link.read_state(1).expect_err("no reply");
    assert!(matches!(err, LinkError::Timeout(_)), "got {err:?}");

    handle.join().expect("join");
}
