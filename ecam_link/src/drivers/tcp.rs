//! TCP link driver.
//!
//! Speaks the controller's ASCII line protocol:
//!
//! | Request | Reply |
//! |---------|-------|
//! | `?AXES` | `?AXES 1 2 44` |
//! | `44:?STATUS` | `44:?STATUS 0x00800203` |
//! | `44:?CFG EINNSTEP` | `44:?CFG EINNSTEP 10000` |
//! | `#44:SYNCAUX ECAM NORMAL` | `44:SYNCAUX OK` |
//! | `#44:ECAMDAT ENCIN 3 0 125 250` | `44:ECAMDAT OK` |
//! | `#PMUX HARD AUX B44 E0` | `PMUX OK` |
//! | `#PMUX REMOVE E0` | `PMUX OK` |
//! | `?PMUX` | `?PMUX B44 E0 AUX HARD; B3 E1 POS` |
//! | `#44:ESYNC` | `44:ESYNC OK` |
//!
//! Requests end with `\r\n`. A reply starting with `ERROR` (after the echo)
//! is a protocol rejection. The connection is opened lazily and dropped
//! after any transport error so the next call reconnects.

use ecam_common::link::config::LinkConfig;
use ecam_common::link::driver::{ControllerLink, LinkError};
use ecam_common::link::types::{
    HwState, MuxLink, OutputLevel, OutputPolarity, OutputTarget, SourceKind,
};
use std::fmt::Write as _;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Factory function to create a TCP link instance.
pub fn create_link(config: &LinkConfig) -> Result<Box<dyn ControllerLink>, LinkError> {
    Ok(Box::new(TcpLink::new(
        &config.host,
        config.port,
        config.timeout_duration(),
    )))
}

struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

/// TCP link to a motion controller.
pub struct TcpLink {
    host: String,
    port: u16,
    timeout: Duration,
    conn: Option<Connection>,
}

impl TcpLink {
    /// Create an unconnected link.
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout,
            conn: None,
        }
    }

    fn connect(&self) -> Result<Connection, LinkError> {
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| LinkError::Io(format!("cannot resolve {}", self.host)))?;
        let stream = TcpStream::connect_timeout(&addr, self.timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.set_nodelay(true)?;
        debug!("Connected to {}:{}", self.host, self.port);
        Ok(Connection {
            reader: BufReader::new(stream.try_clone()?),
            writer: stream,
        })
    }

    fn exchange(&mut self, request: &str) -> Result<String, LinkError> {
        if self.conn.is_none() {
            self.conn = Some(self.connect()?);
        }
        let Some(conn) = self.conn.as_mut() else {
            return Err(LinkError::NotConnected);
        };

        trace!("-> {}", request);
        let result = (|| -> Result<String, LinkError> {
            conn.writer.write_all(request.as_bytes())?;
            conn.writer.write_all(b"\r\n")?;
            conn.writer.flush()?;
            let mut line = String::new();
            if conn.reader.read_line(&mut line)? == 0 {
                return Err(LinkError::Io("connection closed by controller".into()));
            }
            Ok(line.trim_end().to_string())
        })();

        match result {
            Ok(reply) => {
                trace!("<- {}", reply);
                Ok(reply)
            }
            Err(e) => {
                warn!("Dropping connection to {}: {}", self.host, e);
                self.conn = None;
                Err(e)
            }
        }
    }

    /// Send a query and return the reply without the echoed request.
    fn query(&mut self, request: &str) -> Result<String, LinkError> {
        let reply = self.exchange(request)?;
        let body = strip_echo(request, &reply)?;
        if body.starts_with("ERROR") {
            return Err(LinkError::Protocol(format!("{request}: {body}")));
        }
        Ok(body.to_string())
    }

    /// Send an acknowledged command (`#` prefix).
    fn command(&mut self, request: &str) -> Result<(), LinkError> {
        let reply = self.exchange(&format!("#{request}"))?;
        let body = strip_echo(request, &reply)?;
        if body == "OK" {
            Ok(())
        } else {
            Err(LinkError::Protocol(format!("{request}: {body}")))
        }
    }
}

/// Strip the echoed command word from a reply.
fn strip_echo<'a>(request: &str, reply: &'a str) -> Result<&'a str, LinkError> {
    let echo = request.split_whitespace().next().unwrap_or(request);
    reply
        .strip_prefix(echo)
        .map(str::trim)
        .ok_or_else(|| LinkError::Protocol(format!("unexpected reply to {echo}: {reply}")))
}

fn parse_status_word(text: &str) -> Result<u32, LinkError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16)
        .map_err(|e| LinkError::Protocol(format!("bad status word {text:?}: {e}")))
}

fn parse_mux_entry(entry: &str) -> Option<MuxLink> {
    let mut words = entry.split_whitespace();
    let source = words.next()?.strip_prefix('B')?.parse().ok()?;
    let dest = words.next()?.to_string();
    let mut link = MuxLink {
        source,
        dest,
        pos: false,
        aux: false,
        hard: false,
    };
    for flag in words {
        match flag {
            "POS" => link.pos = true,
            "AUX" => link.aux = true,
            "HARD" => link.hard = true,
            _ => {}
        }
    }
    Some(link)
}

impl ControllerLink for TcpLink {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn find_axes(&mut self) -> Result<Vec<u16>, LinkError> {
        let body = self.query("?AXES")?;
        body.split_whitespace()
            .map(|w| {
                w.parse()
                    .map_err(|_| LinkError::Protocol(format!("bad axis number {w:?}")))
            })
            .collect()
    }

    fn read_state(&mut self, axis: u16) -> Result<HwState, LinkError> {
        let body = self.query(&format!("{axis}:?STATUS"))?;
        Ok(HwState::from_status_word(parse_status_word(&body)?))
    }

    fn read_config(&mut self, axis: u16, key: &str) -> Result<String, LinkError> {
        let body = self.query(&format!("{axis}:?CFG {key}"))?;
        body.split_whitespace()
            .last()
            .map(str::to_string)
            .ok_or_else(|| LinkError::Protocol(format!("empty value for {key}")))
    }

    fn write_output(
        &mut self,
        axis: u16,
        target: &OutputTarget,
        level: OutputLevel,
        polarity: OutputPolarity,
    ) -> Result<(), LinkError> {
        self.command(&format!(
            "{axis}:{} {} {}",
            target.command(),
            level.mnemonic(),
            polarity.mnemonic()
        ))
    }

    fn load_table(
        &mut self,
        axis: u16,
        values: &[f64],
        source: SourceKind,
    ) -> Result<(), LinkError> {
        let mut request = format!("{axis}:ECAMDAT {} {}", source.mnemonic(), values.len());
        for v in values {
            let _ = write!(request, " {v}");
        }
        self.command(&request)
    }

    fn add_link(
        &mut self,
        axis: u16,
        line: &str,
        pos: bool,
        aux: bool,
        hard: bool,
    ) -> Result<(), LinkError> {
        let mut request = String::from("PMUX");
        if hard {
            request.push_str(" HARD");
        }
        if pos {
            request.push_str(" POS");
        }
        if aux {
            request.push_str(" AUX");
        }
        let _ = write!(request, " B{axis} {}", line.to_ascii_uppercase());
        self.command(&request)
    }

    fn clear_link(&mut self, line: &str) -> Result<(), LinkError> {
        self.command(&format!("PMUX REMOVE {}", line.to_ascii_uppercase()))
    }

    fn list_links(&mut self) -> Result<Vec<MuxLink>, LinkError> {
        let body = self.query("?PMUX")?;
        Ok(body.split(';').filter_map(parse_mux_entry).collect())
    }

    fn sync_now(&mut self, axis: u16) -> Result<(), LinkError> {
        self.command(&format!("{axis}:ESYNC"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_is_stripped() {
        assert_eq!(
            strip_echo("44:?CFG EINNSTEP", "44:?CFG EINNSTEP 10000").unwrap(),
            "EINNSTEP 10000"
        );
        assert!(strip_echo("44:?STATUS", "43:?STATUS 0x0").is_err());
    }

    #[test]
    fn status_word_parsing() {
        assert_eq!(parse_status_word("0x00800203").unwrap(), 0x0080_0203);
        assert_eq!(parse_status_word("00800203").unwrap(), 0x0080_0203);
        assert!(parse_status_word("0xZZ").is_err());
    }

    #[test]
    fn mux_entries() {
        let link = parse_mux_entry(" B44 E0 AUX HARD").unwrap();
        assert_eq!(link.source, 44);
        assert_eq!(link.dest, "E0");
        assert!(link.aux && link.hard && !link.pos);
        assert!(parse_mux_entry("").is_none());
        assert!(parse_mux_entry("X44 E0").is_none());
    }
}
