//! Collision event times from SUMO collision output.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::RiskError;

/// `time` of every element whose local name ends in `collision`, in
/// document order. Elements without a parseable time are ignored.
pub fn collision_times<R: BufRead>(inner: R) -> Result<Vec<f64>, RiskError> {
    let mut reader = Reader::from_reader(inner);
    let mut buf = Vec::new();
    let mut times = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref().ends_with(b"collision") => {
                for a in e.attributes() {
                    let a = a?;
                    if a.key.as_ref() == b"time" {
                        if let Ok(t) = a.unescape_value()?.trim().parse::<f64>() {
                            times.push(t);
                        }
                    }
                }
            }
            Event::Eof => return Ok(times),
            _ => {}
        }
    }
}

pub fn read_collision_times(path: &Path) -> Result<Vec<f64>, RiskError> {
    if !path.exists() {
        return Err(RiskError::MissingInput(path.to_path_buf()));
    }
    collision_times(BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_collision_times() {
        let xml = r#"<collisions>
            <collision time="12.40" type="collision" collider="a" victim="b"/>
            <collision time="bad"/>
            <collision time="13.0"></collision>
        </collisions>"#;
        assert_eq!(collision_times(xml.as_bytes()).unwrap(), vec![12.4, 13.0]);
    }

    #[test]
    fn no_collisions() {
        assert!(collision_times("<collisions/>".as_bytes()).unwrap().is_empty());
    }
}
