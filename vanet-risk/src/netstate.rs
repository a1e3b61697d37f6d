//! ## vanet-risk::netstate
//! **Streaming reader for SUMO netstate dumps**
//!
//! The dump is `timestep[time] / edge / lane[id] / vehicle[id, pos, speed]`.
//! Only one timestep is held in memory at a time.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::RiskError;

#[derive(Debug, Clone, PartialEq)]
pub struct LaneVehicle {
    pub id: String,
    /// Lane-relative position (m).
    pub pos: f64,
    /// Network coordinates, when the dump carries them. `x` falls back to `pos`.
    pub x: f64,
    pub y: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Timestep {
    pub time_s: f64,
    /// Vehicles per lane id, in document order. Vehicles without a
    /// parseable `pos` are not kept.
    pub lanes: BTreeMap<String, Vec<LaneVehicle>>,
}

impl Timestep {
    pub fn vehicle_count(&self) -> usize {
        self.lanes.values().map(Vec::len).sum()
    }
}

pub struct NetstateReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
}

impl NetstateReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, RiskError> {
        if !path.exists() {
            return Err(RiskError::MissingInput(path.to_path_buf()));
        }
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, RiskError> {
    for a in e.attributes() {
        let a = a?;
        if a.key.as_ref() == name {
            return Ok(Some(a.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn attr_f64(e: &BytesStart<'_>, name: &[u8], missing: f64) -> Result<f64, RiskError> {
    Ok(match attr(e, name)? {
        Some(v) => v.trim().parse().unwrap_or(f64::NAN),
        None => missing,
    })
}

impl<R: BufRead> NetstateReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: Reader::from_reader(inner),
            buf: Vec::new(),
        }
    }

    /// Reads up to the end of the next `timestep` element.
    pub fn next_timestep(&mut self) -> Result<Option<Timestep>, RiskError> {
        let mut current: Option<Timestep> = None;
        let mut lane: Option<String> = None;

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) if e.name().as_ref() == b"timestep" => {
                    current = Some(Timestep {
                        time_s: attr_f64(&e, b"time", 0.0)?,
                        lanes: BTreeMap::new(),
                    });
                }
                Event::Empty(e) if e.name().as_ref() == b"timestep" => {
                    return Ok(Some(Timestep {
                        time_s: attr_f64(&e, b"time", 0.0)?,
                        lanes: BTreeMap::new(),
                    }));
                }
                Event::Start(e) if e.name().as_ref() == b"lane" => {
                    lane = Some(attr(&e, b"id")?.unwrap_or_default());
                }
                Event::End(e) if e.name().as_ref() == b"lane" => lane = None,
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"vehicle" => {
                    if let (Some(step), Some(lane_id)) = (current.as_mut(), lane.as_ref()) {
                        let pos = attr_f64(&e, b"pos", f64::NAN)?;
                        let x = attr_f64(&e, b"x", f64::NAN)?;
                        let vehicle = LaneVehicle {
                            id: attr(&e, b"id")?.unwrap_or_default(),
                            pos,
                            x: if x.is_nan() { pos } else { x },
                            y: attr_f64(&e, b"y", f64::NAN)?,
                            speed: attr_f64(&e, b"speed", 0.0)?,
                        };
                        if !vehicle.pos.is_nan() {
                            step.lanes.entry(lane_id.clone()).or_default().push(vehicle);
                        }
                    }
                }
                Event::End(e) if e.name().as_ref() == b"timestep" => {
                    if let Some(step) = current.take() {
                        return Ok(Some(step));
                    }
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for NetstateReader<R> {
    type Item = Result<Timestep, RiskError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_timestep().transpose()
    }
}
