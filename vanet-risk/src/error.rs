use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("netstate dump not found: {0}")]
    MissingInput(PathBuf),

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed XML attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("cannot write risk table: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
