//! Format detection for DYM files.
//!
//! Three flavours exist in the wild: raw `DYM2` and `DYM3` files, identified
//! by their 4-byte tag, and `DYMZ` zip archives bundling an XML metadata
//! file with a `DYM3` payload. Only `DYM2` is decoded; the others are
//! recognised so callers get a precise error instead of garbage.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::str::FromStr;

use dym_common::{Diagnostics, WarningKind};
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use zip::ZipArchive;

use crate::source::{ByteSource, BUFFER_NAME};

/// Length of the leading format tag.
pub const TAG_LEN: usize = 4;

/// Number of members a DYMZ archive must contain.
const DYMZ_MEMBER_COUNT: usize = 2;

/// Detected DYM flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileFormat {
    #[serde(rename = "DYM2")]
    Dym2,
    #[serde(rename = "DYM3")]
    Dym3,
    #[serde(rename = "DYMZ")]
    Dymz,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl FileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Dym2 => "DYM2",
            FileFormat::Dym3 => "DYM3",
            FileFormat::Dymz => "DYMZ",
            FileFormat::Unknown => "UNKNOWN",
        }
    }

    /// Format identified by a raw 4-byte tag. Archives have no tag.
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"DYM2" => Some(FileFormat::Dym2),
            b"DYM3" => Some(FileFormat::Dym3),
            _ => None,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DYM2" => Ok(FileFormat::Dym2),
            "DYM3" => Ok(FileFormat::Dym3),
            "DYMZ" => Ok(FileFormat::Dymz),
            "UNKNOWN" => Ok(FileFormat::Unknown),
            _ => Err(format!("unknown DYM format '{}'", s)),
        }
    }
}

/// Detect the format of a file on disk.
///
/// Never fails: unreadable or unrecognised files are reported as
/// [`FileFormat::Unknown`] with a warning in `diag`.
pub fn sniff_file(path: impl AsRef<Path>, diag: &mut Diagnostics) -> FileFormat {
    let path = path.as_ref();
    let name = path.display().to_string();
    match File::open(path) {
        Ok(file) => sniff_reader(BufReader::new(file), &name, diag),
        Err(e) => {
            diag.warn(WarningKind::Format, format!("{}: cannot open: {}", name, e));
            FileFormat::Unknown
        }
    }
}

/// Detect the format of an in-memory buffer.
pub fn sniff_bytes(data: &[u8], diag: &mut Diagnostics) -> FileFormat {
    sniff_reader(Cursor::new(data), BUFFER_NAME, diag)
}

/// Detect the format of any [`ByteSource`].
pub fn sniff_source(source: &ByteSource, diag: &mut Diagnostics) -> FileFormat {
    match source {
        ByteSource::Path(path) => sniff_file(path, diag),
        ByteSource::Buffer(data) => sniff_bytes(data, diag),
    }
}

fn sniff_reader<R: Read + Seek>(mut reader: R, name: &str, diag: &mut Diagnostics) -> FileFormat {
    let mut tag = [0u8; TAG_LEN];
    if reader.read_exact(&mut tag).is_ok() {
        if let Some(format) = FileFormat::from_tag(&tag) {
            return format;
        }
    }

    if let Err(e) = reader.seek(SeekFrom::Start(0)) {
        diag.warn(WarningKind::Format, format!("{}: cannot rewind: {}", name, e));
        return FileFormat::Unknown;
    }

    match check_dymz(reader) {
        Ok(()) => FileFormat::Dymz,
        Err(reason) => {
            diag.warn(WarningKind::Format, format!("{}: {}", name, reason));
            FileFormat::Unknown
        }
    }
}

/// Validate a DYMZ archive: exactly two members, an `.xml` metadata file
/// that parses, and a `.dym` payload tagged `DYM3`.
fn check_dymz<R: Read + Seek>(reader: R) -> Result<(), String> {
    let mut archive = ZipArchive::new(reader)
        .map_err(|e| format!("not a DYM2, DYM3 or DYMZ file ({})", e))?;

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    if names.len() != DYMZ_MEMBER_COUNT {
        return Err(format!(
            "DYMZ archive must hold {} members, found {}",
            DYMZ_MEMBER_COUNT,
            names.len()
        ));
    }

    let meta_name = names
        .iter()
        .find(|name| name.ends_with("xml"))
        .ok_or("DYMZ archive has no XML metadata member")?;
    let data_name = names
        .iter()
        .find(|name| name.contains(".dym"))
        .ok_or("DYMZ archive has no .dym member")?;

    {
        let mut member = archive
            .by_name(data_name)
            .map_err(|e| format!("cannot open DYMZ member {}: {}", data_name, e))?;
        let mut tag = [0u8; TAG_LEN];
        member
            .read_exact(&mut tag)
            .map_err(|e| format!("cannot read DYMZ member {}: {}", data_name, e))?;
        if FileFormat::from_tag(&tag) != Some(FileFormat::Dym3) {
            return Err(format!(
                "DYMZ member {} is tagged {:?}, expected DYM3",
                data_name,
                String::from_utf8_lossy(&tag)
            ));
        }
    }

    let member = archive
        .by_name(meta_name)
        .map_err(|e| format!("cannot open DYMZ member {}: {}", meta_name, e))?;
    check_xml(BufReader::new(member))
        .map_err(|e| format!("DYMZ metadata {} is not well-formed XML: {}", meta_name, e))
}

/// Well-formedness check: balanced tags and exactly one root element.
fn check_xml<R: BufRead>(reader: R) -> Result<(), String> {
    let mut xml = quick_xml::Reader::from_reader(reader);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut roots = 0usize;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(_)) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Ok(Event::End(_)) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unexpected closing tag".to_string())?;
            }
            Ok(Event::Empty(_)) => {
                if depth == 0 {
                    roots += 1;
                }
            }
            Ok(Event::Text(text)) => {
                if depth == 0 && !text.iter().all(|b| b.is_ascii_whitespace()) {
                    return Err("text outside the root element".to_string());
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(e.to_string()),
        }
        buf.clear();
    }

    if depth != 0 {
        return Err("unclosed element".to_string());
    }
    match roots {
        1 => Ok(()),
        0 => Err("no root element".to_string()),
        n => Err(format!("{} root elements", n)),
    }
}
