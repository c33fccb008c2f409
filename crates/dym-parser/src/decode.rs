//! End-to-end decoding of a byte source.

use std::io::Read;

use dym_common::{
    header_range_dates, leap_aware_date, Diagnostics, TimeAxis, TimeAxisMode, WarningKind,
    DATE_PLACEHOLDER,
};
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::read_all_levels;
use crate::error::{DymError, DymResult};
use crate::format::{sniff_source, FileFormat};
use crate::header::{check_available, read_header_blocks, DymHeader};
use crate::source::{ByteSource, SourceReader};

/// Decoding options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// How the time coordinate is built.
    pub time_axis: TimeAxisMode,
    /// Reject sources whose sniffed format differs.
    pub expected_format: Option<FileFormat>,
}

/// A fully decoded DYM2 file.
#[derive(Debug, Clone)]
pub struct DecodedDym {
    pub header: DymHeader,
    /// Values indexed `[level, lat, lon]`, in file order.
    pub data: Array3<f32>,
    /// Mask indexed `[lon, lat]`.
    pub mask: Array2<i32>,
    pub time: TimeAxis,
    /// Coordinate grids indexed `[lon, lat]`.
    pub lon_grid: Array2<f32>,
    pub lat_grid: Array2<f32>,
    /// Raw fractional-year value of every level.
    pub levels: Vec<f32>,
}

type DecodeFn =
    fn(&mut SourceReader, &str, Option<u64>, &DecodeOptions, &mut Diagnostics) -> DymResult<DecodedDym>;

/// Decoders by sniffed format. Formats missing here are detected only.
const DECODERS: &[(FileFormat, DecodeFn)] = &[(FileFormat::Dym2, decode_dym2_source)];

/// Whether `format` can be decoded.
pub fn is_decodable(format: FileFormat) -> bool {
    decoder_for(format).is_some()
}

fn decoder_for(format: FileFormat) -> Option<DecodeFn> {
    DECODERS
        .iter()
        .find(|(candidate, _)| *candidate == format)
        .map(|(_, decoder)| *decoder)
}

/// Sniff and decode a source.
pub fn decode(
    source: &ByteSource,
    options: &DecodeOptions,
    diag: &mut Diagnostics,
) -> DymResult<DecodedDym> {
    let name = source.name();
    let format = sniff_source(source, diag);
    debug!(source = %name, format = %format, "Sniffed DYM source");

    if let Some(expected) = options.expected_format {
        if expected != format {
            return Err(DymError::format(
                &name,
                format!("expected {} file, found {}", expected, format),
            ));
        }
    }

    let decoder = decoder_for(format).ok_or_else(|| {
        DymError::format(&name, format!("unsupported format: {}", format))
    })?;

    let available = source.len()?;
    let mut reader = source.open()?;
    decoder(&mut reader, &name, Some(available), options, diag)
}

/// Decode a DYM2 stream without sniffing.
pub fn decode_reader<R: Read>(
    reader: &mut R,
    source_name: &str,
    options: &DecodeOptions,
    diag: &mut Diagnostics,
) -> DymResult<DecodedDym> {
    decode_dym2(reader, source_name, None, options, diag)
}

fn decode_dym2_source(
    reader: &mut SourceReader,
    source_name: &str,
    available: Option<u64>,
    options: &DecodeOptions,
    diag: &mut Diagnostics,
) -> DymResult<DecodedDym> {
    decode_dym2(reader, source_name, available, options, diag)
}

fn decode_dym2<R: Read>(
    reader: &mut R,
    source_name: &str,
    available: Option<u64>,
    options: &DecodeOptions,
    diag: &mut Diagnostics,
) -> DymResult<DecodedDym> {
    let header = DymHeader::read(reader, source_name)?;
    if header.format_id != FileFormat::Dym2.as_str() {
        return Err(DymError::format(
            source_name,
            format!("header tag {:?} is not DYM2", header.format_id),
        ));
    }

    if let Some(available) = available {
        check_available(&header, available, source_name)?;
    }

    let file_header = read_header_blocks(reader, header, source_name)?;
    let data = read_all_levels(reader, &file_header.header, source_name)?;
    let time = build_time_axis(
        &file_header.header,
        &file_header.levels,
        options.time_axis,
        source_name,
        diag,
    );

    info!(
        source = source_name,
        nlon = file_header.header.nlon,
        nlat = file_header.header.nlat,
        nlevel = file_header.header.nlevel,
        dated = time.is_dates(),
        "Decoded DYM2 file"
    );

    Ok(DecodedDym {
        header: file_header.header,
        data,
        mask: file_header.mask,
        time,
        lon_grid: file_header.grids.lon,
        lat_grid: file_header.grids.lat,
        levels: file_header.levels,
    })
}

/// Build the time coordinate for a decoded header.
///
/// Dates that cannot be built are recorded in `diag` and the axis falls
/// back to the raw level values.
pub fn build_time_axis(
    header: &DymHeader,
    levels: &[f32],
    mode: TimeAxisMode,
    source_name: &str,
    diag: &mut Diagnostics,
) -> TimeAxis {
    match mode {
        TimeAxisMode::Raw => TimeAxis::Raw(levels.to_vec()),
        TimeAxisMode::HeaderRange { delta_days } => {
            let first = f64::from(header.first_date);
            let last = f64::from(header.last_date);
            match header_range_dates(first, last, header.nlevel, delta_days) {
                Ok(dates) => TimeAxis::Dates(dates),
                Err(e) => {
                    diag.warn(
                        WarningKind::Date,
                        format!(
                            "{}: no dates for header range {}..{}: {}; keeping raw level values",
                            source_name, first, last, e
                        ),
                    );
                    TimeAxis::Raw(levels.to_vec())
                }
            }
        }
        TimeAxisMode::PerLevel => {
            let mut dates = Vec::with_capacity(levels.len());
            let mut failed = false;
            for (index, &value) in levels.iter().enumerate() {
                match leap_aware_date(f64::from(value)) {
                    Ok(date) => dates.push(date),
                    Err(e) => {
                        failed = true;
                        diag.warn(
                            WarningKind::Date,
                            format!(
                                "{}: level {} ({}) shown as {}: {}",
                                source_name,
                                index + 1,
                                value,
                                DATE_PLACEHOLDER,
                                e
                            ),
                        );
                    }
                }
            }
            if failed {
                TimeAxis::Raw(levels.to_vec())
            } else {
                TimeAxis::Dates(dates)
            }
        }
    }
}
