//! Point cloud and index file output.
//!
//! Each object's samples are written as an ASCII PLY file with four vertex
//! properties:
//!
//! ```text
//! ply
//! format ascii 1.0
//! element vertex <N>
//! property float x
//! property float y
//! property float z
//! property uchar confidence
//! end_header
//! <x> <y> <z> <confidence>
//! ```
//!
//! The summaries of all objects go to one pretty-printed JSON array.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use sensor_types::ObjectId;

use crate::error::{ReconError, ReconResult};
use crate::params::DEFAULT_MAX_POINTS;
use crate::reservoir::SampledPoint;
use crate::summary::ObjectSummary;

const PROPERTIES: [&str; 4] = [
    "property float x",
    "property float y",
    "property float z",
    "property uchar confidence",
];

/// Returns the point cloud file name for an object.
///
/// Bytes outside `[A-Za-z0-9_-]` are written as `%XX` hex escapes, so the
/// name never escapes the output directory and distinct identifiers never
/// share a file.
///
/// # Example
///
/// ```
/// use scan_recon::point_cloud_file_name;
///
/// assert_eq!(point_cloud_file_name(&"chair-1".into(), "ply"), "chair-1.ply");
/// assert_eq!(point_cloud_file_name(&"../x".into(), "ply"), "%2E%2E%2Fx.ply");
/// ```
#[must_use]
pub fn point_cloud_file_name(id: &ObjectId, extension: &str) -> String {
    let mut stem = String::with_capacity(id.as_str().len());
    for byte in id.as_str().bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    format!("{stem}.{extension}")
}

/// Writes samples in ASCII PLY to any writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_point_cloud<W, I>(writer: &mut W, samples: I, precision: usize) -> std::io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = SampledPoint>,
    I::IntoIter: ExactSizeIterator,
{
    let samples = samples.into_iter();
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", samples.len())?;
    for property in PROPERTIES {
        writeln!(writer, "{property}")?;
    }
    writeln!(writer, "end_header")?;

    for ([x, y, z], confidence) in samples {
        writeln!(
            writer,
            "{x:.precision$} {y:.precision$} {z:.precision$} {confidence}"
        )?;
    }
    writer.flush()
}

/// Saves samples to a PLY file.
///
/// # Errors
///
/// Returns [`ReconError::Io`] if the file cannot be created or written.
pub fn save_point_cloud<P, I>(path: P, samples: I, precision: usize) -> ReconResult<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = SampledPoint>,
    I::IntoIter: ExactSizeIterator,
{
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| ReconError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_point_cloud(&mut writer, samples, precision).map_err(|e| ReconError::io(path, e))
}

/// Reads a PLY file written by [`save_point_cloud`].
///
/// # Errors
///
/// Returns [`ReconError::Io`] if the file cannot be read, or
/// [`ReconError::PointCloudParse`] if the header or a vertex line is malformed.
pub fn read_point_cloud<P: AsRef<Path>>(path: P) -> ReconResult<Vec<SampledPoint>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| ReconError::io(path, e))?;
    let mut reader = PlyLines {
        path,
        lines: BufReader::new(file).lines().enumerate(),
    };

    reader.expect_line("ply")?;
    reader.expect_line("format ascii 1.0")?;
    let count = match reader.next_line()? {
        Some((number, line)) => line
            .trim()
            .strip_prefix("element vertex ")
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| ReconError::parse(number, "expected vertex count"))?,
        None => return Err(ReconError::parse(0, "missing vertex count")),
    };
    for property in PROPERTIES {
        reader.expect_line(property)?;
    }
    reader.expect_line("end_header")?;

    let mut samples = Vec::with_capacity(count.min(DEFAULT_MAX_POINTS));
    while samples.len() < count {
        let Some((number, line)) = reader.next_line()? else {
            return Err(ReconError::parse(
                0,
                format!("expected {count} vertices, found {}", samples.len()),
            ));
        };
        samples.push(parse_vertex(number, &line)?);
    }
    Ok(samples)
}

/// Numbered line source for the PLY reader.
struct PlyLines<'a, R> {
    path: &'a Path,
    lines: std::iter::Enumerate<std::io::Lines<R>>,
}

impl<R: BufRead> PlyLines<'_, R> {
    fn next_line(&mut self) -> ReconResult<Option<(usize, String)>> {
        match self.lines.next() {
            Some((index, Ok(line))) => Ok(Some((index + 1, line))),
            Some((_, Err(e))) => Err(ReconError::io(self.path, e)),
            None => Ok(None),
        }
    }

    fn expect_line(&mut self, expected: &str) -> ReconResult<()> {
        match self.next_line()? {
            Some((_, line)) if line.trim() == expected => Ok(()),
            Some((number, line)) => Err(ReconError::parse(
                number,
                format!("expected {expected:?}, found {:?}", line.trim()),
            )),
            None => Err(ReconError::parse(0, format!("missing {expected:?}"))),
        }
    }
}

fn parse_vertex(number: usize, line: &str) -> ReconResult<SampledPoint> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 4 {
        return Err(ReconError::parse(
            number,
            format!("expected 4 values, found {}", parts.len()),
        ));
    }

    let mut point = [0.0f32; 3];
    for (value, part) in point.iter_mut().zip(&parts[..3]) {
        *value = part
            .parse()
            .map_err(|_| ReconError::parse(number, format!("invalid coordinate: {part}")))?;
    }
    let confidence = parts[3]
        .parse()
        .map_err(|_| ReconError::parse(number, format!("invalid confidence: {}", parts[3])))?;
    Ok((point, confidence))
}

/// Writes the object index as a pretty-printed JSON array.
///
/// Missing parent directories are created.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_index<P: AsRef<Path>>(path: P, summaries: &[ObjectSummary]) -> ReconResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ReconError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| ReconError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, summaries)?;
    writer.flush().map_err(|e| ReconError::io(path, e))
}
