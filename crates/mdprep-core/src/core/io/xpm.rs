use crate::core::io::traits::FormatReader;
use crate::core::models::matrix::{AxisName, LegendEntry, MAX_CELLS, StructureMatrix};
use std::io::{self, BufRead};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

const XPM_SENTINEL: &str = "/* XPM */";
const ARRAY_DECLARATION: &str = "static char";

#[derive(Debug, Error)]
pub enum XpmError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Missing '/* XPM */' header")]
    MissingHeader,
    #[error("Malformed dimensions on line {line}: '{content}'")]
    MalformedDimensions { line: usize, content: String },
    #[error("Unsupported encoding: {chars_per_pixel} characters per pixel (only 1 is supported)")]
    UnsupportedEncoding { chars_per_pixel: usize },
    #[error("Malformed legend entry on line {line}: '{content}'")]
    MalformedLegendLine { line: usize, content: String },
    #[error("Dimension mismatch on line {line}: {detail}")]
    DimensionMismatch { line: usize, detail: String },
}

/// Line source with room for a single pushed-back line.
struct LineReader<'a, R: BufRead> {
    reader: &'a mut R,
    peeked: Option<String>,
    line_num: usize,
}

impl<'a, R: BufRead> LineReader<'a, R> {
    fn new(reader: &'a mut R) -> Self {
        Self {
            reader,
            peeked: None,
            line_num: 0,
        }
    }

    /// Next line, trimmed. `None` at end of input.
    fn next_line(&mut self) -> io::Result<Option<String>> {
        if let Some(line) = self.peeked.take() {
            return Ok(Some(line));
        }
        let mut buf = String::new();
        if self.reader.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        self.line_num += 1;
        Ok(Some(buf.trim().to_string()))
    }

    fn push_back(&mut self, line: String) {
        debug_assert!(self.peeked.is_none(), "only one line of lookahead");
        self.peeked = Some(line);
    }

    /// Number of the line most recently returned.
    fn line_num(&self) -> usize {
        self.line_num
    }
}

fn strip_comment_markers(line: &str) -> String {
    line.replace("/*", "").replace("*/", "")
}

fn strip_string_literal(line: &str) -> &str {
    let s = line.strip_suffix(',').unwrap_or(line);
    let s = s.strip_prefix('"').unwrap_or(s);
    s.strip_suffix('"').unwrap_or(s)
}

fn axis_declaration(line: &str) -> Option<AxisName> {
    let rest = line.strip_prefix("/*")?.trim_start();
    [AxisName::X, AxisName::Y]
        .into_iter()
        .find(|axis| rest.starts_with(&format!("{}:", axis.label())))
}

/// Parser for the `.xpm` matrices written by GROMACS analysis tools.
///
/// Stages run in a fixed order: header, dimensions, legend, axis declarations,
/// data rows. The first data line is stored in the last grid row.
pub struct XpmFile;

impl XpmFile {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<StructureMatrix, XpmError> {
        let matrix = Self::read_from_path(path)?;
        debug!(
            "Loaded {}x{} matrix with {} legend entries",
            matrix.rows(),
            matrix.cols(),
            matrix.legend().len()
        );
        Ok(matrix)
    }

    fn skip_to_header<R: BufRead>(lines: &mut LineReader<'_, R>) -> Result<(), XpmError> {
        loop {
            match lines.next_line()? {
                Some(line) if line.starts_with(XPM_SENTINEL) => break,
                Some(_) => continue,
                None => return Err(XpmError::MissingHeader),
            }
        }
        // Comments and the C array declaration precede the dimensions.
        while let Some(line) = lines.next_line()? {
            if line.is_empty() || line.starts_with("/*") || line.starts_with(ARRAY_DECLARATION) {
                continue;
            }
            lines.push_back(line);
            break;
        }
        Ok(())
    }

    fn parse_dimensions<R: BufRead>(
        lines: &mut LineReader<'_, R>,
    ) -> Result<(usize, usize, usize), XpmError> {
        let line = lines.next_line()?.unwrap_or_default();
        let malformed = || XpmError::MalformedDimensions {
            line: lines.line_num(),
            content: line.clone(),
        };
        let fields: Vec<usize> = strip_string_literal(&line)
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| malformed())?;
        let [cols, rows, colors, chars_per_pixel] = fields[..] else {
            return Err(malformed());
        };
        if chars_per_pixel != 1 {
            return Err(XpmError::UnsupportedEncoding { chars_per_pixel });
        }
        if cols.checked_mul(rows).is_none_or(|cells| cells > MAX_CELLS) {
            return Err(malformed());
        }
        trace!("cols={} rows={} colors={}", cols, rows, colors);
        Ok((cols, rows, colors))
    }

    /// Parses `"~  c #FFFFFF " /* "Coil" */,`.
    fn parse_legend_line<R: BufRead>(
        lines: &mut LineReader<'_, R>,
    ) -> Result<(char, LegendEntry), XpmError> {
        let line = lines.next_line()?.unwrap_or_default();
        let malformed = || XpmError::MalformedLegendLine {
            line: lines.line_num(),
            content: line.clone(),
        };

        let (head, comment) = match line.find("/*") {
            Some(start) => (&line[..start], &line[start + 2..]),
            None => return Err(malformed()),
        };
        let name = comment
            .split("*/")
            .next()
            .unwrap_or("")
            .trim()
            .trim_matches('"')
            .trim();

        let head = head.replace(['"', ','], " ");
        let tokens: Vec<&str> = head.split_whitespace().collect();
        let [code, "c", color, ..] = tokens[..] else {
            return Err(malformed());
        };
        let mut code_chars = code.chars();
        let (Some(code), None) = (code_chars.next(), code_chars.next()) else {
            return Err(malformed());
        };
        if name.is_empty() {
            return Err(malformed());
        }
        Ok((code, LegendEntry::new(color, name)))
    }

    fn parse_axes<R: BufRead>(
        lines: &mut LineReader<'_, R>,
        matrix: &mut StructureMatrix,
    ) -> Result<(), XpmError> {
        while let Some(line) = lines.next_line()? {
            let Some(axis) = axis_declaration(&line) else {
                lines.push_back(line);
                break;
            };
            let cleaned = strip_comment_markers(&line);
            let ticks = cleaned.split_whitespace().skip(1);
            matrix
                .axis_mut(axis)
                .extend(ticks)
                .map_err(|e| XpmError::DimensionMismatch {
                    line: lines.line_num(),
                    detail: e.to_string(),
                })?;
        }
        for axis in [matrix.axis(AxisName::X), matrix.axis(AxisName::Y)] {
            if !axis.is_empty() && !axis.is_full() {
                return Err(XpmError::DimensionMismatch {
                    line: lines.line_num(),
                    detail: format!(
                        "{} declares {} of {} ticks",
                        axis.name(),
                        axis.len(),
                        axis.capacity()
                    ),
                });
            }
        }
        Ok(())
    }

    fn parse_data<R: BufRead>(
        lines: &mut LineReader<'_, R>,
        matrix: &mut StructureMatrix,
    ) -> Result<(), XpmError> {
        let rows = matrix.rows();
        let mut read = 0;
        while read < rows {
            let Some(line) = lines.next_line()? else {
                return Err(XpmError::DimensionMismatch {
                    line: lines.line_num(),
                    detail: format!("expected {} data rows, found {}", rows, read),
                });
            };
            if line.is_empty() {
                continue;
            }
            matrix
                .set_row(rows - 1 - read, strip_string_literal(&line))
                .map_err(|e| XpmError::DimensionMismatch {
                    line: lines.line_num(),
                    detail: e.to_string(),
                })?;
            read += 1;
        }

        while let Some(line) = lines.next_line()? {
            if line.is_empty() || line == "};" {
                continue;
            }
            warn!(
                "Ignoring content after the last data row on line {}",
                lines.line_num()
            );
            break;
        }
        Ok(())
    }
}

impl FormatReader for XpmFile {
    type Output = StructureMatrix;
    type Error = XpmError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error> {
        let mut lines = LineReader::new(reader);

        Self::skip_to_header(&mut lines)?;
        let (cols, rows, colors) = Self::parse_dimensions(&mut lines)?;
        let mut matrix = StructureMatrix::new(cols, rows);

        for _ in 0..colors {
            let (code, entry) = Self::parse_legend_line(&mut lines)?;
            matrix.insert_legend(code, entry);
        }
        Self::parse_axes(&mut lines, &mut matrix)?;
        Self::parse_data(&mut lines, &mut matrix)?;

        Ok(matrix)
    }
}
