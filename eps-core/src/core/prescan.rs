//! Document prescan: bounding box, DSC metadata and signature check.
//!
//! The prescan never executes drawing commands. It reads a bounded number of
//! header lines so that its cost stays flat on very large files.

use super::error::{EpsError, EpsResult};
use rustc_hash::FxHashMap;
use std::fmt;
use std::io::{BufRead, Cursor};

/// Signature of a DOS binary EPS file.
pub const BINARY_EPS_MAGIC: [u8; 4] = [0xC5, 0xD0, 0xD3, 0xC6];

/// Size of the DOS binary EPS header.
const BINARY_EPS_HEADER_LEN: usize = 30;

/// Document bounding box in PostScript points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    llx: i32,
    lly: i32,
    urx: i32,
    ury: i32,
}

impl BoundingBox {
    /// US Letter, used whenever no box can be resolved.
    pub const US_LETTER: BoundingBox = BoundingBox {
        llx: 0,
        lly: 0,
        urx: 612,
        ury: 792,
    };

    /// Create a bounding box, rejecting negative extents.
    pub fn new(llx: i32, lly: i32, urx: i32, ury: i32) -> EpsResult<Self> {
        if urx < llx || ury < lly {
            return Err(EpsError::malformed(format!(
                "bounding box {} {} {} {} has negative extent",
                llx, lly, urx, ury
            )));
        }
        Ok(BoundingBox { llx, lly, urx, ury })
    }

    /// Lower-left x.
    pub fn llx(&self) -> i32 {
        self.llx
    }

    /// Lower-left y.
    pub fn lly(&self) -> i32 {
        self.lly
    }

    /// Upper-right x.
    pub fn urx(&self) -> i32 {
        self.urx
    }

    /// Upper-right y.
    pub fn ury(&self) -> i32 {
        self.ury
    }

    /// Width in points, saturating at `i32::MAX`.
    pub fn width(&self) -> i32 {
        self.urx.saturating_sub(self.llx)
    }

    /// Height in points, saturating at `i32::MAX`.
    pub fn height(&self) -> i32 {
        self.ury.saturating_sub(self.lly)
    }

    /// The four corners as `(llx, lly, urx, ury)`.
    pub fn as_tuple(&self) -> (i32, i32, i32, i32) {
        (self.llx, self.lly, self.urx, self.ury)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        BoundingBox::US_LETTER
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.llx, self.lly, self.urx, self.ury)
    }
}

/// DSC keys collected by the prescan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataKey {
    Title,
    Creator,
    CreationDate,
    Pages,
    LanguageLevel,
}

impl MetadataKey {
    /// All keys, in display order.
    pub const ALL: [MetadataKey; 5] = [
        MetadataKey::Title,
        MetadataKey::Creator,
        MetadataKey::CreationDate,
        MetadataKey::Pages,
        MetadataKey::LanguageLevel,
    ];

    /// The DSC comment prefix carrying this key.
    pub fn dsc_prefix(&self) -> &'static str {
        match self {
            MetadataKey::Title => "%%Title:",
            MetadataKey::Creator => "%%Creator:",
            MetadataKey::CreationDate => "%%CreationDate:",
            MetadataKey::Pages => "%%Pages:",
            MetadataKey::LanguageLevel => "%%LanguageLevel:",
        }
    }

    /// Stable key name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataKey::Title => "title",
            MetadataKey::Creator => "creator",
            MetadataKey::CreationDate => "creationDate",
            MetadataKey::Pages => "pages",
            MetadataKey::LanguageLevel => "languageLevel",
        }
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata found in the document header. Missing keys stay missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    entries: FxHashMap<MetadataKey, String>,
}

impl DocumentMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key.
    pub fn get(&self, key: MetadataKey) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    /// Whether the key was found.
    pub fn contains(&self, key: MetadataKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Present entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = (MetadataKey, &str)> + '_ {
        MetadataKey::ALL
            .into_iter()
            .filter_map(|key| self.get(key).map(|value| (key, value)))
    }

    pub(crate) fn insert(&mut self, key: MetadataKey, value: String) {
        self.entries.insert(key, value);
    }

    /// Record the line if it carries one of the known keys.
    fn absorb_line(&mut self, line: &str) {
        for key in MetadataKey::ALL {
            if let Some(rest) = line.strip_prefix(key.dsc_prefix()) {
                self.insert(key, rest.trim().to_string());
                return;
            }
        }
    }
}

/// Line ceilings for the prescan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrescanOptions {
    /// Lines searched for bounding-box comments (default: 100)
    pub bounding_box_lines: usize,

    /// Lines searched for DSC metadata (default: 50)
    pub metadata_lines: usize,

    /// When set, an `(atend)` box is resolved from this many trailing lines.
    /// Only honored by [`prescan`], which holds the whole document.
    pub trailer_lines: Option<usize>,
}

impl Default for PrescanOptions {
    fn default() -> Self {
        PrescanOptions {
            bounding_box_lines: 100,
            metadata_lines: 50,
            trailer_lines: None,
        }
    }
}

impl PrescanOptions {
    pub fn with_bounding_box_lines(mut self, lines: usize) -> Self {
        self.bounding_box_lines = lines;
        self
    }

    pub fn with_metadata_lines(mut self, lines: usize) -> Self {
        self.metadata_lines = lines;
        self
    }

    pub fn with_trailer_lines(mut self, lines: usize) -> Self {
        self.trailer_lines = Some(lines);
        self
    }
}

/// Everything the prescan learned about a document.
#[derive(Debug, Clone, PartialEq)]
pub struct PrescanResult {
    pub bounding_box: BoundingBox,
    /// Whether the box came from the document rather than the default
    pub bounding_box_found: bool,
    pub metadata: DocumentMetadata,
    pub is_valid: bool,
}

/// Bounding-box comment variants.
#[derive(Debug, Clone, Copy, PartialEq)]
enum BoxComment {
    Integer(BoundingBox),
    HiRes(BoundingBox),
    AtEnd,
}

/// Parse a single `%%BoundingBox:` / `%%HiResBoundingBox:` line.
///
/// Returns `Ok(None)` for lines that are not bounding-box comments.
fn parse_box_comment(line: &str) -> EpsResult<Option<BoxComment>> {
    if let Some(rest) = line.strip_prefix("%%BoundingBox:") {
        let parts: Vec<&str> = rest.split_whitespace().collect();
        if parts.first() == Some(&"(atend)") {
            return Ok(Some(BoxComment::AtEnd));
        }
        if parts.len() < 4 {
            return Err(EpsError::malformed(line.to_string()));
        }
        let mut coords = [0i32; 4];
        for (slot, part) in coords.iter_mut().zip(&parts) {
            *slot = part
                .parse::<i32>()
                .map_err(|_| EpsError::malformed(line.to_string()))?;
        }
        let bbox = BoundingBox::new(coords[0], coords[1], coords[2], coords[3])?;
        return Ok(Some(BoxComment::Integer(bbox)));
    }

    if let Some(rest) = line.strip_prefix("%%HiResBoundingBox:") {
        let parts: Vec<&str> = rest.split_whitespace().collect();
        if parts.first() == Some(&"(atend)") {
            return Ok(Some(BoxComment::AtEnd));
        }
        if parts.len() < 4 {
            return Err(EpsError::malformed(line.to_string()));
        }
        let mut coords = [0i32; 4];
        for (slot, part) in coords.iter_mut().zip(&parts) {
            let value = part
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| EpsError::malformed(line.to_string()))?;
            *slot = value.trunc() as i32;
        }
        let bbox = BoundingBox::new(coords[0], coords[1], coords[2], coords[3])?;
        return Ok(Some(BoxComment::HiRes(bbox)));
    }

    Ok(None)
}

/// Accumulates bounding-box candidates. A high-resolution box wins over an
/// integer one regardless of order.
#[derive(Debug, Default)]
struct BoxScan {
    integer: Option<BoundingBox>,
    hires: Option<BoundingBox>,
    deferred: bool,
}

impl BoxScan {
    fn absorb_line(&mut self, line: &str) {
        match parse_box_comment(line) {
            Ok(Some(BoxComment::Integer(bbox))) => {
                log::debug!("Found BoundingBox: {}", bbox);
                self.integer = Some(bbox);
            }
            Ok(Some(BoxComment::HiRes(bbox))) => {
                log::debug!("Found HiResBoundingBox: {}", bbox);
                self.hires = Some(bbox);
            }
            Ok(Some(BoxComment::AtEnd)) => {
                log::debug!("Bounding box deferred to trailer: {}", line);
                self.deferred = true;
            }
            Ok(None) => {}
            Err(e) => log::warn!("Skipping bounding box candidate: {}", e),
        }
    }

    fn resolved(&self) -> Option<BoundingBox> {
        self.hires.or(self.integer)
    }
}

/// Splits a byte stream on LF, CR or CRLF, decoding each line lossily.
///
/// Iteration stops quietly at the end of the stream or on the first I/O error.
pub(crate) struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        LineReader {
            reader,
            buf: Vec::new(),
        }
    }

    fn read_line(&mut self) -> std::io::Result<bool> {
        self.buf.clear();
        loop {
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                return Ok(!self.buf.is_empty());
            }
            if let Some(pos) = available.iter().position(|&b| b == b'\n' || b == b'\r') {
                self.buf.extend_from_slice(&available[..pos]);
                let terminator = available[pos];
                self.reader.consume(pos + 1);
                if terminator == b'\r' && self.reader.fill_buf()?.first() == Some(&b'\n') {
                    self.reader.consume(1);
                }
                return Ok(true);
            }
            let len = available.len();
            self.buf.extend_from_slice(available);
            self.reader.consume(len);
        }
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match self.read_line() {
            Ok(true) => Some(String::from_utf8_lossy(&self.buf).into_owned()),
            Ok(false) => None,
            Err(e) => {
                log::warn!("Stopping line scan on read error: {}", e);
                None
            }
        }
    }
}

/// Check the signature on the first line. Fails closed on any error.
pub fn is_valid_eps<R: BufRead>(mut reader: R) -> bool {
    let mut first = Vec::new();
    match reader.read_until(b'\n', &mut first) {
        Ok(0) => false,
        Ok(_) => has_eps_signature(&first),
        Err(e) => {
            log::error!("Error validating EPS file: {}", e);
            false
        }
    }
}

fn has_eps_signature(first_line: &[u8]) -> bool {
    first_line.starts_with(b"%!PS") || first_line.starts_with(&BINARY_EPS_MAGIC)
}

/// Locate the PostScript section of a document.
///
/// Plain EPS is returned unchanged. DOS binary EPS carries a 30-byte header
/// whose little-endian offset/length pair points at the PostScript text.
pub fn postscript_section(data: &[u8]) -> EpsResult<&[u8]> {
    if !data.starts_with(&BINARY_EPS_MAGIC) {
        return Ok(data);
    }
    if data.len() < BINARY_EPS_HEADER_LEN {
        return Err(EpsError::InvalidBinaryHeader(format!(
            "header truncated at {} bytes",
            data.len()
        )));
    }

    let read_u32 = |at: usize| u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
    let offset = read_u32(4) as usize;
    let length = read_u32(8) as usize;
    let end = offset
        .checked_add(length)
        .filter(|&end| end <= data.len() && offset >= BINARY_EPS_HEADER_LEN)
        .ok_or_else(|| {
            EpsError::InvalidBinaryHeader(format!(
                "PostScript section {}+{} outside file of {} bytes",
                offset,
                length,
                data.len()
            ))
        })?;

    log::debug!("Binary EPS: PostScript section at {}..{}", offset, end);
    Ok(&data[offset..end])
}

/// Find the bounding box within the first `options.bounding_box_lines` lines.
pub fn parse_bounding_box<R: BufRead>(reader: R, options: &PrescanOptions) -> BoundingBox {
    let mut scan = BoxScan::default();
    for line in LineReader::new(reader).take(options.bounding_box_lines) {
        scan.absorb_line(&line);
    }
    scan.resolved().unwrap_or_else(|| {
        log::warn!("BoundingBox not found, using default: 612x792");
        BoundingBox::US_LETTER
    })
}

/// Collect DSC metadata from the first `options.metadata_lines` lines.
pub fn parse_metadata<R: BufRead>(reader: R, options: &PrescanOptions) -> DocumentMetadata {
    let mut metadata = DocumentMetadata::new();
    for line in LineReader::new(reader).take(options.metadata_lines) {
        metadata.absorb_line(&line);
    }
    metadata
}

/// Single bounded pass over a stream: signature, bounding box and metadata.
pub fn prescan_reader<R: BufRead>(reader: R, options: &PrescanOptions) -> PrescanResult {
    let ceiling = options.bounding_box_lines.max(options.metadata_lines);
    let mut scan = BoxScan::default();
    let mut metadata = DocumentMetadata::new();
    let mut is_valid = false;

    for (index, line) in LineReader::new(reader).take(ceiling).enumerate() {
        if index == 0 {
            is_valid = has_eps_signature(line.as_bytes());
        }
        if index < options.bounding_box_lines {
            scan.absorb_line(&line);
        }
        if index < options.metadata_lines {
            metadata.absorb_line(&line);
        }
    }

    let found = scan.resolved();
    if found.is_none() {
        log::warn!("BoundingBox not found, using default: 612x792");
    }
    PrescanResult {
        bounding_box: found.unwrap_or(BoundingBox::US_LETTER),
        bounding_box_found: found.is_some(),
        metadata,
        is_valid,
    }
}

/// Prescan an in-memory document.
///
/// Binary EPS is unwrapped first; the signature check still looks at the raw
/// bytes. With `trailer_lines` set, an `(atend)` box is looked up in the
/// document tail when the header did not resolve one.
pub fn prescan(data: &[u8], options: &PrescanOptions) -> PrescanResult {
    let section = match postscript_section(data) {
        Ok(section) => section,
        Err(e) => {
            log::warn!("{}", e);
            data
        }
    };

    let mut result = prescan_reader(Cursor::new(section), options);
    result.is_valid = has_eps_signature(data);

    if let Some(tail_lines) = options.trailer_lines {
        if !result.bounding_box_found {
            if let Some(bbox) = scan_trailer(section, tail_lines) {
                log::debug!("Resolved deferred BoundingBox from trailer: {}", bbox);
                result.bounding_box = bbox;
                result.bounding_box_found = true;
            }
        }
    }

    result
}

fn scan_trailer(section: &[u8], tail_lines: usize) -> Option<BoundingBox> {
    let lines: Vec<String> = LineReader::new(Cursor::new(section)).collect();
    let start = lines.len().saturating_sub(tail_lines);
    let mut scan = BoxScan::default();
    for line in &lines[start..] {
        scan.absorb_line(line);
    }
    scan.resolved()
}
