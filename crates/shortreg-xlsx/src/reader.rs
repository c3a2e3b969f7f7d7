use std::io::{BufReader, Read, Seek};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use shortreg_rows::{CellParseWarning, Lookahead, Row, RowCursor, RowSource, RowSourceError};

use crate::{SharedStrings, XlsxPackage};

/// Sheet-name fragment of the published register (`Blad1`, Swedish for "Sheet1").
pub const DEFAULT_SHEET_FRAGMENT: &str = "blad1";

/// What to do when the worksheet XML turns out to be malformed part-way through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedXmlPolicy {
    /// Log a warning and end the row sequence. Rows emitted so far stand.
    #[default]
    StopSilently,
    /// Report one [`RowSourceError::MalformedDocument`] from `next_row`, then end.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Case-insensitive substring of the worksheet name to read.
    pub sheet_fragment: String,
    pub malformed_xml: MalformedXmlPolicy,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            sheet_fragment: DEFAULT_SHEET_FRAGMENT.to_string(),
            malformed_xml: MalformedXmlPolicy::default(),
        }
    }
}

impl ReaderOptions {
    pub fn with_sheet_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.sheet_fragment = fragment.into();
        self
    }

    pub fn with_malformed_xml(mut self, policy: MalformedXmlPolicy) -> Self {
        self.malformed_xml = policy;
        self
    }
}

/// Streaming row reader over one worksheet of an XLSX package.
///
/// Rows are assembled from `<row>`/`<c>`/`<v>` events as the worksheet part is inflated; the
/// worksheet is never held in memory. Cells are emitted in document order without regard to
/// their `r` reference, so a cell without a value simply doesn't appear in its row.
///
/// A shared-string reference that doesn't resolve (non-numeric or out of range) yields an empty
/// cell and a logged [`CellParseWarning`]; the rest of the row is kept.
pub struct XlsxRowReader<'a> {
    inner: Lookahead<SheetCursor<'a>>,
}

impl std::fmt::Debug for XlsxRowReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cursor = self.inner.cursor();
        f.debug_struct("XlsxRowReader")
            .field("sheet", &cursor.sheet)
            .field("shared_strings", &cursor.shared.len())
            .field("rows_seen", &cursor.state.row_number)
            .finish()
    }
}

impl<'a> XlsxRowReader<'a> {
    /// Locate the sheet named by `options`, load the shared strings, and open the worksheet
    /// stream.
    pub fn try_open<R: Read + Seek>(
        package: &'a mut XlsxPackage<R>,
        options: &ReaderOptions,
    ) -> Result<Self, RowSourceError> {
        let sheet = package.find_sheet(&options.sheet_fragment)?;
        let shared = package.shared_strings()?;
        log::debug!(
            "reading sheet `{}` ({}) with {} shared strings",
            sheet.name,
            sheet.part,
            shared.len()
        );
        let stream = package.open_part(&sheet.part)?;
        Ok(Self::from_stream(sheet.name, stream, shared, options.malformed_xml))
    }

    /// Like [`XlsxRowReader::try_open`], but a document that can't be opened is logged and
    /// read as having no rows.
    pub fn open<R: Read + Seek>(package: &'a mut XlsxPackage<R>, options: &ReaderOptions) -> Self {
        match Self::try_open(package, options) {
            Ok(reader) => reader,
            Err(err) => {
                log::warn!("{err}; reading as empty");
                Self::empty()
            }
        }
    }

    /// Read rows from raw worksheet XML (`xl/worksheets/sheetN.xml`) and an already-loaded
    /// shared-string table.
    pub fn from_sheet_xml<S: Read + 'a>(
        sheet_xml: S,
        shared: SharedStrings,
        policy: MalformedXmlPolicy,
    ) -> Self {
        Self::from_stream(String::new(), Box::new(sheet_xml), shared, policy)
    }

    /// A reader that yields no rows.
    pub fn empty() -> Self {
        Self {
            inner: Lookahead::new(SheetCursor {
                events: None,
                shared: SharedStrings::default(),
                policy: MalformedXmlPolicy::default(),
                sheet: String::new(),
                buf: Vec::new(),
                state: CellState::default(),
            }),
        }
    }

    fn from_stream(
        sheet: String,
        stream: Box<dyn Read + 'a>,
        shared: SharedStrings,
        policy: MalformedXmlPolicy,
    ) -> Self {
        let mut events = Reader::from_reader(BufReader::new(stream));
        // Whitespace inside `<v>`/`<t>` is cell content.
        events.config_mut().trim_text(false);
        Self {
            inner: Lookahead::new(SheetCursor {
                events: Some(events),
                shared,
                policy,
                sheet,
                buf: Vec::new(),
                state: CellState::default(),
            }),
        }
    }

    pub fn shared_strings(&self) -> &SharedStrings {
        &self.inner.cursor().shared
    }
}

impl RowSource for XlsxRowReader<'_> {
    fn has_next(&mut self) -> bool {
        self.inner.has_next()
    }

    fn next_row(&mut self) -> Result<Row, RowSourceError> {
        self.inner.next_row()
    }
}

struct SheetCursor<'a> {
    /// `None` once the stream is exhausted or abandoned.
    events: Option<Reader<BufReader<Box<dyn Read + 'a>>>>,
    shared: SharedStrings,
    policy: MalformedXmlPolicy,
    sheet: String,
    buf: Vec<u8>,
    state: CellState,
}

impl SheetCursor<'_> {
    fn stop(&mut self, reason: String) -> Result<Option<Row>, RowSourceError> {
        self.events = None;
        let sheet = if self.sheet.is_empty() {
            "worksheet".to_string()
        } else {
            format!("sheet `{}`", self.sheet)
        };
        match self.policy {
            MalformedXmlPolicy::StopSilently => {
                log::warn!(
                    "{sheet}: {reason}; treating as end of rows after {} rows",
                    self.state.row_number
                );
                Ok(None)
            }
            MalformedXmlPolicy::Fail => Err(RowSourceError::MalformedDocument(format!(
                "{sheet}: {reason}"
            ))),
        }
    }
}

impl RowCursor for SheetCursor<'_> {
    fn advance(&mut self) -> Result<Option<Row>, RowSourceError> {
        loop {
            let step = {
                let Some(events) = self.events.as_mut() else {
                    return Ok(None);
                };
                self.buf.clear();
                match events.read_event_into(&mut self.buf) {
                    Ok(event) => self.state.handle(event, &self.shared),
                    Err(err) => Step::Malformed(format!(
                        "xml error at byte {}: {err}",
                        events.buffer_position()
                    )),
                }
            };

            match step {
                Step::Continue => {}
                Step::Row(row) => return Ok(Some(row)),
                Step::Eof if self.state.in_row => {
                    return self.stop("unexpected end of document inside <row>".to_string())
                }
                Step::Eof if self.state.in_sheet_data => {
                    return self.stop("unexpected end of document inside <sheetData>".to_string())
                }
                Step::Eof => {
                    self.events = None;
                    return Ok(None);
                }
                Step::Malformed(reason) => return self.stop(reason),
            }
        }
    }
}

enum Step {
    Continue,
    Row(Row),
    Eof,
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Capture {
    #[default]
    Off,
    /// Inside `<v>`.
    Value,
    /// Inside `<is><t>` (inline string text).
    InlineText,
}

/// Mutable event-loop state for the row being assembled.
#[derive(Debug, Default)]
struct CellState {
    in_sheet_data: bool,
    in_row: bool,
    /// Rows seen so far (1-based index of the current row); used in log messages only.
    row_number: usize,
    cells: Row,
    /// Text accumulated for the current value; character data may arrive in several fragments.
    text: String,
    /// The current cell is `t="s"`: its value is an index into the shared-string table.
    shared_ref: bool,
    capture: Capture,
    in_inline: bool,
    /// Inside `<rPh>` (phonetic run) whose `<t>` text is not part of the value.
    in_phonetic: bool,
}

impl CellState {
    fn handle(&mut self, event: Event<'_>, shared: &SharedStrings) -> Step {
        match event {
            Event::Start(e) => self.on_start(&e),
            Event::Empty(e) => return self.on_empty(&e, shared),
            Event::End(e) => return self.on_end(e.local_name().as_ref(), shared),
            Event::Text(e) if self.capturing() => match e.unescape() {
                Ok(text) => self.text.push_str(&text),
                Err(err) => return Step::Malformed(format!("bad character data: {err}")),
            },
            Event::CData(e) if self.capturing() => match std::str::from_utf8(e.as_ref()) {
                Ok(text) => self.text.push_str(text),
                Err(err) => return Step::Malformed(format!("bad CDATA: {err}")),
            },
            Event::Eof => return Step::Eof,
            _ => {}
        }
        Step::Continue
    }

    fn capturing(&self) -> bool {
        match self.capture {
            Capture::Off => false,
            Capture::Value => true,
            Capture::InlineText => !self.in_phonetic,
        }
    }

    fn on_start(&mut self, e: &BytesStart<'_>) {
        let name = e.local_name();
        let name = name.as_ref();
        if name == b"sheetData" {
            self.in_sheet_data = true;
            return;
        }
        if !self.in_sheet_data {
            return;
        }
        match name {
            b"row" => {
                self.in_row = true;
                self.row_number += 1;
                self.cells.clear();
            }
            b"c" => {
                self.shared_ref = is_shared_string_cell(e);
                self.capture = Capture::Off;
                self.text.clear();
            }
            b"v" => {
                self.text.clear();
                self.capture = Capture::Value;
            }
            b"is" => {
                self.text.clear();
                self.in_inline = true;
            }
            b"rPh" if self.in_inline => self.in_phonetic = true,
            // Runs inside `<is>` concatenate, so `<t>` doesn't reset the buffer.
            b"t" if self.in_inline => self.capture = Capture::InlineText,
            _ => {}
        }
    }

    fn on_empty(&mut self, e: &BytesStart<'_>, shared: &SharedStrings) -> Step {
        if !self.in_sheet_data {
            return Step::Continue;
        }
        match e.local_name().as_ref() {
            b"row" => {
                self.row_number += 1;
                return Step::Row(Vec::new());
            }
            // `<c r="B2" s="1"/>`: styled but valueless, contributes nothing.
            b"c" => self.shared_ref = false,
            b"is" => self.cells.push(String::new()),
            b"v" => {
                self.text.clear();
                self.finish_value(shared);
            }
            _ => {}
        }
        Step::Continue
    }

    fn on_end(&mut self, name: &[u8], shared: &SharedStrings) -> Step {
        if name == b"sheetData" {
            self.in_sheet_data = false;
            return Step::Continue;
        }
        if !self.in_sheet_data {
            return Step::Continue;
        }
        match name {
            b"v" => {
                self.capture = Capture::Off;
                self.finish_value(shared);
            }
            b"t" if self.in_inline => self.capture = Capture::Off,
            b"rPh" => self.in_phonetic = false,
            b"is" => {
                self.in_inline = false;
                self.in_phonetic = false;
                self.cells.push(std::mem::take(&mut self.text));
            }
            b"c" => {
                self.shared_ref = false;
                self.capture = Capture::Off;
            }
            b"row" => {
                self.in_row = false;
                return Step::Row(std::mem::take(&mut self.cells));
            }
            _ => {}
        }
        Step::Continue
    }

    fn finish_value(&mut self, shared: &SharedStrings) {
        let text = std::mem::take(&mut self.text);
        let value = if self.shared_ref {
            self.shared_ref = false;
            self.resolve_shared(&text, shared)
        } else {
            text
        };
        self.cells.push(value);
    }

    fn resolve_shared(&self, raw: &str, shared: &SharedStrings) -> String {
        let index = raw.trim();
        match index.parse::<usize>().ok().and_then(|idx| shared.get(idx)) {
            Some(text) => text.to_string(),
            None => {
                CellParseWarning::SharedStringIndex {
                    row: self.row_number,
                    index: index.to_string(),
                    len: shared.len(),
                }
                .log();
                String::new()
            }
        }
    }
}

fn is_shared_string_cell(e: &BytesStart<'_>) -> bool {
    // Attribute errors are left for the value itself to surface; a cell we can't classify is
    // read as inline.
    matches!(
        e.try_get_attribute("t"),
        Ok(Some(attr)) if attr.value.as_ref() == b"s"
    )
}
