//! Shared strings table (`xl/sharedStrings.xml`).

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;

use crate::PackageError;

const PART: &str = "xl/sharedStrings.xml";

/// The document's shared-string table, indexed by position.
///
/// Rich-text runs are flattened to their visible text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SharedStrings {
    items: Vec<String>,
}

impl SharedStrings {
    pub fn new(items: Vec<String>) -> Self {
        Self { items }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SharedStrings {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Parse a shared strings part from a byte stream.
pub fn parse_shared_strings<R: BufRead>(input: R) -> Result<SharedStrings, PackageError> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut items = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"si" => {
                items.push(parse_si(&mut reader)?);
            }
            // `<si/>` is an empty string but still occupies an index.
            Event::Empty(e) if e.local_name().as_ref() == b"si" => items.push(String::new()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(SharedStrings { items })
}

fn parse_si<R: BufRead>(reader: &mut Reader<R>) -> Result<String, PackageError> {
    let mut buf = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                let end = e.name().as_ref().to_vec();
                read_text(reader, QName(&end), &mut text)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"r" => {
                parse_r(reader, &mut text)?;
            }
            Event::Start(e) => {
                // Phonetic runs (`<rPh>`) and extensions may contain `<t>` elements that are not
                // part of the displayed string.
                let end = e.name().as_ref().to_vec();
                reader.read_to_end_into(QName(&end), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"si" => break,
            Event::Eof => return Err(malformed("unexpected eof in <si>")),
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

fn parse_r<R: BufRead>(reader: &mut Reader<R>, text: &mut String) -> Result<(), PackageError> {
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                let end = e.name().as_ref().to_vec();
                read_text(reader, QName(&end), text)?;
            }
            Event::Start(e) => {
                let end = e.name().as_ref().to_vec();
                reader.read_to_end_into(QName(&end), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"r" => break,
            Event::Eof => return Err(malformed("unexpected eof in <r>")),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

fn read_text<R: BufRead>(
    reader: &mut Reader<R>,
    end: QName<'_>,
    text: &mut String,
) -> Result<(), PackageError> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::CData(e) => text.push_str(std::str::from_utf8(e.as_ref())?),
            Event::End(e) if e.name() == end => break,
            Event::Eof => return Err(malformed("unexpected eof in <t>")),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn malformed(reason: &'static str) -> PackageError {
    PackageError::Malformed {
        part: PART.to_string(),
        reason,
    }
}
