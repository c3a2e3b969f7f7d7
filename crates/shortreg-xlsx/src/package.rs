use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};

use zip::ZipArchive;

use crate::relationships::{
    parse_relationships, parse_workbook_sheets, rels_part_name, resolve_target, Relationship,
    REL_TYPE_SHARED_STRINGS, REL_TYPE_WORKSHEET,
};
use crate::shared_strings::{parse_shared_strings, SharedStrings};
use crate::PackageError;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const DEFAULT_SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const WORKSHEETS_DIR: &str = "xl/worksheets/";

/// Maximum uncompressed size of a small metadata part (`workbook.xml`, `.rels`) read into memory.
///
/// Worksheets are never read into memory, so this only guards against ZIP bombs hiding in parts
/// that are expected to be a few kilobytes.
pub const MAX_XLSX_METADATA_PART_BYTES: u64 = 16 * 1024 * 1024; // 16MiB

/// A worksheet listed by the workbook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetEntry {
    /// Tab name shown in Excel (e.g. `Blad1`).
    pub name: String,
    /// Canonical part name (e.g. `xl/worksheets/sheet1.xml`).
    pub part: String,
}

/// Open Packaging Convention view of an XLSX ZIP archive.
///
/// Part payloads are only inflated on demand. Worksheets are exposed as forward-only streams via
/// [`XlsxPackage::open_part`].
pub struct XlsxPackage<R> {
    archive: ZipArchive<R>,
    /// Case-folded canonical part name -> zip entry index.
    part_index: HashMap<String, usize>,
}

impl<R> std::fmt::Debug for XlsxPackage<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XlsxPackage")
            .field("parts", &self.part_index.len())
            .finish()
    }
}

impl<R: Read + Seek> XlsxPackage<R> {
    /// Open a package by scanning the ZIP central directory. No part is inflated.
    pub fn from_reader(reader: R) -> Result<Self, PackageError> {
        let mut archive = ZipArchive::new(reader)?;
        let mut part_index = HashMap::new();
        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            // Keep the first entry when names collide after normalization.
            part_index.entry(canonical_part_name(file.name())).or_insert(i);
        }
        Ok(Self {
            archive,
            part_index,
        })
    }

    pub fn contains_part(&self, name: &str) -> bool {
        self.part_index.contains_key(&canonical_part_name(name))
    }

    /// Open a part as a forward-only byte stream.
    pub fn open_part(&mut self, name: &str) -> Result<Box<dyn Read + '_>, PackageError> {
        let index = *self
            .part_index
            .get(&canonical_part_name(name))
            .ok_or_else(|| PackageError::MissingPart(name.to_string()))?;
        Ok(Box::new(self.archive.by_index(index)?))
    }

    /// Read a (small) part fully into memory, enforcing [`MAX_XLSX_METADATA_PART_BYTES`].
    pub fn read_part(&mut self, name: &str) -> Result<Vec<u8>, PackageError> {
        let max = MAX_XLSX_METADATA_PART_BYTES;
        let part = self.open_part(name)?;
        let mut out = Vec::new();
        // Read one byte past the limit so forged size headers can't sneak past the check.
        part.take(max + 1).read_to_end(&mut out)?;
        if out.len() as u64 > max {
            return Err(PackageError::PartTooLarge {
                part: name.to_string(),
                size: out.len() as u64,
                max,
            });
        }
        Ok(out)
    }

    fn read_optional_part(&mut self, name: &str) -> Result<Option<Vec<u8>>, PackageError> {
        if !self.contains_part(name) {
            return Ok(None);
        }
        self.read_part(name).map(Some)
    }

    fn workbook_relationships(&mut self) -> Result<Vec<Relationship>, PackageError> {
        match self.read_optional_part(&rels_part_name(WORKBOOK_PART))? {
            Some(bytes) => parse_relationships(&bytes),
            None => Ok(Vec::new()),
        }
    }

    /// List worksheets in workbook order.
    ///
    /// Packages without `xl/workbook.xml` fall back to the parts under `xl/worksheets/`, named
    /// after their file stem and ordered by part name.
    pub fn sheets(&mut self) -> Result<Vec<SheetEntry>, PackageError> {
        let Some(workbook_xml) = self.read_optional_part(WORKBOOK_PART)? else {
            return Ok(self.worksheet_parts_by_name());
        };

        let workbook_sheets = parse_workbook_sheets(&workbook_xml)?;
        let targets: HashMap<String, String> = self
            .workbook_relationships()?
            .into_iter()
            .filter(|rel| !rel.external && rel.type_uri == REL_TYPE_WORKSHEET)
            .map(|rel| (rel.id, resolve_target(WORKBOOK_PART, &rel.target)))
            .collect();

        let mut sheets = Vec::with_capacity(workbook_sheets.len());
        for sheet in workbook_sheets {
            // Chart sheets and dialog sheets use other relationship types.
            let Some(part) = targets.get(&sheet.rel_id) else {
                log::debug!(
                    "sheet `{}` ({}) is not a worksheet relationship; skipping",
                    sheet.name,
                    sheet.rel_id
                );
                continue;
            };
            sheets.push(SheetEntry {
                name: sheet.name,
                part: part.clone(),
            });
        }
        Ok(sheets)
    }

    fn worksheet_parts_by_name(&self) -> Vec<SheetEntry> {
        let mut parts: Vec<&String> = self
            .part_index
            .keys()
            .filter(|name| name.starts_with(WORKSHEETS_DIR) && name.ends_with(".xml"))
            .filter(|name| !name[WORKSHEETS_DIR.len()..].contains('/'))
            .collect();
        parts.sort();
        parts
            .into_iter()
            .map(|part| {
                let stem = &part[WORKSHEETS_DIR.len()..part.len() - ".xml".len()];
                SheetEntry {
                    name: stem.to_string(),
                    part: part.clone(),
                }
            })
            .collect()
    }

    /// Find the first worksheet whose name contains `fragment` (case-insensitive).
    pub fn find_sheet(&mut self, fragment: &str) -> Result<SheetEntry, PackageError> {
        let needle = fragment.to_lowercase();
        self.sheets()?
            .into_iter()
            .find(|sheet| sheet.name.to_lowercase().contains(&needle))
            .ok_or_else(|| PackageError::SheetNotFound(fragment.to_string()))
    }

    /// Load the shared-string table. A package without one has an empty table.
    pub fn shared_strings(&mut self) -> Result<SharedStrings, PackageError> {
        let part = self
            .workbook_relationships()?
            .into_iter()
            .find(|rel| !rel.external && rel.type_uri == REL_TYPE_SHARED_STRINGS)
            .map(|rel| resolve_target(WORKBOOK_PART, &rel.target))
            .unwrap_or_else(|| DEFAULT_SHARED_STRINGS_PART.to_string());

        if !self.contains_part(&part) {
            return Ok(SharedStrings::default());
        }
        parse_shared_strings(BufReader::new(self.open_part(&part)?))
    }
}

/// Normalize separators, strip leading `/`, and case-fold (OPC part names compare
/// case-insensitively).
fn canonical_part_name(name: &str) -> String {
    name.replace('\\', "/")
        .trim_start_matches('/')
        .to_ascii_lowercase()
}
