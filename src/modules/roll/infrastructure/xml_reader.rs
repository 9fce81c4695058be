/// Pull-based reader over a roll document.
///
/// Documents run to several gigabytes, so only the header and one unit
/// subtree (`RLUEx`) are ever held in memory at a time.
use crate::shared::errors::{AppError, AppResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub const UNIT_TAG: &str = "RLUEx";
pub const MUNI_CODE_TAG: &str = "RLM01A";
pub const YEAR_TAG: &str = "RLM02A";

/// A small owned element tree for one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn is(&self, tag: &str) -> bool {
        self.name.eq_ignore_ascii_case(tag)
    }

    /// First descendant named `tag`, depth first.
    pub fn find(&self, tag: &str) -> Option<&XmlNode> {
        for child in &self.children {
            if child.is(tag) {
                return Some(child);
            }
            if let Some(found) = child.find(tag) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_all<'a>(&'a self, tag: &str) -> Vec<&'a XmlNode> {
        let mut found = Vec::new();
        self.collect(tag, &mut found);
        found
    }

    fn collect<'a>(&'a self, tag: &str, out: &mut Vec<&'a XmlNode>) {
        for child in &self.children {
            if child.is(tag) {
                out.push(child);
            }
            child.collect(tag, out);
        }
    }

    /// Trimmed text of the first descendant `tag`; blank text reads as absent.
    pub fn text_of(&self, tag: &str) -> Option<&str> {
        self.find(tag)
            .map(|node| node.text.trim())
            .filter(|text| !text.is_empty())
    }
}

/// Fields applying to every unit of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentHeader {
    pub muni_code: String,
    pub year: i32,
}

pub struct RollDocumentReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    label: String,
}

impl RollDocumentReader<BufReader<File>> {
    pub fn open(path: &Path) -> AppResult<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(
            BufReader::with_capacity(256 * 1024, file),
            path.display().to_string(),
        ))
    }
}

impl<R: BufRead> RollDocumentReader<R> {
    pub fn from_reader(inner: R, label: impl Into<String>) -> Self {
        let mut reader = Reader::from_reader(inner);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Bytes consumed so far; drives progress reporting.
    pub fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    /// Read the municipality code and roll year. Both precede the first unit.
    pub fn read_header(&mut self) -> AppResult<DocumentHeader> {
        let mut muni_code: Option<String> = None;
        let mut year: Option<String> = None;

        while muni_code.is_none() || year.is_none() {
            self.buf.clear();
            let name = match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => tag_name(&e),
                Event::Eof => break,
                _ => continue,
            };

            if name.eq_ignore_ascii_case(MUNI_CODE_TAG) {
                muni_code = Some(self.read_subtree(name)?.text.trim().to_string());
            } else if name.eq_ignore_ascii_case(YEAR_TAG) {
                year = Some(self.read_subtree(name)?.text.trim().to_string());
            } else if name.eq_ignore_ascii_case(UNIT_TAG) {
                break;
            }
        }

        match (muni_code, year) {
            (Some(muni_code), Some(year)) => Ok(DocumentHeader {
                muni_code,
                year: year.parse().map_err(|_| {
                    AppError::ParseError(format!("{}: invalid roll year '{}'", self.label, year))
                })?,
            }),
            _ => Err(AppError::ParseError(format!(
                "{}: missing {} / {} header",
                self.label, MUNI_CODE_TAG, YEAR_TAG
            ))),
        }
    }

    /// Next unit subtree, or `None` at end of document.
    pub fn next_unit(&mut self) -> AppResult<Option<XmlNode>> {
        loop {
            self.buf.clear();
            let name = match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => tag_name(&e),
                Event::Eof => return Ok(None),
                _ => continue,
            };

            if name.eq_ignore_ascii_case(UNIT_TAG) {
                return self.read_subtree(name).map(Some);
            }
        }
    }

    /// Consume events up to the end tag matching an already-read start tag.
    fn read_subtree(&mut self, root: String) -> AppResult<XmlNode> {
        let mut stack = vec![XmlNode::new(root)];

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => stack.push(XmlNode::new(tag_name(&e))),
                Event::Empty(e) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::new(tag_name(&e)));
                    }
                }
                Event::Text(t) => {
                    let text = t.unescape()?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Event::CData(c) => {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Event::End(_) => {
                    let Some(node) = stack.pop() else {
                        return Err(AppError::ParseError(format!(
                            "{}: unbalanced end tag",
                            self.label
                        )));
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => return Ok(node),
                    }
                }
                Event::Eof => {
                    return Err(AppError::ParseError(format!(
                        "{}: document ended inside <{}>",
                        self.label,
                        stack.first().map(|n| n.name.as_str()).unwrap_or("?")
                    )))
                }
                _ => {}
            }
        }
    }
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<RL>
  <RLM01A>66023</RLM01A>
  <RLM02A>2022</RLM02A>
  <RLUEx>
    <RL0105A>1000</RL0105A>
    <RL0201>
      <RL0201x><RL0201Gx>2001-05-01</RL0201Gx><RL0201Hx>1</RL0201Hx></RL0201x>
      <RL0201x><RL0201Gx>2019-03-12</RL0201Gx><RL0201Hx>2</RL0201Hx></RL0201x>
    </RL0201>
  </RLUEx>
  <RLUEx>
    <RL0105A>4500</RL0105A>
    <RL0101><RL0101x><RL0101Gx>DES &amp; ÉRABLES</RL0101Gx></RL0101x></RL0101>
  </RLUEx>
</RL>"#;

    #[test]
    fn reads_header_then_units() {
        let mut reader = RollDocumentReader::from_reader(DOC.as_bytes(), "inline");
        let header = reader.read_header().unwrap();
        assert_eq!(header.muni_code, "66023");
        assert_eq!(header.year, 2022);

        let first = reader.next_unit().unwrap().unwrap();
        assert_eq!(first.text_of("RL0105A"), Some("1000"));
        assert_eq!(first.find_all("RL0201x").len(), 2);

        let second = reader.next_unit().unwrap().unwrap();
        assert_eq!(second.text_of("rl0101gx"), Some("DES & ÉRABLES"));

        assert!(reader.next_unit().unwrap().is_none());
        assert!(reader.position() > 0);
    }

    #[test]
    fn missing_header_is_a_parse_error() {
        let mut reader = RollDocumentReader::from_reader("<RL><RLUEx/></RL>".as_bytes(), "bad");
        assert!(matches!(reader.read_header(), Err(AppError::ParseError(_))));
    }

    #[test]
    fn truncated_unit_is_a_parse_error() {
        let doc = "<RL><RLM01A>1</RLM01A><RLM02A>2022</RLM02A><RLUEx><RL0105A>1000";
        let mut reader = RollDocumentReader::from_reader(doc.as_bytes(), "cut");
        reader.read_header().unwrap();
        assert!(reader.next_unit().is_err());
    }
}
