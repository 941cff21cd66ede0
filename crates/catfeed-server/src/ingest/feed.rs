//! Streaming feed reader
//!
//! Pull-parses the hierarchical category/offer XML dialect without ever
//! holding the full document in memory. A job makes three independent passes
//! over the file: offer count, category table, and the offer cursor itself.
//!
//! The cursor is forward-only and single-pass; each yielded [`Offer`] owns its
//! data, so the backing parse buffer is reused between elements and memory use
//! stays constant regardless of feed size. Malformed or truncated XML
//! surfaces as [`IngestError::FeedParse`] and fails the whole pass; there is
//! no partial recovery.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::categories::CategoryTable;
use super::models::{Category, Offer};
use super::{IngestError, Result};

/// Count `<offer>` elements in the feed (one full pass).
pub fn count_offers(path: &Path) -> Result<u64> {
    let mut reader = open_reader(path)?;
    let mut buf = Vec::new();
    let mut count = 0u64;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"offer" => count += 1,
            Event::Eof => break,
            _ => {},
        }
    }

    debug!(offers = count, "Counted feed offers");
    Ok(count)
}

/// Read the `<categories>` header into a category table (one full pass,
/// stops once the section ends).
pub fn read_categories(path: &Path) -> Result<CategoryTable> {
    let mut reader = open_reader(path)?;
    let mut buf = Vec::new();
    let mut table = CategoryTable::new();
    let mut in_categories = false;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"categories" => in_categories = true,
            Event::Start(e) if in_categories && e.name().as_ref() == b"category" => {
                let (id, parent_id) = category_attributes(&e)?;
                let name = read_element_text(&mut reader, b"category")?;
                if let Some(id) = id {
                    table.insert(id, Category { name, parent_id });
                }
            },
            Event::End(e) if e.name().as_ref() == b"categories" => break,
            Event::Eof => break,
            _ => {},
        }
    }

    debug!(categories = table.len(), "Read feed category table");
    Ok(table)
}

/// Forward-only cursor over the feed's `<offer>` elements.
///
/// `next` yields one owned [`Offer`] at a time and `Ok(None)` once the feed
/// is exhausted.
pub struct OfferCursor {
    reader: Reader<BufReader<File>>,
    buf: Vec<u8>,
    finished: bool,
}

impl OfferCursor {
    /// Open the feed for a single streaming pass.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: open_reader(path)?,
            buf: Vec::new(),
            finished: false,
        })
    }

    /// Advance to the next offer.
    pub fn next(&mut self) -> Result<Option<Offer>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            self.buf.clear();
            let offer_id = match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) if e.name().as_ref() == b"offer" => offer_id_attribute(&e)?,
                Event::Eof => {
                    self.finished = true;
                    return Ok(None);
                },
                _ => continue,
            };

            let offer = self.read_offer_body(offer_id)?;
            return Ok(Some(offer));
        }
    }

    /// Read the children of an `<offer>` element until its closing tag.
    fn read_offer_body(&mut self, offer_id: String) -> Result<Offer> {
        let mut offer = Offer {
            offer_id,
            ..Offer::default()
        };

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => {
                    let tag = e.name().as_ref().to_vec();
                    if tag == b"param" {
                        let param_name = param_name_attribute(&e)?;
                        let value = read_element_text(&mut self.reader, b"param")?;
                        if let Some(name) = param_name {
                            offer.params.insert(name, value);
                        }
                    } else {
                        let text = read_element_text(&mut self.reader, &tag)?;
                        set_offer_field(&mut offer, &tag, text);
                    }
                },
                Event::End(e) if e.name().as_ref() == b"offer" => return Ok(offer),
                Event::Eof => {
                    return Err(IngestError::FeedParse(
                        "unexpected end of feed inside <offer>".to_string(),
                    ))
                },
                _ => {},
            }
        }
    }
}

/// Open the feed and configure the reader for streaming.
fn open_reader(path: &Path) -> Result<Reader<BufReader<File>>> {
    let mut reader = Reader::from_file(path)?;
    reader.config_mut().trim_text(true);
    Ok(reader)
}

/// Extract the `id` attribute of an `<offer>` element.
fn offer_id_attribute(e: &BytesStart<'_>) -> Result<String> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"id" {
            return Ok(attr.unescape_value()?.into_owned());
        }
    }
    Err(IngestError::FeedParse("<offer> element without an id attribute".to_string()))
}

/// Extract `id` and `parentId` attributes of a `<category>` element.
fn category_attributes(e: &BytesStart<'_>) -> Result<(Option<String>, Option<String>)> {
    let mut id = None;
    let mut parent_id = None;
    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"id" => id = Some(attr.unescape_value()?.into_owned()),
            b"parentId" => parent_id = Some(attr.unescape_value()?.into_owned()),
            _ => {},
        }
    }
    Ok((id, parent_id))
}

/// Extract the `name` attribute of a `<param>` element.
fn param_name_attribute(e: &BytesStart<'_>) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"name" {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Accumulate the text content of the current element until its closing tag.
///
/// Nested elements are skipped (depth-tracked); only their text is dropped,
/// never misattributed to the parent.
fn read_element_text<R: BufRead>(reader: &mut Reader<R>, end: &[u8]) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut depth = 0usize;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(e) => {
                if depth == 0 {
                    if e.name().as_ref() == end {
                        break;
                    }
                    return Err(IngestError::FeedParse(format!(
                        "mismatched closing tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    )));
                }
                depth -= 1;
            },
            Event::Text(t) if depth == 0 => text.push_str(&t.unescape()?),
            Event::CData(t) if depth == 0 => {
                text.push_str(&String::from_utf8_lossy(&t.into_inner()))
            },
            Event::Eof => {
                return Err(IngestError::FeedParse("unexpected end of feed".to_string()))
            },
            _ => {},
        }
    }

    Ok(text.trim().to_string())
}

/// Assign a known offer child element; blank or unknown elements are ignored.
fn set_offer_field(offer: &mut Offer, tag: &[u8], text: String) {
    let value = if text.is_empty() { None } else { Some(text) };
    match tag {
        b"name" => offer.name = value,
        b"description" => offer.description = value,
        b"vendor" => offer.vendor = value,
        b"barcode" => offer.barcode = value,
        b"categoryId" => offer.category_id = value,
        b"currencyId" => offer.currency_id = value,
        b"price" => offer.price = value,
        b"picture" => offer.picture = value,
        _ => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<yml_catalog date="2024-01-18 12:00">
  <shop>
    <name>Test shop</name>
    <categories>
      <category id="1">Electronics</category>
      <category id="2" parentId="1">Phones</category>
      <category id="3" parentId="2">Accessories</category>
    </categories>
    <offers>
      <offer id="101" available="true">
        <name>Phone case</name>
        <description>Silicone case &amp; strap</description>
        <vendor>Acme</vendor>
        <barcode>4601234567890</barcode>
        <categoryId>3</categoryId>
        <currencyId>RUR</currencyId>
        <price>1990.50</price>
        <picture>http://example.com/case.jpg</picture>
        <param name="Color">Black</param>
        <param name="Material">Silicone</param>
      </offer>
      <offer id="102">
        <name>Charger</name>
        <categoryId>2</categoryId>
      </offer>
      <offer id="103">
        <name>Mystery item</name>
        <barcode>ABC123</barcode>
      </offer>
    </offers>
  </shop>
</yml_catalog>
"#;

    fn feed_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_count_offers() {
        let file = feed_file(SAMPLE_FEED);
        assert_eq!(count_offers(file.path()).unwrap(), 3);
    }

    #[test]
    fn test_count_offers_empty_feed() {
        let file = feed_file("<yml_catalog><shop><offers></offers></shop></yml_catalog>");
        assert_eq!(count_offers(file.path()).unwrap(), 0);
    }

    #[test]
    fn test_read_categories() {
        let file = feed_file(SAMPLE_FEED);
        let table = read_categories(file.path()).unwrap();

        assert_eq!(table.len(), 3);
        let phones = table.get("2").unwrap();
        assert_eq!(phones.name, "Phones");
        assert_eq!(phones.parent_id.as_deref(), Some("1"));
        assert_eq!(table.get("1").unwrap().parent_id, None);
    }

    #[test]
    fn test_cursor_yields_all_offers_in_order() {
        let file = feed_file(SAMPLE_FEED);
        let mut cursor = OfferCursor::open(file.path()).unwrap();

        let first = cursor.next().unwrap().unwrap();
        assert_eq!(first.offer_id, "101");
        assert_eq!(first.name.as_deref(), Some("Phone case"));
        assert_eq!(first.description.as_deref(), Some("Silicone case & strap"));
        assert_eq!(first.vendor.as_deref(), Some("Acme"));
        assert_eq!(first.barcode.as_deref(), Some("4601234567890"));
        assert_eq!(first.category_id.as_deref(), Some("3"));
        assert_eq!(first.currency_id.as_deref(), Some("RUR"));
        assert_eq!(first.price.as_deref(), Some("1990.50"));
        assert_eq!(first.params.get("Color").map(String::as_str), Some("Black"));
        assert_eq!(first.params.get("Material").map(String::as_str), Some("Silicone"));

        let second = cursor.next().unwrap().unwrap();
        assert_eq!(second.offer_id, "102");
        assert_eq!(second.vendor, None);
        assert_eq!(second.price, None);
        assert!(second.params.is_empty());

        let third = cursor.next().unwrap().unwrap();
        assert_eq!(third.offer_id, "103");
        assert_eq!(third.barcode.as_deref(), Some("ABC123"));

        assert!(cursor.next().unwrap().is_none());
        // Exhausted cursors keep signalling done
        assert!(cursor.next().unwrap().is_none());
    }

    #[test]
    fn test_truncated_feed_fails() {
        let file = feed_file(
            r#"<yml_catalog><shop><offers><offer id="1"><name>Broken</name>"#,
        );
        let mut cursor = OfferCursor::open(file.path()).unwrap();

        let err = cursor.next().unwrap_err();
        assert!(matches!(err, IngestError::FeedParse(_)));
    }

    #[test]
    fn test_mismatched_tags_fail() {
        let file = feed_file(
            r#"<yml_catalog><shop><offers><offer id="1"><name>Bad</vendor></offer></offers></shop></yml_catalog>"#,
        );
        let mut cursor = OfferCursor::open(file.path()).unwrap();

        assert!(cursor.next().is_err());
    }

    #[test]
    fn test_nested_markup_in_description_is_skipped() {
        let file = feed_file(
            r#"<yml_catalog><shop><offers>
            <offer id="7"><description>Plain <b>bold</b> tail</description></offer>
            </offers></shop></yml_catalog>"#,
        );
        let mut cursor = OfferCursor::open(file.path()).unwrap();

        let offer = cursor.next().unwrap().unwrap();
        let description = offer.description.unwrap();
        assert!(description.starts_with("Plain"));
        assert!(description.ends_with("tail"));
    }

    #[test]
    fn test_offer_without_id_fails() {
        let file = feed_file(
            r#"<yml_catalog><shop><offers><offer><name>Anon</name></offer></offers></shop></yml_catalog>"#,
        );
        let mut cursor = OfferCursor::open(file.path()).unwrap();

        assert!(matches!(cursor.next(), Err(IngestError::FeedParse(_))));
    }
}
