use quick_xml::{Reader, events::Event};

/// Text of the first `<tag>…</tag>` in `xml`, decoded.
///
/// Vendor payloads are frequently truncated or otherwise non-conforming;
/// every failure mode is `None`, never an error.
#[must_use]
pub fn first_tag_text(xml: &str, tag: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut inside = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == tag.as_bytes() => {
                inside = true;
            }
            Ok(Event::Text(t)) if inside => {
                // Indentation between a container tag and its children is
                // also a text node; keep scanning past it.
                match t.unescape() {
                    Ok(text) if !text.trim().is_empty() => return Some(text.into_owned()),
                    Ok(_) => {}
                    Err(_) => return None,
                }
            }
            Ok(Event::CData(t)) if inside => {
                return Some(String::from_utf8_lossy(&t.into_inner()).into_owned());
            }
            Ok(Event::End(e)) if inside && e.name().as_ref() == tag.as_bytes() => {
                // Empty element: <tag></tag>
                return Some(String::new());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Value of `attr` on the first `<tag …>` element in `xml`.
#[must_use]
pub fn first_attr(xml: &str, tag: &str, attr: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == tag.as_bytes() => {
                for a in e.attributes().flatten() {
                    if a.key.as_ref() == attr.as_bytes() {
                        return a.unescape_value().ok().map(|v| v.into_owned());
                    }
                }
                return None;
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Whether `xml` contains a `<tag>` element at any depth.
#[must_use]
pub fn has_tag(xml: &str, tag: &str) -> bool {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == tag.as_bytes() => {
                return true;
            }
            Ok(Event::Eof) | Err(_) => return false,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_tag_text() {
        let xml = "<msg><appmsg><title>hi there</title><type>57</type></appmsg></msg>";
        assert_eq!(first_tag_text(xml, "title").as_deref(), Some("hi there"));
        assert_eq!(first_tag_text(xml, "type").as_deref(), Some("57"));
        assert_eq!(first_tag_text(xml, "missing"), None);
    }

    #[test]
    fn extracts_cdata() {
        let xml = "<msg><url><![CDATA[https://example.com/a?b=1&c=2]]></url></msg>";
        assert_eq!(
            first_tag_text(xml, "url").as_deref(),
            Some("https://example.com/a?b=1&c=2")
        );
    }

    #[test]
    fn empty_element_yields_empty_string() {
        assert_eq!(
            first_tag_text("<msg><des></des></msg>", "des").as_deref(),
            Some("")
        );
    }

    #[test]
    fn extracts_attribute() {
        let xml = r#"<msg><emoji cdnurl="http://cdn/x" md5="abc"/></msg>"#;
        assert_eq!(first_attr(xml, "emoji", "cdnurl").as_deref(), Some("http://cdn/x"));
        assert_eq!(first_attr(xml, "emoji", "md5").as_deref(), Some("abc"));
        assert_eq!(first_attr(xml, "emoji", "nope"), None);
    }

    #[test]
    fn has_tag_finds_nested_elements() {
        let xml = "<msg><appmsg><refermsg><chatusr>u</chatusr></refermsg></appmsg></msg>";
        assert!(has_tag(xml, "refermsg"));
        assert!(!has_tag(xml, "absent"));
    }

    #[test]
    fn malformed_xml_is_none_not_panic() {
        assert_eq!(first_tag_text("<msg><broken", "msg"), None);
        assert!(!has_tag("not xml at all", "msg"));
    }
}
