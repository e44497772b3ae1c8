//! WebDAV/CalDAV request bodies and response parsing, built and read with
//! `quick-xml` the way other calendar-sync code in this corpus does.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::io::Cursor;

const ICS_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

pub fn principal_propfind_body() -> String {
    propfind_body(&["current-user-principal"])
}

pub fn calendar_home_propfind_body() -> String {
    propfind_body(&["calendar-home-set"])
}

pub fn calendar_listing_propfind_body() -> String {
    propfind_body_with_tags(&[
        "resourcetype",
        "supported-calendar-component-set",
        "displayname",
    ])
}

fn propfind_body(dav_props: &[&str]) -> String {
    propfind_body_with_tags(dav_props)
}

fn propfind_body_with_tags(props: &[&str]) -> String {
    let mut buf = Vec::new();
    let mut writer = Writer::new_with_indent(Cursor::new(&mut buf), b' ', 2);

    write_start(&mut writer, "d:propfind", &[("xmlns:d", "DAV:"), ("xmlns:c", "urn:ietf:params:xml:ns:caldav")]);
    write_start(&mut writer, "d:prop", &[]);
    for prop in props {
        write_empty(&mut writer, &format!("d:{prop}"));
    }
    write_end(&mut writer, "d:prop");
    write_end(&mut writer, "d:propfind");

    String::from_utf8(buf).expect("generated xml is valid utf-8")
}

/// `REPORT calendar-query` with a VEVENT time-range filter bounded by the
/// sync horizon `[from, to]`.
pub fn calendar_query_body(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    let mut buf = Vec::new();
    let mut writer = Writer::new_with_indent(Cursor::new(&mut buf), b' ', 2);

    write_start(
        &mut writer,
        "c:calendar-query",
        &[("xmlns:d", "DAV:"), ("xmlns:c", "urn:ietf:params:xml:ns:caldav")],
    );
    write_start(&mut writer, "d:prop", &[]);
    write_empty(&mut writer, "d:getetag");
    write_empty(&mut writer, "c:calendar-data");
    write_end(&mut writer, "d:prop");

    write_start(&mut writer, "c:filter", &[]);
    write_start(&mut writer, "c:comp-filter", &[("name", "VCALENDAR")]);
    write_start(&mut writer, "c:comp-filter", &[("name", "VEVENT")]);
    write_start(
        &mut writer,
        "c:time-range",
        &[
            ("start", &from.format(ICS_TIME_FORMAT).to_string()),
            ("end", &to.format(ICS_TIME_FORMAT).to_string()),
        ],
    );
    write_end(&mut writer, "c:time-range");
    write_end(&mut writer, "c:comp-filter");
    write_end(&mut writer, "c:comp-filter");
    write_end(&mut writer, "c:filter");
    write_end(&mut writer, "c:calendar-query");

    String::from_utf8(buf).expect("generated xml is valid utf-8")
}

fn write_start(writer: &mut Writer<Cursor<&mut Vec<u8>>>, name: &str, attrs: &[(&str, &str)]) {
    let mut elem = quick_xml::events::BytesStart::new(name);
    for (k, v) in attrs {
        elem.push_attribute((*k, *v));
    }
    writer.write_event(Event::Start(elem)).expect("writing xml element");
}

fn write_empty(writer: &mut Writer<Cursor<&mut Vec<u8>>>, name: &str) {
    let elem = quick_xml::events::BytesStart::new(name);
    writer.write_event(Event::Empty(elem)).expect("writing xml element");
}

fn write_end(writer: &mut Writer<Cursor<&mut Vec<u8>>>, name: &str) {
    writer
        .write_event(Event::End(quick_xml::events::BytesEnd::new(name)))
        .expect("writing xml element");
}

/// One `<d:response>` entry, with the handful of fields our callers need.
#[derive(Debug, Default, Clone)]
pub struct DavResponse {
    pub href: Option<String>,
    pub current_user_principal: Option<String>,
    pub calendar_home_set: Option<String>,
    pub is_collection: bool,
    pub supported_components: Vec<String>,
    pub calendar_data: Option<String>,
}

/// Parse a multistatus response body into its `<d:response>` entries.
/// Tolerant of extra/unknown elements; only recognized tags populate fields.
pub fn parse_multistatus(body: &str) -> anyhow::Result<Vec<DavResponse>> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut responses = Vec::new();
    let mut current: Option<DavResponse> = None;
    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let local = local_name(&e.name().as_ref().to_vec());
                path.push(local.clone());

                if local == "response" {
                    current = Some(DavResponse::default());
                }
                text_buf.clear();
            }
            Event::Empty(e) => {
                let local = local_name(&e.name().as_ref().to_vec());
                if local == "collection" {
                    if let Some(r) = current.as_mut() {
                        r.is_collection = true;
                    }
                }
                if local == "comp" {
                    for attr in e.attributes().flatten() {
                        if local_name(&attr.key.as_ref().to_vec()) == "name" {
                            if let Some(r) = current.as_mut() {
                                r.supported_components
                                    .push(String::from_utf8_lossy(&attr.value).to_string());
                            }
                        }
                    }
                }
            }
            Event::Text(t) => {
                text_buf.push_str(&t.unescape()?);
            }
            Event::CData(t) => {
                text_buf.push_str(&String::from_utf8_lossy(&t.into_inner()));
            }
            Event::End(e) => {
                let local = local_name(&e.name().as_ref().to_vec());
                let trimmed = text_buf.trim().to_string();

                if let Some(r) = current.as_mut() {
                    match local.as_str() {
                        "href" => {
                            let parent = path.get(path.len().saturating_sub(2));
                            match parent.map(String::as_str) {
                                Some("current-user-principal") => {
                                    r.current_user_principal = Some(trimmed.clone())
                                }
                                Some("calendar-home-set") => {
                                    r.calendar_home_set = Some(trimmed.clone())
                                }
                                _ => r.href = Some(trimmed.clone()),
                            }
                        }
                        "calendar-data" => r.calendar_data = Some(trimmed.clone()),
                        "response" => responses.push(current.take().unwrap()),
                        _ => {}
                    }
                }

                text_buf.clear();
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(responses)
}

fn local_name(qualified: &[u8]) -> String {
    let s = String::from_utf8_lossy(qualified);
    s.rsplit(':').next().unwrap_or(&s).to_string()
}
