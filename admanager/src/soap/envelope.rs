use std::fmt::Write;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::soap::Error;

pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Key of a JSON object whose entries are rendered as XML attributes of the
/// enclosing element, e.g. `{"attributes": {"xsi:type": "NumberValue"}}`.
pub const ATTRIBUTES_KEY: &str = "attributes";

/// A header block added to every outgoing envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapHeader {
    /// Qualified element name, e.g. `ns1:RequestHeader`.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Child elements in order, with qualified names.
    pub fields: Vec<(String, String)>,
}

impl SoapHeader {
    fn render(&self, out: &mut String) -> Result<(), Error> {
        out.push('<');
        out.push_str(check_name(&self.name)?);
        for (k, v) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", check_name(k)?, escape(v.as_str()));
        }
        out.push('>');
        for (k, v) in &self.fields {
            let k = check_name(k)?;
            let _ = write!(out, "<{k}>{}</{k}>", escape(v.as_str()));
        }
        let _ = write!(out, "</{}>", self.name);
        Ok(())
    }
}

/// Accepts a qualified XML name (`prefix:local` or `local`) and rejects
/// anything that would break out of the markup.
pub fn check_name(name: &str) -> Result<&str, Error> {
    fn is_ncname(part: &str) -> bool {
        let mut chars = part.chars();
        match chars.next() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    }
    let valid = match name.split_once(':') {
        Some((prefix, local)) => is_ncname(prefix) && is_ncname(local),
        None => is_ncname(name),
    };
    if valid {
        Ok(name)
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}

/// Bearer token sent in the `Authorization` header of every request.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerSecurity {
    token: String,
}

impl BearerSecurity {
    pub fn new(token: impl Into<String>) -> Result<Self, Error> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::EmptyToken);
        }
        Ok(Self { token })
    }

    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl std::fmt::Debug for BearerSecurity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerSecurity(***)")
    }
}

/// Renders the request envelope of `operation`.
///
/// The operation element carries the target namespace as its default
/// namespace, so the rendered body fields are qualified by it.
pub fn render(namespace: &str, operation: &str, headers: &[SoapHeader], body: &Value) -> Result<String, Error> {
    let fields = match body {
        Value::Object(map) => Some(map),
        Value::Null => None,
        _ => return Err(Error::InvalidBody(operation.to_string())),
    };

    check_name(operation)?;

    let mut out = String::with_capacity(512);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = write!(
        out,
        r#"<soapenv:Envelope xmlns:soapenv="{SOAP_ENVELOPE_NS}" xmlns:xsi="{XSI_NS}">"#
    );
    if !headers.is_empty() {
        out.push_str("<soapenv:Header>");
        for header in headers {
            header.render(&mut out)?;
        }
        out.push_str("</soapenv:Header>");
    }
    out.push_str("<soapenv:Body>");
    let _ = write!(out, r#"<{operation} xmlns="{}">"#, escape(namespace));
    if let Some(fields) = fields {
        render_fields(fields, &mut out)?;
    }
    let _ = write!(out, "</{operation}>");
    out.push_str("</soapenv:Body></soapenv:Envelope>");
    Ok(out)
}

fn render_fields(map: &Map<String, Value>, out: &mut String) -> Result<(), Error> {
    for (name, value) in map {
        if name == ATTRIBUTES_KEY {
            continue;
        }
        render_element(check_name(name)?, value, out)?;
    }
    Ok(())
}

fn render_element(name: &str, value: &Value, out: &mut String) -> Result<(), Error> {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            out.push('<');
            out.push_str(name);
            if let Some(Value::Object(attrs)) = map.get(ATTRIBUTES_KEY) {
                for (k, v) in attrs {
                    let _ = write!(out, " {}=\"{}\"", check_name(k)?, escape(scalar(v).as_str()));
                }
            }
            out.push('>');
            render_fields(map, out)?;
            let _ = write!(out, "</{name}>");
        }
        // arrays repeat the element; nested arrays are flattened
        Value::Array(items) => {
            for item in items {
                render_element(name, item, out)?;
            }
        }
        v => {
            let _ = write!(out, "<{name}>{}</{name}>", escape(scalar(v).as_str()));
        }
    }
    Ok(())
}

fn scalar(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

struct Frame {
    name: String,
    fields: Map<String, Value>,
    text: String,
    nil: bool,
}

impl Frame {
    fn new(e: &BytesStart) -> Result<Self, Error> {
        Ok(Self {
            name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
            fields: Map::new(),
            text: String::new(),
            nil: is_nil(e)?,
        })
    }

    fn into_value(self) -> (String, Value) {
        let value = if self.nil {
            Value::Null
        } else if self.fields.is_empty() {
            Value::String(self.text)
        } else {
            Value::Object(self.fields)
        };
        (self.name, value)
    }
}

fn is_nil(e: &BytesStart) -> Result<bool, Error> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == b"nil" {
            return Ok(attr.unescape_value()? == "true");
        }
    }
    Ok(false)
}

fn insert(map: &mut Map<String, Value>, name: String, value: Value) {
    match map.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}

/// Parses a response envelope into the JSON form of its first body element,
/// e.g. `{"rval": ...}`. Repeated elements become arrays.
pub fn parse_response(xml: &str) -> Result<Value, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    // frames below soapenv:Body
    let mut stack: Vec<Frame> = Vec::new();
    let mut in_body = false;
    let mut result: Option<(String, Value)> = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if in_body {
                    stack.push(Frame::new(&e)?);
                } else if e.local_name().as_ref() == b"Body" {
                    in_body = true;
                }
            }
            Event::Empty(e) if in_body => {
                let (name, value) = Frame::new(&e)?.into_value();
                match stack.last_mut() {
                    Some(parent) => insert(&mut parent.fields, name, value),
                    None if result.is_none() => result = Some((name, value)),
                    None => {}
                }
            }
            Event::Text(t) if in_body => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(t) if in_body => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::End(e) if in_body => match stack.pop() {
                Some(frame) => {
                    let (name, value) = frame.into_value();
                    match stack.last_mut() {
                        Some(parent) => insert(&mut parent.fields, name, value),
                        None if result.is_none() => result = Some((name, value)),
                        None => {}
                    }
                }
                None if e.local_name().as_ref() == b"Body" => in_body = false,
                None => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    match result {
        Some((name, value)) if name == "Fault" => Err(fault(value)),
        Some((_, Value::Object(map))) => Ok(Value::Object(map)),
        // a response element without children
        Some(_) => Ok(Value::Object(Map::new())),
        None => Err(Error::Xml("missing soap:Body content".to_string())),
    }
}

fn fault(value: Value) -> Error {
    let field = |name: &str| value.get(name).map(scalar).unwrap_or_default();
    Error::Fault {
        code: field("faultcode"),
        message: field("faultstring"),
        detail: value.get("detail").cloned(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn header() -> SoapHeader {
        SoapHeader {
            name: "ns1:RequestHeader".to_string(),
            attributes: vec![("xmlns:ns1".to_string(), "urn:test".to_string())],
            fields: vec![("ns1:applicationName".to_string(), "a&b".to_string())],
        }
    }

    #[test]
    fn test_render() {
        let body = json!({
            "filterStatement": {
                "query": "WHERE id > :id",
                "values": [
                    {"key": "id", "value": {"attributes": {"xsi:type": "NumberValue"}, "value": 5}},
                ],
            },
            "skipped": null,
        });
        let xml = render("urn:test", "getLineItemsByStatement", &[header()], &body).unwrap();
        assert!(xml.contains(
            r#"<soapenv:Header><ns1:RequestHeader xmlns:ns1="urn:test"><ns1:applicationName>a&amp;b</ns1:applicationName></ns1:RequestHeader></soapenv:Header>"#
        ));
        assert!(xml.contains(r#"<getLineItemsByStatement xmlns="urn:test"><filterStatement><query>WHERE id &gt; :id</query>"#));
        assert!(xml.contains(r#"<values><key>id</key><value xsi:type="NumberValue"><value>5</value></value></values>"#));
        assert!(!xml.contains("skipped"));
        assert!(!xml.contains("attributes"));
    }

    #[test]
    fn test_render_invalid_body() {
        assert!(matches!(render("urn:test", "op", &[], &json!([1])), Err(Error::InvalidBody(_))));
        let xml = render("urn:test", "op", &[], &Value::Null).unwrap();
        assert!(xml.contains(r#"<soapenv:Body><op xmlns="urn:test"></op></soapenv:Body>"#));
        assert!(!xml.contains("soapenv:Header"));
    }

    #[test]
    fn test_render_rejects_markup_in_names() {
        let body = json!({"a><evil/><b": "x"});
        assert!(matches!(render("urn:test", "op", &[], &body), Err(Error::InvalidName(n)) if n == "a><evil/><b"));

        let body = json!({"value": {"attributes": {"x=\"1\" onload": "y"}, "v": 1}});
        assert!(matches!(render("urn:test", "op", &[], &body), Err(Error::InvalidName(_))));

        let body = json!({"outer": [{"in ner": 1}]});
        assert!(matches!(render("urn:test", "op", &[], &body), Err(Error::InvalidName(_))));

        assert!(matches!(render("urn:test", "op><x", &[], &Value::Null), Err(Error::InvalidName(_))));

        let mut bad = header();
        bad.fields.push(("ns1:a></ns1:RequestHeader><x".to_string(), "v".to_string()));
        assert!(matches!(render("urn:test", "op", &[bad], &Value::Null), Err(Error::InvalidName(_))));
    }

    #[test]
    fn test_check_name() {
        assert!(check_name("filterStatement").is_ok());
        assert!(check_name("ns1:networkCode").is_ok());
        assert!(check_name("xmlns:soapenv").is_ok());
        assert!(check_name("_private-1.x").is_ok());
        assert!(check_name("").is_err());
        assert!(check_name("1abc").is_err());
        assert!(check_name("a:b:c").is_err());
        assert!(check_name(":a").is_err());
        assert!(check_name("a b").is_err());
        assert!(check_name("a\"b").is_err());
    }

    #[test]
    fn test_parse_response() {
        let xml = r#"<?xml version="1.0"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Header><ResponseHeader><requestId>abc</requestId></ResponseHeader></soap:Header>
  <soap:Body>
    <getReportJobStatusResponse xmlns="urn:test">
      <rval>COMPLETED</rval>
    </getReportJobStatusResponse>
  </soap:Body>
</soap:Envelope>"#;
        assert_eq!(json!({"rval": "COMPLETED"}), parse_response(xml).unwrap());
    }

    #[test]
    fn test_parse_response_nested() {
        let xml = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body>
<r xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><rval><totalResultSetSize>2</totalResultSetSize>
<results><id>1</id><name>a &amp; b</name></results><results><id>2</id><name xsi:nil="true"/></results>
<empty/></rval></r></soap:Body></soap:Envelope>"#;
        assert_eq!(
            json!({"rval": {
                "totalResultSetSize": "2",
                "results": [{"id": "1", "name": "a & b"}, {"id": "2", "name": null}],
                "empty": "",
            }}),
            parse_response(xml).unwrap()
        );
    }

    #[test]
    fn test_parse_response_without_rval() {
        let xml = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body><performActionResponse/></soap:Body></soap:Envelope>"#;
        assert_eq!(json!({}), parse_response(xml).unwrap());
    }

    #[test]
    fn test_parse_fault() {
        let xml = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body><soap:Fault>
<faultcode>soap:Server</faultcode><faultstring>[AuthenticationError.NETWORK_NOT_FOUND @ ]</faultstring>
</soap:Fault></soap:Body></soap:Envelope>"#;
        match parse_response(xml) {
            Err(Error::Fault { code, message, detail }) => {
                assert_eq!("soap:Server", code);
                assert_eq!("[AuthenticationError.NETWORK_NOT_FOUND @ ]", message);
                assert!(detail.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_bearer_security() {
        assert!(matches!(BearerSecurity::new(""), Err(Error::EmptyToken)));
        let security = BearerSecurity::new("abc").unwrap();
        assert_eq!("Bearer abc", security.header_value());
        assert_eq!("BearerSecurity(***)", format!("{security:?}"));
    }
}
