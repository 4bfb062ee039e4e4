use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::soap::Error;

/// The parts of a WSDL document the client needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceDescription {
    pub target_namespace: String,
    /// `soap:address` of the first port, if any.
    pub location: Option<String>,
    /// Operations of the port types, in document order.
    pub operations: Vec<String>,
}

impl ServiceDescription {
    pub fn parse(wsdl: &str) -> Result<Self, Error> {
        let mut reader = Reader::from_str(wsdl);
        reader.config_mut().trim_text(true);

        let mut description = ServiceDescription::default();
        let mut in_port_type = false;
        let mut seen_definitions = false;
        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    in_port_type |= description.visit(&e, in_port_type, &mut seen_definitions)?;
                }
                Event::Empty(e) => {
                    description.visit(&e, in_port_type, &mut seen_definitions)?;
                }
                Event::End(e) if e.local_name().as_ref() == b"portType" => in_port_type = false,
                Event::Eof => break,
                _ => {}
            }
        }
        if !seen_definitions {
            return Err(Error::Xml("missing wsdl:definitions element".to_string()));
        }
        Ok(description)
    }

    /// Records what `e` contributes and returns whether it opens a port type.
    fn visit(&mut self, e: &BytesStart, in_port_type: bool, seen_definitions: &mut bool) -> Result<bool, Error> {
        match e.local_name().as_ref() {
            b"definitions" => {
                *seen_definitions = true;
                if let Some(ns) = attribute(e, b"targetNamespace")? {
                    self.target_namespace = ns;
                }
            }
            b"portType" => return Ok(true),
            b"operation" if in_port_type => {
                if let Some(name) = attribute(e, b"name")? {
                    if !self.operations.contains(&name) {
                        self.operations.push(name);
                    }
                }
            }
            b"address" if self.location.is_none() => {
                self.location = attribute(e, b"location")?;
            }
            _ => {}
        }
        Ok(false)
    }
}

fn attribute(e: &BytesStart, local_name: &[u8]) -> Result<Option<String>, Error> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == local_name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
