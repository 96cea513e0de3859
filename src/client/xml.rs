//! Mediaflux service request and reply documents

use crate::error::RemoteError;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;

/// Builder for the `<args>` of a service call
#[derive(Debug, Default)]
pub(crate) struct ServiceArgs {
    xml: String,
}

impl ServiceArgs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a leaf element with an escaped text value
    pub(crate) fn add(mut self, name: &str, value: &str) -> Self {
        self.xml
            .push_str(&format!("<{name}>{}</{name}>", escape(value)));
        self
    }

    /// Append an already rendered fragment
    pub(crate) fn raw(mut self, fragment: &str) -> Self {
        self.xml.push_str(fragment);
        self
    }
}

/// Wrap a service call in a request envelope
pub(crate) fn request_document(service: &str, session: Option<&str>, args: &ServiceArgs) -> String {
    let session = session
        .map(|s| format!(" session=\"{}\"", escape(s)))
        .unwrap_or_default();
    format!(
        "<request><service name=\"{}\"{}><args>{}</args></service></request>",
        escape(service),
        session,
        args.xml
    )
}

/// A decoded `<reply>`: its type and the leaf elements beneath it
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ServiceReply {
    reply_type: Option<String>,
    leaves: Vec<(String, String)>,
}

impl ServiceReply {
    /// Parse a `<response>` document
    pub(crate) fn parse(service: &str, xml: &str) -> Result<Self, RemoteError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut reply = ServiceReply::default();
        let mut seen_reply = false;
        // (name, has child elements) for each open element below <reply>
        let mut stack: Vec<(String, bool)> = Vec::new();
        let mut in_reply = false;
        let mut text = String::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if in_reply {
                        if let Some(parent) = stack.last_mut() {
                            parent.1 = true;
                        }
                        stack.push((name, false));
                        text.clear();
                    } else if name == "reply" {
                        in_reply = true;
                        seen_reply = true;
                        reply.reply_type = e
                            .try_get_attribute("type")
                            .map_err(quick_xml::Error::from)?
                            .map(|a| a.unescape_value().map(|v| v.into_owned()))
                            .transpose()?;
                    }
                }
                Event::Empty(e) => {
                    if in_reply {
                        if let Some(parent) = stack.last_mut() {
                            parent.1 = true;
                        }
                        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        reply.leaves.push((name, String::new()));
                    }
                }
                Event::Text(t) => {
                    if in_reply {
                        text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(c) => {
                    if in_reply {
                        text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::End(e) => {
                    if !in_reply {
                        continue;
                    }
                    match stack.pop() {
                        Some((name, has_children)) => {
                            if !has_children {
                                reply.leaves.push((name, std::mem::take(&mut text)));
                            }
                            text.clear();
                        }
                        None if e.name().as_ref() == b"reply" => in_reply = false,
                        None => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_reply {
            return Err(RemoteError::MalformedReply {
                service: service.to_string(),
                reason: "no <reply> element".to_string(),
            });
        }
        Ok(reply)
    }

    /// Turn an error reply into [`RemoteError::Service`]
    pub(crate) fn into_result(self, service: &str) -> Result<Self, RemoteError> {
        match self.reply_type.as_deref() {
            Some("result") => Ok(self),
            Some("error") => Err(RemoteError::Service {
                service: service.to_string(),
                error: self.value("error").unwrap_or_default().to_string(),
                message: self
                    .value("message")
                    .or_else(|| self.value("error"))
                    .unwrap_or("unknown error")
                    .to_string(),
            }),
            other => Err(RemoteError::MalformedReply {
                service: service.to_string(),
                reason: format!("unexpected reply type {:?}", other),
            }),
        }
    }

    /// First value of the named leaf element
    pub(crate) fn value<'a>(&'a self, name: &str) -> Option<&'a str> {
        self.values(name).next()
    }

    /// All values of the named leaf element, in document order
    pub(crate) fn values<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a str> + use<'a, 'n> {
        self.leaves
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}
