//! Заголовок OFX-файла.
//!
//! Версии 1.x (102, 103, …) используют SGML-заголовок из строк `KEY:VALUE`,
//! отделённый от дерева пустой строкой; версии 2.x — XML-декларацию и
//! инструкцию `<?OFX …?>`.

use crate::error::{OfxGenError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::fmt;
use uuid::Uuid;

const NONE: &str = "NONE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfxHeader {
    pub version: u16,
    pub security: String,
    pub encoding: String,
    pub charset: String,
    pub compression: String,
    pub old_file_uid: String,
    pub new_file_uid: String,
}

impl OfxHeader {
    /// NEWFILEUID генерируется на каждый файл.
    pub fn new(version: u16) -> Self {
        let encoding = if version >= 200 { "UTF-8" } else { "USASCII" };
        Self {
            version,
            security: NONE.into(),
            encoding: encoding.into(),
            charset: NONE.into(),
            compression: NONE.into(),
            old_file_uid: NONE.into(),
            new_file_uid: Uuid::new_v4().simple().to_string().to_uppercase(),
        }
    }

    pub fn is_xml(&self) -> bool {
        self.version >= 200
    }

    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim_start_matches('\u{feff}').trim_start();
        if text.starts_with("<?") {
            parse_v2(text)
        } else {
            parse_v1(text)
        }
    }
}

impl fmt::Display for OfxHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_xml() {
            write!(
                f,
                "<?xml version=\"1.0\" encoding=\"{}\" standalone=\"no\"?>\r\n",
                self.encoding
            )?;
            write!(
                f,
                "<?OFX OFXHEADER=\"200\" VERSION=\"{}\" SECURITY=\"{}\" OLDFILEUID=\"{}\" NEWFILEUID=\"{}\"?>\r\n",
                self.version, self.security, self.old_file_uid, self.new_file_uid
            )
        } else {
            let lines = [
                ("OFXHEADER", "100".to_string()),
                ("DATA", "OFXSGML".to_string()),
                ("VERSION", self.version.to_string()),
                ("SECURITY", self.security.clone()),
                ("ENCODING", self.encoding.clone()),
                ("CHARSET", self.charset.clone()),
                ("COMPRESSION", self.compression.clone()),
                ("OLDFILEUID", self.old_file_uid.clone()),
                ("NEWFILEUID", self.new_file_uid.clone()),
            ];
            for (key, value) in lines {
                write!(f, "{key}:{value}\r\n")?;
            }
            write!(f, "\r\n")
        }
    }
}

fn parse_v1(text: &str) -> Result<OfxHeader> {
    let mut fields = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('<') {
            break;
        }
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| OfxGenError::Parse(format!("header line {line:?}")))?;
        fields.insert(key.trim().to_string(), value.trim().to_string());
    }

    if fields.get("OFXHEADER").map(String::as_str) != Some("100") {
        return Err(OfxGenError::Parse("OFXHEADER:100 expected".into()));
    }
    from_fields(fields)
}

fn parse_v2(text: &str) -> Result<OfxHeader> {
    let caps = processing_instruction_re()
        .captures(text)
        .ok_or_else(|| OfxGenError::Parse("<?OFX ...?> not found".into()))?;
    let mut fields: HashMap<String, String> = attribute_re()
        .captures_iter(&caps["attrs"])
        .map(|c| (c["key"].to_string(), c["value"].to_string()))
        .collect();

    if fields.get("OFXHEADER").map(String::as_str) != Some("200") {
        return Err(OfxGenError::Parse("OFXHEADER=\"200\" expected".into()));
    }

    let encoding = xml_encoding_re()
        .captures(text)
        .map(|c| c["enc"].to_string())
        .unwrap_or_else(|| "UTF-8".into());
    fields.insert("ENCODING".into(), encoding);
    from_fields(fields)
}

fn processing_instruction_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<\?OFX\s+(?P<attrs>[^?]*)\?>").expect("ofx pi regex"))
}

fn attribute_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?P<key>[A-Z]+)="(?P<value>[^"]*)""#).expect("attribute regex"))
}

fn xml_encoding_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<\?xml[^>]*encoding="(?P<enc>[^"]*)""#).expect("xml encoding regex")
    })
}

fn from_fields(mut fields: HashMap<String, String>) -> Result<OfxHeader> {
    let version = fields
        .get("VERSION")
        .ok_or_else(|| OfxGenError::Parse("VERSION missing".into()))?
        .parse::<u16>()
        .map_err(|e| OfxGenError::Parse(format!("VERSION: {e}")))?;

    let mut take = |key: &str| fields.remove(key).unwrap_or_else(|| NONE.to_string());
    Ok(OfxHeader {
        version,
        security: take("SECURITY"),
        encoding: take("ENCODING"),
        charset: take("CHARSET"),
        compression: take("COMPRESSION"),
        old_file_uid: take("OLDFILEUID"),
        new_file_uid: take("NEWFILEUID"),
    })
}
