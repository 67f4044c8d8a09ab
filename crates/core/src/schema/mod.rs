//! Schema parsers for HR export documents.
//!
//! Each dialect is described by a static [`SchemaLayout`] (namespace URI,
//! employee tag, naked root tags, field table) and exposed through a
//! [`SchemaParser`] implementation. The dialect of a document is chosen up
//! front by [`SchemaDialect::detect`], which reads only the root element.
//!
//! Parsing uses `quick_xml`'s namespace-aware pull reader. `quick_xml` never
//! loads external entities; on top of that, any `<!DOCTYPE>` is rejected and
//! any entity reference other than the five predefined ones fails to unescape,
//! so both surface as [`SchemaError::MalformedDocument`].

pub mod sap_hcm;
pub mod workday;

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use serde::Serialize;

use crate::employee::RawEmployeeRecord;
use crate::error::SchemaError;

pub use sap_hcm::SapHcmParser;
pub use workday::WorkdayParser;

// ---------------------------------------------------------------------------
// Layout description
// ---------------------------------------------------------------------------

/// One child element extracted from every employee element.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Local name of the child element.
    pub element: &'static str,
    /// Key under which the value is stored in the raw record.
    pub key: &'static str,
}

/// Static description of an export dialect.
#[derive(Debug)]
pub struct SchemaLayout {
    pub namespace: &'static str,
    pub employee_tag: &'static str,
    /// Root tags accepted when the document declares no namespace at all.
    pub naked_roots: &'static [&'static str],
    pub fields: &'static [FieldSpec],
}

impl SchemaLayout {
    fn field_for(&self, local_name: &[u8]) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|f| f.element.as_bytes() == local_name)
    }

    /// A record with every field of the layout present and empty.
    fn empty_record(&self) -> RawEmployeeRecord {
        self.fields.iter().map(|f| (f.key, "")).collect()
    }
}

// ---------------------------------------------------------------------------
// Dialects
// ---------------------------------------------------------------------------

/// The recognized HR export dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaDialect {
    Workday,
    SapHcm,
}

impl SchemaDialect {
    pub const ALL: [SchemaDialect; 2] = [Self::Workday, Self::SapHcm];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workday => "workday",
            Self::SapHcm => "sap_hcm",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "workday" => Some(Self::Workday),
            "sap_hcm" => Some(Self::SapHcm),
            _ => None,
        }
    }

    pub fn layout(&self) -> &'static SchemaLayout {
        match self {
            Self::Workday => &workday::LAYOUT,
            Self::SapHcm => &sap_hcm::LAYOUT,
        }
    }

    /// A fresh parser for this dialect.
    pub fn parser(&self) -> Box<dyn SchemaParser> {
        match self {
            Self::Workday => Box::new(WorkdayParser),
            Self::SapHcm => Box::new(SapHcmParser),
        }
    }

    /// Pick the dialect of `document` from its root element.
    ///
    /// The root's own namespace wins over namespaces it merely declares;
    /// naked root tags are only considered when neither matches.
    pub fn detect(document: &[u8]) -> Result<Self, SchemaError> {
        let root = read_root(document)?;

        let by_own_namespace = Self::ALL
            .into_iter()
            .find(|d| root.namespace.as_deref() == Some(d.layout().namespace));
        let by_declaration = || {
            Self::ALL
                .into_iter()
                .find(|d| root.declared.iter().any(|ns| ns == d.layout().namespace))
        };
        let by_naked_root = || Self::ALL.into_iter().find(|d| root.is_naked_root_of(d.layout()));

        by_own_namespace
            .or_else(by_declaration)
            .or_else(by_naked_root)
            .ok_or_else(|| SchemaError::UnsupportedSchema(root.describe()))
    }
}

impl std::fmt::Display for SchemaDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Parse result
// ---------------------------------------------------------------------------

/// How employee elements were located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeMatch {
    /// Employee elements were found in the dialect's namespace.
    Namespaced,
    /// No namespaced employees existed; matched by local name only.
    NamespaceFree,
}

/// Output of a successful parse.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub dialect: SchemaDialect,
    pub employee_match: EmployeeMatch,
    pub employees: Vec<RawEmployeeRecord>,
}

impl ParsedDocument {
    pub fn employee_count(&self) -> usize {
        self.employees.len()
    }
}

// ---------------------------------------------------------------------------
// Parser trait
// ---------------------------------------------------------------------------

/// Converts document bytes into raw employee records for one dialect.
///
/// Implementations are stateless; the default [`parse`](Self::parse) drives
/// everything off [`layout`](Self::layout).
pub trait SchemaParser: Send + Sync {
    fn dialect(&self) -> SchemaDialect;

    fn layout(&self) -> &'static SchemaLayout;

    fn parse(&self, document: &[u8]) -> Result<ParsedDocument, SchemaError> {
        let layout = self.layout();
        let root = read_root(document)?;
        if !root.belongs_to(layout) {
            return Err(SchemaError::UnsupportedSchema(format!(
                "{} (expected a {} export)",
                root.describe(),
                self.dialect()
            )));
        }

        let namespaced = scan_employees(document, layout, EmployeeMatch::Namespaced)?;
        if !namespaced.is_empty() {
            return Ok(ParsedDocument {
                dialect: self.dialect(),
                employee_match: EmployeeMatch::Namespaced,
                employees: namespaced,
            });
        }

        let naked = scan_employees(document, layout, EmployeeMatch::NamespaceFree)?;
        Ok(ParsedDocument {
            dialect: self.dialect(),
            employee_match: if naked.is_empty() {
                EmployeeMatch::Namespaced
            } else {
                EmployeeMatch::NamespaceFree
            },
            employees: naked,
        })
    }
}

/// Detect the dialect of `document` and parse it with that dialect's parser.
pub fn parse_document(document: &[u8]) -> Result<ParsedDocument, SchemaError> {
    SchemaDialect::detect(document)?.parser().parse(document)
}

// ---------------------------------------------------------------------------
// Root inspection
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct RootElement {
    local_name: String,
    /// Resolved namespace of the root itself; `None` when unbound.
    namespace: Option<String>,
    /// Namespaces declared via `xmlns` / `xmlns:*` on the root.
    declared: Vec<String>,
}

impl RootElement {
    fn belongs_to(&self, layout: &SchemaLayout) -> bool {
        self.namespace.as_deref() == Some(layout.namespace)
            || self.declared.iter().any(|ns| ns == layout.namespace)
            || self.is_naked_root_of(layout)
    }

    fn is_naked_root_of(&self, layout: &SchemaLayout) -> bool {
        self.namespace.is_none() && layout.naked_roots.contains(&self.local_name.as_str())
    }

    fn describe(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("root element <{}> in namespace '{ns}'", self.local_name),
            None => format!("root element <{}> without namespace", self.local_name),
        }
    }
}

fn malformed(err: impl std::fmt::Display) -> SchemaError {
    SchemaError::MalformedDocument(err.to_string())
}

fn dtd_rejected() -> SchemaError {
    SchemaError::MalformedDocument("DTD declarations are not permitted".into())
}

fn outside_root(what: &str) -> SchemaError {
    SchemaError::MalformedDocument(format!("{what} outside the root element"))
}

/// Whitespace only. A leading UTF-8 byte order mark counts as blank.
fn is_blank(text: &[u8]) -> bool {
    let text = text.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(text);
    text.iter().all(u8::is_ascii_whitespace)
}

fn bound_namespace(ns: &ResolveResult) -> Option<String> {
    match ns {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        _ => None,
    }
}

fn read_root(document: &[u8]) -> Result<RootElement, SchemaError> {
    let mut reader = NsReader::from_reader(document);
    let mut buf = Vec::new();

    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((ns, Event::Start(e))) | Ok((ns, Event::Empty(e))) => {
                let mut declared = Vec::new();
                for attr in e.attributes() {
                    let attr = attr.map_err(malformed)?;
                    let key = attr.key.as_ref();
                    if key == b"xmlns" || key.starts_with(b"xmlns:") {
                        declared.push(attr.unescape_value().map_err(malformed)?.into_owned());
                    }
                }
                return Ok(RootElement {
                    local_name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                    namespace: bound_namespace(&ns),
                    declared,
                });
            }
            Ok((_, Event::Text(t))) if !is_blank(&t) => return Err(outside_root("text")),
            Ok((_, Event::CData(_))) => return Err(outside_root("CDATA")),
            Ok((_, Event::DocType(_))) => return Err(dtd_rejected()),
            Ok((_, Event::Eof)) => {
                return Err(SchemaError::MalformedDocument(
                    "document has no root element".into(),
                ))
            }
            Ok(_) => {}
            Err(e) => return Err(malformed(e)),
        }
        buf.clear();
    }
}

// ---------------------------------------------------------------------------
// Employee scan
// ---------------------------------------------------------------------------

struct OpenEmployee {
    depth: usize,
    record: RawEmployeeRecord,
}

struct OpenField {
    key: &'static str,
    depth: usize,
    text: String,
}

/// Does an element in namespace `ns` count as the employee element?
fn accepts_employee(mode: EmployeeMatch, ns: &ResolveResult, layout: &SchemaLayout) -> bool {
    match mode {
        EmployeeMatch::Namespaced => bound_namespace(ns).as_deref() == Some(layout.namespace),
        EmployeeMatch::NamespaceFree => true,
    }
}

/// Does a child in namespace `ns` count as a field of its employee?
///
/// Unqualified children are accepted in both modes.
fn accepts_field(mode: EmployeeMatch, ns: &ResolveResult, layout: &SchemaLayout) -> bool {
    match (mode, bound_namespace(ns)) {
        (EmployeeMatch::NamespaceFree, _) | (_, None) => true,
        (EmployeeMatch::Namespaced, Some(bound)) => bound == layout.namespace,
    }
}

fn scan_employees(
    document: &[u8],
    layout: &SchemaLayout,
    mode: EmployeeMatch,
) -> Result<Vec<RawEmployeeRecord>, SchemaError> {
    let mut reader = NsReader::from_reader(document);
    let mut buf = Vec::new();
    let mut depth: usize = 0;
    let mut root_closed = false;
    let mut employee: Option<OpenEmployee> = None;
    let mut field: Option<OpenField> = None;
    let mut employees = Vec::new();

    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((ns, Event::Start(e))) => {
                if root_closed {
                    return Err(outside_root("element"));
                }
                depth += 1;
                let local = e.local_name();
                let employee_depth = employee.as_ref().map(|open| open.depth);
                match employee_depth {
                    None => {
                        if local.as_ref() == layout.employee_tag.as_bytes()
                            && accepts_employee(mode, &ns, layout)
                        {
                            employee = Some(OpenEmployee {
                                depth,
                                record: layout.empty_record(),
                            });
                        }
                    }
                    Some(parent) if depth == parent + 1 && field.is_none() => {
                        if let Some(spec) = layout.field_for(local.as_ref()) {
                            if accepts_field(mode, &ns, layout) {
                                field = Some(OpenField {
                                    key: spec.key,
                                    depth,
                                    text: String::new(),
                                });
                            }
                        }
                    }
                    Some(_) => {}
                }
            }
            Ok((ns, Event::Empty(e))) => {
                if root_closed {
                    return Err(outside_root("element"));
                }
                root_closed = depth == 0;
                // `<Employee/>` still counts as an employee; `<Field/>` is
                // already present as "" in the open record.
                if employee.is_none()
                    && e.local_name().as_ref() == layout.employee_tag.as_bytes()
                    && accepts_employee(mode, &ns, layout)
                {
                    employees.push(layout.empty_record());
                }
            }
            Ok((_, Event::Text(t))) => {
                if depth == 0 && !is_blank(&t) {
                    return Err(outside_root("text"));
                }
                if let Some(open) = field.as_mut().filter(|f| f.depth == depth) {
                    open.text.push_str(&t.unescape().map_err(malformed)?);
                }
            }
            Ok((_, Event::CData(c))) => {
                if depth == 0 {
                    return Err(outside_root("CDATA"));
                }
                if let Some(open) = field.as_mut().filter(|f| f.depth == depth) {
                    open.text.push_str(std::str::from_utf8(&c).map_err(malformed)?);
                }
            }
            Ok((_, Event::End(_))) => {
                if field.as_ref().is_some_and(|f| f.depth == depth) {
                    if let (Some(done), Some(open)) = (field.take(), employee.as_mut()) {
                        open.record.insert(done.key, done.text.trim());
                    }
                }
                if employee.as_ref().is_some_and(|e| e.depth == depth) {
                    if let Some(done) = employee.take() {
                        employees.push(done.record);
                    }
                }
                depth = depth.saturating_sub(1);
                root_closed = depth == 0;
            }
            Ok((_, Event::DocType(_))) => return Err(dtd_rejected()),
            Ok((_, Event::Eof)) => {
                if depth != 0 {
                    return Err(SchemaError::MalformedDocument(
                        "unexpected end of document".into(),
                    ));
                }
                break;
            }
            Ok(_) => {}
            Err(e) => return Err(malformed(e)),
        }
        buf.clear();
    }

    Ok(employees)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const WORKDAY_DOC: &[u8] = br#"<?xml version="1.0"?>
<wd:Report_Data xmlns:wd="urn:com.workday.report/HR_Employee_Export">
  <wd:Employee><wd:Employee_ID>EMP001</wd:Employee_ID></wd:Employee>
</wd:Report_Data>"#;

    const SAP_DOC: &[u8] = br#"<?xml version="1.0"?>
<sap:EmployeeExport xmlns:sap="urn:sap.com:hcm:employee:export">
  <sap:Employee><sap:PersonnelNumber>00012345</sap:PersonnelNumber></sap:Employee>
</sap:EmployeeExport>"#;

    // -- Detection -----------------------------------------------------------

    #[test]
    fn detects_workday_by_root_namespace() {
        assert_eq!(SchemaDialect::detect(WORKDAY_DOC).unwrap(), SchemaDialect::Workday);
    }

    #[test]
    fn detects_sap_by_root_namespace() {
        assert_eq!(SchemaDialect::detect(SAP_DOC).unwrap(), SchemaDialect::SapHcm);
    }

    #[test]
    fn detects_by_declaration_on_unqualified_root() {
        let doc = br#"<Export xmlns:sap="urn:sap.com:hcm:employee:export"><sap:Employee/></Export>"#;
        assert_eq!(SchemaDialect::detect(doc).unwrap(), SchemaDialect::SapHcm);
    }

    #[test]
    fn detects_naked_workday_root() {
        let doc = b"<Report_Data><Employee><Employee_ID>1</Employee_ID></Employee></Report_Data>";
        assert_eq!(SchemaDialect::detect(doc).unwrap(), SchemaDialect::Workday);
    }

    #[test]
    fn unknown_root_is_unsupported() {
        let doc = br#"<Payroll xmlns="urn:example:payroll"><Employee/></Payroll>"#;
        assert_matches!(
            SchemaDialect::detect(doc),
            Err(SchemaError::UnsupportedSchema(msg)) if msg.contains("Payroll")
        );
    }

    #[test]
    fn dialect_names_round_trip() {
        for d in SchemaDialect::ALL {
            assert_eq!(SchemaDialect::from_str(d.as_str()), Some(d));
        }
    }

    // -- Hardening -----------------------------------------------------------

    #[test]
    fn doctype_is_rejected() {
        let doc = br#"<?xml version="1.0"?>
<!DOCTYPE foo [ <!ENTITY xxe SYSTEM "file:///etc/passwd"> ]>
<Report_Data><Employee><Employee_ID>&xxe;</Employee_ID></Employee></Report_Data>"#;
        assert_matches!(
            parse_document(doc),
            Err(SchemaError::MalformedDocument(msg)) if msg.contains("DTD")
        );
    }

    #[test]
    fn undefined_entity_is_rejected() {
        let doc = b"<Report_Data><Employee><Employee_ID>&xxe;</Employee_ID></Employee></Report_Data>";
        assert_matches!(parse_document(doc), Err(SchemaError::MalformedDocument(_)));
    }

    #[test]
    fn predefined_entities_are_unescaped() {
        let doc = b"<Report_Data><Employee><Department>R&amp;D</Department></Employee></Report_Data>";
        let parsed = parse_document(doc).unwrap();
        assert_eq!(parsed.employees[0].get("department"), "R&D");
    }

    #[test]
    fn mismatched_tags_are_malformed() {
        let doc = b"<Report_Data><Employee></Report_Data>";
        assert_matches!(parse_document(doc), Err(SchemaError::MalformedDocument(_)));
    }

    #[test]
    fn truncated_document_is_malformed() {
        let doc = b"<Report_Data><Employee><Employee_ID>1</Employee_ID>";
        assert_matches!(parse_document(doc), Err(SchemaError::MalformedDocument(_)));
    }

    #[test]
    fn second_root_element_is_malformed() {
        let doc = br#"<Report_Data/><Payroll xmlns="urn:x"><Employee><Employee_ID>1</Employee_ID></Employee></Payroll>"#;
        assert_matches!(
            parse_document(doc),
            Err(SchemaError::MalformedDocument(msg)) if msg.contains("outside the root")
        );
    }

    #[test]
    fn text_around_root_is_malformed() {
        let leading = b"junk text <Report_Data><Employee><Employee_ID>1</Employee_ID></Employee></Report_Data>";
        assert_matches!(parse_document(leading), Err(SchemaError::MalformedDocument(_)));

        let trailing = b"<Report_Data><Employee><Employee_ID>1</Employee_ID></Employee></Report_Data>junk";
        assert_matches!(parse_document(trailing), Err(SchemaError::MalformedDocument(_)));
    }

    #[test]
    fn whitespace_and_comments_around_root_are_accepted() {
        let doc = b"<?xml version=\"1.0\"?>\n<!-- export -->\n<Report_Data><Employee><Employee_ID>1</Employee_ID></Employee></Report_Data>\n<?done?>\n<!-- end -->\n";
        assert_eq!(parse_document(doc).unwrap().employee_count(), 1);
    }

    #[test]
    fn plain_text_is_malformed() {
        assert_matches!(
            parse_document(b"This is not XML"),
            Err(SchemaError::MalformedDocument(_))
        );
    }

    // -- Parser / root agreement --------------------------------------------

    #[test]
    fn parser_rejects_other_dialects_document() {
        assert_matches!(
            WorkdayParser.parse(SAP_DOC),
            Err(SchemaError::UnsupportedSchema(_))
        );
        assert_matches!(
            SapHcmParser.parse(WORKDAY_DOC),
            Err(SchemaError::UnsupportedSchema(_))
        );
    }

    #[test]
    fn cdata_field_text_is_captured() {
        let doc = b"<Report_Data><Employee><First_Name><![CDATA[ Ana ]]></First_Name></Employee></Report_Data>";
        let parsed = parse_document(doc).unwrap();
        assert_eq!(parsed.employees[0].get("first_name"), "Ana");
    }
}
