//! Record-driven fixtures for custom reports.
//!
//! Records are JSON objects, the same shape a test scenario or a seed file
//! would write them in. Required properties are checked before anything is
//! stored.

use serde_json::{Map, Value};

use crate::error::GeneratorError;
use crate::reportbuilder::{Column, Filter, Report, ReportStore};

type Result<T> = std::result::Result<T, GeneratorError>;

pub struct ReportBuilderGenerator<'a> {
    store: &'a dyn ReportStore,
    userid: i64,
}

impl<'a> ReportBuilderGenerator<'a> {
    /// Reports are recorded as created by `userid`.
    pub fn new(store: &'a dyn ReportStore, userid: i64) -> Self {
        Self { store, userid }
    }

    /// Requires `name` and `source`. `default` (true unless given) adds the
    /// source's default columns, filters and conditions.
    pub fn create_report(&self, record: &Value) -> Result<Report> {
        let record = as_record(record)?;
        let name = required_str(record, "name")?;
        let source = required_str(record, "source")?;
        let default = optional_bool(record, "default")?.unwrap_or(true);
        let report = self.store.create_report(name, source, default, self.userid)?;
        tracing::debug!("generated report {} from {source}", report.id);
        Ok(report)
    }

    /// Requires `reportid` and `uniqueidentifier`.
    pub fn create_column(&self, record: &Value) -> Result<Column> {
        let (reportid, identifier) = report_item(record)?;
        Ok(self.store.add_column(reportid, identifier)?)
    }

    /// Requires `reportid` and `uniqueidentifier`.
    pub fn create_filter(&self, record: &Value) -> Result<Filter> {
        let (reportid, identifier) = report_item(record)?;
        Ok(self.store.add_filter(reportid, identifier)?)
    }

    /// Requires `reportid` and `uniqueidentifier`.
    pub fn create_condition(&self, record: &Value) -> Result<Filter> {
        let (reportid, identifier) = report_item(record)?;
        Ok(self.store.add_condition(reportid, identifier)?)
    }
}

fn as_record(record: &Value) -> Result<&Map<String, Value>> {
    record.as_object().ok_or(GeneratorError::InvalidProperty {
        property: "record",
        reason: "expected an object".to_string(),
    })
}

fn report_item(record: &Value) -> Result<(i64, &str)> {
    let record = as_record(record)?;
    let reportid = required_int(record, "reportid")?;
    let identifier = required_str(record, "uniqueidentifier")?;
    Ok((reportid, identifier))
}

fn required<'r>(record: &'r Map<String, Value>, property: &'static str) -> Result<&'r Value> {
    record
        .get(property)
        .ok_or(GeneratorError::MissingProperty(property))
}

fn required_str<'r>(record: &'r Map<String, Value>, property: &'static str) -> Result<&'r str> {
    required(record, property)?
        .as_str()
        .ok_or_else(|| GeneratorError::InvalidProperty {
            property,
            reason: "expected a string".to_string(),
        })
}

fn required_int(record: &Map<String, Value>, property: &'static str) -> Result<i64> {
    let value = required(record, property)?;
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| GeneratorError::InvalidProperty {
            property,
            reason: "expected an integer".to_string(),
        })
}

/// Booleans may also be written as 0/1, as numbers or strings.
fn optional_bool(record: &Map<String, Value>, property: &'static str) -> Result<Option<bool>> {
    match record.get(property) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::Number(n)) if n.as_i64() == Some(0) => Ok(Some(false)),
        Some(Value::Number(n)) if n.as_i64() == Some(1) => Ok(Some(true)),
        Some(Value::String(s)) if matches!(s.as_str(), "0" | "false") => Ok(Some(false)),
        Some(Value::String(s)) if matches!(s.as_str(), "1" | "true") => Ok(Some(true)),
        Some(_) => Err(GeneratorError::InvalidProperty {
            property,
            reason: "expected a boolean".to_string(),
        }),
    }
}
