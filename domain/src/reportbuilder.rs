//! Custom report models: reports, their columns, filters and conditions.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub name: String,
    pub source: String,
    pub usercreated: i64,
    pub timecreated: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: i64,
    pub reportid: i64,
    pub uniqueidentifier: String,
    pub columnorder: i64,
    #[serde(default)]
    pub sortenabled: bool,
}

/// A filter or, with `iscondition`, a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub id: i64,
    pub reportid: i64,
    pub uniqueidentifier: String,
    pub iscondition: bool,
    pub filterorder: i64,
}

/// What a report source offers, and what a default report starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datasource {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub filters: &'static [&'static str],
    pub default_columns: &'static [&'static str],
    pub default_filters: &'static [&'static str],
    pub default_conditions: &'static [&'static str],
}

pub const USERS_SOURCE: &str = "core_user\\reportbuilder\\datasource\\users";
pub const COURSES_SOURCE: &str = "core_course\\reportbuilder\\datasource\\courses";

const DATASOURCES: &[Datasource] = &[
    Datasource {
        name: USERS_SOURCE,
        columns: &[
            "user:fullname",
            "user:firstname",
            "user:lastname",
            "user:username",
            "user:email",
            "user:city",
            "user:lastaccess",
        ],
        filters: &[
            "user:fullname",
            "user:firstname",
            "user:lastname",
            "user:username",
            "user:email",
            "user:city",
            "user:suspended",
        ],
        default_columns: &["user:fullname", "user:username", "user:email"],
        default_filters: &["user:fullname", "user:username", "user:email"],
        default_conditions: &["user:fullname", "user:username", "user:email"],
    },
    Datasource {
        name: COURSES_SOURCE,
        columns: &[
            "course_category:name",
            "course:shortname",
            "course:fullname",
            "course:idnumber",
            "course:startdate",
        ],
        filters: &[
            "course_category:name",
            "course:shortname",
            "course:fullname",
            "course:idnumber",
            "course:courseselector",
        ],
        default_columns: &[
            "course_category:name",
            "course:shortname",
            "course:fullname",
            "course:idnumber",
        ],
        default_filters: &["course:courseselector"],
        default_conditions: &["course_category:name"],
    },
];

impl Datasource {
    pub fn find(name: &str) -> Option<&'static Datasource> {
        DATASOURCES.iter().find(|d| d.name == name)
    }

    pub fn all() -> &'static [Datasource] {
        DATASOURCES
    }

    pub fn has_column(&self, identifier: &str) -> bool {
        self.columns.contains(&identifier)
    }

    pub fn has_filter(&self, identifier: &str) -> bool {
        self.filters.contains(&identifier)
    }
}

pub trait ReportStore: Send + Sync {
    /// Create a report; with `default`, the source's default columns,
    /// filters and conditions are added.
    fn create_report(&self, name: &str, source: &str, default: bool, userid: i64) -> Result<Report>;

    fn add_column(&self, reportid: i64, uniqueidentifier: &str) -> Result<Column>;

    fn add_filter(&self, reportid: i64, uniqueidentifier: &str) -> Result<Filter>;

    fn add_condition(&self, reportid: i64, uniqueidentifier: &str) -> Result<Filter>;

    fn report(&self, id: i64) -> Option<Report>;

    /// Columns in display order.
    fn columns(&self, reportid: i64) -> Vec<Column>;

    fn filters(&self, reportid: i64) -> Vec<Filter>;

    fn conditions(&self, reportid: i64) -> Vec<Filter>;
}
