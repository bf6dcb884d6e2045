// Typed query filters for the list and analytics endpoints.
//
// Each filter renders to ordered `(key, value)` pairs. Unset fields are
// omitted and list fields repeat their key (`status=a&status=b`), which is
// how the server reads multi-valued parameters.

use chrono::NaiveDate;

use crate::models::EntityId;

pub type QueryPairs = Vec<(String, String)>;

pub trait ToQuery {
    fn to_query(&self) -> QueryPairs;
}

/// Accumulates pairs, skipping unset values.
#[derive(Debug, Default)]
struct PairBuilder(QueryPairs);

impl PairBuilder {
    fn opt<V: ToString>(mut self, key: &str, value: &Option<V>) -> Self {
        if let Some(v) = value {
            self.0.push((key.to_string(), v.to_string()));
        }
        self
    }

    fn text(mut self, key: &str, value: &Option<String>) -> Self {
        if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            self.0.push((key.to_string(), v.to_string()));
        }
        self
    }

    fn date(mut self, key: &str, value: &Option<NaiveDate>) -> Self {
        if let Some(d) = value {
            self.0.push((key.to_string(), d.format("%Y-%m-%d").to_string()));
        }
        self
    }

    fn many(mut self, key: &str, values: &[String]) -> Self {
        self.0
            .extend(values.iter().map(|v| (key.to_string(), v.clone())));
        self
    }

    fn build(self) -> QueryPairs {
        self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EstimateFilter {
    pub name: Option<String>,
    pub client: Option<EntityId>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub favorite: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u64>,
}

impl ToQuery for EstimateFilter {
    fn to_query(&self) -> QueryPairs {
        PairBuilder::default()
            .text("name", &self.name)
            .opt("client", &self.client)
            .date("date_from", &self.date_from)
            .date("date_to", &self.date_to)
            .opt("favorite", &self.favorite)
            .opt("limit", &self.limit)
            .opt("offset", &self.offset)
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientFilter {
    pub name: Option<String>,
    pub company: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u64>,
}

impl ToQuery for ClientFilter {
    fn to_query(&self) -> QueryPairs {
        PairBuilder::default()
            .text("name", &self.name)
            .text("company", &self.company)
            .opt("limit", &self.limit)
            .opt("offset", &self.offset)
            .build()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateFilter {
    pub name: Option<String>,
}

impl ToQuery for TemplateFilter {
    fn to_query(&self) -> QueryPairs {
        PairBuilder::default().text("name", &self.name).build()
    }
}

/// Paging for change-log and version history endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub limit: Option<u32>,
    pub offset: Option<u64>,
}

impl ToQuery for LogFilter {
    fn to_query(&self) -> QueryPairs {
        PairBuilder::default()
            .opt("limit", &self.limit)
            .opt("offset", &self.offset)
            .build()
    }
}

/// Version history pages the same way as change logs.
pub type VersionFilter = LogFilter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Granularity {
    #[default]
    Month,
    Quarter,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Month => "month",
            Granularity::Quarter => "quarter",
        }
    }
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "month" => Ok(Granularity::Month),
            "quarter" => Ok(Granularity::Quarter),
            other => Err(format!("unknown granularity: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyticsFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Vec<String>,
    pub vat_enabled: Option<bool>,
    pub categories: Vec<String>,
    /// `None` leaves the server default (monthly).
    pub granularity: Option<Granularity>,
}

impl ToQuery for AnalyticsFilter {
    fn to_query(&self) -> QueryPairs {
        PairBuilder::default()
            .date("start_date", &self.start_date)
            .date("end_date", &self.end_date)
            .many("status", &self.status)
            .opt("vat_enabled", &self.vat_enabled)
            .many("categories", &self.categories)
            .opt("granularity", &self.granularity.map(Granularity::as_str))
            .build()
    }
}
