use crate::parser::step::{format_attributes, StepRecord, StepValue};

#[derive(Debug, Clone)]
pub struct HeaderRecord {
    keyword: String,
    values: Vec<StepValue>,
    raw: Option<String>,
}

impl HeaderRecord {
    #[must_use]
    pub fn new(keyword: &str, values: Vec<StepValue>) -> Self {
        Self {
            keyword: keyword.to_string(),
            values,
            raw: None,
        }
    }

    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    #[must_use]
    pub fn values(&self) -> &[StepValue] {
        &self.values
    }

    pub fn set_values(&mut self, values: Vec<StepValue>) {
        self.values = values;
        self.raw = None;
    }

    #[must_use]
    pub fn to_step(&self) -> String {
        match &self.raw {
            Some(raw) => raw.clone(),
            None => format!("{}{}", self.keyword, format_attributes(&self.values)),
        }
    }
}

impl From<StepRecord> for HeaderRecord {
    fn from(record: StepRecord) -> Self {
        Self {
            keyword: record.keyword,
            values: record.values,
            raw: Some(record.raw),
        }
    }
}

/// The HEADER section, in file order.
#[derive(Debug, Clone, Default)]
pub struct Header {
    records: Vec<HeaderRecord>,
}

impl Header {
    #[must_use]
    pub fn new(records: Vec<HeaderRecord>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn records(&self) -> &[HeaderRecord] {
        &self.records
    }

    #[must_use]
    pub fn get(&self, keyword: &str) -> Option<&HeaderRecord> {
        self.records.iter().find(|r| r.keyword == keyword)
    }

    pub fn get_mut(&mut self, keyword: &str) -> Option<&mut HeaderRecord> {
        self.records.iter_mut().find(|r| r.keyword == keyword)
    }
}
