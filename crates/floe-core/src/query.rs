use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// QueryInfo
///
/// Immutable bag of normalized query constraints attached to a request.
/// Absent constraint kinds are omitted, never empty-but-present, and every
/// kind is independent of the others: select and expand may both be present,
/// paging composes with ordering regardless of evaluation order.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct QueryInfo {
    select: Vec<String>,
    expand: Vec<String>,
    filter: Option<String>,
    order_by: Vec<OrderBy>,
    top: Option<u64>,
    skip: Option<u64>,
    inline_count: Option<InlineCount>,
    custom: BTreeMap<String, String>,
}

impl QueryInfo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- construction (consuming, builder-style) ---

    #[must_use]
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(fields.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn expand<I, S>(mut self, navs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expand.extend(navs.into_iter().map(Into::into));
        self
    }

    /// Attach a filter expression. The expression text is opaque to this
    /// layer; the grammar belongs to the dispatch collaborator.
    #[must_use]
    pub fn filter(mut self, expr: impl Into<String>) -> Self {
        self.filter = Some(expr.into());
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    #[must_use]
    pub const fn top(mut self, n: u64) -> Self {
        self.top = Some(n);
        self
    }

    #[must_use]
    pub const fn skip(mut self, n: u64) -> Self {
        self.skip = Some(n);
        self
    }

    #[must_use]
    pub const fn inline_count(mut self) -> Self {
        self.inline_count = Some(InlineCount::AllPages);
        self
    }

    #[must_use]
    pub fn custom(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.insert(name.into(), value.into());
        self
    }

    // --- accessors ---

    #[must_use]
    pub fn selection(&self) -> &[String] {
        &self.select
    }

    #[must_use]
    pub fn expansion(&self) -> &[String] {
        &self.expand
    }

    #[must_use]
    pub fn filter_text(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    #[must_use]
    pub fn ordering(&self) -> &[OrderBy] {
        &self.order_by
    }

    #[must_use]
    pub const fn top_limit(&self) -> Option<u64> {
        self.top
    }

    #[must_use]
    pub const fn skip_offset(&self) -> Option<u64> {
        self.skip
    }

    #[must_use]
    pub const fn wants_inline_count(&self) -> bool {
        self.inline_count.is_some()
    }

    #[must_use]
    pub const fn custom_options(&self) -> &BTreeMap<String, String> {
        &self.custom
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.select.is_empty()
            && self.expand.is_empty()
            && self.filter.is_none()
            && self.order_by.is_empty()
            && self.top.is_none()
            && self.skip.is_none()
            && self.inline_count.is_none()
            && self.custom.is_empty()
    }

    /// Render the `$`-option query-string form; empty when no constraints.
    /// Output order is fixed, values are percent-escaped.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();

        if !self.select.is_empty() {
            pairs.push(("$select", self.select.join(",")));
        }
        if !self.expand.is_empty() {
            pairs.push(("$expand", self.expand.join(",")));
        }
        if let Some(filter) = &self.filter {
            pairs.push(("$filter", filter.clone()));
        }
        if !self.order_by.is_empty() {
            let rendered: Vec<String> = self.order_by.iter().map(OrderBy::render).collect();
            pairs.push(("$orderby", rendered.join(",")));
        }
        if let Some(top) = self.top {
            pairs.push(("$top", top.to_string()));
        }
        if let Some(skip) = self.skip {
            pairs.push(("$skip", skip.to_string()));
        }
        if let Some(count) = self.inline_count {
            pairs.push(("$inlinecount", count.to_string()));
        }
        for (name, value) in &self.custom {
            pairs.push((name.as_str(), value.clone()));
        }

        pairs
            .iter()
            .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

///
/// OrderBy
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    /// Textual form: ascending renders bare, descending with a suffix.
    #[must_use]
    pub fn render(&self) -> String {
        match self.direction {
            Direction::Asc => self.field.clone(),
            Direction::Desc => format!("{} desc", self.field),
        }
    }
}

///
/// Direction
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum Direction {
    #[default]
    #[display("asc")]
    Asc,

    #[display("desc")]
    Desc,
}

///
/// InlineCount
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum InlineCount {
    #[display("allpages")]
    AllPages,
}

///
/// TESTS
///
