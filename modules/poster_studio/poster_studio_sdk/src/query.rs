//! Table-style query types for the remote data service.
//!
//! Rows travel as JSON objects; typed decoding happens at the backend-access
//! boundary, never in the stores.

use std::fmt;

use serde_json::Value;

/// A single table row as returned by, or sent to, the data service.
pub type Row = serde_json::Map<String, Value>;

/// The three record collections the service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Profiles,
    Templates,
    UserDesigns,
}

impl Table {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::Templates => "templates",
            Self::UserDesigns => "user_designs",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Row filter. Only equality is needed by the stores.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Value },
}

impl Filter {
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Eq { column, .. } => column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    #[must_use]
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    #[must_use]
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }
}

/// Related record joined into the result rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Embed {
    /// The originating template of a design, under the `template` key.
    Template,
}

impl Embed {
    /// Key the embedded record is stored under in each row.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Template => "template",
        }
    }

    /// Table the embedded record comes from.
    #[must_use]
    pub const fn table(self) -> Table {
        match self {
            Self::Template => Table::Templates,
        }
    }

    /// Column of the parent row referencing the embedded record.
    #[must_use]
    pub const fn foreign_key(self) -> &'static str {
        match self {
            Self::Template => "template_id",
        }
    }
}

/// Filtered, ordered read over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub embed: Option<Embed>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn from(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: Vec::new(),
            embed: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn order(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    #[must_use]
    pub fn embed(mut self, embed: Embed) -> Self {
        self.embed = Some(embed);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
