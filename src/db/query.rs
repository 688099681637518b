//! Query value types and the dialect-dispatching builder.

use super::relational::SqlQueryBuilder;
use super::timeseries::FluxQueryBuilder;

/// An executable backend-native query.
///
/// Produced by a query builder; callers that want portability never
/// hand-author `raw`.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Backend-native query text.
    pub raw: String,
    /// Positional bind parameters, if any.
    pub args: Vec<serde_json::Value>,
}

impl Query {
    /// Wrap an already-rendered query with no bind parameters.
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            raw: text.into(),
            args: Vec::new(),
        }
    }

    /// Attach positional bind parameters.
    pub fn with_args(mut self, args: Vec<serde_json::Value>) -> Self {
        self.args = args;
        self
    }
}

/// Normalized query result: ordered column names, ordered rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Builder for whichever dialect the driver speaks.
///
/// Chaining consumes and returns the builder; [`build`](Self::build) is the
/// single point an immutable [`Query`] is produced and it consumes the
/// builder, so a builder cannot be reused across `build` calls.
#[derive(Debug, Clone)]
pub enum AnyQueryBuilder {
    Sql(SqlQueryBuilder),
    Flux(FluxQueryBuilder),
}

impl AnyQueryBuilder {
    pub fn select<I, F>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        match self {
            Self::Sql(builder) => Self::Sql(builder.select(fields)),
            Self::Flux(builder) => Self::Flux(builder.select(fields)),
        }
    }

    pub fn from(self, source: impl Into<String>) -> Self {
        match self {
            Self::Sql(builder) => Self::Sql(builder.from(source)),
            Self::Flux(builder) => Self::Flux(builder.from(source)),
        }
    }

    pub fn where_clause(self, condition: impl Into<String>) -> Self {
        match self {
            Self::Sql(builder) => Self::Sql(builder.where_clause(condition)),
            Self::Flux(builder) => Self::Flux(builder.where_clause(condition)),
        }
    }

    pub fn group_by<I, F>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        match self {
            Self::Sql(builder) => Self::Sql(builder.group_by(fields)),
            Self::Flux(builder) => Self::Flux(builder.group_by(fields)),
        }
    }

    pub fn order_by(self, field: impl Into<String>, ascending: bool) -> Self {
        match self {
            Self::Sql(builder) => Self::Sql(builder.order_by(field, ascending)),
            Self::Flux(builder) => Self::Flux(builder.order_by(field, ascending)),
        }
    }

    pub fn limit(self, n: u64) -> Self {
        match self {
            Self::Sql(builder) => Self::Sql(builder.limit(n)),
            Self::Flux(builder) => Self::Flux(builder.limit(n)),
        }
    }

    /// Produce the query, consuming the builder.
    pub fn build(self) -> Query {
        match self {
            Self::Sql(builder) => builder.build(),
            Self::Flux(builder) => builder.build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_matches_direct_builders() {
        let via_any = AnyQueryBuilder::Sql(SqlQueryBuilder::new())
            .select(["a"])
            .from("t")
            .limit(1)
            .build();
        let direct = SqlQueryBuilder::new().select(["a"]).from("t").limit(1).build();
        assert_eq!(via_any, direct);

        let via_any = AnyQueryBuilder::Flux(FluxQueryBuilder::new())
            .from("t")
            .limit(1)
            .build();
        let direct = FluxQueryBuilder::new().from("t").limit(1).build();
        assert_eq!(via_any, direct);
    }

    #[test]
    fn test_raw_query_helper() {
        let query = Query::raw("SELECT 1").with_args(vec![serde_json::json!(5)]);
        assert_eq!(query.raw, "SELECT 1");
        assert_eq!(query.args.len(), 1);
    }
}
