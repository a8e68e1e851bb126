/// Operators understood by the query engine.
///
/// Parsing accepts any identifier as a call name; only names listed here
/// compile into pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // Comparison
    /// Equal (`eq`, or the implicit `key=value`)
    Eq,
    /// Not equal (`ne`)
    Ne,
    /// Less than (`lt`)
    Lt,
    /// Less than or equal (`le`)
    Le,
    /// Greater than (`gt`)
    Gt,
    /// Greater than or equal (`ge`)
    Ge,

    // Membership
    /// Field value is one of an array (`in`)
    In,
    /// Field value is none of an array (`out`)
    Out,
    /// Field array holds a value (`contains`)
    Contains,
    /// Field array lacks a value (`excludes`)
    Excludes,

    // Logical
    /// All nested predicates hold (`and`)
    And,
    /// Any nested predicate holds (`or`)
    Or,

    // Transforming
    Select,
    Values,
    Sort,
    Limit,
    Slice,
    Index,
    Distinct,
    First,
    One,
    Unwind,
    /// Field reference (`key(field)`), also usable as a comparison operand
    Key,

    // Aggregating
    Sum,
    Mean,
    Max,
    Min,
    Count,
    Aggregate,
}

impl Operator {
    pub const ALL: [Operator; 29] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Le,
        Operator::Gt,
        Operator::Ge,
        Operator::In,
        Operator::Out,
        Operator::Contains,
        Operator::Excludes,
        Operator::And,
        Operator::Or,
        Operator::Select,
        Operator::Values,
        Operator::Sort,
        Operator::Limit,
        Operator::Slice,
        Operator::Index,
        Operator::Distinct,
        Operator::First,
        Operator::One,
        Operator::Unwind,
        Operator::Key,
        Operator::Sum,
        Operator::Mean,
        Operator::Max,
        Operator::Min,
        Operator::Count,
        Operator::Aggregate,
    ];

    /// Single dispatch point from call names to operators.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::In => "in",
            Operator::Out => "out",
            Operator::Contains => "contains",
            Operator::Excludes => "excludes",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Select => "select",
            Operator::Values => "values",
            Operator::Sort => "sort",
            Operator::Limit => "limit",
            Operator::Slice => "slice",
            Operator::Index => "index",
            Operator::Distinct => "distinct",
            Operator::First => "first",
            Operator::One => "one",
            Operator::Unwind => "unwind",
            Operator::Key => "key",
            Operator::Sum => "sum",
            Operator::Mean => "mean",
            Operator::Max => "max",
            Operator::Min => "min",
            Operator::Count => "count",
            Operator::Aggregate => "aggregate",
        }
    }

    /// True for operators that keep or drop whole records.
    pub fn is_filter(self) -> bool {
        matches!(
            self,
            Operator::Eq
                | Operator::Ne
                | Operator::Lt
                | Operator::Le
                | Operator::Gt
                | Operator::Ge
                | Operator::In
                | Operator::Out
                | Operator::Contains
                | Operator::Excludes
                | Operator::And
                | Operator::Or
        )
    }

    /// True for the reducers allowed inside `aggregate(...)`.
    pub fn is_reducer(self) -> bool {
        matches!(
            self,
            Operator::Sum | Operator::Mean | Operator::Max | Operator::Min | Operator::Count
        )
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
