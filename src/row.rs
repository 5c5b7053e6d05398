//! Rows of a definition section and the identifiers that key them.

use std::collections::HashMap;

/// One concrete rule instance: field name to value.
pub type Row = serde_json::Map<String, serde_json::Value>;

////////////////////////////////////////////// RowId ///////////////////////////////////////////////

/// An opaque row identifier.
///
/// Row ids are generated whenever a policy is loaded or a row is added.  They are unique for the
/// lifetime of a session and never sent to the catalog.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RowId(uuid::Uuid);

impl RowId {
    /// Generate a fresh row id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// The first eight hex digits, enough to tell rows apart on screen.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RowId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(uuid::Uuid::parse_str(s)?))
    }
}

//////////////////////////////////////////// truthiness ////////////////////////////////////////////

/// True when a field value counts as filled in.
///
/// `null`, `false`, zero and the empty string are empty; every other value, including empty
/// arrays and objects, is filled in.
pub fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().map(|x| x != 0.0 && !x.is_nan()).unwrap_or(true),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

/// The number of filled-in values of a row.
pub fn filled_fields(row: &Row) -> usize {
    row.values().filter(|v| is_truthy(v)).count()
}

///////////////////////////////////////////// Section //////////////////////////////////////////////

/// All rows of one definition section.
///
/// Rows are stored by id and their order is tracked separately, so iteration follows the order
/// in which rows were loaded or added.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Section {
    order: Vec<RowId>,
    rows: HashMap<RowId, Row>,
}

impl Section {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when the section has no rows.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Look up a row.
    pub fn get(&self, id: &RowId) -> Option<&Row> {
        self.rows.get(id)
    }

    /// True when the row exists.
    pub fn contains(&self, id: &RowId) -> bool {
        self.rows.contains_key(id)
    }

    /// The id of the row at a 1-based position.
    pub fn row_id(&self, position: usize) -> Option<RowId> {
        position
            .checked_sub(1)
            .and_then(|index| self.order.get(index))
            .copied()
    }

    /// Rows in order.
    pub fn iter(&self) -> impl Iterator<Item = (RowId, &Row)> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.rows.get(id).map(|row| (*id, row)))
    }

    /// Append a row under a fresh id.
    pub fn push(&mut self, row: Row) -> RowId {
        let id = RowId::generate();
        self.insert(id, row);
        id
    }

    /// Set one field of a row, creating the row at the end if it does not exist.
    pub fn set(&mut self, id: RowId, field: impl Into<String>, value: serde_json::Value) {
        if !self.rows.contains_key(&id) {
            self.insert(id, Row::new());
        }
        if let Some(row) = self.rows.get_mut(&id) {
            row.insert(field.into(), value);
        }
    }

    /// Remove a row, returning it if it existed.
    pub fn remove(&mut self, id: &RowId) -> Option<Row> {
        let row = self.rows.remove(id)?;
        self.order.retain(|x| x != id);
        Some(row)
    }

    /// Total filled-in values across every row.
    pub fn filled_fields(&self) -> usize {
        self.rows.values().map(filled_fields).sum()
    }

    fn insert(&mut self, id: RowId, row: Row) {
        if self.rows.insert(id, row).is_none() {
            self.order.push(id);
        }
    }
}
