//! Reserved field names and type tags of the GraphSON format.

pub const EMBEDDED_TYPES: &str = "embeddedTypes";
pub const VERTICES: &str = "vertices";
pub const EDGES: &str = "edges";

pub const _ID: &str = "_id";
pub const _TYPE: &str = "_type";
pub const _OUT_V: &str = "_outV";
pub const _IN_V: &str = "_inV";
pub const _LABEL: &str = "_label";

/// Keys of a typed value object when embedded types are on.
pub const TYPE: &str = "type";
pub const VALUE: &str = "value";

/// Keys that never become properties of a vertex record.
pub const VERTEX_RESERVED: [&str; 2] = [_ID, _TYPE];

/// Keys that never become properties of an edge record.
pub const EDGE_RESERVED: [&str; 5] = [_ID, _TYPE, _OUT_V, _IN_V, _LABEL];

/// Property keys no store accepts.
pub const ID: &str = "id";
pub const LABEL: &str = "label";
